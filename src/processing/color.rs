//! Per-texel channel math: color bleed, color shift and noise.

use image::RgbaImage;
use rand::Rng;

use crate::processing::kernel::{to_channel, RowKernel, Rows};
use crate::settings::unit;

/// Warm analog bleed: boosts red and blue, pulls green down.
#[derive(Debug, Clone, Copy)]
pub struct ColorBleed {
    gains: [f32; 3],
}

impl ColorBleed {
    pub fn new(intensity: u8) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            gains: [1.0 + 0.3 * t, 1.0 - 0.2 * t, 1.0 + 0.4 * t],
        })
    }
}

impl RowKernel for ColorBleed {
    fn apply_rows(&mut self, mut rows: Rows<'_>, _snapshot: Option<&RgbaImage>) {
        for (_, row) in rows.rows_mut() {
            for texel in row.chunks_exact_mut(4) {
                for (channel, gain) in texel[..3].iter_mut().zip(self.gains) {
                    *channel = to_channel(f32::from(*channel) * gain);
                }
            }
        }
    }
}

/// Slow sinusoidal hue drift along the linear texel index.
#[derive(Debug, Clone, Copy)]
pub struct ColorShift {
    amplitude: f32,
}

impl ColorShift {
    pub fn new(intensity: u8) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            amplitude: t * 100.0,
        })
    }
}

impl RowKernel for ColorShift {
    fn apply_rows(&mut self, mut rows: Rows<'_>, _snapshot: Option<&RgbaImage>) {
        let width = rows.width as usize;
        for (y, row) in rows.rows_mut() {
            let row_start = y as usize * width;
            for (x, texel) in row.chunks_exact_mut(4).enumerate() {
                let i = (row_start + x) as f64;
                let shift = ((0.001 * i).sin() as f32) * self.amplitude;
                texel[0] = to_channel(f32::from(texel[0]) + shift);
                texel[1] = to_channel(f32::from(texel[1]) - shift * 0.5);
                texel[2] = to_channel(f32::from(texel[2]) + shift * 0.8);
            }
        }
    }
}

/// Uniform luminance grain; one draw per texel shared by R, G and B.
pub struct Noise<'r, R: Rng + ?Sized> {
    strength: f32,
    rng: &'r mut R,
}

impl<'r, R: Rng + ?Sized> Noise<'r, R> {
    pub fn new(intensity: u8, rng: &'r mut R) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            strength: t * 50.0,
            rng,
        })
    }
}

impl<R: Rng + ?Sized> RowKernel for Noise<'_, R> {
    fn apply_rows(&mut self, mut rows: Rows<'_>, _snapshot: Option<&RgbaImage>) {
        for (_, row) in rows.rows_mut() {
            for texel in row.chunks_exact_mut(4) {
                let grain = (self.rng.random::<f32>() - 0.5) * self.strength;
                for channel in &mut texel[..3] {
                    *channel = to_channel(f32::from(*channel) + grain);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::kernel::apply_whole;
    use image::Rgba;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn color_bleed_full_strength_on_mid_gray() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([100, 100, 100, 255]));
        apply_whole(&mut img, &mut ColorBleed::new(100).unwrap());
        assert_eq!(img.get_pixel(0, 0).0, [130, 80, 140, 255]);
    }

    #[test]
    fn color_bleed_clamps_bright_channels() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([250, 10, 200, 128]));
        apply_whole(&mut img, &mut ColorBleed::new(100).unwrap());
        assert_eq!(img.get_pixel(0, 0).0, [255, 8, 255, 128]);
    }

    #[test]
    fn zero_intensity_builds_no_kernel() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(ColorBleed::new(0).is_none());
        assert!(ColorShift::new(0).is_none());
        assert!(Noise::new(0, &mut rng).is_none());
    }

    #[test]
    fn color_shift_follows_linear_index() {
        let width = 2000;
        let mut img = RgbaImage::from_pixel(width, 1, Rgba([128, 128, 128, 255]));
        apply_whole(&mut img, &mut ColorShift::new(50).unwrap());

        // i = 0 -> sin(0) = 0, untouched
        assert_eq!(img.get_pixel(0, 0).0, [128, 128, 128, 255]);

        // i = 1571 -> sin(1.571) ~= 1.0, shift ~= 50
        let shift = (0.001f64 * 1571.0).sin() as f32 * 50.0;
        let px = img.get_pixel(1571, 0).0;
        assert_eq!(px[0], to_channel(128.0 + shift));
        assert_eq!(px[1], to_channel(128.0 - shift * 0.5));
        assert_eq!(px[2], to_channel(128.0 + shift * 0.8));
        assert_eq!(px[3], 255);
    }

    #[test]
    fn color_shift_index_continues_across_rows() {
        let mut wide = RgbaImage::from_pixel(600, 1, Rgba([90, 90, 90, 255]));
        let mut folded = RgbaImage::from_pixel(300, 2, Rgba([90, 90, 90, 255]));
        apply_whole(&mut wide, &mut ColorShift::new(80).unwrap());
        apply_whole(&mut folded, &mut ColorShift::new(80).unwrap());
        assert_eq!(wide.as_raw(), folded.as_raw());
    }

    #[test]
    fn noise_stays_within_strength_and_keeps_alpha() {
        let mut img = RgbaImage::from_pixel(64, 64, Rgba([128, 128, 128, 77]));
        let mut rng = StdRng::seed_from_u64(7);
        apply_whole(&mut img, &mut Noise::new(100, &mut rng).unwrap());

        let mut changed = 0;
        for px in img.pixels() {
            assert_eq!(px[3], 77);
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert!(px[0].abs_diff(128) <= 25, "{:?}", px.0);
            if px[0] != 128 {
                changed += 1;
            }
        }
        assert!(changed > 64 * 64 / 2);
    }
}
