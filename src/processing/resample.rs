//! Stages that read neighbouring texels from a pre-stage snapshot.

use image::RgbaImage;

use crate::processing::kernel::{to_channel, RowKernel, Rows};
use crate::settings::{unit, MAX_ANAGLYPH_OFFSET};

/// Splits red and blue horizontally in opposite directions.
#[derive(Debug, Clone, Copy)]
pub struct ChromaticAberration {
    offset: u32,
}

impl ChromaticAberration {
    pub fn new(intensity: u8) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            offset: (8.0 * t).floor() as u32,
        })
    }
}

impl RowKernel for ChromaticAberration {
    fn needs_snapshot(&self) -> bool {
        true
    }

    fn apply_rows(&mut self, mut rows: Rows<'_>, snapshot: Option<&RgbaImage>) {
        let Some(source) = snapshot else {
            return;
        };
        let last = rows.width - 1;
        for (y, row) in rows.rows_mut() {
            for (x, texel) in row.chunks_exact_mut(4).enumerate() {
                let x = x as u32;
                let red_from = x.saturating_add(self.offset).min(last);
                let blue_from = x.saturating_sub(self.offset);
                texel[0] = source.get_pixel(red_from, y)[0];
                texel[2] = source.get_pixel(blue_from, y)[2];
            }
        }
    }
}

/// Sinusoidal warp of sample positions.
#[derive(Debug, Clone, Copy)]
pub struct Displacement {
    t: f32,
    amount: f32,
}

impl Displacement {
    pub fn new(intensity: u8) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            t,
            amount: (20.0 * t).floor(),
        })
    }

    fn offsets(&self, x: u32, y: u32) -> (i64, i64) {
        let (fx, fy) = (x as f32, y as f32);
        let dx = ((0.1 * fx + 0.1 * fy).sin() * self.t * self.amount).floor();
        let dy = ((0.05 * fx).sin() * self.t * self.amount * 0.5).floor();
        (dx as i64, dy as i64)
    }
}

impl RowKernel for Displacement {
    fn needs_snapshot(&self) -> bool {
        true
    }

    fn apply_rows(&mut self, mut rows: Rows<'_>, snapshot: Option<&RgbaImage>) {
        let Some(source) = snapshot else {
            return;
        };
        let max_x = i64::from(rows.width) - 1;
        let max_y = i64::from(rows.height) - 1;
        for (y, row) in rows.rows_mut() {
            for (x, texel) in row.chunks_exact_mut(4).enumerate() {
                let (dx, dy) = self.offsets(x as u32, y);
                let sx = (x as i64 + dx).clamp(0, max_x) as u32;
                let sy = (i64::from(y) + dy).clamp(0, max_y) as u32;
                texel.copy_from_slice(&source.get_pixel(sx, sy).0);
            }
        }
    }
}

/// Red/cyan stereo synthesis from horizontally offset luma samples.
#[derive(Debug, Clone, Copy)]
pub struct Anaglyph {
    t: f32,
    offset: u32,
}

impl Anaglyph {
    pub fn new(intensity: u8, offset: u8) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            t,
            offset: u32::from(offset.min(MAX_ANAGLYPH_OFFSET)),
        })
    }
}

impl RowKernel for Anaglyph {
    fn needs_snapshot(&self) -> bool {
        true
    }

    fn apply_rows(&mut self, mut rows: Rows<'_>, snapshot: Option<&RgbaImage>) {
        let Some(source) = snapshot else {
            return;
        };
        let last = rows.width - 1;
        let t = self.t;
        for (y, row) in rows.rows_mut() {
            for (x, texel) in row.chunks_exact_mut(4).enumerate() {
                let x = x as u32;
                let left = luma(&source.get_pixel(x.saturating_sub(self.offset), y).0);
                let right = luma(&source.get_pixel(x.saturating_add(self.offset).min(last), y).0);
                texel[0] = to_channel(blend(left, f32::from(texel[0]), t));
                texel[1] = to_channel(f32::from(texel[1]) * (1.0 - 0.8 * t));
                texel[2] = to_channel(blend(right, f32::from(texel[2]), t));
            }
        }
    }
}

fn luma(texel: &[u8; 4]) -> f32 {
    0.299 * f32::from(texel[0]) + 0.587 * f32::from(texel[1]) + 0.114 * f32::from(texel[2])
}

fn blend(effect: f32, original: f32, t: f32) -> f32 {
    effect * t + original * (1.0 - t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::kernel::{apply_chunked, apply_whole};
    use image::Rgba;

    fn four_distinct() -> RgbaImage {
        let mut img = RgbaImage::new(4, 1);
        img.put_pixel(0, 0, Rgba([10, 11, 12, 255]));
        img.put_pixel(1, 0, Rgba([20, 21, 22, 255]));
        img.put_pixel(2, 0, Rgba([30, 31, 32, 255]));
        img.put_pixel(3, 0, Rgba([40, 41, 42, 255]));
        img
    }

    #[test]
    fn chromatic_half_strength_shifts_by_four_and_clamps() {
        let mut img = four_distinct();
        apply_whole(&mut img, &mut ChromaticAberration::new(50).unwrap());
        // offset 4 on a 4-wide row: red always comes from x=3, blue from x=0
        assert_eq!(img.get_pixel(0, 0).0, [40, 11, 12, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [40, 21, 12, 255]);
        assert_eq!(img.get_pixel(2, 0).0, [40, 31, 12, 255]);
        assert_eq!(img.get_pixel(3, 0).0, [40, 41, 12, 255]);
    }

    #[test]
    fn chromatic_small_offset_directions() {
        let mut img = four_distinct();
        // 25% -> floor(8 * 0.25) = 2
        apply_whole(&mut img, &mut ChromaticAberration::new(25).unwrap());
        let reds: Vec<u8> = img.pixels().map(|p| p[0]).collect();
        let blues: Vec<u8> = img.pixels().map(|p| p[2]).collect();
        assert_eq!(reds, vec![30, 40, 40, 40]);
        assert_eq!(blues, vec![12, 12, 12, 22]);
    }

    #[test]
    fn chromatic_below_one_pixel_is_a_no_op() {
        let mut img = four_distinct();
        apply_whole(&mut img, &mut ChromaticAberration::new(10).unwrap());
        assert_eq!(img, four_distinct());
    }

    #[test]
    fn displacement_offsets_match_formula() {
        let kernel = Displacement::new(100).unwrap();
        assert_eq!(kernel.offsets(0, 0), (0, 0));
        // sin(0.1 * 10 + 0.1 * 5) = sin(1.5) ~= 0.997 -> floor(19.95) = 19
        // sin(0.05 * 10) = sin(0.5) ~= 0.479 -> floor(4.79) = 4
        assert_eq!(kernel.offsets(10, 5), (19, 4));
    }

    #[test]
    fn displacement_chunked_matches_single_pass() {
        let mut a = RgbaImage::from_fn(37, 29, |x, y| Rgba([(x * 7) as u8, (y * 5) as u8, 9, 255]));
        let mut b = a.clone();
        apply_whole(&mut a, &mut Displacement::new(70).unwrap());
        apply_chunked(&mut b, &mut Displacement::new(70).unwrap(), 3);
        assert_eq!(a, b);
    }

    #[test]
    fn anaglyph_full_strength_uses_offset_luma() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 200]));
        img.put_pixel(1, 0, Rgba([100, 50, 20, 200]));
        img.put_pixel(2, 0, Rgba([0, 0, 0, 200]));
        apply_whole(&mut img, &mut Anaglyph::new(100, 1).unwrap());
        let px = img.get_pixel(1, 0).0;
        // left eye sees the white texel, right eye the black one
        assert_eq!(px, [255, 10, 0, 200]);
    }

    #[test]
    fn anaglyph_zero_offset_blends_with_own_luma() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 0, 255]));
        apply_whole(&mut img, &mut Anaglyph::new(50, 0).unwrap());
        let gray = 0.299 * 200.0 + 0.587 * 100.0;
        let px = img.get_pixel(0, 0).0;
        assert_eq!(px[0], to_channel(gray * 0.5 + 200.0 * 0.5));
        assert_eq!(px[1], to_channel(100.0 * 0.6));
        assert_eq!(px[2], to_channel(gray * 0.5));
        assert_eq!(px[3], 255);
    }
}
