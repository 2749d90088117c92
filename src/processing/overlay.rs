//! Composited overlays applied after all resampling stages.

use image::RgbaImage;

use crate::processing::kernel::{to_channel, RowKernel, Rows};
use crate::settings::unit;

/// Frame thickness of the CRT bezel, in pixels.
pub const BEZEL_BORDER_PX: u32 = 4;
const BEZEL_COLOR: [u8; 3] = [12, 12, 12];
const VIGNETTE_MAX_OPACITY: f32 = 0.8;
/// Normalized radius where the vignette starts to darken.
const VIGNETTE_INNER: f32 = 0.45;

/// Darkens every n-th row with a translucent black line.
#[derive(Debug, Clone, Copy)]
pub struct Scanlines {
    spacing: u32,
    keep: f32,
}

impl Scanlines {
    pub fn new(intensity: u8) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            spacing: ((4.0 / t).floor() as u32).max(1),
            keep: 1.0 - 0.3 * t,
        })
    }

    #[must_use]
    pub fn spacing(&self) -> u32 {
        self.spacing
    }
}

impl RowKernel for Scanlines {
    fn apply_rows(&mut self, mut rows: Rows<'_>, _snapshot: Option<&RgbaImage>) {
        let spacing = self.spacing;
        let keep = self.keep;
        for (_, row) in rows.rows_mut().filter(|(y, _)| y % spacing == 0) {
            for texel in row.chunks_exact_mut(4) {
                for channel in &mut texel[..3] {
                    *channel = to_channel(f32::from(*channel) * keep);
                }
            }
        }
    }
}

/// Radial vignette plus a solid dark frame around the edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrtBezel;

impl CrtBezel {
    pub fn new(enabled: bool) -> Option<Self> {
        enabled.then_some(Self)
    }
}

impl RowKernel for CrtBezel {
    fn apply_rows(&mut self, mut rows: Rows<'_>, _snapshot: Option<&RgbaImage>) {
        let (width, height) = (rows.width, rows.height);
        let center_x = (width as f32 - 1.0) * 0.5;
        let center_y = (height as f32 - 1.0) * 0.5;
        let corner = (center_x * center_x + center_y * center_y).sqrt().max(1.0);
        for (y, row) in rows.rows_mut() {
            let in_frame_row = y < BEZEL_BORDER_PX || y >= height.saturating_sub(BEZEL_BORDER_PX);
            let dy = y as f32 - center_y;
            for (x, texel) in row.chunks_exact_mut(4).enumerate() {
                let x = x as u32;
                if in_frame_row || x < BEZEL_BORDER_PX || x >= width.saturating_sub(BEZEL_BORDER_PX)
                {
                    texel[..3].copy_from_slice(&BEZEL_COLOR);
                    texel[3] = 255;
                    continue;
                }
                let dx = x as f32 - center_x;
                let radius = (dx * dx + dy * dy).sqrt() / corner;
                let opacity = vignette_opacity(radius);
                if opacity <= 0.0 {
                    continue;
                }
                for channel in &mut texel[..3] {
                    *channel = to_channel(f32::from(*channel) * (1.0 - opacity));
                }
            }
        }
    }
}

/// Black overlay opacity at a normalized distance from the centre
/// (0 at the centre, 1 at the corners).
#[must_use]
pub fn vignette_opacity(radius: f32) -> f32 {
    let t = ((radius - VIGNETTE_INNER) / (1.0 - VIGNETTE_INNER)).clamp(0.0, 1.0);
    VIGNETTE_MAX_OPACITY * smoothstep(t)
}

fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::kernel::apply_whole;
    use image::Rgba;

    #[test]
    fn scanline_spacing_follows_intensity() {
        assert_eq!(Scanlines::new(100).unwrap().spacing(), 4);
        assert_eq!(Scanlines::new(50).unwrap().spacing(), 8);
        assert_eq!(Scanlines::new(3).unwrap().spacing(), 133);
    }

    #[test]
    fn scanlines_darken_only_selected_rows() {
        let mut img = RgbaImage::from_pixel(3, 9, Rgba([200, 100, 50, 255]));
        apply_whole(&mut img, &mut Scanlines::new(100).unwrap());
        for y in 0..9 {
            let px = img.get_pixel(1, y).0;
            if y % 4 == 0 {
                assert_eq!(px, [140, 70, 35, 255], "row {y}");
            } else {
                assert_eq!(px, [200, 100, 50, 255], "row {y}");
            }
        }
    }

    #[test]
    fn bezel_is_disabled_by_flag() {
        assert!(CrtBezel::new(false).is_none());
        assert!(CrtBezel::new(true).is_some());
    }

    #[test]
    fn bezel_frames_edges_and_keeps_centre() {
        let mut img = RgbaImage::from_pixel(41, 41, Rgba([200, 200, 200, 128]));
        apply_whole(&mut img, &mut CrtBezel);
        assert_eq!(img.get_pixel(0, 0).0, [12, 12, 12, 255]);
        assert_eq!(img.get_pixel(3, 20).0, [12, 12, 12, 255]);
        assert_eq!(img.get_pixel(20, 37).0, [12, 12, 12, 255]);
        assert_eq!(img.get_pixel(20, 20).0, [200, 200, 200, 128]);
        // inside the frame but near a corner: darkened, alpha kept
        let near_corner = img.get_pixel(4, 4).0;
        assert!(near_corner[0] < 120, "{near_corner:?}");
        assert_eq!(near_corner[3], 128);
    }

    #[test]
    fn vignette_ramps_to_eighty_percent() {
        assert_eq!(vignette_opacity(0.0), 0.0);
        assert_eq!(vignette_opacity(VIGNETTE_INNER), 0.0);
        assert!((vignette_opacity(1.0) - 0.8).abs() < 1e-6);
        assert!(vignette_opacity(0.7) < vignette_opacity(0.9));
    }
}
