use image::RgbaImage;
use rand::Rng;

use crate::processing::kernel::{RowKernel, Rows};
use crate::settings::unit;

/// Only the first bands from the top are considered.
pub const MAX_BANDS: u32 = 50;

/// Brightness sort over horizontal bands, each picked with probability `t`.
pub struct PixelSort<'r, R: Rng + ?Sized> {
    t: f32,
    band_height: u32,
    rng: &'r mut R,
}

impl<'r, R: Rng + ?Sized> PixelSort<'r, R> {
    pub fn new(intensity: u8, rng: &'r mut R) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            t,
            band_height: band_height(t),
            rng,
        })
    }
}

/// Rows per band: thin bands at high intensity, thick ones at low.
#[must_use]
pub fn band_height(t: f32) -> u32 {
    ((20.0 * (1.0 - t)).floor() as u32).max(1)
}

impl<R: Rng + ?Sized> RowKernel for PixelSort<'_, R> {
    fn row_alignment(&self) -> u32 {
        self.band_height
    }

    fn apply_rows(&mut self, rows: Rows<'_>, _snapshot: Option<&RgbaImage>) {
        let band_bytes = self.band_height as usize * rows.width as usize * 4;
        let first_band = rows.first_row / self.band_height;
        for (i, band) in rows.data.chunks_mut(band_bytes).enumerate() {
            if first_band + i as u32 >= MAX_BANDS {
                break;
            }
            if self.rng.random_bool(f64::from(self.t)) {
                sort_band(band);
            }
        }
    }
}

/// Stable ascending sort of a band's texels by `(R + G + B) / 3`, written
/// back in row-major order.
pub fn sort_band(band: &mut [u8]) {
    let mut texels: Vec<[u8; 4]> = band
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();
    texels.sort_by_key(|t| u16::from(t[0]) + u16::from(t[1]) + u16::from(t[2]));
    for (out, texel) in band.chunks_exact_mut(4).zip(&texels) {
        out.copy_from_slice(texel);
    }
}
