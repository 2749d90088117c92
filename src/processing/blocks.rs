//! Block-structured stages: pixelation and datamosh.

use image::RgbaImage;
use rand::Rng;
use tracing::trace;

use crate::processing::kernel::{texel_offset, RowKernel, Rows};
use crate::settings::unit;

const DATAMOSH_MAX_BLOCKS: usize = 100;

/// Mosaic of flat squares, each filled with the texel at its top-left corner.
#[derive(Debug, Clone, Copy)]
pub struct Pixelation {
    block: u32,
}

impl Pixelation {
    pub fn new(intensity: u8) -> Option<Self> {
        let t = unit(intensity);
        (t > 0.0).then(|| Self {
            block: (12.0 * t).floor() as u32 + 1,
        })
    }

    #[must_use]
    pub fn block_size(&self) -> u32 {
        self.block
    }
}

impl RowKernel for Pixelation {
    // Each block is sampled and filled inside one chunk, so no snapshot is
    // needed: a block's representative texel is only ever overwritten with
    // its own value.
    fn row_alignment(&self) -> u32 {
        self.block
    }

    fn apply_rows(&mut self, rows: Rows<'_>, _snapshot: Option<&RgbaImage>) {
        if self.block <= 1 {
            return;
        }
        let width = rows.width;
        let chunk_rows = rows.row_count();
        let data = rows.data;
        let mut by = 0;
        while by < chunk_rows {
            let block_h = self.block.min(chunk_rows - by);
            let mut bx = 0;
            while bx < width {
                let block_w = self.block.min(width - bx);
                let at = texel_offset(width, bx, by);
                let mut color = [0u8; 4];
                color.copy_from_slice(&data[at..at + 4]);
                for y in by..by + block_h {
                    let start = texel_offset(width, bx, y);
                    let end = start + block_w as usize * 4;
                    for texel in data[start..end].chunks_exact_mut(4) {
                        texel.copy_from_slice(&color);
                    }
                }
                bx += self.block;
            }
            by += self.block;
        }
    }
}

/// Corrupt the image by copying random square blocks over each other.
///
/// Returns the number of blocks actually copied. Placements are drawn so the
/// block always fits; when the image is smaller than one block there is no
/// valid placement and nothing is copied.
pub fn datamosh<R: Rng + ?Sized>(image: &mut RgbaImage, intensity: u8, rng: &mut R) -> usize {
    let t = unit(intensity);
    if t <= 0.0 {
        return 0;
    }
    let (width, height) = image.dimensions();
    let block = (20.0 * t).floor() as u32 + 5;
    let area = f64::from(width) * f64::from(height);
    let wanted = (area / f64::from(block * block) * f64::from(t) * 0.3).floor() as usize;
    let count = wanted.min(DATAMOSH_MAX_BLOCKS);
    if block > width || block > height {
        trace!(block, width, height, "datamosh block larger than image; skipping");
        return 0;
    }

    let row_bytes = block as usize * 4;
    let mut scratch = vec![0u8; row_bytes * block as usize];
    for _ in 0..count {
        let sx = rng.random_range(0..=width - block);
        let sy = rng.random_range(0..=height - block);
        let dx = rng.random_range(0..=width - block);
        let dy = rng.random_range(0..=height - block);
        copy_block(image, &mut scratch, block, (sx, sy), (dx, dy));
    }
    count
}

fn copy_block(
    image: &mut RgbaImage,
    scratch: &mut [u8],
    block: u32,
    (sx, sy): (u32, u32),
    (dx, dy): (u32, u32),
) {
    let width = image.width();
    let row_bytes = block as usize * 4;
    let data: &mut [u8] = image;
    // stage through scratch so overlapping source/destination copies stay exact
    for (row, out) in scratch.chunks_exact_mut(row_bytes).enumerate() {
        let start = texel_offset(width, sx, sy + row as u32);
        out.copy_from_slice(&data[start..start + row_bytes]);
    }
    for (row, src) in scratch.chunks_exact(row_bytes).enumerate() {
        let start = texel_offset(width, dx, dy + row as u32);
        data[start..start + row_bytes].copy_from_slice(src);
    }
}
