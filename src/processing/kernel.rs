//! Row-oriented stage interface shared by the single-pass and chunked drivers.

use image::RgbaImage;

/// A contiguous group of full rows borrowed mutably out of a raster.
#[derive(Debug)]
pub struct Rows<'a> {
    /// Width of the whole raster in texels.
    pub width: u32,
    /// Height of the whole raster in texels.
    pub height: u32,
    /// Index of the first row contained in `data`.
    pub first_row: u32,
    /// RGBA bytes for `data.len() / (width * 4)` rows.
    pub data: &'a mut [u8],
}

impl Rows<'_> {
    #[must_use]
    pub fn row_count(&self) -> u32 {
        (self.data.len() / (self.width as usize * 4)) as u32
    }

    /// Iterate `(y, row_bytes)` pairs, `y` being the absolute row index.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (u32, &mut [u8])> {
        let first = self.first_row;
        self.data
            .chunks_exact_mut(self.width as usize * 4)
            .enumerate()
            .map(move |(i, row)| (first + i as u32, row))
    }
}

/// A stage that rewrites rows independently of one another.
///
/// Kernels may keep state across calls (a random source, say), but they are
/// always fed rows top to bottom, exactly once each.
pub trait RowKernel {
    /// Whether the kernel samples other texels and therefore needs a copy of
    /// the buffer as it was before the stage began.
    fn needs_snapshot(&self) -> bool {
        false
    }

    /// Chunks handed to [`RowKernel::apply_rows`] start on multiples of this.
    fn row_alignment(&self) -> u32 {
        1
    }

    fn apply_rows(&mut self, rows: Rows<'_>, snapshot: Option<&RgbaImage>);
}

/// Run `kernel` over the whole image in one pass.
pub fn apply_whole<K: RowKernel + ?Sized>(image: &mut RgbaImage, kernel: &mut K) {
    let rows = image.height();
    apply_chunked(image, kernel, rows.max(1));
}

/// Run `kernel` over the image in groups of `rows_per_chunk` rows, rounded
/// up to the kernel's alignment.
pub fn apply_chunked<K: RowKernel + ?Sized>(
    image: &mut RgbaImage,
    kernel: &mut K,
    rows_per_chunk: u32,
) {
    let pass = ChunkedPass::new(image, kernel, rows_per_chunk);
    for index in 0..pass.chunk_count() {
        pass.apply(image, kernel, index);
    }
}

/// One stage's walk over an image, split into row chunks.
///
/// Holds the pre-stage snapshot for kernels that sample neighbours, so every
/// chunk reads the same source regardless of how the rows were split.
#[derive(Debug)]
pub struct ChunkedPass {
    width: u32,
    height: u32,
    rows: u32,
    snapshot: Option<RgbaImage>,
}

impl ChunkedPass {
    pub fn new<K: RowKernel + ?Sized>(image: &RgbaImage, kernel: &K, rows_per_chunk: u32) -> Self {
        let (width, height) = image.dimensions();
        let empty = width == 0 || height == 0;
        Self {
            width,
            height,
            rows: chunk_rows(rows_per_chunk, kernel.row_alignment()),
            snapshot: (!empty && kernel.needs_snapshot()).then(|| image.clone()),
        }
    }

    /// Number of chunks; zero for an empty image.
    #[must_use]
    pub fn chunk_count(&self) -> u32 {
        if self.width == 0 {
            return 0;
        }
        self.height.div_ceil(self.rows)
    }

    /// Feed chunk `index` (top to bottom) to `kernel`.
    pub fn apply<K: RowKernel + ?Sized>(&self, image: &mut RgbaImage, kernel: &mut K, index: u32) {
        let first_row = index * self.rows;
        if first_row >= self.height {
            return;
        }
        let last_row = first_row.saturating_add(self.rows).min(self.height);
        let stride = self.width as usize * 4;
        let data: &mut [u8] = image;
        kernel.apply_rows(
            Rows {
                width: self.width,
                height: self.height,
                first_row,
                data: &mut data[first_row as usize * stride..last_row as usize * stride],
            },
            self.snapshot.as_ref(),
        );
    }
}

/// Effective chunk height: at least one row, rounded up to `alignment`.
#[must_use]
pub fn chunk_rows(rows_per_chunk: u32, alignment: u32) -> u32 {
    let alignment = alignment.max(1);
    rows_per_chunk.max(1).div_ceil(alignment).saturating_mul(alignment)
}

/// Round and clamp a computed channel value.
#[inline]
#[must_use]
pub fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Byte offset of texel `(x, y)` in an image `width` texels wide.
#[inline]
#[must_use]
pub fn texel_offset(width: u32, x: u32, y: u32) -> usize {
    (y as usize * width as usize + x as usize) * 4
}
