//! Cooperative chunked execution of row kernels.
//!
//! Stages never run in parallel; instead each row scan is sliced into groups
//! of rows and the task yields back to the runtime between groups so that
//! settings updates and shutdown requests are serviced while a large image is
//! being processed.

use image::RgbaImage;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::processing::kernel::{ChunkedPass, RowKernel};

pub const DEFAULT_ROWS_PER_CHUNK: u32 = 1024;

#[derive(Debug, Clone)]
pub struct ChunkScheduler {
    rows_per_chunk: u32,
    cancel: CancellationToken,
}

impl ChunkScheduler {
    pub fn new(rows_per_chunk: u32, cancel: CancellationToken) -> Self {
        Self {
            rows_per_chunk: rows_per_chunk.max(1),
            cancel,
        }
    }

    /// Run `kernel` over `image` chunk by chunk, yielding after each chunk.
    ///
    /// Returns the number of chunks processed.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] if shutdown was requested at a checkpoint.
    /// Rows already written stay written; callers must discard the buffer.
    pub async fn run_kernel<K>(&self, image: &mut RgbaImage, kernel: &mut K) -> Result<u32, Error>
    where
        K: RowKernel + ?Sized,
    {
        let pass = ChunkedPass::new(image, kernel, self.rows_per_chunk);
        for index in 0..pass.chunk_count() {
            pass.apply(image, kernel, index);
            self.checkpoint().await?;
        }
        Ok(pass.chunk_count())
    }

    /// Yield to the runtime, then report whether the run should stop.
    pub async fn checkpoint(&self) -> Result<(), Error> {
        tokio::task::yield_now().await;
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
