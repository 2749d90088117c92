use thiserror::Error;

use crate::pipeline::Stage;

/// Library error type for glitch rendering operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested dimensions exceed the hard per-axis cap.
    #[error("dimensions too large: {width}x{height} exceeds the {max}x{max} limit")]
    DimensionTooLarge { width: u32, height: u32, max: u32 },

    /// The RGBA working buffer would not fit in the memory budget.
    #[error(
        "insufficient memory budget: {width}x{height} needs ~{estimate_mb:.1} MB of RGBA data, limit is {limit_mb:.1} MB"
    )]
    MemoryBudgetExceeded {
        width: u32,
        height: u32,
        estimate_mb: f64,
        limit_mb: f64,
    },

    /// The source file could not be decoded into a raster.
    #[error("failed to decode {path}: {source}")]
    DecodeFailure {
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// The source file extension is not one of the accepted image formats.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The source file is larger than the accepted upload size.
    #[error("file {path} is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    /// A scratch surface or resampler could not be set up.
    #[error("render context unavailable: {0}")]
    RenderContextUnavailable(String),

    /// A stage left the buffer in an inconsistent state.
    #[error("stage {stage} failed: {reason}")]
    StageExecutionFailure { stage: Stage, reason: String },

    /// Raw pixel data does not describe a valid RGBA raster.
    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    /// The run observed a shutdown request at a checkpoint.
    #[error("pipeline run cancelled")]
    Cancelled,

    /// The task executing a run terminated abnormally.
    #[error("render worker failed: {0}")]
    Worker(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
