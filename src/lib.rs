pub mod config;
pub mod error;
pub mod events;
pub mod loader;
pub mod pipeline;
pub mod processing;
pub mod raster;
pub mod scheduler;
pub mod settings;
pub mod tasks {
    pub mod debounce;
    pub mod export;
    pub mod watch;
}

pub use error::Error;
pub use pipeline::{Pipeline, ProcessedImage, ProcessingResult, Stage};
pub use settings::{EffectSettings, Preset};
