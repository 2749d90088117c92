use std::fmt;
use std::time::Instant;

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::PipelineOptions;
use crate::error::Error;
use crate::processing::blocks::{self, Pixelation};
use crate::processing::color::{ColorBleed, ColorShift, Noise};
use crate::processing::kernel::RowKernel;
use crate::processing::limits;
use crate::processing::overlay::{CrtBezel, Scanlines};
use crate::processing::pixel_sort::PixelSort;
use crate::processing::resample::{Anaglyph, ChromaticAberration, Displacement};
use crate::processing::resize;
use crate::raster::{Dimensions, RasterBuffer};
use crate::scheduler::ChunkScheduler;
use crate::settings::EffectSettings;

/// One transform in the fixed pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ColorBleed,
    ChromaticAberration,
    Datamosh,
    Displacement,
    PixelSort,
    ColorShift,
    Pixelation,
    Noise,
    Anaglyph,
    Scanlines,
    CrtBezel,
}

impl Stage {
    /// Application order. Overlays come last because they composite on top of
    /// the resampled result.
    pub const ORDER: [Self; 11] = [
        Self::ColorBleed,
        Self::ChromaticAberration,
        Self::Datamosh,
        Self::Displacement,
        Self::PixelSort,
        Self::ColorShift,
        Self::Pixelation,
        Self::Noise,
        Self::Anaglyph,
        Self::Scanlines,
        Self::CrtBezel,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ColorBleed => "color-bleed",
            Self::ChromaticAberration => "chromatic-aberration",
            Self::Datamosh => "datamosh",
            Self::Displacement => "displacement",
            Self::PixelSort => "pixel-sort",
            Self::ColorShift => "color-shift",
            Self::Pixelation => "pixelation",
            Self::Noise => "noise",
            Self::Anaglyph => "anaglyph",
            Self::Scanlines => "scanlines",
            Self::CrtBezel => "crt-bezel",
        }
    }

    #[must_use]
    pub const fn is_overlay(&self) -> bool {
        matches!(self, Self::Scanlines | Self::CrtBezel)
    }

    /// Whether the stage would touch the buffer under `settings`.
    #[must_use]
    pub const fn is_enabled(&self, settings: &EffectSettings) -> bool {
        let intensity = match self {
            Self::ColorBleed => settings.color_bleed,
            Self::ChromaticAberration => settings.chromatic,
            Self::Datamosh => settings.datamosh,
            Self::Displacement => settings.displacement,
            Self::PixelSort => settings.pixel_sort,
            Self::ColorShift => settings.color_shift,
            Self::Pixelation => settings.pixelation,
            Self::Noise => settings.noise,
            Self::Anaglyph => settings.anaglyph,
            Self::Scanlines => settings.scanlines,
            Self::CrtBezel => return settings.crt_bezel,
        };
        intensity > 0
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished run: the rendered buffer plus the size bookkeeping the host
/// needs to tell the user about downsampling.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub original: Dimensions,
    pub processed: Dimensions,
    pub was_resized: bool,
    pub buffer: RasterBuffer,
}

pub type ProcessingResult = Result<ProcessedImage, Error>;

/// Validates, downsamples and runs every enabled stage over one image.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: PipelineOptions,
    scheduler: ChunkScheduler,
}

impl Pipeline {
    pub fn new(options: PipelineOptions, cancel: CancellationToken) -> Self {
        let scheduler = ChunkScheduler::new(options.rows_per_chunk, cancel);
        Self { options, scheduler }
    }

    /// Render `source` with `settings`.
    ///
    /// The source is never modified; the stages work on a private copy at the
    /// working resolution which is only returned once every stage succeeded.
    #[instrument(skip_all, fields(width = source.width(), height = source.height()))]
    pub async fn run(&self, source: &RgbaImage, settings: &EffectSettings) -> ProcessingResult {
        let started = Instant::now();
        let original = Dimensions::new(source.width(), source.height());
        limits::validate(original.width, original.height)?;

        let plan = resize::plan(original.width, original.height, self.options.max_dimension);
        let mut image = resize::resize(source, plan)?;
        if plan.was_resized {
            debug!(
                from = ?(original.width, original.height),
                to = ?(plan.width, plan.height),
                "downsampled to working resolution"
            );
        }

        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        for stage in Stage::ORDER {
            if !stage.is_enabled(settings) {
                continue;
            }
            let stage_started = Instant::now();
            self.apply_stage(stage, &mut image, settings, &mut rng).await?;
            check_invariant(stage, &image, plan.width, plan.height)?;
            debug!(
                stage = %stage,
                elapsed_ms = stage_started.elapsed().as_millis() as u64,
                "stage applied"
            );
            self.scheduler.checkpoint().await?;
        }

        let buffer = RasterBuffer::from_image(image)?;
        info!(
            width = buffer.width(),
            height = buffer.height(),
            resized = plan.was_resized,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline run complete"
        );
        Ok(ProcessedImage {
            original,
            processed: buffer.dimensions(),
            was_resized: plan.was_resized,
            buffer,
        })
    }

    async fn apply_stage(
        &self,
        stage: Stage,
        image: &mut RgbaImage,
        settings: &EffectSettings,
        rng: &mut StdRng,
    ) -> Result<(), Error> {
        match stage {
            Stage::ColorBleed => self.scan(image, ColorBleed::new(settings.color_bleed)).await,
            Stage::ChromaticAberration => {
                self.scan(image, ChromaticAberration::new(settings.chromatic)).await
            }
            Stage::Datamosh => {
                let copied = blocks::datamosh(image, settings.datamosh, rng);
                debug!(copied, "datamosh blocks copied");
                Ok(())
            }
            Stage::Displacement => {
                self.scan(image, Displacement::new(settings.displacement)).await
            }
            Stage::PixelSort => self.scan(image, PixelSort::new(settings.pixel_sort, rng)).await,
            Stage::ColorShift => self.scan(image, ColorShift::new(settings.color_shift)).await,
            Stage::Pixelation => self.scan(image, Pixelation::new(settings.pixelation)).await,
            Stage::Noise => self.scan(image, Noise::new(settings.noise, rng)).await,
            Stage::Anaglyph => {
                self.scan(image, Anaglyph::new(settings.anaglyph, settings.anaglyph_offset)).await
            }
            Stage::Scanlines => self.scan(image, Scanlines::new(settings.scanlines)).await,
            Stage::CrtBezel => self.scan(image, CrtBezel::new(settings.crt_bezel)).await,
        }
    }

    async fn scan<K: RowKernel>(
        &self,
        image: &mut RgbaImage,
        kernel: Option<K>,
    ) -> Result<(), Error> {
        let Some(mut kernel) = kernel else {
            return Ok(());
        };
        self.scheduler.run_kernel(image, &mut kernel).await?;
        Ok(())
    }
}

fn check_invariant(stage: Stage, image: &RgbaImage, width: u32, height: u32) -> Result<(), Error> {
    let expected = Dimensions::new(width, height).rgba_bytes();
    if image.dimensions() != (width, height) || image.as_raw().len() as u64 != expected {
        return Err(Error::StageExecutionFailure {
            stage,
            reason: format!(
                "buffer is {}x{} with {} bytes, expected {width}x{height} with {expected}",
                image.width(),
                image.height(),
                image.as_raw().len()
            ),
        });
    }
    Ok(())
}
