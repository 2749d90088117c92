use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::events::Rendered;
use crate::raster::RasterBuffer;

/// Counts of what happened to the renders that reached the exporter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    pub failed: usize,
}

/// Writes every current render to `output`, replacing the previous file.
///
/// Failed runs are logged and leave the last good file in place.
#[instrument(skip(rendered_rx, cancel), fields(output = %output.display()))]
pub async fn run(
    mut rendered_rx: Receiver<Rendered>,
    output: PathBuf,
    cancel: CancellationToken,
) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();
    loop {
        select! {
            _ = cancel.cancelled() => break,
            maybe_rendered = rendered_rx.recv() => {
                let Some(rendered) = maybe_rendered else {
                    break;
                };
                match rendered.result {
                    Ok(processed) => {
                        let path = output.clone();
                        let buffer = processed.buffer;
                        tokio::task::spawn_blocking(move || write_image(&buffer, &path))
                            .await
                            .context("export worker panicked")??;
                        summary.written += 1;
                        info!(
                            generation = rendered.generation,
                            original = ?(processed.original.width, processed.original.height),
                            processed = ?(processed.processed.width, processed.processed.height),
                            resized = processed.was_resized,
                            "wrote render"
                        );
                    }
                    Err(err) => {
                        summary.failed += 1;
                        warn!(
                            generation = rendered.generation,
                            "not exporting failed render: {err}"
                        );
                    }
                }
            }
        }
    }
    Ok(summary)
}

/// Encode `buffer` to `path`; the format follows the file extension.
///
/// Formats without an alpha channel receive the RGB channels only.
pub fn write_image(buffer: &RasterBuffer, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("unsupported output format for {}", path.display()))?;
    let image = DynamicImage::ImageRgba8(buffer.as_image().clone());
    let image = if matches!(format, ImageFormat::Jpeg | ImageFormat::Bmp) {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        image
    };
    image
        .save_with_format(path, format)
        .with_context(|| format!("failed to write {}", path.display()))
}
