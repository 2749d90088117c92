use std::path::Path;

use image::{ImageReader, RgbaImage};
use tracing::debug;

use crate::error::Error;
use crate::processing::limits::{self, MAX_FILE_BYTES};

/// File extensions accepted as sources (lowercase).
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// Whether `path` names one of the accepted raster formats.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Decode `path` into an RGBA8 raster.
///
/// The header is probed first so oversized images are refused before any
/// pixel memory is allocated.
pub fn load_source(path: &Path) -> Result<RgbaImage, Error> {
    let shown = path.display().to_string();
    if !is_supported(path) {
        return Err(Error::UnsupportedFormat(shown));
    }

    let size = std::fs::metadata(path)?.len();
    if size > MAX_FILE_BYTES {
        return Err(Error::FileTooLarge {
            path: shown,
            size,
            limit: MAX_FILE_BYTES,
        });
    }

    let decode_failure = |source| Error::DecodeFailure {
        path: shown.clone(),
        source,
    };

    let (width, height) = ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()
        .map_err(decode_failure)?;
    limits::validate(width, height)?;
    debug!(path = %shown, width, height, bytes = size, "probed source header");

    let decoded = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(decode_failure)?;
    Ok(decoded.to_rgba8())
}
