//! Owned RGBA8 raster handed between the loader, the pipeline and the exporter.

use image::RgbaImage;

use crate::error::Error;

/// Width/height pair reported alongside processed rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size in bytes of an RGBA8 buffer with these dimensions.
    #[must_use]
    pub const fn rgba_bytes(&self) -> u64 {
        self.width as u64 * self.height as u64 * 4
    }
}

/// A row-major RGBA8 pixel buffer.
///
/// The backing storage always holds exactly `width * height * 4` bytes; every
/// constructor checks this and there is no way to resize the data in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    image: RgbaImage,
}

impl RasterBuffer {
    /// Wrap raw RGBA bytes.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRaster`] if either dimension is zero or the
    /// byte count does not match `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidRaster(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = Dimensions::new(width, height).rgba_bytes();
        if pixels.len() as u64 != expected {
            return Err(Error::InvalidRaster(format!(
                "expected {expected} bytes for {width}x{height}, got {}",
                pixels.len()
            )));
        }
        RgbaImage::from_raw(width, height, pixels)
            .map(|image| Self { image })
            .ok_or_else(|| Error::InvalidRaster("failed to construct RGBA image".into()))
    }

    /// Take ownership of an already decoded image.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRaster`] for empty images.
    pub fn from_image(image: RgbaImage) -> Result<Self, Error> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::InvalidRaster(format!(
                "dimensions must be positive, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Borrow the raw RGBA bytes.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Borrow the buffer as an `image` crate view, e.g. for encoding.
    #[must_use]
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.image.into_raw()
    }
}
