use fast_image_resize as fir;
use image::RgbaImage;

use crate::error::Error;

/// Target size for the working copy of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizePlan {
    pub width: u32,
    pub height: u32,
    pub was_resized: bool,
}

/// Fit `src_w x src_h` inside a `max_dim` square, keeping the aspect ratio.
///
/// Images already inside the bound are left alone. Otherwise the long edge
/// becomes `max_dim` and the short edge is floored.
pub fn plan(src_w: u32, src_h: u32, max_dim: u32) -> ResizePlan {
    let max_dim = max_dim.max(1);
    if src_w <= max_dim && src_h <= max_dim {
        return ResizePlan {
            width: src_w,
            height: src_h,
            was_resized: false,
        };
    }
    let aspect = f64::from(src_w.max(1)) / f64::from(src_h.max(1));
    let (w, h) = if src_w >= src_h {
        (f64::from(max_dim), f64::from(max_dim) / aspect)
    } else {
        (f64::from(max_dim) * aspect, f64::from(max_dim))
    };
    ResizePlan {
        width: (w.floor() as u32).clamp(1, max_dim),
        height: (h.floor() as u32).clamp(1, max_dim),
        was_resized: true,
    }
}

/// Produce the working copy described by `plan`.
///
/// # Errors
/// Returns [`Error::RenderContextUnavailable`] if the resampler cannot be set up.
pub fn resize(source: &RgbaImage, plan: ResizePlan) -> Result<RgbaImage, Error> {
    if plan.width == 0 || plan.height == 0 {
        return Err(Error::RenderContextUnavailable(
            "resize dimensions must be positive".into(),
        ));
    }
    if source.width() == plan.width && source.height() == plan.height {
        return Ok(source.clone());
    }

    let src_view = fir::images::ImageRef::new(
        source.width(),
        source.height(),
        source.as_raw(),
        fir::PixelType::U8x4,
    )
    .map_err(|err| Error::RenderContextUnavailable(format!("source view: {err}")))?;
    let mut dst_image = fir::images::Image::new(plan.width, plan.height, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .map_err(|err| Error::RenderContextUnavailable(format!("resize failed: {err}")))?;
    RgbaImage::from_raw(plan.width, plan.height, dst_image.into_vec()).ok_or_else(|| {
        Error::RenderContextUnavailable("failed to construct resized RGBA image".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_small_images_alone() {
        let p = plan(640, 480, 4096);
        assert_eq!(
            p,
            ResizePlan {
                width: 640,
                height: 480,
                was_resized: false
            }
        );
    }

    #[test]
    fn landscape_long_edge_hits_cap() {
        let p = plan(10_000, 5_000, 4096);
        assert_eq!((p.width, p.height, p.was_resized), (4096, 2048, true));
    }

    #[test]
    fn portrait_short_edge_is_floored() {
        // 3000 / 7000 * 4096 = 1755.43
        let p = plan(3000, 7000, 4096);
        assert_eq!((p.width, p.height, p.was_resized), (1755, 4096, true));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        let p = plan(8000, 1, 100);
        assert_eq!((p.width, p.height), (100, 1));
    }

    #[test]
    fn resize_downsamples_uniform_color() {
        let source = RgbaImage::from_pixel(40, 20, image::Rgba([90, 120, 200, 255]));
        let target = plan(40, 20, 10);
        let out = resize(&source, target).unwrap();
        assert_eq!(out.dimensions(), (10, 5));
        for px in out.pixels() {
            for (got, want) in px.0.iter().zip([90u8, 120, 200, 255]) {
                assert!(got.abs_diff(want) <= 1, "{:?}", px.0);
            }
        }
    }
}
