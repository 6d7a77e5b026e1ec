//! Page rasterisation and image encoding.
//!
//! Pages are rendered at the configured DPI, with the longest edge capped at
//! `max_rendered_pixels` so an A0 poster cannot exhaust memory.

use crate::config::ConverterConfig;
use crate::error::StageError;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::io::Cursor;
use tracing::debug;

/// Raster image formats offered for per-page output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
    Tiff,
}

impl RasterFormat {
    /// Extension used for staged page files.
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpeg",
            RasterFormat::Tiff => "tiff",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            RasterFormat::Png => ImageFormat::Png,
            RasterFormat::Jpeg => ImageFormat::Jpeg,
            RasterFormat::Tiff => ImageFormat::Tiff,
        }
    }
}

/// Rendering parameters derived from [`ConverterConfig`].
#[derive(Debug, Clone)]
pub struct RasterSettings {
    pub scale: f32,
    pub max_pixels: u32,
    pub password: Option<String>,
}

impl RasterSettings {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            scale: config.render_scale(),
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        }
    }

    fn render_config(&self) -> PdfRenderConfig {
        PdfRenderConfig::new()
            .scale_page_by_factor(self.scale)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32)
    }
}

/// Rasterise one page.
pub fn rasterize(
    page: &PdfPage<'_>,
    page_num: usize,
    settings: &RasterSettings,
) -> Result<DynamicImage, StageError> {
    let bitmap = page
        .render_with_config(&settings.render_config())
        .map_err(|e| StageError::Render {
            page: page_num,
            detail: format!("{e:?}"),
        })?;

    let image = bitmap.as_image();
    debug!(
        page = page_num,
        width = image.width(),
        height = image.height(),
        "Rendered page"
    );
    Ok(image)
}

/// Encode an image in the requested format.
///
/// JPEG cannot carry an alpha channel, so the image is flattened to RGB first.
pub fn encode_image(image: &DynamicImage, format: RasterFormat) -> Result<Vec<u8>, StageError> {
    let mut buf = Vec::new();
    match format {
        RasterFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut Cursor::new(&mut buf), format.image_format())?,
        _ => image.write_to(&mut Cursor::new(&mut buf), format.image_format())?,
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([10, 20, 30, 128])))
    }

    #[test]
    fn encodes_each_format_with_its_signature() {
        let png = encode_image(&sample(), RasterFormat::Png).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");

        let jpeg = encode_image(&sample(), RasterFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let tiff = encode_image(&sample(), RasterFormat::Tiff).unwrap();
        assert!(&tiff[..4] == b"II*\0" || &tiff[..4] == b"MM\0*");
    }

    #[test]
    fn encoded_png_round_trips_dimensions() {
        let png = encode_image(&sample(), RasterFormat::Png).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn extensions() {
        assert_eq!(RasterFormat::Png.extension(), "png");
        assert_eq!(RasterFormat::Jpeg.extension(), "jpeg");
        assert_eq!(RasterFormat::Tiff.extension(), "tiff");
    }

    #[test]
    fn settings_follow_config() {
        let config = ConverterConfig::builder()
            .dpi(144)
            .max_rendered_pixels(1200)
            .build()
            .unwrap();
        let s = RasterSettings::from_config(&config);
        assert!((s.scale - 2.0).abs() < f32::EPSILON);
        assert_eq!(s.max_pixels, 1200);
        assert!(s.password.is_none());
    }
}
