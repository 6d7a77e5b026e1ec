//! Configuration for the conversion service.
//!
//! Every knob lives in [`ConverterConfig`], built via its
//! [`ConverterConfigBuilder`]. The external toolchain locations (pdfium,
//! pandoc, java, the tabula jar) are injected here rather than hard-coded,
//! and pdfium binding failures surface at startup.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default upload cap: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Configuration for the conversion service.
///
/// Built via [`ConverterConfig::builder()`] or using
/// [`ConverterConfig::default()`].
///
/// # Example
/// ```rust
/// use pdfconvert::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .output_dir("/srv/pdfconvert/converted")
///     .dpi(150)
///     .tabula_jar("/opt/tabula/tabula.jar")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Where accepted uploads are persisted. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Where converted files are written and served from. Default: `converted`.
    pub output_dir: PathBuf,

    /// Parent directory for per-job staging areas. Default: the system temp dir.
    pub staging_dir: PathBuf,

    /// Upload size cap in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Path to libpdfium, or to the directory containing it.
    /// `None` binds to the system library.
    pub pdfium_library: Option<PathBuf>,

    /// pandoc executable. Default: `pandoc` (resolved through `PATH`).
    pub pandoc_program: PathBuf,

    /// Java executable used to run tabula. Default: `java`.
    pub java_program: PathBuf,

    /// tabula-java jar (with dependencies). csv/xlsx stay disabled without it.
    pub tabula_jar: Option<PathBuf>,

    /// Rasterisation resolution for image, SVG and slide output. Range: 72–600. Default: 200.
    pub dpi: u32,

    /// Cap on the rendered width and height in pixels. Default: 4000.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional callback receiving per-conversion and per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("converted"),
            staging_dir: std::env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            pdfium_library: None,
            pandoc_program: PathBuf::from("pandoc"),
            java_program: PathBuf::from("java"),
            tabula_jar: None,
            dpi: 200,
            max_rendered_pixels: 4000,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("upload_dir", &self.upload_dir)
            .field("output_dir", &self.output_dir)
            .field("staging_dir", &self.staging_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("pdfium_library", &self.pdfium_library)
            .field("pandoc_program", &self.pandoc_program)
            .field("java_program", &self.java_program)
            .field("tabula_jar", &self.tabula_jar)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Scale factor from PDF points (1/72 in) to pixels at the configured DPI.
    pub fn render_scale(&self) -> f32 {
        self.dpi as f32 / 72.0
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn pandoc_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.pandoc_program = program.into();
        self
    }

    pub fn java_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.java_program = program.into();
        self
    }

    pub fn tabula_jar(mut self, jar: impl Into<PathBuf>) -> Self {
        self.config.tabula_jar = Some(jar.into());
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(ConvertError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "Upload limit must be greater than zero".into(),
            ));
        }
        if c.upload_dir.as_os_str().is_empty() || c.output_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Upload and output directories must be set".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_limits() {
        let c = ConverterConfig::default();
        assert_eq!(c.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(c.upload_dir, PathBuf::from("uploads"));
        assert_eq!(c.output_dir, PathBuf::from("converted"));
        assert!(c.tabula_jar.is_none());
    }

    #[test]
    fn dpi_is_clamped() {
        let c = ConverterConfig::builder().dpi(10).build().unwrap();
        assert_eq!(c.dpi, 72);
        let c = ConverterConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(c.dpi, 600);
    }

    #[test]
    fn zero_upload_limit_rejected() {
        let err = ConverterConfig::builder().max_upload_bytes(0).build();
        assert!(matches!(err, Err(ConvertError::InvalidConfig(_))));
    }

    #[test]
    fn empty_output_dir_rejected() {
        let err = ConverterConfig::builder().output_dir("").build();
        assert!(matches!(err, Err(ConvertError::InvalidConfig(_))));
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConverterConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn render_scale_from_dpi() {
        let c = ConverterConfig::builder().dpi(144).build().unwrap();
        assert!((c.render_scale() - 2.0).abs() < f32::EPSILON);
    }
}
