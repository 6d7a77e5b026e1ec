//! The conversion dispatcher.
//!
//! [`Converter`] owns the registry, the strategy table and the storage
//! layout. A conversion resolves the format key (no filesystem access on
//! failure), mints a fresh [`JobToken`], runs the strategy for that key and
//! reports the produced file. Any strategy error is logged with full detail
//! here and surfaces as [`ConvertError::ConversionFailed`] with a path-free
//! message; the destination and every claimed alternate path are removed.

use crate::capabilities::Capabilities;
use crate::config::ConverterConfig;
use crate::download::DownloadResolver;
use crate::error::{ConvertError, StageError};
use crate::naming::JobToken;
use crate::pipeline::engine::PdfEngine;
use crate::pipeline::input::SourceDocument;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::registry::FormatRegistry;
use crate::staging::StagingFactory;
use crate::strategy::{JobContext, StrategyTable};
use crate::upload::{UploadHandler, UploadedFile};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The result of one successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// Requested format key.
    pub format: String,
    /// Path of the produced file.
    #[serde(skip)]
    pub destination: PathBuf,
    /// File name to request from the download endpoint.
    pub file_name: String,
    /// Size of the produced file in bytes.
    pub bytes: u64,
    pub token: JobToken,
}

/// Upload → convert → download, wired to one configuration.
pub struct Converter {
    config: ConverterConfig,
    registry: FormatRegistry,
    strategies: StrategyTable,
    progress: ProgressCallback,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("strategies", &self.strategies)
            .finish()
    }
}

impl Converter {
    /// Bind pdfium, probe the optional toolchains and build the full
    /// strategy table.
    ///
    /// # Errors
    /// [`ConvertError::PdfiumBindingFailed`] when pdfium cannot be loaded,
    /// [`ConvertError::Storage`] when the storage directories cannot be created.
    pub async fn start(config: ConverterConfig) -> Result<Self, ConvertError> {
        let engine = Arc::new(PdfEngine::bind(config.pdfium_library.as_deref())?);
        let caps = Capabilities::probe(&config).await;
        info!(
            document_converter = caps.document_converter,
            table_extractor = caps.table_extractor,
            "Capabilities probed"
        );
        let strategies = StrategyTable::standard(engine, &config);
        Self::from_parts(config, caps, strategies)
    }

    /// Assemble a converter from explicit capabilities and strategies.
    pub fn from_parts(
        config: ConverterConfig,
        caps: Capabilities,
        strategies: StrategyTable,
    ) -> Result<Self, ConvertError> {
        for dir in [&config.upload_dir, &config.output_dir, &config.staging_dir] {
            std::fs::create_dir_all(dir).map_err(|source| ConvertError::Storage {
                path: dir.clone(),
                source,
            })?;
        }

        let registry = FormatRegistry::new(caps);
        for format in registry.iter().filter(|f| f.status.is_available()) {
            if !strategies.contains(format.key) {
                return Err(ConvertError::InvalidConfig(format!(
                    "no conversion strategy registered for '{}'",
                    format.key
                )));
            }
        }

        let progress = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));

        Ok(Self {
            config,
            registry,
            strategies,
            progress,
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn upload_handler(&self) -> UploadHandler {
        UploadHandler::new(&self.config.upload_dir, self.config.max_upload_bytes)
    }

    pub fn download_resolver(&self) -> DownloadResolver {
        DownloadResolver::new(&self.config.output_dir)
    }

    /// Validate and store an upload, then convert it to `format_key`.
    ///
    /// The format is checked before the upload is written, so an unknown or
    /// unavailable format leaves no file behind.
    pub async fn convert_upload(
        &self,
        upload: &UploadedFile,
        format_key: &str,
    ) -> Result<ConversionOutput, ConvertError> {
        self.registry.resolve(format_key)?;
        let source = self.upload_handler().accept(upload).await?;
        self.convert(&source, format_key).await
    }

    /// Convert `source` to the format registered under `format_key`.
    pub async fn convert(
        &self,
        source: &SourceDocument,
        format_key: &str,
    ) -> Result<ConversionOutput, ConvertError> {
        let start = Instant::now();

        // ── Step 1: Resolve format (no side effects) ─────────────────────
        let format = self.registry.resolve(format_key)?;
        let strategy = self.strategies.get(format.key).ok_or_else(|| {
            ConvertError::Internal(format!("no strategy for '{}'", format.key))
        })?;

        // ── Step 2: Name the job ─────────────────────────────────────────
        let token = JobToken::new();
        let file_name = format!(
            "converted_{token}_{}.{}",
            source.base_name(),
            format.extension
        );
        let destination = self.config.output_dir.join(&file_name);
        let job = JobContext::new(
            format.key,
            source.clone(),
            destination,
            token.clone(),
            StagingFactory::new(&self.config.staging_dir, token.clone()),
            self.progress.clone(),
        );
        let mut guard = OutputGuard::new(&job);

        info!(format = format.key, token = %token, "Starting conversion");
        debug!(source = %source.path().display(), destination = %job.destination().display());
        self.progress.on_conversion_start(format.key);

        // ── Step 3: Run the strategy ─────────────────────────────────────
        let result: Result<(PathBuf, u64), StageError> = async {
            let path = strategy.convert(&job).await?;
            let bytes = tokio::fs::metadata(&path).await?.len();
            Ok((path, bytes))
        }
        .await;

        match result {
            Ok((path, bytes)) => {
                guard.keep(&path);
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or(file_name);
                info!(
                    format = format.key,
                    token = %token,
                    bytes,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Conversion complete: {}",
                    file_name
                );
                self.progress.on_conversion_complete(format.key, bytes);
                Ok(ConversionOutput {
                    format: format.key.to_string(),
                    destination: path,
                    file_name,
                    bytes,
                    token,
                })
            }
            Err(e) => {
                error!(
                    format = format.key,
                    token = %token,
                    source = %source.path().display(),
                    destination = %job.destination().display(),
                    error = ?e,
                    "Conversion failed"
                );
                let message = e.to_string();
                self.progress.on_conversion_error(format.key, &message);
                drop(guard);
                Err(ConvertError::ConversionFailed {
                    format: format.key.to_string(),
                    message,
                })
            }
        }
    }
}

/// Removes every path a job owns unless told to keep one.
///
/// Runs on error returns and on cancellation (the conversion future being
/// dropped mid-way) alike.
struct OutputGuard<'a> {
    job: &'a JobContext,
    keep: Option<PathBuf>,
}

impl<'a> OutputGuard<'a> {
    fn new(job: &'a JobContext) -> Self {
        Self { job, keep: None }
    }

    fn keep(&mut self, path: &std::path::Path) {
        self.keep = Some(path.to_path_buf());
    }
}

impl Drop for OutputGuard<'_> {
    fn drop(&mut self) {
        for path in self.job.owned_paths() {
            if self.keep.as_ref() == Some(&path) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed partial output {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
            }
        }
    }
}
