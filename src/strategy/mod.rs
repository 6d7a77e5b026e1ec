//! Conversion strategies: one object per format family, looked up by key.
//!
//! Every strategy implements the same contract. It receives a
//! [`JobContext`] (source, destination, staging factory, progress sink),
//! writes its output and returns the path it produced. Strategies do not
//! clean up partial destinations themselves; the dispatcher in
//! [`crate::convert`] removes the destination and every claimed alternate
//! path when a strategy fails. Staging areas clean up after themselves.

pub mod document;
pub mod external;
pub mod images;

use crate::config::ConverterConfig;
use crate::error::StageError;
use crate::naming::JobToken;
use crate::pipeline::engine::PdfEngine;
use crate::pipeline::input::SourceDocument;
use crate::pipeline::pandoc::{pandoc_writer, PANDOC_KEYS};
use crate::pipeline::render::{RasterFormat, RasterSettings};
use crate::progress::ProgressCallback;
use crate::staging::StagingFactory;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A conversion routine for one format family.
#[async_trait]
pub trait ConversionStrategy: Send + Sync {
    /// Produce the output for `job` and return the path actually written.
    ///
    /// Usually `job.destination()`; a strategy that needs a different
    /// extension (multi-table CSV → zip) must obtain the path from
    /// [`JobContext::alternate_destination`] so it is cleaned up on failure.
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError>;
}

/// Everything a strategy needs to know about one conversion.
pub struct JobContext {
    format: String,
    source: SourceDocument,
    destination: PathBuf,
    token: JobToken,
    staging: StagingFactory,
    progress: ProgressCallback,
    claimed: Mutex<Vec<PathBuf>>,
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("format", &self.format)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl JobContext {
    pub fn new(
        format: impl Into<String>,
        source: SourceDocument,
        destination: PathBuf,
        token: JobToken,
        staging: StagingFactory,
        progress: ProgressCallback,
    ) -> Self {
        Self {
            format: format.into(),
            source,
            destination,
            token,
            staging,
            progress,
            claimed: Mutex::new(Vec::new()),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn source(&self) -> &Path {
        self.source.path()
    }

    /// Document title: the sanitised source base name.
    pub fn title(&self) -> &str {
        self.source.base_name()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn token(&self) -> &JobToken {
        &self.token
    }

    pub fn staging(&self) -> &StagingFactory {
        &self.staging
    }

    pub fn progress(&self) -> &ProgressCallback {
        &self.progress
    }

    /// The destination with its extension replaced, claimed by this job.
    pub fn alternate_destination(&self, extension: &str) -> PathBuf {
        let path = self.destination.with_extension(extension);
        self.claim(path.clone());
        path
    }

    /// Register a path this job may write besides its destination.
    pub fn claim(&self, path: PathBuf) {
        self.claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(path);
    }

    /// The destination followed by every claimed alternate path.
    pub fn owned_paths(&self) -> Vec<PathBuf> {
        let claimed = self
            .claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::iter::once(self.destination.clone())
            .chain(claimed.iter().cloned())
            .collect()
    }
}

/// Mapping from format key to strategy.
#[derive(Clone, Default)]
pub struct StrategyTable {
    strategies: HashMap<String, Arc<dyn ConversionStrategy>>,
}

impl std::fmt::Debug for StrategyTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.strategies.keys().collect();
        keys.sort();
        f.debug_struct("StrategyTable").field("keys", &keys).finish()
    }
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full table for every registry key, backed by `engine` and the
    /// tool locations in `config`.
    pub fn standard(engine: Arc<PdfEngine>, config: &ConverterConfig) -> Self {
        let password = config.password.clone();
        let raster = RasterSettings::from_config(config);
        let mut table = Self::new();

        let text = document::PdfText::new(engine.clone(), password.clone());
        table.register("txt", Arc::new(document::TextStrategy(text.clone())));
        table.register("html", Arc::new(document::HtmlStrategy(text.clone())));
        table.register("xml", Arc::new(document::XmlStrategy(text.clone())));
        table.register("docx", Arc::new(document::DocxStrategy(text.clone())));

        for format in [RasterFormat::Png, RasterFormat::Jpeg, RasterFormat::Tiff] {
            table.register(
                format.extension(),
                Arc::new(images::RasterStrategy::new(engine.clone(), raster.clone(), format)),
            );
        }
        table.register("svg", Arc::new(images::SvgStrategy::new(engine.clone(), raster.clone())));
        table.register("pptx", Arc::new(images::SlidesStrategy::new(engine.clone(), raster)));

        for key in PANDOC_KEYS {
            if let Some(writer) = pandoc_writer(key) {
                table.register(
                    key,
                    Arc::new(external::PandocStrategy::new(
                        text.clone(),
                        config.pandoc_program.clone(),
                        writer,
                    )),
                );
            }
        }

        let tabula = external::TabulaRunner::new(
            config.java_program.clone(),
            config.tabula_jar.clone(),
            password,
        );
        table.register("csv", Arc::new(external::CsvStrategy::new(tabula.clone())));
        table.register("xlsx", Arc::new(external::XlsxStrategy::new(tabula)));

        table
    }

    /// Add or replace the strategy for `key`.
    pub fn register(&mut self, key: &str, strategy: Arc<dyn ConversionStrategy>) {
        self.strategies.insert(key.to_string(), strategy);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn ConversionStrategy>> {
        self.strategies.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.strategies.contains_key(key)
    }
}

/// Write a finished in-memory output to `path`.
pub(crate) async fn write_output(path: &Path, bytes: &[u8]) -> Result<PathBuf, StageError> {
    tokio::fs::write(path, bytes).await?;
    Ok(path.to_path_buf())
}
