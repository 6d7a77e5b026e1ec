//! Text-bearing single-file outputs: txt, html, xml, docx.

use super::{write_output, ConversionStrategy, JobContext};
use crate::error::StageError;
use crate::pipeline::engine::PdfEngine;
use crate::pipeline::extract::{self, join_pages, PageLayout};
use crate::pipeline::{markup, ooxml};
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Extract every page's text on a blocking worker.
async fn extract_texts(
    engine: Arc<PdfEngine>,
    source: PathBuf,
    password: Option<String>,
    progress: ProgressCallback,
) -> Result<Vec<String>, StageError> {
    tokio::task::spawn_blocking(move || {
        let mut pages = Vec::new();
        engine.for_each_page(&source, password.as_deref(), |page, n, total| {
            pages.push(extract::page_text(&page, n)?);
            progress.on_page_complete(n, total);
            Ok(())
        })?;
        Ok(pages)
    })
    .await?
}

/// Extract every page's positioned text on a blocking worker.
async fn extract_layouts(
    engine: Arc<PdfEngine>,
    source: PathBuf,
    password: Option<String>,
    progress: ProgressCallback,
) -> Result<Vec<PageLayout>, StageError> {
    tokio::task::spawn_blocking(move || {
        let mut pages = Vec::new();
        engine.for_each_page(&source, password.as_deref(), |page, n, total| {
            pages.push(extract::page_layout(&page, n)?);
            progress.on_page_complete(n, total);
            Ok(())
        })?;
        Ok(pages)
    })
    .await?
}

/// Page text reader shared by the text-bearing strategies.
#[derive(Clone)]
pub struct PdfText {
    engine: Arc<PdfEngine>,
    password: Option<String>,
}

impl PdfText {
    pub fn new(engine: Arc<PdfEngine>, password: Option<String>) -> Self {
        Self { engine, password }
    }

    pub async fn pages(&self, job: &JobContext) -> Result<Vec<String>, StageError> {
        extract_texts(
            self.engine.clone(),
            job.source().to_path_buf(),
            self.password.clone(),
            job.progress().clone(),
        )
        .await
    }

    pub async fn layouts(&self, job: &JobContext) -> Result<Vec<PageLayout>, StageError> {
        extract_layouts(
            self.engine.clone(),
            job.source().to_path_buf(),
            self.password.clone(),
            job.progress().clone(),
        )
        .await
    }
}

/// Plain UTF-8 text, pages separated by a blank line.
pub struct TextStrategy(pub PdfText);

/// One HTML document with a positioned `div` per page.
pub struct HtmlStrategy(pub PdfText);

/// Structured XML of pages and text segments.
pub struct XmlStrategy(pub PdfText);

/// A Word document, one paragraph per line.
pub struct DocxStrategy(pub PdfText);

#[async_trait]
impl ConversionStrategy for TextStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let pages = self.0.pages(job).await?;
        let text = join_pages(&pages);
        debug!(pages = pages.len(), chars = text.len(), "Writing text");
        write_output(job.destination(), text.as_bytes()).await
    }
}

#[async_trait]
impl ConversionStrategy for HtmlStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let layouts = self.0.layouts(job).await?;
        let html = markup::html_document(job.title(), &layouts);
        write_output(job.destination(), html.as_bytes()).await
    }
}

#[async_trait]
impl ConversionStrategy for XmlStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let layouts = self.0.layouts(job).await?;
        let xml = markup::xml_document(job.title(), &layouts)?;
        write_output(job.destination(), xml.as_bytes()).await
    }
}

#[async_trait]
impl ConversionStrategy for DocxStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let pages = self.0.pages(job).await?;
        let bytes = tokio::task::spawn_blocking(move || ooxml::docx_package(&pages)).await??;
        write_output(job.destination(), &bytes).await
    }
}
