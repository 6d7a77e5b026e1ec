//! Rendered outputs: per-page images, per-page SVG, and slide decks.
//!
//! Image and SVG conversions always produce a zip, even for a one-page PDF,
//! so the download shape does not depend on the page count.

use super::{write_output, ConversionStrategy, JobContext};
use crate::error::StageError;
use crate::packager;
use crate::pipeline::engine::PdfEngine;
use crate::pipeline::extract::page_layout;
use crate::pipeline::markup::svg_page;
use crate::pipeline::ooxml::pptx_package;
use crate::pipeline::render::{encode_image, rasterize, RasterFormat, RasterSettings};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// One PNG/JPEG/TIFF per page, zipped.
pub struct RasterStrategy {
    engine: Arc<PdfEngine>,
    settings: RasterSettings,
    format: RasterFormat,
}

impl RasterStrategy {
    pub fn new(engine: Arc<PdfEngine>, settings: RasterSettings, format: RasterFormat) -> Self {
        Self {
            engine,
            settings,
            format,
        }
    }
}

#[async_trait]
impl ConversionStrategy for RasterStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let area = job.staging().create()?;
        let engine = self.engine.clone();
        let settings = self.settings.clone();
        let format = self.format;
        let source = job.source().to_path_buf();
        let progress = job.progress().clone();

        let area = tokio::task::spawn_blocking(move || {
            let pages = engine.for_each_page(&source, settings.password.as_deref(), |page, n, total| {
                let image = rasterize(&page, n, &settings)?;
                let bytes = encode_image(&image, format)?;
                area.stage_blocking(&format!("page_{n}.{}", format.extension()), &bytes)?;
                progress.on_page_complete(n, total);
                Ok(())
            })?;
            info!(pages, format = format.extension(), "Rasterised pages");
            Ok::<_, StageError>(area)
        })
        .await??;

        packager::package(area, job.destination()).await
    }
}

/// One SVG per page (embedded raster plus a text layer), zipped.
pub struct SvgStrategy {
    engine: Arc<PdfEngine>,
    settings: RasterSettings,
}

impl SvgStrategy {
    pub fn new(engine: Arc<PdfEngine>, settings: RasterSettings) -> Self {
        Self { engine, settings }
    }
}

#[async_trait]
impl ConversionStrategy for SvgStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let area = job.staging().create()?;
        let engine = self.engine.clone();
        let settings = self.settings.clone();
        let source = job.source().to_path_buf();
        let progress = job.progress().clone();

        let area = tokio::task::spawn_blocking(move || {
            engine.for_each_page(&source, settings.password.as_deref(), |page, n, total| {
                let layout = page_layout(&page, n)?;
                let png = encode_image(&rasterize(&page, n, &settings)?, RasterFormat::Png)?;
                area.stage_blocking(&format!("page_{n}.svg"), svg_page(&layout, &png).as_bytes())?;
                progress.on_page_complete(n, total);
                Ok(())
            })?;
            Ok::<_, StageError>(area)
        })
        .await??;

        packager::package(area, job.destination()).await
    }
}

/// A 4:3 presentation with one full-bleed page image per slide.
pub struct SlidesStrategy {
    engine: Arc<PdfEngine>,
    settings: RasterSettings,
}

impl SlidesStrategy {
    pub fn new(engine: Arc<PdfEngine>, settings: RasterSettings) -> Self {
        Self { engine, settings }
    }
}

#[async_trait]
impl ConversionStrategy for SlidesStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let engine = self.engine.clone();
        let settings = self.settings.clone();
        let source = job.source().to_path_buf();
        let progress = job.progress().clone();

        let deck = tokio::task::spawn_blocking(move || {
            let mut slides = Vec::new();
            engine.for_each_page(&source, settings.password.as_deref(), |page, n, total| {
                slides.push(encode_image(&rasterize(&page, n, &settings)?, RasterFormat::Png)?);
                progress.on_page_complete(n, total);
                Ok(())
            })?;
            pptx_package(&slides)
        })
        .await??;

        write_output(job.destination(), &deck).await
    }
}
