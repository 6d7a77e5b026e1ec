//! Outputs that depend on optional external toolchains: pandoc for the
//! document-converter family, tabula-java for csv and xlsx.

use super::document::PdfText;
use super::{write_output, ConversionStrategy, JobContext};
use crate::error::StageError;
use crate::packager;
use crate::pipeline::extract::join_pages;
use crate::pipeline::ooxml::xlsx_package;
use crate::pipeline::pandoc;
use crate::pipeline::tables::{self, Table};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

// ── pandoc ───────────────────────────────────────────────────────────────

/// Extracted text converted by pandoc to one writer (rtf, epub3, gfm, …).
pub struct PandocStrategy {
    text: PdfText,
    program: PathBuf,
    writer: &'static str,
}

impl PandocStrategy {
    pub fn new(text: PdfText, program: PathBuf, writer: &'static str) -> Self {
        Self {
            text,
            program,
            writer,
        }
    }
}

#[async_trait]
impl ConversionStrategy for PandocStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let pages = self.text.pages(job).await?;
        let text = join_pages(&pages);
        pandoc::convert_text(&self.program, job.title(), &text, self.writer, job.destination())
            .await?;
        Ok(job.destination().to_path_buf())
    }
}

// ── tabula ───────────────────────────────────────────────────────────────

/// Runs tabula-java; shared by the csv and xlsx strategies.
#[derive(Debug, Clone)]
pub struct TabulaRunner {
    java: PathBuf,
    jar: Option<PathBuf>,
    password: Option<String>,
}

impl TabulaRunner {
    pub fn new(java: PathBuf, jar: Option<PathBuf>, password: Option<String>) -> Self {
        Self {
            java,
            jar,
            password,
        }
    }

    /// All non-blank tables in the job's source; zero tables is an error.
    async fn tables(&self, job: &JobContext) -> Result<Vec<Table>, StageError> {
        let jar = self.jar.as_deref().ok_or_else(|| StageError::Tool {
            tool: "tabula",
            detail: "no tabula jar configured".into(),
        })?;
        let tables =
            tables::extract_tables(&self.java, jar, job.source(), self.password.as_deref()).await?;
        if tables.is_empty() {
            return Err(StageError::NoTables);
        }
        Ok(tables)
    }
}

/// One table → a CSV file; several → `table_{n}.csv` entries in a zip.
pub struct CsvStrategy {
    tabula: TabulaRunner,
}

impl CsvStrategy {
    pub fn new(tabula: TabulaRunner) -> Self {
        Self { tabula }
    }
}

#[async_trait]
impl ConversionStrategy for CsvStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let found = self.tabula.tables(job).await?;
        write_tables_csv(job, &found).await
    }
}

/// Write `found` as CSV for `job`: a single file, or an archive when there
/// is more than one table.
pub(crate) async fn write_tables_csv(
    job: &JobContext,
    found: &[Table],
) -> Result<PathBuf, StageError> {
    match found {
        [] => Err(StageError::NoTables),
        [single] => {
            tables::write_csv(job.destination(), single).await?;
            Ok(job.destination().to_path_buf())
        }
        many => {
            let area = job.staging().create()?;
            for (idx, table) in many.iter().enumerate() {
                let path = area.entry_path(&format!("table_{}.csv", idx + 1))?;
                tables::write_csv(&path, table).await?;
            }
            info!(tables = many.len(), "Packaging CSV tables");
            let archive = job.alternate_destination("zip");
            packager::package(area, &archive).await
        }
    }
}

/// Every table as its own sheet in one workbook.
pub struct XlsxStrategy {
    tabula: TabulaRunner,
}

impl XlsxStrategy {
    pub fn new(tabula: TabulaRunner) -> Self {
        Self { tabula }
    }
}

#[async_trait]
impl ConversionStrategy for XlsxStrategy {
    async fn convert(&self, job: &JobContext) -> Result<PathBuf, StageError> {
        let found = self.tabula.tables(job).await?;
        debug!(sheets = found.len(), "Building workbook");
        let bytes = tokio::task::spawn_blocking(move || xlsx_package(&found)).await??;
        write_output(job.destination(), &bytes).await
    }
}
