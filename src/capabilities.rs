//! Optional-dependency detection.
//!
//! Two external toolchains gate parts of the format registry: a universal
//! document converter (pandoc) and a table extractor (tabula on a Java
//! runtime). They are probed once at startup and the resulting
//! [`Capabilities`] value is passed explicitly to the registry and the
//! strategy table. A missing toolchain disables formats; it is never an
//! error at request time.

use crate::config::ConverterConfig;
use serde::Serialize;
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Which optional toolchains were found at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// pandoc answered `--version`.
    pub document_converter: bool,
    /// A tabula jar is configured and present, and `java -version` works.
    pub table_extractor: bool,
}

impl Capabilities {
    /// Neither optional toolchain is available.
    pub fn none() -> Self {
        Self::default()
    }

    /// Both optional toolchains are available.
    pub fn all() -> Self {
        Self {
            document_converter: true,
            table_extractor: true,
        }
    }

    /// Probe the configured programs.
    pub async fn probe(config: &ConverterConfig) -> Self {
        let document_converter = program_responds(&config.pandoc_program, ["--version"]).await;
        if !document_converter {
            warn!(
                program = %config.pandoc_program.display(),
                "pandoc not available; doc/rtf/epub/mobi/odt/markdown/pages disabled"
            );
        }

        let table_extractor = match config.tabula_jar {
            Some(ref jar) if jar.is_file() => {
                program_responds(&config.java_program, ["-version"]).await
            }
            Some(ref jar) => {
                warn!(jar = %jar.display(), "tabula jar not found; csv/xlsx disabled");
                false
            }
            None => {
                debug!("No tabula jar configured; csv/xlsx disabled");
                false
            }
        };

        let caps = Self {
            document_converter,
            table_extractor,
        };
        info!(
            document_converter = caps.document_converter,
            table_extractor = caps.table_extractor,
            "Optional toolchains probed"
        );
        caps
    }
}

/// Run `program args…` with all stdio discarded and report whether it
/// exited successfully.
async fn program_responds<I, S>(program: impl AsRef<OsStr>, args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) => status.success(),
        Err(e) => {
            debug!(program = ?program, error = %e, "Probe failed to start");
            false
        }
    }
}
