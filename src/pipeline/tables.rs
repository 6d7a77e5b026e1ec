//! Table extraction through tabula-java, and CSV serialisation.

use crate::error::StageError;
use crate::pipeline::tools::run_tool;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// A rectangular-ish grid of cell text. Rows may differ in length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// `true` when every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|cell| cell.trim().is_empty()))
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct TabulaTable {
    #[serde(default)]
    data: Vec<Vec<TabulaCell>>,
}

#[derive(Debug, Deserialize)]
struct TabulaCell {
    #[serde(default)]
    text: String,
}

/// Parse `tabula --format JSON` output, dropping tables with no content.
pub fn parse_tabula_json(json: &[u8]) -> Result<Vec<Table>, StageError> {
    let raw: Vec<TabulaTable> = serde_json::from_slice(json).map_err(|e| StageError::Tool {
        tool: "tabula",
        detail: format!("unreadable JSON output: {e}"),
    })?;

    Ok(raw
        .into_iter()
        .map(|t| {
            Table::new(
                t.data
                    .into_iter()
                    .map(|row| row.into_iter().map(|c| c.text).collect())
                    .collect(),
            )
        })
        .filter(|t| !t.is_blank())
        .collect())
}

/// Run tabula over every page of `source` and return the tables found.
pub async fn extract_tables(
    java: &Path,
    jar: &Path,
    source: &Path,
    password: Option<&str>,
) -> Result<Vec<Table>, StageError> {
    let mut args = vec![
        "-jar".into(),
        jar.as_os_str().to_owned(),
        "--pages".into(),
        "all".into(),
        "--format".into(),
        "JSON".into(),
        "--silent".into(),
    ];
    if let Some(pwd) = password {
        args.push("--password".into());
        args.push(pwd.into());
    }
    args.push(source.as_os_str().to_owned());

    let stdout = run_tool("tabula", java, &args, None).await?;
    let tables = parse_tabula_json(&stdout)?;
    info!(tables = tables.len(), "Tables extracted");
    Ok(tables)
}

/// Write one table as a CSV file at `path`. Ragged rows are kept as-is.
pub async fn write_csv(path: &Path, table: &Table) -> Result<(), StageError> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = csv_async::AsyncWriterBuilder::new()
        .flexible(true)
        .create_writer(file);
    for row in &table.rows {
        writer.write_record(row).await?;
    }
    writer.flush().await?;
    debug!(rows = table.rows.len(), "Wrote CSV table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TABLES: &str = r#"[
      {"extraction_method":"lattice","top":10.0,"left":5.0,"width":200.0,"height":50.0,
       "data":[[{"top":10.0,"left":5.0,"width":50.0,"height":10.0,"text":"Name"},
                {"top":10.0,"left":55.0,"width":50.0,"height":10.0,"text":"Qty"}],
               [{"text":"Widget, large"},{"text":"3"}]]},
      {"extraction_method":"stream","data":[[{"text":""}],[{"text":"  "}]]},
      {"extraction_method":"stream","data":[[{"text":"only"}]]}
    ]"#;

    #[test]
    fn parse_keeps_non_blank_tables() {
        let tables = parse_tabula_json(TWO_TABLES.as_bytes()).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].rows[0], vec!["Name", "Qty"]);
        assert_eq!(tables[0].rows[1], vec!["Widget, large", "3"]);
        assert_eq!(tables[1].rows, vec![vec!["only".to_string()]]);
    }

    #[test]
    fn parse_empty_array() {
        assert!(parse_tabula_json(b"[]").unwrap().is_empty());
    }

    #[test]
    fn parse_garbage_is_tool_error() {
        let err = parse_tabula_json(b"Error: could not open file").unwrap_err();
        assert!(matches!(err, StageError::Tool { tool: "tabula", .. }));
    }

    #[test]
    fn table_width_handles_ragged_rows() {
        let t = Table::new(vec![vec!["a".into()], vec!["b".into(), "c".into()]]);
        assert_eq!(t.width(), 2);
        assert!(!t.is_blank());
        assert_eq!(Table::default().width(), 0);
    }

    #[tokio::test]
    async fn csv_quotes_and_allows_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table_1.csv");
        let t = Table::new(vec![
            vec!["Name".into(), "Qty".into()],
            vec!["Widget, large".into(), "3".into()],
            vec!["Total".into()],
        ]);
        write_csv(&path, &t).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Name,Qty\n\"Widget, large\",3\nTotal\n"
        );
    }
}
