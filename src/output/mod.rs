//! Report rendering and writing.
//!
//! | Format | File | Content |
//! |--------|------|---------|
//! | table | `licenses.txt` | packages grouped by manager, summary |
//! | csv | `licenses.csv` | `package_name,version,license,package_manager` |
//! | json | `licenses.json` | the full [`ScanReport`] |

mod csv;
mod json;
mod table;

pub use self::csv::{render_csv, CSV_HEADER};
pub use json::render_json;
pub use table::render_table;

use crate::model::ScanReport;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Output format for scan reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    Table,
    /// CSV, one row per package
    Csv,
    /// JSON document for programmatic use
    Json,
    /// Every format above
    All,
}

impl OutputFormat {
    pub const SINGLE: [OutputFormat; 3] = [OutputFormat::Table, OutputFormat::Csv, OutputFormat::Json];

    /// Formats covered by this selection.
    pub fn expand(self) -> Vec<OutputFormat> {
        match self {
            OutputFormat::All => Self::SINGLE.to_vec(),
            single => vec![single],
        }
    }

    pub fn file_name(self) -> Option<&'static str> {
        match self {
            OutputFormat::Table => Some("licenses.txt"),
            OutputFormat::Csv => Some("licenses.csv"),
            OutputFormat::Json => Some("licenses.json"),
            OutputFormat::All => None,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" | "txt" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "all" => Ok(OutputFormat::All),
            _ => Err(format!(
                "Unknown format: {}. Use 'table', 'csv', 'json', or 'all'",
                s
            )),
        }
    }
}

/// Renders a single format. `All` renders the table.
pub fn format_report(report: &ScanReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table | OutputFormat::All => Ok(render_table(report)),
        OutputFormat::Csv => Ok(render_csv(report)),
        OutputFormat::Json => render_json(report),
    }
}

pub fn print_report(report: &ScanReport, format: OutputFormat) -> Result<()> {
    print!("{}", format_report(report, format)?);
    Ok(())
}

/// Writes one report file per selected format into `dir`.
pub fn write_reports(report: &ScanReport, dir: &Path, format: OutputFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::new();
    for single in format.expand() {
        let Some(name) = single.file_name() else {
            continue;
        };
        let path = dir.join(name);
        let content = format_report(report, single)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::TempDir;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("CSV").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str("all").unwrap(), OutputFormat::All);
        assert_eq!(OutputFormat::from_str("txt").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::from_str("sarif").is_err());
    }

    #[test]
    fn test_write_all_formats() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("report");
        let report = ScanReport::new("debian:12");

        let written = write_reports(&report, &out, OutputFormat::All).unwrap();

        assert_eq!(written.len(), 3);
        assert!(out.join("licenses.txt").exists());
        assert!(out.join("licenses.json").exists());
        let csv = fs::read_to_string(out.join("licenses.csv")).unwrap();
        assert!(csv.starts_with(CSV_HEADER));
    }

    #[test]
    fn test_write_single_format() {
        let dir = TempDir::new().unwrap();
        let written =
            write_reports(&ScanReport::new("img"), dir.path(), OutputFormat::Json).unwrap();
        assert_eq!(written, vec![dir.path().join("licenses.json")]);
    }
}
