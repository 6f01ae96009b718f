use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

// -------------------------------------------------------------------------------------------------
// ReportWriter
// -------------------------------------------------------------------------------------------------
/// An incremental CSV report.
///
/// The header row is written and flushed when the report is created; every subsequent row is
/// flushed to the file before `write_row` returns. An interrupted run therefore always leaves a
/// valid file behind: the header plus one complete row per entity processed so far.
pub struct ReportWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows_written: u64,
}

impl ReportWriter {
    /// Create the report file, truncating any previous run's output, and write the header row.
    pub fn create<P: AsRef<Path>>(path: P, columns: &[&str]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(columns)
            .with_context(|| format!("Failed to write header to {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush header to {}", path.display()))?;
        Ok(ReportWriter {
            path,
            writer,
            rows_written: 0,
        })
    }

    /// Append one row and flush it to the file.
    pub fn write_row<T: Serialize>(&mut self, row: &T) -> Result<()> {
        self.writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", self.path.display()))?;
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush row to {}", self.path.display()))?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        name: String,
        count: i64,
        flagged: bool,
    }

    fn row(name: &str, count: i64) -> Row {
        Row {
            name: name.to_string(),
            count,
            flagged: count > 1,
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .expect("report file should be readable")
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn header_is_written_on_create() {
        let dir = TempDir::new().expect("should create tempdir");
        let path = dir.path().join("report.csv");
        let writer = ReportWriter::create(&path, &["Name", "Count", "Flagged"]).unwrap();
        assert_eq!(writer.rows_written(), 0);

        // Visible on disk before any row arrives and before the writer is dropped.
        assert_eq!(read_lines(&path), vec!["Name,Count,Flagged"]);
    }

    #[test]
    fn each_row_is_durable_before_the_next() {
        let dir = TempDir::new().expect("should create tempdir");
        let path = dir.path().join("report.csv");
        let mut writer = ReportWriter::create(&path, &["Name", "Count", "Flagged"]).unwrap();

        writer.write_row(&row("alpha", 1)).unwrap();
        assert_eq!(read_lines(&path).len(), 2);

        writer.write_row(&row("beta", 2)).unwrap();
        assert_eq!(read_lines(&path).len(), 3);
        assert_eq!(writer.rows_written(), 2);
    }

    #[test]
    fn interrupted_run_leaves_a_valid_file() {
        let dir = TempDir::new().expect("should create tempdir");
        let path = dir.path().join("report.csv");
        let mut writer = ReportWriter::create(&path, &["Name", "Count", "Flagged"]).unwrap();
        writer.write_row(&row("alpha", 1)).unwrap();
        writer.write_row(&row("beta", 2)).unwrap();

        // Abandon the writer without any orderly shutdown, as an interrupt would.
        std::mem::forget(writer);

        let lines = read_lines(&path);
        assert_eq!(
            lines,
            vec![
                "Name,Count,Flagged".to_string(),
                "alpha,1,false".to_string(),
                "beta,2,true".to_string(),
            ]
        );
    }

    #[test]
    fn fields_needing_quotes_stay_one_row() {
        let dir = TempDir::new().expect("should create tempdir");
        let path = dir.path().join("report.csv");
        let mut writer = ReportWriter::create(&path, &["Name", "Count", "Flagged"]).unwrap();
        writer.write_row(&row("commas, and\nnewlines", 1)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "commas, and\nnewlines");
    }
}
