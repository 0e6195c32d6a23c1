//! CSV export of finished company records.
//!
//! Fixed column order, one row per scraped record, absent fields as empty
//! cells. Also doubles as the incremental progress sink the batch runner
//! calls after each company.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::domain::{CompanyOutcome, CompanyRecord};
use crate::engine::batch::ProgressSink;

pub struct CsvExporter {
    path: PathBuf,
}

impl CsvExporter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write every scraped record among `outcomes`, in order. Not-found and
    /// failed companies have no row; they live in the batch summary instead.
    /// Returns the number of rows written.
    pub fn write_all(&self, outcomes: &[CompanyOutcome]) -> Result<usize> {
        let mut writer = csv::WriterBuilder::new()
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        writer
            .write_record(CompanyRecord::CSV_HEADERS)
            .context("Failed to write CSV header")?;

        let mut rows = 0usize;
        for outcome in outcomes {
            if let Some(record) = outcome.record() {
                writer
                    .write_record(record.csv_row())
                    .with_context(|| format!("Failed to write CSV row for '{}'", record.name))?;
                rows += 1;
            }
        }

        writer.flush().context("Failed to flush CSV file")?;
        debug!(path = %self.path.display(), rows, "wrote CSV");
        Ok(rows)
    }
}

impl ProgressSink for CsvExporter {
    fn save(&self, outcomes: &[CompanyOutcome]) -> Result<()> {
        self.write_all(outcomes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CompanyRecord, Funding};

    #[test]
    fn writes_header_plus_one_row_per_scraped_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut record = CompanyRecord::new("Acme Inc");
        record.funding_total = Some(Funding {
            amount: 5_000_000.0,
            currency: "USD".to_string(),
        });
        let outcomes = vec![
            CompanyOutcome::Scraped(record),
            CompanyOutcome::NotFound {
                name: "GhostCorp".to_string(),
            },
        ];

        let rows = CsvExporter::new(&path).write_all(&outcomes).unwrap();
        assert_eq!(rows, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("name,legal_name"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("Acme Inc,"));
        assert!(row.contains("5000000"));
        assert!(lines.next().is_none());
    }
}
