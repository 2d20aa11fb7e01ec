use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::domain::IssueRecord;

/// Snapshot of the desk history for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub records: Vec<IssueRecord>,
}

/// Export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

/// Exporter for writing desk history in the given order
pub struct Exporter<'a> {
    records: &'a [IssueRecord],
}

impl<'a> Exporter<'a> {
    pub fn new(records: &'a [IssueRecord]) -> Self {
        Self { records }
    }

    pub fn export<W: Write>(&self, format: ExportFormat, writer: W) -> Result<usize> {
        match format {
            ExportFormat::Csv => self.export_csv(writer),
            ExportFormat::Json => self.export_json(writer),
        }
    }

    /// Export records to CSV. Image payloads are left out; only their presence is noted.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "id",
            "qr_code",
            "employee_id",
            "employee_name",
            "designation",
            "book_title",
            "issue_date",
            "due_date",
            "return_date",
            "status",
            "has_image",
        ])?;

        let mut count = 0;
        for record in self.records {
            csv_writer.write_record(&[
                record.id.to_string(),
                record.qr_code.clone(),
                record.employee_id.clone(),
                record.employee_name.clone(),
                record.designation.clone(),
                record.book_title.clone(),
                record.issue_date.to_rfc3339(),
                record.due_date.to_rfc3339(),
                record
                    .return_date
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default(),
                record.status.as_str().to_string(),
                record.book_image.is_some().to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export a full JSON snapshot, image payloads included.
    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let snapshot = HistorySnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            records: self.records.to_vec(),
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        Ok(snapshot.records.len())
    }
}
