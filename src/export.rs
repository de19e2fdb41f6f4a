//! CSV export of listing reports.

use crate::model::{ExportError, ListingReport};
use crate::utils::{file_timestamp, sanitize_file_stem};
use chrono::NaiveDateTime;
use csv::{Terminator, Writer, WriterBuilder};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ReportExporter {
    output_dir: PathBuf,
}

impl ReportExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    /// Same listing, same path; an existing file is overwritten.
    pub fn path_for(&self, report: &ListingReport) -> PathBuf {
        self.output_dir
            .join(format!("{}.csv", sanitize_file_stem(report.listing.as_str())))
    }

    /// Writes `Date,Price` plus one row per observation.
    pub fn export(&self, report: &ListingReport) -> Result<PathBuf, ExportError> {
        let path = self.path_for(report);
        let mut writer = self.writer(&path)?;
        writer.write_record(["Date", "Price"])?;
        for observation in &report.observations {
            writer.write_record([
                observation.date.format("%Y-%m-%d").to_string(),
                observation.value.to_string(),
            ])?;
        }
        writer.flush()?;
        debug!("Exported {} row(s) to {}", report.observations.len(), path.display());
        Ok(path)
    }

    /// All reports in one file, `Hotel Name,Date,Price`, named after the location and `at`.
    pub fn export_combined(
        &self,
        reports: &[ListingReport],
        location: &str,
        at: NaiveDateTime,
    ) -> Result<PathBuf, ExportError> {
        let path = self
            .output_dir
            .join(format!("{}_{}.csv", sanitize_file_stem(location), file_timestamp(at)));
        let mut writer = self.writer(&path)?;
        writer.write_record(["Hotel Name", "Date", "Price"])?;
        for report in reports {
            for observation in &report.observations {
                writer.write_record([
                    report.listing.to_string(),
                    observation.date.format("%Y-%m-%d").to_string(),
                    observation.value.to_string(),
                ])?;
            }
        }
        writer.flush()?;
        Ok(path)
    }

    fn writer(&self, path: &Path) -> Result<Writer<File>, ExportError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_path(path)?)
    }
}
