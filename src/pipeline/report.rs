//! # Run Reporting Module
//!
//! Esiti per-file e statistiche aggregate di una run della pipeline.
//!
//! Ogni file scoperto termina in esattamente uno degli esiti di
//! `FileOutcome`; `RunStats` li accumula e produce il riepilogo finale.

use crate::file_manager::FileManager;

/// What happened to a single discovered file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Matched a rule and produced output through its transform
    Transformed {
        rule_pattern: String,
        bytes_in: u64,
        bytes_out: u64,
    },
    /// No rule matched; copied into the destination tree byte-for-byte
    Copied { bytes: u64 },
    /// Same canonical file already handled earlier in this run
    DuplicateSkipped,
    /// This file failed; the run went on without it
    Failed { error: String },
}

/// Outcome of one file, tied to its rule-matching path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub relative_path: String,
    pub outcome: FileOutcome,
}

/// Cumulative statistics for a pipeline run
#[derive(Debug, Default)]
pub struct RunStats {
    pub files_total: usize,
    pub transformed: usize,
    pub copied: usize,
    pub duplicates_skipped: usize,
    pub failed: usize,
    /// Source bytes of transformed files
    pub bytes_in: u64,
    /// Output bytes of transformed files
    pub bytes_out: u64,
    /// Bytes copied verbatim for unmatched files
    pub bytes_copied: u64,
    reports: Vec<FileReport>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one file report into the totals
    pub fn record(&mut self, report: FileReport) {
        self.files_total += 1;
        match &report.outcome {
            FileOutcome::Transformed {
                bytes_in,
                bytes_out,
                ..
            } => {
                self.transformed += 1;
                self.bytes_in += bytes_in;
                self.bytes_out += bytes_out;
            }
            FileOutcome::Copied { bytes } => {
                self.copied += 1;
                self.bytes_copied += bytes;
            }
            FileOutcome::DuplicateSkipped => {
                self.duplicates_skipped += 1;
            }
            FileOutcome::Failed { .. } => {
                self.failed += 1;
            }
        }
        self.reports.push(report);
    }

    /// All per-file reports, in completion order
    pub fn reports(&self) -> &[FileReport] {
        &self.reports
    }

    /// Find the report for a relative path
    pub fn report_for(&self, relative_path: &str) -> Option<&FileReport> {
        self.reports
            .iter()
            .find(|r| r.relative_path == relative_path)
    }

    pub fn bytes_saved(&self) -> u64 {
        self.bytes_in.saturating_sub(self.bytes_out)
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        if self.bytes_in > 0 {
            (self.bytes_saved() as f64 / self.bytes_in as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Transformed: {} | Copied: {} | Skipped: {} | Errors: {} | Saved: {} ({:.2}%)",
            self.files_total,
            self.transformed,
            self.copied,
            self.duplicates_skipped,
            self.failed,
            FileManager::format_size(self.bytes_saved()),
            self.overall_reduction_percent()
        )
    }
}
