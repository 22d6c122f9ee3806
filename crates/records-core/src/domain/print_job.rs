// ============================================================================
// Records Core - Contract Print Job Entity
// File: crates/records-core/src/domain/print_job.rs
// Description: Queued document rendering request for a contract
// ============================================================================

use std::fmt;

use chrono::{DateTime, Utc};
use records_shared::{ActorId, RecordId, TenantId};
use serde::{Deserialize, Serialize};

/// Print job status: QUEUED -> PROCESSING -> {COMPLETED, FAILED}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintJobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl PrintJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrintJobStatus::Queued => "QUEUED",
            PrintJobStatus::Processing => "PROCESSING",
            PrintJobStatus::Completed => "COMPLETED",
            PrintJobStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "QUEUED" => Some(PrintJobStatus::Queued),
            "PROCESSING" => Some(PrintJobStatus::Processing),
            "COMPLETED" => Some(PrintJobStatus::Completed),
            "FAILED" => Some(PrintJobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, PrintJobStatus::Completed | PrintJobStatus::Failed)
    }
}

impl Default for PrintJobStatus {
    fn default() -> Self {
        PrintJobStatus::Queued
    }
}

impl fmt::Display for PrintJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested output format. Only HTML is rendered in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputFormat {
    Html,
    Pdf,
    Docx,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Html => "HTML",
            OutputFormat::Pdf => "PDF",
            OutputFormat::Docx => "DOCX",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "HTML" => Some(OutputFormat::Html),
            "PDF" => Some(OutputFormat::Pdf),
            "DOCX" => Some(OutputFormat::Docx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Html
    }
}

/// Contract print job entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub contract_id: RecordId,
    pub status: PrintJobStatus,
    pub output_format: OutputFormat,
    pub output_path: Option<String>,
    pub file_size: Option<i64>,
    pub page_count: Option<i32>,
    pub retry_count: i32,
    pub error_message: Option<String>,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub requested_by: Option<ActorId>,
}

impl PrintJob {
    pub fn can_retry(&self, max_retries: i32) -> bool {
        self.retry_count < max_retries
    }
}

/// Result of a successful render, recorded on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintOutput {
    pub output_path: String,
    pub file_size: i64,
    pub page_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!(OutputFormat::from_str("html"), Some(OutputFormat::Html));
        assert_eq!(OutputFormat::from_str("PDF"), Some(OutputFormat::Pdf));
        assert_eq!(OutputFormat::from_str("odt"), None);
        assert_eq!(OutputFormat::Html.extension(), "html");
    }

    #[test]
    fn test_finished_statuses() {
        assert!(!PrintJobStatus::Queued.is_finished());
        assert!(!PrintJobStatus::Processing.is_finished());
        assert!(PrintJobStatus::Completed.is_finished());
        assert!(PrintJobStatus::Failed.is_finished());
    }
}
