//! Records produced by the database-side contract generation procedures.
//! Treated as opaque snapshots; only read through the generation gateway.

use chrono::{DateTime, Utc};
use records_shared::{ActorId, RecordId, TenantId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContract {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub contract_id: RecordId,
    pub template_id: Option<RecordId>,
    pub content: String,
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
    pub generated_by: Option<ActorId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTemplate {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub template_code: String,
    pub name: String,
    pub contract_type: Option<String>,
    pub version: i32,
    pub is_default: bool,
    pub is_active: bool,
}

/// Outcome of the content-hash verification procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityStatus {
    Match,
    Mismatch,
    /// The snapshot does not exist or belongs to another tenant.
    NotFoundOrUnauthorized,
}

impl IntegrityStatus {
    /// Result code convention of the procedure: 1 match, 0 mismatch, anything else not found.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => IntegrityStatus::Match,
            0 => IntegrityStatus::Mismatch,
            _ => IntegrityStatus::NotFoundOrUnauthorized,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, IntegrityStatus::Match)
    }
}

/// Actions logged against a generated snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationAction {
    View,
    Download,
    Print,
    Email,
}

impl GenerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationAction::View => "VIEW",
            GenerationAction::Download => "DOWNLOAD",
            GenerationAction::Print => "PRINT",
            GenerationAction::Email => "EMAIL",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub total_generated: i64,
    pub contracts_with_documents: i64,
    pub total_actions: i64,
    pub last_generated_at: Option<DateTime<Utc>>,
}
