// ============================================================================
// Records Core - Contract History Entity
// File: crates/records-core/src/domain/history.rs
// Description: Append-only audit trail with retention-based anonymization
// ============================================================================

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use records_shared::config::RetentionSettings;
use records_shared::constants::{DEFAULT_IP_RETENTION_DAYS, DEFAULT_USER_AGENT_RETENTION_DAYS};
use records_shared::{ActorId, RecordId, TenantId};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Create,
    Update,
    StatusChange,
    Sign,
    Print,
    Delete,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Create => "CREATE",
            HistoryAction::Update => "UPDATE",
            HistoryAction::StatusChange => "STATUS_CHANGE",
            HistoryAction::Sign => "SIGN",
            HistoryAction::Print => "PRINT",
            HistoryAction::Delete => "DELETE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CREATE" => Some(HistoryAction::Create),
            "UPDATE" => Some(HistoryAction::Update),
            "STATUS_CHANGE" => Some(HistoryAction::StatusChange),
            "SIGN" => Some(HistoryAction::Sign),
            "PRINT" => Some(HistoryAction::Print),
            "DELETE" => Some(HistoryAction::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub contract_id: RecordId,
    pub action: HistoryAction,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: Option<String>,
    pub performed_by: Option<ActorId>,
    pub client_ip: Option<String>,
    pub client_user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub anonymized_at: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    fn client_ip_expired(&self, policy: &RetentionPolicy, now: DateTime<Utc>) -> bool {
        self.client_ip.is_some() && policy.client_ip.is_expired(self.age(now))
    }

    fn user_agent_expired(&self, policy: &RetentionPolicy, now: DateTime<Utc>) -> bool {
        self.client_user_agent.is_some() && policy.user_agent.is_expired(self.age(now))
    }

    /// True when at least one personal field has outlived its window.
    pub fn is_eligible_for_anonymization(&self, policy: &RetentionPolicy, now: DateTime<Utc>) -> bool {
        self.client_ip_expired(policy, now) || self.user_agent_expired(policy, now)
    }

    /// Clear personal fields older than their retention window.
    /// Returns whether anything changed.
    pub fn anonymize(&mut self, policy: &RetentionPolicy, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        if self.client_ip_expired(policy, now) {
            self.client_ip = None;
            changed = true;
        }
        if self.user_agent_expired(policy, now) {
            self.client_user_agent = None;
            changed = true;
        }
        if changed {
            self.anonymized_at = Some(now);
        }
        changed
    }

    /// Clear both personal fields regardless of age (erasure requests).
    pub fn force_anonymize(&mut self, now: DateTime<Utc>) {
        self.client_ip = None;
        self.client_user_agent = None;
        self.anonymized_at = Some(now);
    }
}

/// Audit entry to append
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub contract_id: RecordId,
    pub action: HistoryAction,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: Option<String>,
    pub performed_by: Option<ActorId>,
    pub client_ip: Option<String>,
    pub client_user_agent: Option<String>,
}

impl NewHistoryEntry {
    pub fn new(contract_id: RecordId, action: HistoryAction, performed_by: Option<ActorId>) -> Self {
        Self {
            contract_id,
            action,
            field_name: None,
            old_value: None,
            new_value: None,
            description: None,
            performed_by,
            client_ip: None,
            client_user_agent: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.field_name = Some(name.into());
        self
    }

    pub fn values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.client_ip = ip;
        self.client_user_agent = user_agent;
        self
    }
}

/// Retention rule for one personal field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRetention {
    pub retention_days: i64,
    pub collect: bool,
}

impl FieldRetention {
    pub fn new(retention_days: i64, collect: bool) -> Self {
        Self { retention_days, collect }
    }

    /// A retention span too large for `Duration` never expires.
    fn is_expired(&self, age: Duration) -> bool {
        match Duration::try_days(self.retention_days) {
            Some(limit) => age > limit,
            None => false,
        }
    }
}

/// Retention policy for the personal fields of audit entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub client_ip: FieldRetention,
    pub user_agent: FieldRetention,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            client_ip: FieldRetention::new(DEFAULT_IP_RETENTION_DAYS, true),
            user_agent: FieldRetention::new(DEFAULT_USER_AGENT_RETENTION_DAYS, true),
        }
    }
}

impl From<&RetentionSettings> for RetentionPolicy {
    fn from(settings: &RetentionSettings) -> Self {
        Self {
            client_ip: FieldRetention::new(settings.client_ip_days, settings.collect_client_ip),
            user_agent: FieldRetention::new(settings.user_agent_days, settings.collect_user_agent),
        }
    }
}

impl RetentionPolicy {
    /// Drop fields the policy says must not be collected.
    pub fn apply_collection(&self, entry: &mut NewHistoryEntry) {
        if !self.client_ip.collect {
            entry.client_ip = None;
        }
        if !self.user_agent.collect {
            entry.client_user_agent = None;
        }
    }
}

/// Process-wide retention policy cell. Readers get an immutable snapshot;
/// `replace` swaps the whole policy atomically.
#[derive(Debug, Clone)]
pub struct RetentionPolicyCell {
    sender: Arc<watch::Sender<Arc<RetentionPolicy>>>,
}

impl RetentionPolicyCell {
    pub fn new(policy: RetentionPolicy) -> Self {
        let (sender, _) = watch::channel(Arc::new(policy));
        Self { sender: Arc::new(sender) }
    }

    pub fn snapshot(&self) -> Arc<RetentionPolicy> {
        self.sender.borrow().clone()
    }

    pub fn replace(&self, policy: RetentionPolicy) -> Arc<RetentionPolicy> {
        self.sender.send_replace(Arc::new(policy))
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<RetentionPolicy>> {
        self.sender.subscribe()
    }
}

impl From<&RetentionSettings> for RetentionPolicyCell {
    fn from(settings: &RetentionSettings) -> Self {
        Self::new(RetentionPolicy::from(settings))
    }
}

impl Default for RetentionPolicyCell {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}
