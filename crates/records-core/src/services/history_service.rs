// ============================================================================
// Records Core - History Service
// File: crates/records-core/src/services/history_service.rs
// ============================================================================
//! Append-only contract audit trail with retention-based anonymization

use std::sync::Arc;

use chrono::{DateTime, Utc};
use records_shared::{Page, Pagination, RecordId, TenantId};
use tracing::{debug, info, warn};

use super::checked_page;
use crate::domain::{HistoryEntry, NewHistoryEntry, RetentionPolicyCell};
use crate::error::DomainError;
use crate::repositories::HistoryRepository;

pub struct HistoryRecorder<H: HistoryRepository> {
    history_repo: Arc<H>,
    policy: RetentionPolicyCell,
}

impl<H: HistoryRepository> Clone for HistoryRecorder<H> {
    fn clone(&self) -> Self {
        Self {
            history_repo: Arc::clone(&self.history_repo),
            policy: self.policy.clone(),
        }
    }
}

impl<H: HistoryRepository> HistoryRecorder<H> {
    pub fn new(history_repo: Arc<H>, policy: RetentionPolicyCell) -> Self {
        Self { history_repo, policy }
    }

    pub fn policy(&self) -> &RetentionPolicyCell {
        &self.policy
    }

    /// Append an entry, dropping personal fields the current policy does not collect.
    pub async fn record(
        &self,
        tenant_id: TenantId,
        mut entry: NewHistoryEntry,
    ) -> Result<HistoryEntry, DomainError> {
        self.policy.snapshot().apply_collection(&mut entry);
        let stored = self.history_repo.append(tenant_id, &entry).await?;
        debug!(
            tenant_id = %tenant_id,
            contract_id = entry.contract_id,
            action = %entry.action,
            "History entry recorded"
        );
        Ok(stored)
    }

    /// Audit failures never fail the primary operation.
    pub async fn record_best_effort(&self, tenant_id: TenantId, entry: NewHistoryEntry) {
        let contract_id = entry.contract_id;
        let action = entry.action;
        if let Err(e) = self.record(tenant_id, entry).await {
            warn!(
                tenant_id = %tenant_id,
                contract_id,
                action = %action,
                "Failed to record history entry: {}",
                e
            );
        }
    }

    pub async fn list(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        page: Pagination,
    ) -> Result<Page<HistoryEntry>, DomainError> {
        let page = checked_page(page)?;
        self.history_repo.list_for_contract(tenant_id, contract_id, page).await
    }

    /// Clear client IP and user agent of one entry immediately.
    pub async fn erase(&self, tenant_id: TenantId, id: RecordId) -> Result<HistoryEntry, DomainError> {
        let mut entry = self
            .history_repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| DomainError::not_found("ContractHistory", id))?;

        entry.force_anonymize(Utc::now());
        self.history_repo.store_anonymized(tenant_id, &entry).await?;
        info!(tenant_id = %tenant_id, history_id = id, "History entry erased");
        Ok(entry)
    }

    /// Walk a contract's trail and clear the personal fields that outlived
    /// the current policy. Returns the number of entries changed.
    pub async fn apply_retention(
        &self,
        tenant_id: TenantId,
        contract_id: RecordId,
        now: DateTime<Utc>,
    ) -> Result<u64, DomainError> {
        let policy = self.policy.snapshot();
        let mut page = Pagination::new(0, records_shared::constants::MAX_PAGE_SIZE);
        let mut changed = 0u64;

        loop {
            let batch = self.history_repo.list_for_contract(tenant_id, contract_id, page).await?;
            let fetched = batch.items.len() as i64;

            for mut entry in batch.items {
                if entry.anonymize(&policy, now) {
                    self.history_repo.store_anonymized(tenant_id, &entry).await?;
                    changed += 1;
                }
            }

            if fetched < page.limit {
                break;
            }
            page.offset += fetched;
        }

        if changed > 0 {
            info!(tenant_id = %tenant_id, contract_id, changed, "Retention applied to history");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldRetention, HistoryAction, RetentionPolicy};
    use crate::repositories::MockHistoryRepository;
    use chrono::Duration;
    use uuid::Uuid;

    fn stored(id: RecordId, age_days: i64, now: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            id,
            tenant_id: Uuid::nil(),
            contract_id: 5,
            action: HistoryAction::StatusChange,
            field_name: Some("status".into()),
            old_value: Some("DRAFT".into()),
            new_value: Some("PENDING".into()),
            description: None,
            performed_by: None,
            client_ip: Some("192.168.1.20".into()),
            client_user_agent: Some("Mozilla/5.0".into()),
            created_at: now - Duration::days(age_days),
            anonymized_at: None,
        }
    }

    fn no_ip_policy() -> RetentionPolicyCell {
        RetentionPolicyCell::new(RetentionPolicy {
            client_ip: FieldRetention::new(90, false),
            user_agent: FieldRetention::new(30, true),
        })
    }

    #[tokio::test]
    async fn test_record_applies_collection_policy() {
        let mut repo = MockHistoryRepository::new();
        let now = Utc::now();
        repo.expect_append()
            .withf(|_, e| e.client_ip.is_none() && e.client_user_agent.as_deref() == Some("curl/8"))
            .times(1)
            .returning(move |_, _| Ok(stored(1, 0, now)));

        let recorder = HistoryRecorder::new(Arc::new(repo), no_ip_policy());
        let entry = NewHistoryEntry::new(5, HistoryAction::Create, None)
            .client(Some("10.1.1.1".into()), Some("curl/8".into()));

        assert!(recorder.record(Uuid::nil(), entry).await.is_ok());
    }

    #[tokio::test]
    async fn test_best_effort_swallows_errors() {
        let mut repo = MockHistoryRepository::new();
        repo.expect_append()
            .times(1)
            .returning(|_, _| Err(DomainError::DatabaseError("connection reset".into())));

        let recorder = HistoryRecorder::new(Arc::new(repo), RetentionPolicyCell::default());
        recorder
            .record_best_effort(Uuid::nil(), NewHistoryEntry::new(5, HistoryAction::Sign, None))
            .await;
    }

    #[tokio::test]
    async fn test_erase_missing_entry_is_not_found() {
        let mut repo = MockHistoryRepository::new();
        repo.expect_find_by_id().returning(|_, _| Ok(None));
        repo.expect_store_anonymized().never();

        let recorder = HistoryRecorder::new(Arc::new(repo), RetentionPolicyCell::default());
        let err = recorder.erase(Uuid::nil(), 99).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_erase_clears_personal_fields() {
        let now = Utc::now();
        let mut repo = MockHistoryRepository::new();
        repo.expect_find_by_id().returning(move |_, id| Ok(Some(stored(id, 1, now))));
        repo.expect_store_anonymized()
            .withf(|_, e| e.client_ip.is_none() && e.client_user_agent.is_none() && e.anonymized_at.is_some())
            .times(1)
            .returning(|_, _| Ok(()));

        let recorder = HistoryRecorder::new(Arc::new(repo), RetentionPolicyCell::default());
        let entry = recorder.erase(Uuid::nil(), 3).await.unwrap();
        assert_eq!(entry.new_value.as_deref(), Some("PENDING"));
    }

    #[tokio::test]
    async fn test_apply_retention_stores_only_changed_entries() {
        let now = Utc::now();
        let mut repo = MockHistoryRepository::new();
        repo.expect_list_for_contract().times(1).returning(move |_, _, page| {
            Ok(Page {
                items: vec![stored(1, 5, now), stored(2, 45, now), stored(3, 120, now)],
                total: 3,
                offset: page.offset,
                limit: page.limit,
            })
        });
        repo.expect_store_anonymized().times(2).returning(|_, _| Ok(()));

        let recorder = HistoryRecorder::new(Arc::new(repo), RetentionPolicyCell::default());
        assert_eq!(recorder.apply_retention(Uuid::nil(), 5, now).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_rejects_negative_offset() {
        let recorder = HistoryRecorder::new(
            Arc::new(MockHistoryRepository::new()),
            RetentionPolicyCell::default(),
        );
        let err = recorder.list(Uuid::nil(), 5, Pagination::new(-10, 20)).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidPagination(_)));
    }
}
