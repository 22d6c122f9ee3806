//! Tenant-scoped output directory for rendered documents.
//!
//! Layout: `{root}/{tenant_id}/contract_{number}_{YYYYmmdd_HHMMSS}_job{job_id}.{ext}`.
//! The job id keeps two renders of one contract in the same second apart.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use records_core::OutputFormat;
use records_shared::{RecordId, TenantId};
use tokio::fs;
use tracing::debug;

use crate::utils::error::WorkerError;
use crate::utils::sanitize_filename_component;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tenant_dir(&self, tenant_id: TenantId) -> PathBuf {
        self.root.join(tenant_id.to_string())
    }

    pub fn path_for(
        &self,
        tenant_id: TenantId,
        job_id: RecordId,
        contract_number: &str,
        format: OutputFormat,
        at: DateTime<Utc>,
    ) -> PathBuf {
        let file_name = format!(
            "contract_{}_{}_job{}.{}",
            sanitize_filename_component(contract_number),
            at.format("%Y%m%d_%H%M%S"),
            job_id,
            format.extension()
        );
        self.tenant_dir(tenant_id).join(file_name)
    }

    /// Write `content`, creating the tenant directory when missing.
    pub async fn write(
        &self,
        tenant_id: TenantId,
        job_id: RecordId,
        contract_number: &str,
        format: OutputFormat,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<StoredFile, WorkerError> {
        fs::create_dir_all(self.tenant_dir(tenant_id)).await?;

        let path = self.path_for(tenant_id, job_id, contract_number, format, at);
        fs::write(&path, content.as_bytes()).await?;
        let size = fs::metadata(&path).await?.len();

        debug!(path = %path.display(), size, "Document written");
        Ok(StoredFile { path, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_path_layout() {
        let store = OutputStore::new("/srv/out");
        let tenant = TenantId::new_v4();
        let path = store.path_for(tenant, 17, "CTR/2024:001", OutputFormat::Html, at());
        assert_eq!(
            path,
            PathBuf::from(format!("/srv/out/{}/contract_CTR_2024_001_20240305_140709_job17.html", tenant))
        );
    }

    #[test]
    fn test_traversal_stays_inside_tenant_dir() {
        let store = OutputStore::new("/srv/out");
        let tenant = TenantId::new_v4();
        let path = store.path_for(tenant, 1, "../../../etc/cron.d/x", OutputFormat::Html, at());
        assert_eq!(path.parent(), Some(store.tenant_dir(tenant).as_path()));
    }

    #[tokio::test]
    async fn test_write_creates_tenant_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let tenant = TenantId::new_v4();

        let stored = store
            .write(tenant, 1, "CTR-1", OutputFormat::Html, "<html></html>", at())
            .await
            .unwrap();

        assert_eq!(stored.size, 13);
        assert!(stored.path.starts_with(dir.path().join(tenant.to_string())));
        let written = tokio::fs::read_to_string(&stored.path).await.unwrap();
        assert_eq!(written, "<html></html>");
    }

    #[tokio::test]
    async fn test_same_second_renders_do_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let tenant = TenantId::new_v4();

        let first = store.write(tenant, 1, "CTR-1", OutputFormat::Html, "first", at()).await.unwrap();
        let second = store.write(tenant, 2, "CTR-1", OutputFormat::Html, "second", at()).await.unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(tokio::fs::read_to_string(&first.path).await.unwrap(), "first");
        assert_eq!(tokio::fs::read_to_string(&second.path).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_write_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, "x").unwrap();
        let store = OutputStore::new(&root);

        let err = store
            .write(TenantId::new_v4(), 1, "CTR-1", OutputFormat::Html, "x", at())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
