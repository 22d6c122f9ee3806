//! Common types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Tenant isolation key carried by every entity and query.
pub type TenantId = Uuid;

/// Primary key of a tenant-owned record (database `BIGSERIAL`).
pub type RecordId = i64;

/// User performing a mutation.
pub type ActorId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(offset: i64, limit: i64) -> Self {
        Self { offset, limit }
    }

    pub fn page(page: i64, per_page: i64) -> Self {
        let page = page.max(1);
        Self { offset: (page - 1) * per_page, limit: per_page }
    }

    pub fn is_valid(&self) -> bool {
        self.offset >= 0 && self.limit >= 0
    }

    /// Zero limit falls back to the default page size; anything above the
    /// maximum is capped.
    pub fn clamped(self) -> Self {
        let limit = match self.limit {
            0 => DEFAULT_PAGE_SIZE,
            l => l.min(MAX_PAGE_SIZE),
        };
        Self { offset: self.offset, limit }
    }
}

/// A page of results together with the unpaginated total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
            limit: self.limit,
        }
    }
}
