//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 500;
pub const MAX_IDENTIFIER_LENGTH: usize = 128;
pub const MONEY_SCALE: u32 = 2;
pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_PRINT_BATCH_SIZE: usize = 10;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 30;
pub const DEFAULT_MAX_PRINT_RETRIES: i32 = 3;
pub const DEFAULT_STALE_CLAIM_SECONDS: u64 = 900;
pub const DEFAULT_IP_RETENTION_DAYS: i64 = 90;
pub const DEFAULT_USER_AGENT_RETENTION_DAYS: i64 = 30;
