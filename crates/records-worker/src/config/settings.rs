use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use records_shared::config::WorkerSettings;

/// Runtime knobs of the job processor and poller, derived from the
/// `worker` section of the application config.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub batch_size: usize,
    pub max_retries: i32,
    pub poll_interval: Duration,
    pub stale_after: Duration,
    pub output_root: PathBuf,
}

impl ProcessorSettings {
    /// Claims older than this instant are considered abandoned.
    pub fn stale_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let window = chrono::Duration::from_std(self.stale_after).unwrap_or(chrono::Duration::MAX);
        now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl From<&WorkerSettings> for ProcessorSettings {
    fn from(worker: &WorkerSettings) -> Self {
        Self {
            batch_size: worker.batch_size,
            max_retries: worker.max_retries,
            poll_interval: Duration::from_secs(worker.poll_interval_seconds),
            stale_after: Duration::from_secs(worker.stale_after_seconds),
            output_root: worker.output_root.clone(),
        }
    }
}
