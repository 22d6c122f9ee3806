//! Periodic trigger for the print queue.

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use records_core::repositories::{ContractRepository, PrintJobRepository};

use super::processor::PrintJobProcessor;

/// Run passes until `cancel` fires: one immediately, then every
/// `poll_interval`. Returns the number of passes started.
///
/// Cancellation is observed between ticks and between jobs; a job already
/// claimed is finished first.
pub async fn run_poller<P, C>(processor: &PrintJobProcessor<P, C>, cancel: CancellationToken) -> u64
where
    P: PrintJobRepository,
    C: ContractRepository,
{
    let settings = processor.settings();
    let mut ticker = interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        interval_secs = settings.poll_interval.as_secs(),
        batch_size = settings.batch_size,
        "Print job poller started"
    );

    let mut passes = 0u64;
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            // First tick completes immediately: catch-up pass at startup.
            _ = ticker.tick() => {}
        }

        passes += 1;
        match processor.process_pending_jobs_until(settings.batch_size, &cancel).await {
            Ok(report) => debug!(pass = passes, processed = report.processed(), "Poll pass done"),
            Err(e) => error!(pass = passes, "Poll pass failed: {}", e),
        }
    }

    info!(passes, "Print job poller stopped");
    passes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use records_core::DomainError;

    use crate::worker::test_support::{settings, MockContracts, MockJobs};

    #[tokio::test]
    async fn test_cancelled_poller_runs_no_pass() {
        let dir = tempfile::tempdir().unwrap();
        let mut jobs = MockJobs::new();
        jobs.expect_fetch_queued().never();
        let processor = PrintJobProcessor::new(Arc::new(jobs), Arc::new(MockContracts::new()), settings(dir.path()));

        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(run_poller(&processor, cancel).await, 0);
    }

    #[tokio::test]
    async fn test_immediate_pass_then_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();

        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Ok(0));
        let trigger = cancel.clone();
        jobs.expect_fetch_queued().times(1).returning(move |_| {
            trigger.cancel();
            Ok(vec![])
        });
        let processor = PrintJobProcessor::new(Arc::new(jobs), Arc::new(MockContracts::new()), settings(dir.path()));

        assert_eq!(run_poller(&processor, cancel).await, 1);
    }

    #[tokio::test]
    async fn test_failed_pass_keeps_polling() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancellationToken::new();
        let mut worker_settings = settings(dir.path());
        worker_settings.poll_interval = std::time::Duration::from_millis(5);

        let mut jobs = MockJobs::new();
        jobs.expect_reap_stale().returning(|_, _| Ok(0));
        let mut seq = mockall::Sequence::new();
        jobs.expect_fetch_queued()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(DomainError::ConnectionError("refused".into())));
        let trigger = cancel.clone();
        jobs.expect_fetch_queued()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| {
                trigger.cancel();
                Ok(vec![])
            });
        let processor = PrintJobProcessor::new(Arc::new(jobs), Arc::new(MockContracts::new()), worker_settings);

        assert_eq!(run_poller(&processor, cancel).await, 2);
    }
}
