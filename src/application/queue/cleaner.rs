//! Reconciles processed queue rows with the ledger

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::QueueError;
use crate::domain::services::{ClearOutcome, QueueService};
use crate::utils::logging;

#[derive(Debug)]
pub struct QueueCleaner {
    service: QueueService,
    interval: Duration,
    grace_period: Duration,
}

/// Counts from one cleaning pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearSummary {
    pub deleted: usize,
    pub reprocessed: usize,
}

impl QueueCleaner {
    pub fn new(service: QueueService, interval: Duration, grace_period: Duration) -> Self {
        Self {
            service,
            interval,
            grace_period,
        }
    }

    /// Clears every row processed more than the grace period ago
    pub async fn clear_processed(&self) -> Result<ClearSummary, QueueError> {
        let mut summary = ClearSummary::default();

        for item in self.service.clearable_items(self.grace_period).await? {
            match self.service.clear(&item).await {
                Ok(ClearOutcome::Deleted) => summary.deleted += 1,
                Ok(ClearOutcome::Reprocessed(_)) => summary.reprocessed += 1,
                Err(e) => logging::log_warning(&format!(
                    "[CLEANER] Could not reconcile #{}: {}",
                    item.id, e
                )),
            }
        }

        Ok(summary)
    }

    pub async fn run(self, cancel: CancellationToken) {
        logging::log_info(&format!(
            "[CLEANER] 🚀 Clearing queue every {:?} (grace {:?})",
            self.interval, self.grace_period
        ));

        while !cancel.is_cancelled() {
            match self.clear_processed().await {
                Ok(summary) if summary.deleted + summary.reprocessed > 0 => {
                    logging::log_info(&format!(
                        "[CLEANER] Pass done: {} cleared, {} processed again",
                        summary.deleted, summary.reprocessed
                    ))
                }
                Ok(_) => {}
                Err(e) => logging::log_error(&format!("[CLEANER] Clearing pass failed: {}", e)),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        logging::log_info("[CLEANER] 🛑 Stopped");
    }
}
