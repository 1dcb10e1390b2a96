//! Drains due rows of the write queue into the wallet

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::errors::QueueError;
use crate::domain::services::{ProcessOutcome, QueueService};
use crate::utils::logging;

#[derive(Debug)]
pub struct QueueProcessor {
    service: QueueService,
    interval: Duration,
}

/// Counts from one processing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub committed: usize,
    pub failed: usize,
}

impl QueueProcessor {
    pub fn new(service: QueueService, interval: Duration) -> Self {
        Self { service, interval }
    }

    /// Attempts every due row once
    pub async fn process_due(&self) -> Result<ProcessSummary, QueueError> {
        let mut summary = ProcessSummary::default();

        for item in self.service.due_items().await? {
            match self.service.process(&item).await {
                Ok(ProcessOutcome::Committed(_)) => summary.committed += 1,
                Ok(ProcessOutcome::Failed(_)) => summary.failed += 1,
                Err(e) => {
                    logging::log_error(&format!(
                        "[QUEUE] Failed to record result of #{}: {}",
                        item.id, e
                    ));
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    pub async fn run(self, cancel: CancellationToken) {
        logging::log_info(&format!(
            "[QUEUE] 🚀 Processing queue every {:?}",
            self.interval
        ));

        while !cancel.is_cancelled() {
            match self.process_due().await {
                Ok(summary) if summary.committed + summary.failed > 0 => {
                    logging::log_info(&format!(
                        "[QUEUE] Pass done: {} committed, {} failed",
                        summary.committed, summary.failed
                    ))
                }
                Ok(_) => {}
                Err(e) => logging::log_error(&format!("[QUEUE] Processing pass failed: {}", e)),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        logging::log_info("[QUEUE] 🛑 Stopped");
    }
}
