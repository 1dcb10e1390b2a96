//! Finds chains that need a backfill and hands each one to the pool once

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::sync::pool::{BackfillJob, Dispatcher};
use crate::domain::errors::SyncError;
use crate::domain::models::{ChainFilter, ChainPatch};
use crate::infrastructure::persistence::Store;
use crate::utils::logging;

pub struct UnsyncedChainScanner {
    store: Arc<dyn Store>,
    dispatcher: Dispatcher,
    interval: Duration,
}

impl fmt::Debug for UnsyncedChainScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnsyncedChainScanner")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl UnsyncedChainScanner {
    pub fn new(store: Arc<dyn Store>, dispatcher: Dispatcher, interval: Duration) -> Self {
        Self {
            store,
            dispatcher,
            interval,
        }
    }

    /// Drops claims left behind by a previous run
    pub async fn reset_claims(&self) -> Result<u64, SyncError> {
        let reset = self.store.reset_unsynced_chains().await?;
        if reset > 0 {
            logging::log_info(&format!("[SCANNER] Released {} unsynced chains", reset));
        }
        Ok(reset)
    }

    /// Claims every chain awaiting backfill and submits it. Returns the number submitted.
    pub async fn scan_once(&self) -> Result<usize, SyncError> {
        let chains = self
            .store
            .find_chains(&ChainFilter::awaiting_backfill())
            .await?;

        let mut submitted = 0;
        for chain in chains {
            if !self.store.claim_chain_for_pool(&chain.chain_id).await? {
                continue;
            }

            logging::log_debug(&format!(
                "[SCANNER] Sending chain {} to the pool",
                chain.chain_id
            ));

            let chain_id = chain.chain_id.clone();
            if let Err(e) = self.dispatcher.submit(BackfillJob { chain }).await {
                self.store
                    .update_chain(&chain_id, &ChainPatch::release_claim())
                    .await?;
                return Err(e);
            }
            submitted += 1;
        }

        Ok(submitted)
    }

    pub async fn run(self, cancel: CancellationToken) {
        if let Err(e) = self.reset_claims().await {
            logging::log_error(&format!("[SCANNER] Failed to reset chain claims: {}", e));
        }

        logging::log_info(&format!(
            "[SCANNER] 🚀 Scanning for unsynced chains every {:?}",
            self.interval
        ));

        while !cancel.is_cancelled() {
            match self.scan_once().await {
                Ok(0) => {}
                Ok(n) => logging::log_info(&format!("[SCANNER] Sent {} chains to the pool", n)),
                Err(SyncError::PoolClosed) => {
                    logging::log_warning("[SCANNER] Worker pool closed");
                    break;
                }
                Err(e) => logging::log_error(&format!("[SCANNER] Scan failed: {}", e)),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        logging::log_info("[SCANNER] 🛑 Stopped");
    }
}
