//! Block-paced refresh of completed chains
//!
//! Once per directory block the poller promotes locally pending chains that
//! the ledger has anchored, then walks the new entry blocks of every completed
//! chain down to the last block it already holds. Backfill state is not
//! consulted: the walk only covers blocks above `latest_entry_block`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::application::sync::walker::EntryBlockWalker;
use crate::domain::errors::SyncError;
use crate::domain::models::{Chain, ChainFilter, ChainPatch, Status, ZERO_HASH};
use crate::infrastructure::factom::LedgerClient;
use crate::infrastructure::persistence::Store;
use crate::utils::logging;

const MINUTE: Duration = Duration::from_secs(60);

/// Minutes to sleep after a pass that started at minute `before` and ended at
/// minute `after` of the current directory block.
///
/// A smaller `after` means a new block started during the pass, so the next
/// pass runs at once. Minute 0 counts as the last minute of the previous block.
pub fn next_sleep_minutes(before: i64, after: i64, minutes_per_block: i64) -> i64 {
    if after < before {
        return 0;
    }

    let minute = if before == 0 { minutes_per_block } else { before };
    (minutes_per_block - minute + 1).max(0)
}

/// Counts from one update pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub promoted: usize,
    pub updated: usize,
}

pub struct UpdatePoller {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
    walker: EntryBlockWalker,
    minutes_per_block: i64,
}

impl fmt::Debug for UpdatePoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatePoller")
            .field("ledger", &self.ledger)
            .field("minutes_per_block", &self.minutes_per_block)
            .finish_non_exhaustive()
    }
}

impl UpdatePoller {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<dyn LedgerClient>, minutes_per_block: i64) -> Self {
        let walker = EntryBlockWalker::new(store.clone(), ledger.clone());
        Self {
            store,
            ledger,
            walker,
            minutes_per_block,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        logging::log_info("[POLLER] 🚀 Watching for new directory blocks");

        let mut last_height: Option<i64> = None;

        while !cancel.is_cancelled() {
            let before = match self.ledger.current_minute().await {
                Ok(current) => current,
                Err(e) => {
                    logging::log_error(&format!("[POLLER] Failed to read current minute: {}", e));
                    if !sleep_or_cancel(&cancel, MINUTE).await {
                        break;
                    }
                    continue;
                }
            };

            if last_height.map_or(false, |h| before.directory_block_height <= h) {
                logging::log_debug(&format!(
                    "[POLLER] Height {} not advanced yet",
                    before.directory_block_height
                ));
                if !sleep_or_cancel(&cancel, MINUTE).await {
                    break;
                }
                continue;
            }

            logging::log_info(&format!(
                "[POLLER] Directory block {} minute {}, updating chains",
                before.directory_block_height, before.minute
            ));
            last_height = Some(before.directory_block_height);

            match self.update_once().await {
                Ok(summary) => logging::log_info(&format!(
                    "[POLLER] {} chains promoted, {} chains updated",
                    summary.promoted, summary.updated
                )),
                Err(e) => logging::log_error(&format!("[POLLER] Update pass failed: {}", e)),
            }

            let after_minute = match self.ledger.current_minute().await {
                Ok(after) => after.minute,
                Err(e) => {
                    logging::log_warning(&format!(
                        "[POLLER] Failed to read current minute: {}",
                        e
                    ));
                    before.minute
                }
            };

            let minutes = next_sleep_minutes(before.minute, after_minute, self.minutes_per_block);
            logging::log_debug(&format!("[POLLER] Sleeping {} minutes", minutes));

            if !sleep_or_cancel(&cancel, MINUTE * minutes as u32).await {
                break;
            }
        }

        logging::log_info("[POLLER] 🛑 Stopped");
    }

    /// One pass: promote pending chains, then pull new blocks of completed ones
    pub async fn update_once(&self) -> Result<PollSummary, SyncError> {
        let mut summary = PollSummary::default();

        for status in [Status::Queue, Status::Processing] {
            for chain in self.store.find_chains(&ChainFilter::with_status(status)).await? {
                match self.promote(&chain).await {
                    Ok(true) => summary.promoted += 1,
                    Ok(false) => {}
                    Err(e) => logging::log_warning(&format!(
                        "[POLLER] Status check of chain {} failed: {}",
                        chain.chain_id, e
                    )),
                }
            }
        }

        let completed = ChainFilter::with_status(Status::Completed);
        for chain in self.store.find_chains(&completed).await? {
            match self.update_chain(&chain).await {
                Ok(true) => summary.updated += 1,
                Ok(false) => {}
                Err(e) => logging::log_warning(&format!(
                    "[POLLER] Update of chain {} failed: {}",
                    chain.chain_id, e
                )),
            }
        }

        Ok(summary)
    }

    /// Stores a newer ledger status for a pending chain
    async fn promote(&self, chain: &Chain) -> Result<bool, SyncError> {
        let head = self.ledger.chain_head(&chain.chain_id).await?;
        let status = Status::merge(chain.status, head.status());

        if status == chain.status || status == Status::Queue {
            return Ok(false);
        }

        let mut patch = ChainPatch::new().status(status);
        if let Some(key_mr) = &head.head {
            patch = patch.latest_entry_block(key_mr);
        }
        self.store.update_chain(&chain.chain_id, &patch).await?;

        logging::log_debug(&format!(
            "[POLLER] Chain {} is now {}",
            chain.chain_id, status
        ));
        Ok(true)
    }

    /// Walks blocks newer than `latest_entry_block`, then moves the cursor
    async fn update_chain(&self, chain: &Chain) -> Result<bool, SyncError> {
        let head = self.ledger.chain_head(&chain.chain_id).await?;
        let key_mr = match head.head {
            Some(key_mr) if head.status() == Status::Completed => key_mr,
            _ => return Err(SyncError::ChainNotReady(chain.chain_id.clone())),
        };

        if chain.latest_entry_block.as_deref() == Some(key_mr.as_str()) {
            return Ok(false);
        }

        logging::log_debug(&format!(
            "[POLLER] Chain {} has new entry blocks",
            chain.chain_id
        ));

        let to = chain.latest_entry_block.as_deref().unwrap_or(ZERO_HASH);
        self.walker.walk(&chain.chain_id, &key_mr, to, false).await?;

        self.store
            .update_chain(&chain.chain_id, &ChainPatch::new().latest_entry_block(&key_mr))
            .await?;

        Ok(true)
    }
}

/// Sleeps for `duration`; false if cancelled first
async fn sleep_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
