//! Durable write queue: enqueue, process and clear
//!
//! Rows are created once per logical write, attempted until the wallet accepts
//! them, kept for a grace period and then reconciled against the ledger.

use chrono::{Duration, Utc};
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::QueueError;
use crate::domain::models::{
    Chain, ChainPatch, Entry, NewQueueItem, QueueAction, QueueItem, QueueItemPatch, QueueParams,
    Status,
};
use crate::infrastructure::factom::LedgerClient;
use crate::infrastructure::persistence::Store;
use crate::infrastructure::wallet::Wallet;
use crate::utils::logging;

/// Outcome of one processing attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The wallet accepted the write and returned this ledger hash
    Committed(String),
    /// The attempt failed; the row will be retried after the delay
    Failed(String),
}

/// Outcome of reconciling a processed row with the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    /// The write is confirmed and the row was deleted
    Deleted,
    /// The write was not confirmed yet and the row was processed again
    Reprocessed(ProcessOutcome),
}

#[derive(Clone)]
pub struct QueueService {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn Wallet>,
    retry_delay: Duration,
}

impl fmt::Debug for QueueService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueService")
            .field("ledger", &self.ledger)
            .field("wallet", &self.wallet)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

impl QueueService {
    pub fn new(
        store: Arc<dyn Store>,
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn Wallet>,
        retry_delay: std::time::Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            wallet,
            retry_delay: Duration::from_std(retry_delay).unwrap_or_else(|_| Duration::minutes(1)),
        }
    }

    /// Queues a write unless an identical one from the same user is already queued.
    /// Returns the row standing for the request either way.
    pub async fn add_to_queue(
        &self,
        user_id: i32,
        action: QueueAction,
        params: &QueueParams,
    ) -> Result<QueueItem, QueueError> {
        let params = params.to_json()?;

        if let Some(existing) = self.store.find_queue_item(user_id, action, &params).await? {
            logging::log_debug(&format!(
                "[QUEUE] Request already queued as #{} ({})",
                existing.id, action
            ));
            return Ok(existing);
        }

        let item = self
            .store
            .create_queue_item(&NewQueueItem {
                user_id,
                action,
                params,
            })
            .await?;

        logging::log_info(&format!("[QUEUE] Added #{} ({})", item.id, action));
        Ok(item)
    }

    /// Every row queued by a user, newest first
    pub async fn user_queue(&self, user_id: i32) -> Result<Vec<QueueItem>, QueueError> {
        Ok(self.store.user_queue(user_id).await?)
    }

    /// Rows waiting for a first attempt or past their retry deadline
    pub async fn due_items(&self) -> Result<Vec<QueueItem>, QueueError> {
        Ok(self.store.queue_due(Utc::now()).await?)
    }

    /// Processed rows older than `grace`
    pub async fn clearable_items(
        &self,
        grace: std::time::Duration,
    ) -> Result<Vec<QueueItem>, QueueError> {
        let grace = Duration::from_std(grace).unwrap_or_else(|_| Duration::hours(1));
        Ok(self.store.queue_to_clear(Utc::now() - grace).await?)
    }

    /// Runs commit+reveal for a row and records the result in it.
    ///
    /// Wallet and payload failures are written to the row and reported as
    /// [`ProcessOutcome::Failed`]; only storage failures are returned as errors.
    pub async fn process(&self, item: &QueueItem) -> Result<ProcessOutcome, QueueError> {
        logging::log_debug(&format!(
            "[QUEUE] Processing #{} action={} try={}",
            item.id, item.action, item.try_count
        ));

        match self.commit(item).await {
            Ok(write) => {
                let ledger_hash = write.ledger_hash.clone();
                self.store
                    .update_queue_item(
                        item.id,
                        &QueueItemPatch {
                            result: Some(ledger_hash.clone()),
                            processed_at: Some(Utc::now()),
                            ..QueueItemPatch::default()
                        },
                    )
                    .await?;

                logging::log_info(&format!(
                    "[QUEUE] ✅ Created {} {}",
                    item.action, ledger_hash
                ));

                self.mark_processing(item, &write).await;
                Ok(ProcessOutcome::Committed(ledger_hash))
            }
            Err(QueueError::DbError(e)) => Err(QueueError::DbError(e)),
            Err(e) => {
                let message = e.to_string();
                let next_try_at = Utc::now() + self.retry_delay;

                self.store
                    .update_queue_item(
                        item.id,
                        &QueueItemPatch {
                            error: Some(message.clone()),
                            try_count: Some(item.try_count + 1),
                            next_try_at: Some(next_try_at),
                            ..QueueItemPatch::default()
                        },
                    )
                    .await?;

                logging::log_error(&format!(
                    "[QUEUE] ❌ Create {} #{} failed (try {}): {}",
                    item.action,
                    item.id,
                    item.try_count + 1,
                    message
                ));
                Ok(ProcessOutcome::Failed(message))
            }
        }
    }

    /// Deletes a processed row once its write is confirmed on the ledger,
    /// otherwise processes it again and moves `processed_at` forward.
    pub async fn clear(&self, item: &QueueItem) -> Result<ClearOutcome, QueueError> {
        let params = QueueParams::from_json(&item.params)?;
        let entry_hash = params.entry_hash()?;
        let ack = self.ledger.entry_ack(&entry_hash, &params.chain_id).await?;

        if ack.status.to_status() == Status::Completed {
            self.store.delete_queue_item(item.id).await?;
            logging::log_debug(&format!(
                "[CLEANER] Cleared #{} ({} {})",
                item.id, item.action, entry_hash
            ));
            return Ok(ClearOutcome::Deleted);
        }

        logging::log_warning(&format!(
            "[CLEANER] {} {} not confirmed yet, processing #{} again",
            item.action, entry_hash, item.id
        ));

        let outcome = self.process(item).await?;
        self.store
            .update_queue_item(
                item.id,
                &QueueItemPatch {
                    processed_at: Some(Utc::now()),
                    ..QueueItemPatch::default()
                },
            )
            .await?;

        Ok(ClearOutcome::Reprocessed(outcome))
    }

    async fn commit(&self, item: &QueueItem) -> Result<CommittedWrite, QueueError> {
        let params = QueueParams::from_json(&item.params)?;
        let ext_ids = params.decode_ext_ids()?;
        let content = params.decode_content()?;

        match item.action {
            QueueAction::Chain => {
                let chain = Chain::new_local(ext_ids, content);
                let first_entry = chain.first_entry()?.map(|entry| entry.entry_hash);
                let ledger_hash = self.wallet.commit_reveal_chain(&chain).await?;

                Ok(CommittedWrite {
                    ledger_hash,
                    chain_id: Some(chain.chain_id),
                    entry_hash: first_entry,
                })
            }
            QueueAction::Entry => {
                let entry = Entry::new(&params.chain_id, ext_ids, content, Status::Queue)?;
                let ledger_hash = self.wallet.commit_reveal_entry(&entry).await?;

                Ok(CommittedWrite {
                    ledger_hash,
                    chain_id: None,
                    entry_hash: Some(entry.entry_hash),
                })
            }
        }
    }

    /// Moves the local rows of a committed write to processing.
    /// Failures are logged and never retried.
    async fn mark_processing(&self, item: &QueueItem, write: &CommittedWrite) {
        if let Some(chain_id) = &write.chain_id {
            if let Err(e) = self.mark_chain_processing(chain_id).await {
                logging::log_warning(&format!(
                    "[QUEUE] #{} committed but chain {} status not updated: {}",
                    item.id, chain_id, e
                ));
            }
        }

        if let Some(entry_hash) = &write.entry_hash {
            if let Err(e) = self
                .store
                .update_entry_status(entry_hash, Status::Processing)
                .await
            {
                logging::log_warning(&format!(
                    "[QUEUE] #{} committed but entry {} status not updated: {}",
                    item.id, entry_hash, e
                ));
            }
        }
    }

    async fn mark_chain_processing(&self, chain_id: &str) -> Result<(), QueueError> {
        if let Some(chain) = self.store.get_chain(chain_id).await? {
            let status = Status::merge(chain.status, Status::Processing);
            if status != chain.status {
                self.store
                    .update_chain(chain_id, &ChainPatch::new().status(status))
                    .await?;
            }
        }
        Ok(())
    }
}

/// What a successful commit+reveal touched locally
struct CommittedWrite {
    ledger_hash: String,
    chain_id: Option<String>,
    entry_hash: Option<String>,
}
