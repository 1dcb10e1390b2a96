//! Entry block walker
//!
//! Follows the `PrevKeyMR` links of a chain backwards, mirroring every block and
//! its entries into the store. Cursors move only after a block is fully stored,
//! so an interrupted walk resumes at the last complete block.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::SyncError;
use crate::domain::models::{ChainPatch, Entry, Status, ZERO_HASH};
use crate::infrastructure::factom::LedgerClient;
use crate::infrastructure::persistence::Store;
use crate::utils::logging;

/// Entries of one block fetched at the same time
const ENTRY_FETCH_CONCURRENCY: usize = 8;

#[derive(Clone)]
pub struct EntryBlockWalker {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
}

impl fmt::Debug for EntryBlockWalker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryBlockWalker")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl EntryBlockWalker {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { store, ledger }
    }

    /// Walks from `from` back to `to`, which is never fetched.
    ///
    /// With `track_earliest` the chain's `earliest_entry_block` follows the walk.
    /// Reaching the genesis block marks the chain synced. Returns the number of
    /// blocks stored.
    pub async fn walk(
        &self,
        chain_id: &str,
        from: &str,
        to: &str,
        track_earliest: bool,
    ) -> Result<usize, SyncError> {
        let mut key_mr = from.to_string();
        let mut walked = 0;

        while key_mr != to && key_mr != ZERO_HASH {
            key_mr = self.store_block(chain_id, &key_mr, track_earliest).await?;
            walked += 1;
        }

        logging::log_debug(&format!(
            "[WALKER] Chain {}: {} entry blocks stored",
            chain_id, walked
        ));

        Ok(walked)
    }

    /// Stores one block with its entries and returns its `PrevKeyMR`
    async fn store_block(
        &self,
        chain_id: &str,
        key_mr: &str,
        track_earliest: bool,
    ) -> Result<String, SyncError> {
        logging::log_debug(&format!("[WALKER] Fetching entry block {}", key_mr));

        let block = self.ledger.entry_block(key_mr).await?;
        let eblock = block.to_eblock(key_mr);
        self.store.create_eblock(&eblock).await?;

        let listed: Vec<(String, Option<DateTime<Utc>>)> = block
            .entries
            .iter()
            .map(|listed| (listed.entry_hash.clone(), block.entry_time(listed)))
            .collect();

        let fetches = listed.into_iter().map(|(entry_hash, factom_time)| {
            let ledger = self.ledger.clone();
            let chain_id = chain_id.to_string();
            async move {
                fetch_entry(ledger.as_ref(), &chain_id, &entry_hash)
                    .await
                    .map(|entry| entry.with_factom_time(factom_time))
            }
        });
        let entries: Vec<Result<Entry, SyncError>> = stream::iter(fetches)
            .buffered(ENTRY_FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut first_entry = None;
        for entry in entries {
            let entry = entry?;
            self.store.upsert_entry(&entry).await?;
            self.store
                .bind_entry_to_eblock(&entry.entry_hash, key_mr)
                .await?;

            if first_entry.is_none() {
                first_entry = Some(entry);
            }
        }

        if track_earliest {
            self.store
                .update_chain(chain_id, &ChainPatch::new().earliest_entry_block(key_mr))
                .await?;
        }

        if eblock.is_genesis() {
            let mut patch = ChainPatch::new().synced(true);
            if let Some(first) = first_entry {
                patch = patch.ext_ids(first.ext_ids);
                if let Some(time) = first.factom_time {
                    patch = patch.factom_time(time);
                }
            }
            self.store.update_chain(chain_id, &patch).await?;

            logging::log_info(&format!(
                "[WALKER] ✅ Chain {} reached its genesis block",
                chain_id
            ));
        }

        Ok(eblock.prev_key_mr)
    }
}

async fn fetch_entry(
    ledger: &dyn LedgerClient,
    chain_id: &str,
    entry_hash: &str,
) -> Result<Entry, SyncError> {
    logging::log_debug(&format!("[WALKER] Fetching entry {}", entry_hash));

    let fetched = ledger.entry(entry_hash).await?;

    Ok(Entry {
        entry_hash: entry_hash.to_string(),
        chain_id: chain_id.to_string(),
        ext_ids: fetched.ext_ids,
        content: fetched.content,
        status: Status::Completed,
        factom_time: None,
    })
}
