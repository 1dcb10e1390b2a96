use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::ModelError;
use crate::domain::models::entry::{self, Entry};
use crate::domain::models::Status;

/// `worker_id` of a chain no worker holds
pub const WORKER_UNCLAIMED: i32 = -1;
/// `worker_id` of a chain whose backfill has finished
pub const WORKER_FINISHED: i32 = -2;

/// Represents a chain mirrored in the local store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Hash of the first entry's ext ids
    pub chain_id: String,
    /// Ext ids of the first entry
    pub ext_ids: Vec<Vec<u8>>,
    /// First entry's content, kept so the chain can be committed again
    pub content: Option<Vec<u8>>,
    pub status: Status,
    /// Whether the history back to genesis is stored; `None` when unknown
    pub synced: Option<bool>,
    /// Oldest entry block fetched so far (backfill resume point)
    pub earliest_entry_block: Option<String>,
    /// Newest entry block known locally
    pub latest_entry_block: Option<String>,
    /// -1 unclaimed, -2 finished, otherwise the id of the worker holding it
    pub worker_id: i32,
    pub sent_to_pool: bool,
    pub factom_time: Option<DateTime<Utc>>,
}

impl Chain {
    /// A chain submitted through this gateway, not yet on the ledger
    pub fn new_local(ext_ids: Vec<Vec<u8>>, content: Vec<u8>) -> Self {
        Self {
            chain_id: entry::chain_id(&ext_ids),
            ext_ids,
            content: Some(content),
            status: Status::Queue,
            synced: Some(false),
            earliest_entry_block: None,
            latest_entry_block: None,
            worker_id: WORKER_UNCLAIMED,
            sent_to_pool: false,
            factom_time: Some(Utc::now()),
        }
    }

    /// A chain first seen on the ledger; its history is filled in by backfill
    pub fn discovered(chain_id: &str, status: Status, latest_entry_block: Option<String>) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            ext_ids: Vec::new(),
            content: None,
            status,
            synced: Some(false),
            earliest_entry_block: None,
            latest_entry_block,
            worker_id: WORKER_UNCLAIMED,
            sent_to_pool: false,
            factom_time: None,
        }
    }

    pub fn is_synced(&self) -> bool {
        self.synced == Some(true)
    }

    /// The entry that opens this chain, if its payload is known
    pub fn first_entry(&self) -> Result<Option<Entry>, ModelError> {
        match &self.content {
            Some(content) => Entry::new(
                &self.chain_id,
                self.ext_ids.clone(),
                content.clone(),
                self.status,
            )
            .map(|e| Some(e.with_factom_time(self.factom_time))),
            None => Ok(None),
        }
    }
}

/// Explicit field list for a partial chain update; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainPatch {
    pub ext_ids: Option<Vec<Vec<u8>>>,
    pub status: Option<Status>,
    pub synced: Option<bool>,
    pub earliest_entry_block: Option<String>,
    pub latest_entry_block: Option<String>,
    pub worker_id: Option<i32>,
    pub sent_to_pool: Option<bool>,
    pub factom_time: Option<DateTime<Utc>>,
}

impl ChainPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ext_ids(mut self, ext_ids: Vec<Vec<u8>>) -> Self {
        self.ext_ids = Some(ext_ids);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn synced(mut self, synced: bool) -> Self {
        self.synced = Some(synced);
        self
    }

    pub fn earliest_entry_block(mut self, keymr: &str) -> Self {
        self.earliest_entry_block = Some(keymr.to_string());
        self
    }

    pub fn latest_entry_block(mut self, keymr: &str) -> Self {
        self.latest_entry_block = Some(keymr.to_string());
        self
    }

    pub fn worker_id(mut self, worker_id: i32) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    pub fn sent_to_pool(mut self, sent_to_pool: bool) -> Self {
        self.sent_to_pool = Some(sent_to_pool);
        self
    }

    pub fn factom_time(mut self, factom_time: DateTime<Utc>) -> Self {
        self.factom_time = Some(factom_time);
        self
    }

    /// Release a backfill claim so the scanner offers the chain again
    pub fn release_claim() -> Self {
        Self::new().worker_id(WORKER_UNCLAIMED).sent_to_pool(false)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(&self, chain: &mut Chain) {
        if let Some(ext_ids) = &self.ext_ids {
            chain.ext_ids = ext_ids.clone();
        }
        if let Some(status) = self.status {
            chain.status = status;
        }
        if let Some(synced) = self.synced {
            chain.synced = Some(synced);
        }
        if let Some(keymr) = &self.earliest_entry_block {
            chain.earliest_entry_block = Some(keymr.clone());
        }
        if let Some(keymr) = &self.latest_entry_block {
            chain.latest_entry_block = Some(keymr.clone());
        }
        if let Some(worker_id) = self.worker_id {
            chain.worker_id = worker_id;
        }
        if let Some(sent_to_pool) = self.sent_to_pool {
            chain.sent_to_pool = sent_to_pool;
        }
        if let Some(factom_time) = self.factom_time {
            chain.factom_time = Some(factom_time);
        }
    }
}

/// Equality predicate over chain columns; `None` matches anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainFilter {
    pub status: Option<Status>,
    pub synced: Option<bool>,
    pub worker_id: Option<i32>,
    pub sent_to_pool: Option<bool>,
}

impl ChainFilter {
    /// Chains waiting for a backfill worker
    pub fn awaiting_backfill() -> Self {
        Self {
            status: None,
            synced: Some(false),
            worker_id: Some(WORKER_UNCLAIMED),
            sent_to_pool: Some(false),
        }
    }

    pub fn with_status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn matches(&self, chain: &Chain) -> bool {
        self.status.map_or(true, |s| chain.status == s)
            && self.synced.map_or(true, |s| chain.synced == Some(s))
            && self.worker_id.map_or(true, |w| chain.worker_id == w)
            && self.sent_to_pool.map_or(true, |s| chain.sent_to_pool == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_writes_zero_values() {
        let mut chain = Chain::new_local(vec![b"a".to_vec()], b"b".to_vec());
        chain.worker_id = 3;
        chain.sent_to_pool = true;

        ChainPatch::release_claim().apply(&mut chain);
        assert_eq!(chain.worker_id, WORKER_UNCLAIMED);
        assert!(!chain.sent_to_pool);

        ChainPatch::new().worker_id(0).apply(&mut chain);
        assert_eq!(chain.worker_id, 0);
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let chain = Chain::new_local(vec![b"a".to_vec()], b"b".to_vec());
        let mut patched = chain.clone();
        let patch = ChainPatch::new();

        assert!(patch.is_empty());
        patch.apply(&mut patched);
        assert_eq!(chain, patched);
    }

    #[test]
    fn test_awaiting_backfill_filter() {
        let filter = ChainFilter::awaiting_backfill();
        let mut chain = Chain::discovered("ab", Status::Completed, None);
        assert!(filter.matches(&chain));

        chain.sent_to_pool = true;
        assert!(!filter.matches(&chain));

        chain.sent_to_pool = false;
        chain.synced = None;
        assert!(!filter.matches(&chain));
    }

    #[test]
    fn test_first_entry_shares_chain_id() {
        let chain = Chain::new_local(vec![b"a".to_vec()], b"b".to_vec());
        let entry = chain.first_entry().unwrap().unwrap();

        assert_eq!(entry.chain_id, chain.chain_id);
        assert_eq!(entry.content, b"b".to_vec());
        assert!(Chain::discovered(&chain.chain_id, Status::Completed, None)
            .first_entry()
            .unwrap()
            .is_none());
    }
}
