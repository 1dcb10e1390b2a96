//! In-memory doubles for the store, the ledger and the wallet
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use factom_open_api::domain::models::{
    entry, Chain, ChainFilter, ChainPatch, EBlock, Entry, NewQueueItem, QueueAction, QueueItem,
    QueueItemPatch, Status, WORKER_UNCLAIMED, ZERO_HASH,
};
use factom_open_api::domain::services::{ChainService, EntryService, QueueService};
use factom_open_api::infrastructure::factom::{
    AckStatus, ChainHead, CurrentMinute, EBlockEntry, EBlockHeader, EntryAck, LedgerClient,
    LedgerEBlock, LedgerEntry, LedgerError, NOT_FOUND,
};
use factom_open_api::infrastructure::persistence::{DbError, Store};
use factom_open_api::infrastructure::wallet::{Wallet, WalletError};

pub fn bytes(values: &[&str]) -> Vec<Vec<u8>> {
    values.iter().map(|v| v.as_bytes().to_vec()).collect()
}

// ---------------------------------------------------------------------------
// Store

#[derive(Default)]
struct StoreState {
    chains: Vec<Chain>,
    entries: Vec<Entry>,
    eblocks: HashMap<String, EBlock>,
    bindings: HashSet<(String, String)>,
    user_chains: Vec<(i32, String)>,
    queue: BTreeMap<i32, QueueItem>,
    next_queue_id: i32,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    ping_fails: AtomicBool,
    entry_status_failures: AtomicUsize,
    user_binding_fails: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn chain(&self, chain_id: &str) -> Option<Chain> {
        let state = self.state.lock().unwrap();
        state.chains.iter().find(|c| c.chain_id == chain_id).cloned()
    }

    pub fn entry(&self, entry_hash: &str) -> Option<Entry> {
        let state = self.state.lock().unwrap();
        state.entries.iter().find(|e| e.entry_hash == entry_hash).cloned()
    }

    pub fn entries_of(&self, chain_id: &str) -> Vec<Entry> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .iter()
            .filter(|e| e.chain_id == chain_id)
            .cloned()
            .collect()
    }

    pub fn eblock_count(&self) -> usize {
        self.state.lock().unwrap().eblocks.len()
    }

    pub fn binding_count(&self) -> usize {
        self.state.lock().unwrap().bindings.len()
    }

    pub fn queue_items(&self) -> Vec<QueueItem> {
        self.state.lock().unwrap().queue.values().cloned().collect()
    }

    pub fn put_chain(&self, chain: Chain) {
        let mut state = self.state.lock().unwrap();
        state.chains.retain(|c| c.chain_id != chain.chain_id);
        state.chains.push(chain);
    }

    pub fn set_ping_failure(&self, fails: bool) {
        self.ping_fails.store(fails, Ordering::SeqCst);
    }

    /// Chain ids bound to a user, in binding order
    pub fn chains_of_user(&self, user_id: i32) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .user_chains
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, chain_id)| chain_id.clone())
            .collect()
    }

    pub fn set_user_binding_failure(&self, fails: bool) {
        self.user_binding_fails.store(fails, Ordering::SeqCst);
    }

    /// The next `count` calls to `update_entry_status` fail
    pub fn fail_entry_status_updates(&self, count: usize) {
        self.entry_status_failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DbError> {
        if self.ping_fails.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }

    async fn get_chain(&self, chain_id: &str) -> Result<Option<Chain>, DbError> {
        Ok(self.chain(chain_id))
    }

    async fn create_chain(&self, chain: &Chain) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        if !state.chains.iter().any(|c| c.chain_id == chain.chain_id) {
            state.chains.push(chain.clone());
        }
        Ok(())
    }

    async fn update_chain(&self, chain_id: &str, patch: &ChainPatch) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        if let Some(chain) = state.chains.iter_mut().find(|c| c.chain_id == chain_id) {
            patch.apply(chain);
        }
        Ok(())
    }

    async fn find_chains(&self, filter: &ChainFilter) -> Result<Vec<Chain>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .chains
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn claim_chain_for_pool(&self, chain_id: &str) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        match state.chains.iter_mut().find(|c| c.chain_id == chain_id) {
            Some(chain) if ChainFilter::awaiting_backfill().matches(chain) => {
                chain.sent_to_pool = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reset_unsynced_chains(&self) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        let mut reset = 0;
        for chain in state.chains.iter_mut().filter(|c| !c.is_synced()) {
            chain.worker_id = WORKER_UNCLAIMED;
            chain.sent_to_pool = false;
            reset += 1;
        }
        Ok(reset)
    }

    async fn bind_chain_to_user(&self, user_id: i32, chain_id: &str) -> Result<(), DbError> {
        if self.user_binding_fails.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("connection reset".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        let binding = (user_id, chain_id.to_string());
        if !state.user_chains.contains(&binding) {
            state.user_chains.push(binding);
        }
        Ok(())
    }

    async fn user_chains(
        &self,
        user_id: i32,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Chain>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .user_chains
            .iter()
            .rev()
            .filter(|(user, _)| *user == user_id)
            .filter_map(|(_, chain_id)| state.chains.iter().find(|c| &c.chain_id == chain_id))
            .filter(|c| ext_ids.iter().all(|id| c.ext_ids.contains(id)))
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect())
    }

    async fn get_entry(&self, entry_hash: &str) -> Result<Option<Entry>, DbError> {
        Ok(self.entry(entry_hash))
    }

    async fn upsert_entry(&self, entry: &Entry) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        match state
            .entries
            .iter_mut()
            .find(|e| e.entry_hash == entry.entry_hash)
        {
            Some(stored) => {
                stored.status = Status::merge(stored.status, entry.status);
                if entry.factom_time.is_some() {
                    stored.factom_time = entry.factom_time;
                }
            }
            None => state.entries.push(entry.clone()),
        }
        Ok(())
    }

    async fn update_entry_status(&self, entry_hash: &str, status: Status) -> Result<(), DbError> {
        let pending = self.entry_status_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.entry_status_failures.store(pending - 1, Ordering::SeqCst);
            return Err(DbError::Unavailable("connection reset".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state
            .entries
            .iter_mut()
            .find(|e| e.entry_hash == entry_hash && e.status != Status::Completed)
        {
            entry.status = status;
        }
        Ok(())
    }

    async fn chain_entries(
        &self,
        chain_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Entry>, u64), DbError> {
        let mut entries = self.entries_of(chain_id);
        entries.sort_by_key(|e| e.factom_time);
        let total = entries.len() as u64;
        Ok((
            entries
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            total,
        ))
    }

    async fn search_chain_entries(
        &self,
        chain_id: &str,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Entry>, DbError> {
        let mut entries: Vec<Entry> = self
            .entries_of(chain_id)
            .into_iter()
            .filter(|e| ext_ids.iter().all(|id| e.ext_ids.contains(id)))
            .filter(|e| status.map_or(true, |s| e.status == s))
            .collect();
        entries.sort_by_key(|e| e.factom_time);
        Ok(entries)
    }

    async fn create_eblock(&self, eblock: &EBlock) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        state
            .eblocks
            .entry(eblock.key_mr.clone())
            .or_insert_with(|| eblock.clone());
        Ok(())
    }

    async fn bind_entry_to_eblock(&self, entry_hash: &str, key_mr: &str) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        state
            .bindings
            .insert((entry_hash.to_string(), key_mr.to_string()));
        Ok(())
    }

    async fn find_queue_item(
        &self,
        user_id: i32,
        action: QueueAction,
        params: &str,
    ) -> Result<Option<QueueItem>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .queue
            .values()
            .find(|q| q.user_id == user_id && q.action == action && q.params == params)
            .cloned())
    }

    async fn create_queue_item(&self, item: &NewQueueItem) -> Result<QueueItem, DbError> {
        let mut state = self.state.lock().unwrap();
        state.next_queue_id += 1;
        let created = QueueItem {
            id: state.next_queue_id,
            user_id: item.user_id,
            action: item.action,
            params: item.params.clone(),
            result: None,
            error: None,
            try_count: 0,
            processed_at: None,
            next_try_at: None,
            created_at: Utc::now(),
        };
        state.queue.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_queue_item(&self, id: i32, patch: &QueueItemPatch) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        if let Some(item) = state.queue.get_mut(&id) {
            patch.apply(item);
        }
        Ok(())
    }

    async fn queue_due(&self, now: DateTime<Utc>) -> Result<Vec<QueueItem>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .queue
            .values()
            .filter(|q| q.is_due(now))
            .cloned()
            .collect())
    }

    async fn queue_to_clear(&self, before: DateTime<Utc>) -> Result<Vec<QueueItem>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .queue
            .values()
            .filter(|q| q.is_clearable(before))
            .cloned()
            .collect())
    }

    async fn delete_queue_item(&self, id: i32) -> Result<(), DbError> {
        self.state.lock().unwrap().queue.remove(&id);
        Ok(())
    }

    async fn user_queue(&self, user_id: i32) -> Result<Vec<QueueItem>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .queue
            .values()
            .rev()
            .filter(|q| q.user_id == user_id)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Ledger

const GENESIS_TIME: i64 = 1_600_000_000;

#[derive(Debug)]
struct LedgerState {
    heads: HashMap<String, ChainHead>,
    blocks: HashMap<String, LedgerEBlock>,
    entries: HashMap<String, LedgerEntry>,
    acks: HashMap<String, AckStatus>,
    minute: CurrentMinute,
    failing_blocks: HashSet<String>,
    block_fetches: Vec<String>,
    next_key: u64,
}

#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LedgerState {
                heads: HashMap::new(),
                blocks: HashMap::new(),
                entries: HashMap::new(),
                acks: HashMap::new(),
                minute: CurrentMinute {
                    minute: 0,
                    directory_block_height: 1,
                },
                failing_blocks: HashSet::new(),
                block_fetches: Vec::new(),
                next_key: 0,
            }),
        })
    }

    /// Anchors a new chain in a genesis block holding only its first entry
    pub fn publish_chain(&self, ext_ids: Vec<Vec<u8>>, content: &[u8]) -> (String, String) {
        let chain_id = entry::chain_id(&ext_ids);
        let key_mr = self.append_block(&chain_id, vec![(ext_ids, content.to_vec())]);
        (chain_id, key_mr)
    }

    /// Appends an entry block to a chain and makes it the head. Returns its KeyMR.
    pub fn append_block(&self, chain_id: &str, entries: Vec<(Vec<Vec<u8>>, Vec<u8>)>) -> String {
        let mut state = self.state.lock().unwrap();

        state.next_key += 1;
        let key_mr = format!("{:064x}", state.next_key);

        let prev = state
            .heads
            .get(chain_id)
            .and_then(|h| h.head.clone())
            .unwrap_or_else(|| ZERO_HASH.to_string());
        let sequence = match state.blocks.get(&prev) {
            Some(block) => block.header.block_sequence_number + 1,
            None => 0,
        };
        let timestamp = GENESIS_TIME + sequence * 600;

        let mut listed = Vec::new();
        for (i, (ext_ids, content)) in entries.into_iter().enumerate() {
            let entry_hash = entry::entry_hash(chain_id, &ext_ids, &content).unwrap();
            state.acks.insert(entry_hash.clone(), AckStatus::DBlockConfirmed);
            state.entries.insert(
                entry_hash.clone(),
                LedgerEntry {
                    chain_id: chain_id.to_string(),
                    ext_ids,
                    content,
                },
            );
            listed.push(EBlockEntry {
                entry_hash,
                timestamp: timestamp + 60 * i as i64,
            });
        }

        state.blocks.insert(
            key_mr.clone(),
            LedgerEBlock {
                header: EBlockHeader {
                    block_sequence_number: sequence,
                    chain_id: chain_id.to_string(),
                    prev_key_mr: prev,
                    timestamp,
                    db_height: 100 + sequence,
                },
                entries: listed,
            },
        );
        state.heads.insert(
            chain_id.to_string(),
            ChainHead {
                head: Some(key_mr.clone()),
                in_process_list: false,
            },
        );

        key_mr
    }

    /// The chain was acknowledged but has no entry block yet
    pub fn set_in_process(&self, chain_id: &str) {
        self.state.lock().unwrap().heads.insert(
            chain_id.to_string(),
            ChainHead {
                head: None,
                in_process_list: true,
            },
        );
    }

    pub fn set_ack(&self, entry_hash: &str, status: AckStatus) {
        self.state
            .lock()
            .unwrap()
            .acks
            .insert(entry_hash.to_string(), status);
    }

    pub fn set_minute(&self, minute: i64, directory_block_height: i64) {
        self.state.lock().unwrap().minute = CurrentMinute {
            minute,
            directory_block_height,
        };
    }

    pub fn fail_block(&self, key_mr: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_blocks
            .insert(key_mr.to_string());
    }

    pub fn heal_block(&self, key_mr: &str) {
        self.state.lock().unwrap().failing_blocks.remove(key_mr);
    }

    /// KeyMRs requested through `entry_block`, in order
    pub fn block_fetches(&self) -> Vec<String> {
        self.state.lock().unwrap().block_fetches.clone()
    }

    pub fn head(&self, chain_id: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .heads
            .get(chain_id)
            .and_then(|h| h.head.clone())
    }
}

fn not_found(what: &str) -> LedgerError {
    LedgerError::RpcError {
        code: NOT_FOUND,
        message: format!("{} not found", what),
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn chain_head(&self, chain_id: &str) -> Result<ChainHead, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.heads.get(chain_id).cloned().unwrap_or_default())
    }

    async fn entry_block(&self, key_mr: &str) -> Result<LedgerEBlock, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.block_fetches.push(key_mr.to_string());
        if state.failing_blocks.contains(key_mr) {
            return Err(LedgerError::NetworkError("connection refused".to_string()));
        }
        state
            .blocks
            .get(key_mr)
            .cloned()
            .ok_or_else(|| not_found("Block"))
    }

    async fn entry(&self, entry_hash: &str) -> Result<LedgerEntry, LedgerError> {
        let state = self.state.lock().unwrap();
        state
            .entries
            .get(entry_hash)
            .cloned()
            .ok_or_else(|| not_found("Entry"))
    }

    async fn current_minute(&self) -> Result<CurrentMinute, LedgerError> {
        Ok(self.state.lock().unwrap().minute)
    }

    async fn entry_ack(&self, entry_hash: &str, _chain_id: &str) -> Result<EntryAck, LedgerError> {
        let state = self.state.lock().unwrap();
        let status = state
            .acks
            .get(entry_hash)
            .copied()
            .unwrap_or(AckStatus::Unknown);
        Ok(EntryAck {
            status,
            block_date: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Wallet

#[derive(Debug, Default)]
struct WalletState {
    failure: Option<WalletError>,
    chains: Vec<String>,
    entries: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MockWallet {
    state: Mutex<WalletState>,
}

impl MockWallet {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_with(&self, error: WalletError) {
        self.state.lock().unwrap().failure = Some(error);
    }

    pub fn succeed(&self) {
        self.state.lock().unwrap().failure = None;
    }

    pub fn committed_chains(&self) -> Vec<String> {
        self.state.lock().unwrap().chains.clone()
    }

    pub fn committed_entries(&self) -> Vec<String> {
        self.state.lock().unwrap().entries.clone()
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn commit_reveal_entry(&self, entry: &Entry) -> Result<String, WalletError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = &state.failure {
            return Err(e.clone());
        }
        state.entries.push(entry.entry_hash.clone());
        Ok(entry.entry_hash.clone())
    }

    async fn commit_reveal_chain(&self, chain: &Chain) -> Result<String, WalletError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = &state.failure {
            return Err(e.clone());
        }
        state.chains.push(chain.chain_id.clone());
        Ok(chain.chain_id.clone())
    }

    async fn balance(&self) -> Result<i64, WalletError> {
        Ok(1000)
    }
}

// ---------------------------------------------------------------------------
// Wiring

pub const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Services wired to fresh doubles
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<MockLedger>,
    pub wallet: Arc<MockWallet>,
    pub queue: QueueService,
    pub chains: ChainService,
    pub entries: EntryService,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let ledger = MockLedger::new();
        let wallet = MockWallet::new();

        let store_dyn: Arc<dyn Store> = store.clone();
        let ledger_dyn: Arc<dyn LedgerClient> = ledger.clone();
        let wallet_dyn: Arc<dyn Wallet> = wallet.clone();

        let queue = QueueService::new(
            store_dyn.clone(),
            ledger_dyn.clone(),
            wallet_dyn,
            RETRY_DELAY,
        );
        let chains = ChainService::new(store_dyn.clone(), ledger_dyn.clone(), queue.clone());
        let entries = EntryService::new(store_dyn, ledger_dyn, queue.clone());

        Self {
            store,
            ledger,
            wallet,
            queue,
            chains,
            entries,
        }
    }

    pub fn store_dyn(&self) -> Arc<dyn Store> {
        self.store.clone()
    }

    pub fn ledger_dyn(&self) -> Arc<dyn LedgerClient> {
        self.ledger.clone()
    }
}
