//! Storage seam used by the sync engine and the write queue

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::models::{
    Chain, ChainFilter, ChainPatch, EBlock, Entry, NewQueueItem, QueueAction, QueueItem,
    QueueItemPatch, Status,
};
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::repositories::Repositories;

#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), DbError>;

    async fn get_chain(&self, chain_id: &str) -> Result<Option<Chain>, DbError>;
    /// Inserting an existing chain id is a no-op
    async fn create_chain(&self, chain: &Chain) -> Result<(), DbError>;
    async fn update_chain(&self, chain_id: &str, patch: &ChainPatch) -> Result<(), DbError>;
    async fn find_chains(&self, filter: &ChainFilter) -> Result<Vec<Chain>, DbError>;
    /// Atomically mark an unclaimed unsynced chain as sent to the pool.
    /// Returns true for exactly one caller.
    async fn claim_chain_for_pool(&self, chain_id: &str) -> Result<bool, DbError>;
    /// Clear worker claims on every chain that is not synced
    async fn reset_unsynced_chains(&self) -> Result<u64, DbError>;
    /// Binding a chain to a user twice is a no-op
    async fn bind_chain_to_user(&self, user_id: i32, chain_id: &str) -> Result<(), DbError>;
    /// Chains bound to a user, newest first. A non-empty `ext_ids` keeps the
    /// chains whose ext ids contain every one of them.
    async fn user_chains(
        &self,
        user_id: i32,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Chain>, DbError>;

    async fn get_entry(&self, entry_hash: &str) -> Result<Option<Entry>, DbError>;
    /// Insert or refresh an entry; a completed status is never downgraded
    async fn upsert_entry(&self, entry: &Entry) -> Result<(), DbError>;
    async fn update_entry_status(&self, entry_hash: &str, status: Status) -> Result<(), DbError>;
    async fn chain_entries(
        &self,
        chain_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Entry>, u64), DbError>;
    /// Entries of a chain whose ext ids contain every one of `ext_ids`
    async fn search_chain_entries(
        &self,
        chain_id: &str,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Entry>, DbError>;

    async fn create_eblock(&self, eblock: &EBlock) -> Result<(), DbError>;
    async fn bind_entry_to_eblock(&self, entry_hash: &str, key_mr: &str) -> Result<(), DbError>;

    async fn find_queue_item(
        &self,
        user_id: i32,
        action: QueueAction,
        params: &str,
    ) -> Result<Option<QueueItem>, DbError>;
    async fn create_queue_item(&self, item: &NewQueueItem) -> Result<QueueItem, DbError>;
    async fn update_queue_item(&self, id: i32, patch: &QueueItemPatch) -> Result<(), DbError>;
    async fn queue_due(&self, now: DateTime<Utc>) -> Result<Vec<QueueItem>, DbError>;
    async fn queue_to_clear(&self, before: DateTime<Utc>) -> Result<Vec<QueueItem>, DbError>;
    async fn delete_queue_item(&self, id: i32) -> Result<(), DbError>;
    async fn user_queue(&self, user_id: i32) -> Result<Vec<QueueItem>, DbError>;
}

#[async_trait]
impl Store for Repositories {
    async fn ping(&self) -> Result<(), DbError> {
        self.chain
            .connection()
            .ping()
            .await
            .map_err(|e| DbError::Unavailable(e.to_string()))
    }

    async fn get_chain(&self, chain_id: &str) -> Result<Option<Chain>, DbError> {
        self.chain.get(chain_id).await
    }

    async fn create_chain(&self, chain: &Chain) -> Result<(), DbError> {
        self.chain.create(chain).await
    }

    async fn update_chain(&self, chain_id: &str, patch: &ChainPatch) -> Result<(), DbError> {
        self.chain.update(chain_id, patch).await
    }

    async fn find_chains(&self, filter: &ChainFilter) -> Result<Vec<Chain>, DbError> {
        self.chain.find(filter).await
    }

    async fn claim_chain_for_pool(&self, chain_id: &str) -> Result<bool, DbError> {
        self.chain.claim_for_pool(chain_id).await
    }

    async fn reset_unsynced_chains(&self) -> Result<u64, DbError> {
        self.chain.reset_unsynced().await
    }

    async fn bind_chain_to_user(&self, user_id: i32, chain_id: &str) -> Result<(), DbError> {
        self.chain.bind_to_user(user_id, chain_id).await
    }

    async fn user_chains(
        &self,
        user_id: i32,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Chain>, DbError> {
        self.chain.find_for_user(user_id, ext_ids, status).await
    }

    async fn get_entry(&self, entry_hash: &str) -> Result<Option<Entry>, DbError> {
        self.entry.get(entry_hash).await
    }

    async fn upsert_entry(&self, entry: &Entry) -> Result<(), DbError> {
        self.entry.upsert(entry).await
    }

    async fn update_entry_status(&self, entry_hash: &str, status: Status) -> Result<(), DbError> {
        self.entry.update_status(entry_hash, status).await
    }

    async fn chain_entries(
        &self,
        chain_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Entry>, u64), DbError> {
        self.entry.by_chain(chain_id, limit, offset).await
    }

    async fn search_chain_entries(
        &self,
        chain_id: &str,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Entry>, DbError> {
        self.entry.search(chain_id, ext_ids, status).await
    }

    async fn create_eblock(&self, eblock: &EBlock) -> Result<(), DbError> {
        self.eblock.create(eblock).await
    }

    async fn bind_entry_to_eblock(&self, entry_hash: &str, key_mr: &str) -> Result<(), DbError> {
        self.eblock.bind(entry_hash, key_mr).await
    }

    async fn find_queue_item(
        &self,
        user_id: i32,
        action: QueueAction,
        params: &str,
    ) -> Result<Option<QueueItem>, DbError> {
        self.queue.find_matching(user_id, action, params).await
    }

    async fn create_queue_item(&self, item: &NewQueueItem) -> Result<QueueItem, DbError> {
        self.queue.create(item).await
    }

    async fn update_queue_item(&self, id: i32, patch: &QueueItemPatch) -> Result<(), DbError> {
        self.queue.update(id, patch).await
    }

    async fn queue_due(&self, now: DateTime<Utc>) -> Result<Vec<QueueItem>, DbError> {
        self.queue.due(now).await
    }

    async fn queue_to_clear(&self, before: DateTime<Utc>) -> Result<Vec<QueueItem>, DbError> {
        self.queue.to_clear(before).await
    }

    async fn delete_queue_item(&self, id: i32) -> Result<(), DbError> {
        self.queue.delete(id).await
    }

    async fn user_queue(&self, user_id: i32) -> Result<Vec<QueueItem>, DbError> {
        self.queue.by_user(user_id).await
    }
}
