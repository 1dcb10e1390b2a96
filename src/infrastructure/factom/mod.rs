//! Read access to the ledger

pub mod client;
mod error;
pub mod rpc;
pub mod types;

pub use client::FactomdClient;
pub use error::{LedgerError, MISSING_CHAIN_HEAD, NOT_FOUND};
pub use rpc::JsonRpcClient;
pub use types::{
    AckStatus, ChainHead, CurrentMinute, EBlockEntry, EBlockHeader, EntryAck, LedgerEBlock,
    LedgerEntry,
};

use async_trait::async_trait;

/// Read-only view of the ledger used by the sync engine
#[async_trait]
pub trait LedgerClient: Send + Sync + std::fmt::Debug {
    /// Newest entry block of a chain and whether it is still being processed
    async fn chain_head(&self, chain_id: &str) -> Result<ChainHead, LedgerError>;

    /// Entry block by KeyMR
    async fn entry_block(&self, key_mr: &str) -> Result<LedgerEBlock, LedgerError>;

    /// Entry by hash
    async fn entry(&self, entry_hash: &str) -> Result<LedgerEntry, LedgerError>;

    /// Minute within the current directory block and the directory block height
    async fn current_minute(&self) -> Result<CurrentMinute, LedgerError>;

    /// Acknowledgement state of an entry
    async fn entry_ack(&self, entry_hash: &str, chain_id: &str) -> Result<EntryAck, LedgerError>;
}
