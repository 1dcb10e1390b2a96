//! Paid writes to the ledger

mod error;
pub mod walletd;

pub use error::WalletError;
pub use walletd::WalletdWallet;

use async_trait::async_trait;

use crate::domain::models::{Chain, Entry};

/// Funding wallet performing commit+reveal
#[async_trait]
pub trait Wallet: Send + Sync + std::fmt::Debug {
    /// Writes an entry into an existing chain, returning its entry hash
    async fn commit_reveal_entry(&self, entry: &Entry) -> Result<String, WalletError>;

    /// Opens a chain with its first entry, returning the chain id
    async fn commit_reveal_chain(&self, chain: &Chain) -> Result<String, WalletError>;

    /// Entry Credit balance of the funding address
    async fn balance(&self) -> Result<i64, WalletError>;
}
