use std::error::Error;
use std::fmt;

use crate::infrastructure::factom::LedgerError;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::wallet::WalletError;

/// Error type for malformed domain data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Not a 32-byte hex hash
    InvalidHash(String),
    /// Content plus ext ids reach the ledger limit
    EntryTooLarge(usize),
    /// Bad base64 or JSON
    InvalidEncoding(String),
    /// A search needs at least one ext id
    MissingExtIds,
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidHash(hash) => write!(f, "Invalid hash: {}", hash),
            ModelError::EntryTooLarge(size) => {
                write!(f, "Entry cannot be larger than 10KB (got {} bytes)", size)
            }
            ModelError::InvalidEncoding(msg) => write!(f, "Invalid encoding: {}", msg),
            ModelError::MissingExtIds => write!(f, "At least one ext id is required"),
        }
    }
}

impl Error for ModelError {}

/// Error type for chain synchronization (walker, pool, poller)
#[derive(Debug)]
pub enum SyncError {
    LedgerError(LedgerError),
    DbError(DbError),
    ModelError(ModelError),
    /// The chain is not anchored in a directory block yet
    ChainNotReady(String),
    /// The worker pool no longer accepts jobs
    PoolClosed,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::LedgerError(e) => write!(f, "Ledger error: {}", e),
            SyncError::DbError(e) => write!(f, "Database error: {}", e),
            SyncError::ModelError(e) => write!(f, "Data error: {}", e),
            SyncError::ChainNotReady(chain_id) => {
                write!(f, "Chain {} has not been processed on Factom yet", chain_id)
            }
            SyncError::PoolClosed => write!(f, "Worker pool is closed"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SyncError::LedgerError(e) => Some(e),
            SyncError::DbError(e) => Some(e),
            SyncError::ModelError(e) => Some(e),
            SyncError::ChainNotReady(_) | SyncError::PoolClosed => None,
        }
    }
}

impl From<LedgerError> for SyncError {
    fn from(error: LedgerError) -> Self {
        SyncError::LedgerError(error)
    }
}

impl From<DbError> for SyncError {
    fn from(error: DbError) -> Self {
        SyncError::DbError(error)
    }
}

impl From<ModelError> for SyncError {
    fn from(error: ModelError) -> Self {
        SyncError::ModelError(error)
    }
}

/// Error type for write queue operations
#[derive(Debug)]
pub enum QueueError {
    DbError(DbError),
    LedgerError(LedgerError),
    WalletError(WalletError),
    /// Stored params could not be decoded
    InvalidParams(ModelError),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::DbError(e) => write!(f, "Database error: {}", e),
            QueueError::LedgerError(e) => write!(f, "Ledger error: {}", e),
            QueueError::WalletError(e) => write!(f, "Wallet error: {}", e),
            QueueError::InvalidParams(e) => write!(f, "Invalid queue params: {}", e),
        }
    }
}

impl Error for QueueError {}

impl From<DbError> for QueueError {
    fn from(error: DbError) -> Self {
        QueueError::DbError(error)
    }
}

impl From<LedgerError> for QueueError {
    fn from(error: LedgerError) -> Self {
        QueueError::LedgerError(error)
    }
}

impl From<WalletError> for QueueError {
    fn from(error: WalletError) -> Self {
        QueueError::WalletError(error)
    }
}

impl From<ModelError> for QueueError {
    fn from(error: ModelError) -> Self {
        QueueError::InvalidParams(error)
    }
}

/// Error type for client-facing chain and entry operations
#[derive(Debug)]
pub enum ServiceError {
    ChainExists(String),
    ChainNotFound(String),
    InvalidInput(ModelError),
    LedgerError(LedgerError),
    DbError(DbError),
    QueueError(QueueError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::ChainExists(chain_id) => write!(f, "Chain {} exists", chain_id),
            ServiceError::ChainNotFound(chain_id) => write!(f, "Chain {} not found", chain_id),
            ServiceError::InvalidInput(e) => write!(f, "{}", e),
            ServiceError::LedgerError(e) => write!(f, "Ledger error: {}", e),
            ServiceError::DbError(e) => write!(f, "Database error: {}", e),
            ServiceError::QueueError(e) => write!(f, "Queue error: {}", e),
        }
    }
}

impl Error for ServiceError {}

impl From<ModelError> for ServiceError {
    fn from(error: ModelError) -> Self {
        ServiceError::InvalidInput(error)
    }
}

impl From<LedgerError> for ServiceError {
    fn from(error: LedgerError) -> Self {
        ServiceError::LedgerError(error)
    }
}

impl From<DbError> for ServiceError {
    fn from(error: DbError) -> Self {
        ServiceError::DbError(error)
    }
}

impl From<QueueError> for ServiceError {
    fn from(error: QueueError) -> Self {
        ServiceError::QueueError(error)
    }
}
