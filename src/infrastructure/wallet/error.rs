use std::error::Error;
use std::fmt;

use crate::domain::errors::ModelError;
use crate::infrastructure::factom::LedgerError;

/// Represents errors that can occur while paying for ledger writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// No Entry Credit address configured
    NotConfigured,
    /// EC balance below the cost of the write
    InsufficientFunds { required: u64, balance: i64 },
    /// factomd or walletd call failed
    LedgerError(LedgerError),
    /// The payload cannot be written
    InvalidEntry(ModelError),
    /// walletd returned an unusable commit/reveal pair
    ComposeError(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::NotConfigured => write!(f, "EC address is not configured"),
            WalletError::InsufficientFunds { required, balance } => write!(
                f,
                "Not enough Entry Credits: required {}, balance {}",
                required, balance
            ),
            WalletError::LedgerError(e) => write!(f, "{}", e),
            WalletError::InvalidEntry(e) => write!(f, "{}", e),
            WalletError::ComposeError(msg) => write!(f, "Compose error: {}", msg),
        }
    }
}

impl Error for WalletError {}

impl From<LedgerError> for WalletError {
    fn from(error: LedgerError) -> Self {
        WalletError::LedgerError(error)
    }
}

impl From<ModelError> for WalletError {
    fn from(error: ModelError) -> Self {
        WalletError::InvalidEntry(error)
    }
}
