use std::error::Error;
use std::fmt;

/// factomd code for a chain without a head
pub const MISSING_CHAIN_HEAD: i64 = -32009;
/// factomd code for an unknown entry or block
pub const NOT_FOUND: i64 = -32008;

/// Represents errors that can occur in ledger RPC operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Transport failure (connection refused, timeout, bad HTTP status)
    NetworkError(String),
    /// JSON-RPC error object returned by the node
    RpcError { code: i64, message: String },
    /// Response did not have the expected shape
    ParseError(String),
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::RpcError { code, .. } if *code == MISSING_CHAIN_HEAD || *code == NOT_FOUND
        )
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            LedgerError::RpcError { code, message } => {
                write!(f, "RPC error {}: {}", code, message)
            }
            LedgerError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl Error for LedgerError {}

impl From<reqwest::Error> for LedgerError {
    fn from(error: reqwest::Error) -> Self {
        LedgerError::NetworkError(error.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::ParseError(error.to_string())
    }
}
