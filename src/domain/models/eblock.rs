use serde::{Deserialize, Serialize};

use crate::domain::models::ZERO_HASH;

/// An entry block: the entries a chain received during one ledger period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EBlock {
    pub key_mr: String,
    pub chain_id: String,
    pub prev_key_mr: String,
    pub timestamp: i64,
    pub db_height: i64,
    pub block_sequence_number: i64,
}

impl EBlock {
    /// The first block of a chain has no predecessor
    pub fn is_genesis(&self) -> bool {
        self.prev_key_mr == ZERO_HASH
    }
}
