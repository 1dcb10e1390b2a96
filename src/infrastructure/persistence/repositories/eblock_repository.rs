//! Repository for entry block operations

use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::fmt;

use crate::domain::models::EBlock;
use crate::infrastructure::persistence::entities::{eblocks, entries_eblocks};
use crate::infrastructure::persistence::error::{is_duplicate_key, DbError};

/// Repository for entry block operations
#[derive(Clone)]
pub struct EBlockRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for EBlockRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EBlockRepository").finish_non_exhaustive()
    }
}

impl EBlockRepository {
    /// Create a new EBlockRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert an entry block; re-inserting the same KeyMR is a no-op
    pub async fn create(&self, eblock: &EBlock) -> Result<(), DbError> {
        let model = eblocks::ActiveModel {
            key_mr: Set(eblock.key_mr.clone()),
            chain_id: Set(eblock.chain_id.clone()),
            prev_key_mr: Set(eblock.prev_key_mr.clone()),
            timestamp: Set(eblock.timestamp),
            db_height: Set(eblock.db_height),
            block_sequence_number: Set(eblock.block_sequence_number),
        };

        match model.insert(&self.conn).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Record that an entry appears in an entry block
    pub async fn bind(&self, entry_hash: &str, key_mr: &str) -> Result<(), DbError> {
        let model = entries_eblocks::ActiveModel {
            entry_hash: Set(entry_hash.to_string()),
            key_mr: Set(key_mr.to_string()),
        };

        match model.insert(&self.conn).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
