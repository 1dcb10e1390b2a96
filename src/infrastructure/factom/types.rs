//! Ledger-side shapes returned by factomd

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::{EBlock, Status};

/// Head of a chain as reported by `chain-head`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChainHead {
    /// KeyMR of the newest entry block, `None` when the chain has no block yet
    pub head: Option<String>,
    /// The chain was acknowledged but is not in a directory block yet
    pub in_process_list: bool,
}

impl ChainHead {
    pub fn status(&self) -> Status {
        match (&self.head, self.in_process_list) {
            (Some(_), _) => Status::Completed,
            (None, true) => Status::Processing,
            (None, false) => Status::Queue,
        }
    }

    /// The chain is known to the ledger in any form
    pub fn exists(&self) -> bool {
        self.head.is_some() || self.in_process_list
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EBlockHeader {
    #[serde(rename = "blocksequencenumber")]
    pub block_sequence_number: i64,
    #[serde(rename = "chainid")]
    pub chain_id: String,
    #[serde(rename = "prevkeymr")]
    pub prev_key_mr: String,
    pub timestamp: i64,
    #[serde(rename = "dbheight")]
    pub db_height: i64,
}

/// Entry reference inside an entry block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EBlockEntry {
    #[serde(rename = "entryhash")]
    pub entry_hash: String,
    /// Minute-resolution ledger time of the entry, unix seconds
    #[serde(default)]
    pub timestamp: i64,
}

/// Entry block as returned by `entry-block`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEBlock {
    pub header: EBlockHeader,
    #[serde(rename = "entrylist", default)]
    pub entries: Vec<EBlockEntry>,
}

impl LedgerEBlock {
    pub fn to_eblock(&self, key_mr: &str) -> EBlock {
        EBlock {
            key_mr: key_mr.to_string(),
            chain_id: self.header.chain_id.clone(),
            prev_key_mr: self.header.prev_key_mr.clone(),
            timestamp: self.header.timestamp,
            db_height: self.header.db_height,
            block_sequence_number: self.header.block_sequence_number,
        }
    }

    /// Ledger time of an entry listed in this block
    ///
    /// The per-entry timestamp is used; the block timestamp stands in when absent.
    pub fn entry_time(&self, entry: &EBlockEntry) -> Option<DateTime<Utc>> {
        let seconds = if entry.timestamp > 0 {
            entry.timestamp
        } else {
            self.header.timestamp
        };
        Utc.timestamp_opt(seconds, 0).single()
    }
}

/// Decoded entry as returned by `entry`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub chain_id: String,
    pub ext_ids: Vec<Vec<u8>>,
    pub content: Vec<u8>,
}

/// Hex-encoded wire form of [`LedgerEntry`]
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawLedgerEntry {
    #[serde(rename = "chainid")]
    pub chain_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "extids", default)]
    pub ext_ids: Vec<String>,
}

/// Position within the current directory block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CurrentMinute {
    pub minute: i64,
    #[serde(rename = "directoryblockheight")]
    pub directory_block_height: i64,
}

/// Entry state reported by `ack`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Unknown,
    NotConfirmed,
    TransactionAck,
    DBlockConfirmed,
}

impl AckStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "NotConfirmed" => AckStatus::NotConfirmed,
            "TransactionACK" => AckStatus::TransactionAck,
            "DBlockConfirmed" => AckStatus::DBlockConfirmed,
            _ => AckStatus::Unknown,
        }
    }

    pub fn to_status(self) -> Status {
        match self {
            AckStatus::DBlockConfirmed => Status::Completed,
            AckStatus::TransactionAck => Status::Processing,
            AckStatus::Unknown | AckStatus::NotConfirmed => Status::Queue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAck {
    pub status: AckStatus,
    /// Directory block time, unix seconds, once confirmed
    pub block_date: Option<i64>,
}
