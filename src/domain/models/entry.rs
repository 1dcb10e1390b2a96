//! Entries and the content-addressing rules shared with chains.
//!
//! An entry is marshalled as: version byte, 32-byte chain id, big-endian u16 length of
//! the ext id section, each ext id prefixed by its big-endian u16 length, then content.
//! Its hash is `SHA256(SHA512(data) || data)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::domain::errors::ModelError;
use crate::domain::models::Status;

/// Upper bound (exclusive) for content plus ext ids, in bytes
pub const MAX_ENTRY_SIZE: usize = 10240;

/// Marshalled bytes preceding the ext id payload
pub const ENTRY_HEADER_SIZE: usize = 35;

/// Additional Entry Credits charged for opening a chain
pub const CHAIN_EC_COST: u64 = 10;

/// An immutable record within a chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub entry_hash: String,
    pub chain_id: String,
    pub ext_ids: Vec<Vec<u8>>,
    pub content: Vec<u8>,
    pub status: Status,
    pub factom_time: Option<DateTime<Utc>>,
}

impl Entry {
    /// Builds an entry, deriving its hash from chain id, ext ids and content
    pub fn new(
        chain_id: &str,
        ext_ids: Vec<Vec<u8>>,
        content: Vec<u8>,
        status: Status,
    ) -> Result<Self, ModelError> {
        let entry_hash = entry_hash(chain_id, &ext_ids, &content)?;
        Ok(Self {
            entry_hash,
            chain_id: chain_id.to_string(),
            ext_ids,
            content,
            status,
            factom_time: None,
        })
    }

    pub fn with_factom_time(mut self, factom_time: Option<DateTime<Utc>>) -> Self {
        self.factom_time = factom_time;
        self
    }
}

pub fn payload_size(ext_ids: &[Vec<u8>], content: &[u8]) -> usize {
    content.len() + ext_ids.iter().map(Vec::len).sum::<usize>()
}

/// Rejects payloads the ledger will not accept
pub fn ensure_fits(ext_ids: &[Vec<u8>], content: &[u8]) -> Result<(), ModelError> {
    let size = payload_size(ext_ids, content);
    if size < MAX_ENTRY_SIZE {
        Ok(())
    } else {
        Err(ModelError::EntryTooLarge(size))
    }
}

/// Serializes an entry into its ledger binary form
pub fn marshal_entry(
    chain_id: &str,
    ext_ids: &[Vec<u8>],
    content: &[u8],
) -> Result<Vec<u8>, ModelError> {
    let chain_bytes = decode_hash(chain_id)?;

    let ext_section: usize = ext_ids.iter().map(|id| id.len() + 2).sum();
    let ext_section =
        u16::try_from(ext_section).map_err(|_| ModelError::EntryTooLarge(ext_section))?;

    let mut data = Vec::with_capacity(ENTRY_HEADER_SIZE + ext_section as usize + content.len());
    data.push(0u8);
    data.extend_from_slice(&chain_bytes);
    data.extend_from_slice(&ext_section.to_be_bytes());
    for id in ext_ids {
        // Each id fits because the whole section does
        data.extend_from_slice(&(id.len() as u16).to_be_bytes());
        data.extend_from_slice(id);
    }
    data.extend_from_slice(content);

    Ok(data)
}

pub fn entry_hash(chain_id: &str, ext_ids: &[Vec<u8>], content: &[u8]) -> Result<String, ModelError> {
    let data = marshal_entry(chain_id, ext_ids, content)?;

    let mut outer = Sha256::new();
    outer.update(Sha512::digest(&data));
    outer.update(&data);

    Ok(hex::encode(outer.finalize()))
}

/// Chain id derived from the ext ids of its first entry
pub fn chain_id(ext_ids: &[Vec<u8>]) -> String {
    let mut hasher = Sha256::new();
    for id in ext_ids {
        hasher.update(Sha256::digest(id));
    }
    hex::encode(hasher.finalize())
}

/// Entry Credit cost of writing an entry: one EC per started KiB, at least one
pub fn entry_cost(ext_ids: &[Vec<u8>], content: &[u8]) -> Result<u64, ModelError> {
    let len = ext_ids.iter().map(|id| id.len() + 2).sum::<usize>() + content.len();
    if len > MAX_ENTRY_SIZE {
        return Err(ModelError::EntryTooLarge(len));
    }

    Ok((len.div_ceil(1024) as u64).max(1))
}

fn decode_hash(hash: &str) -> Result<[u8; 32], ModelError> {
    let bytes = hex::decode(hash).map_err(|_| ModelError::InvalidHash(hash.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ModelError::InvalidHash(hash.to_string()))
}
