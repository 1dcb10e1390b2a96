use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::ModelError;
use crate::domain::models::entry;
use crate::domain::models::{Chain, Entry};

/// Ledger write a queue row stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Chain,
    Entry,
}

impl QueueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAction::Chain => "chain",
            QueueAction::Entry => "entry",
        }
    }
}

impl fmt::Display for QueueAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chain" => Ok(QueueAction::Chain),
            "entry" => Ok(QueueAction::Entry),
            other => Err(format!("unknown queue action: {}", other)),
        }
    }
}

/// Everything needed to replay a commit. Binary fields are base64 encoded.
///
/// Field order is fixed, so equal payloads serialize to equal strings; the
/// serialized form is the deduplication key of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueParams {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    #[serde(rename = "extIds")]
    pub ext_ids: Vec<String>,
    pub content: String,
}

impl QueueParams {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            chain_id: entry.chain_id.clone(),
            ext_ids: entry.ext_ids.iter().map(base64::encode).collect(),
            content: base64::encode(&entry.content),
        }
    }

    pub fn from_chain(chain: &Chain) -> Self {
        Self {
            chain_id: chain.chain_id.clone(),
            ext_ids: chain.ext_ids.iter().map(base64::encode).collect(),
            content: base64::encode(chain.content.as_deref().unwrap_or_default()),
        }
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        serde_json::to_string(self).map_err(|e| ModelError::InvalidEncoding(e.to_string()))
    }

    pub fn from_json(params: &str) -> Result<Self, ModelError> {
        serde_json::from_str(params).map_err(|e| ModelError::InvalidEncoding(e.to_string()))
    }

    pub fn decode_ext_ids(&self) -> Result<Vec<Vec<u8>>, ModelError> {
        self.ext_ids
            .iter()
            .map(|id| base64::decode(id).map_err(|e| ModelError::InvalidEncoding(e.to_string())))
            .collect()
    }

    pub fn decode_content(&self) -> Result<Vec<u8>, ModelError> {
        base64::decode(&self.content).map_err(|e| ModelError::InvalidEncoding(e.to_string()))
    }

    /// Hash of the entry this row writes (the first entry for a chain)
    pub fn entry_hash(&self) -> Result<String, ModelError> {
        entry::entry_hash(&self.chain_id, &self.decode_ext_ids()?, &self.decode_content()?)
    }
}

/// A durable pending ledger write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub id: i32,
    pub user_id: i32,
    pub action: QueueAction,
    /// Serialized [`QueueParams`]
    pub params: String,
    /// Ledger hash returned by the wallet on success
    pub result: Option<String>,
    /// Last failure message
    pub error: Option<String>,
    pub try_count: i32,
    pub processed_at: Option<DateTime<Utc>>,
    pub next_try_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    /// Unprocessed and past any backoff deadline
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.processed_at.is_none() && self.next_try_at.map_or(true, |t| t < now)
    }

    /// Processed before `processed_before` with a recorded result
    pub fn is_clearable(&self, processed_before: DateTime<Utc>) -> bool {
        self.result.is_some() && self.processed_at.map_or(false, |t| t < processed_before)
    }
}

/// A queue row before it is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQueueItem {
    pub user_id: i32,
    pub action: QueueAction,
    pub params: String,
}

/// Explicit field list for a queue row update; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueItemPatch {
    pub result: Option<String>,
    pub error: Option<String>,
    pub try_count: Option<i32>,
    pub processed_at: Option<DateTime<Utc>>,
    pub next_try_at: Option<DateTime<Utc>>,
}

impl QueueItemPatch {
    pub fn apply(&self, item: &mut QueueItem) {
        if let Some(result) = &self.result {
            item.result = Some(result.clone());
        }
        if let Some(error) = &self.error {
            item.error = Some(error.clone());
        }
        if let Some(try_count) = self.try_count {
            item.try_count = try_count;
        }
        if let Some(processed_at) = self.processed_at {
            item.processed_at = Some(processed_at);
        }
        if let Some(next_try_at) = self.next_try_at {
            item.next_try_at = Some(next_try_at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Status;
    use chrono::Duration;

    fn item() -> QueueItem {
        QueueItem {
            id: 1,
            user_id: 1,
            action: QueueAction::Entry,
            params: String::new(),
            result: None,
            error: None,
            try_count: 0,
            processed_at: None,
            next_try_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_params_serialization_is_stable() {
        let chain = Chain::new_local(vec![b"a".to_vec()], b"b".to_vec());
        let entry = Entry::new(&chain.chain_id, vec![b"a".to_vec()], b"b".to_vec(), Status::Queue)
            .unwrap();

        let from_chain = QueueParams::from_chain(&chain).to_json().unwrap();
        let from_entry = QueueParams::from_entry(&entry).to_json().unwrap();
        assert_eq!(from_chain, from_entry);
        assert_eq!(
            from_chain,
            format!(
                "{{\"chainId\":\"{}\",\"extIds\":[\"YQ==\"],\"content\":\"Yg==\"}}",
                chain.chain_id
            )
        );

        let params = QueueParams::from_json(&from_chain).unwrap();
        assert_eq!(params.entry_hash().unwrap(), entry.entry_hash);
    }

    #[test]
    fn test_due_predicate() {
        let now = Utc::now();
        let mut row = item();
        assert!(row.is_due(now));

        row.next_try_at = Some(now + Duration::minutes(1));
        assert!(!row.is_due(now));
        assert!(row.is_due(now + Duration::minutes(2)));

        row.processed_at = Some(now);
        assert!(!row.is_due(now + Duration::minutes(2)));
    }

    #[test]
    fn test_clearable_predicate() {
        let now = Utc::now();
        let mut row = item();
        row.processed_at = Some(now - Duration::hours(2));
        assert!(!row.is_clearable(now - Duration::hours(1)));

        row.result = Some("ab".to_string());
        assert!(row.is_clearable(now - Duration::hours(1)));
        assert!(!row.is_clearable(now - Duration::hours(3)));
    }
}
