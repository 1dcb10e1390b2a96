use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::FactomConfig;
use crate::infrastructure::factom::error::LedgerError;
use crate::infrastructure::factom::rpc::JsonRpcClient;
use crate::infrastructure::factom::types::{
    AckStatus, ChainHead, CurrentMinute, EntryAck, LedgerEBlock, LedgerEntry, RawLedgerEntry,
};
use crate::infrastructure::factom::LedgerClient;

/// factomd JSON-RPC v2 client
#[derive(Debug, Clone)]
pub struct FactomdClient {
    rpc: JsonRpcClient,
}

impl FactomdClient {
    pub fn new(config: &FactomConfig) -> Result<Self, LedgerError> {
        let credentials = match (&config.user, &config.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            rpc: JsonRpcClient::new(&config.url, credentials, config.rpc_timeout)?,
        })
    }

    /// Raw access for commit/reveal and balance calls
    pub fn rpc(&self) -> &JsonRpcClient {
        &self.rpc
    }
}

#[async_trait]
impl LedgerClient for FactomdClient {
    async fn chain_head(&self, chain_id: &str) -> Result<ChainHead, LedgerError> {
        match self
            .rpc
            .call("chain-head", json!({ "chainid": chain_id }))
            .await
        {
            Ok(result) => Ok(ChainHead {
                head: result
                    .get("chainhead")
                    .and_then(Value::as_str)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string),
                in_process_list: result
                    .get("chaininprocesslist")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            }),
            Err(e) if e.is_not_found() => Ok(ChainHead::default()),
            Err(e) => Err(e),
        }
    }

    async fn entry_block(&self, key_mr: &str) -> Result<LedgerEBlock, LedgerError> {
        self.rpc
            .call_as("entry-block", json!({ "keymr": key_mr }))
            .await
    }

    async fn entry(&self, entry_hash: &str) -> Result<LedgerEntry, LedgerError> {
        let raw: RawLedgerEntry = self
            .rpc
            .call_as("entry", json!({ "hash": entry_hash }))
            .await?;

        let decode = |field: &str, value: &str| {
            hex::decode(value).map_err(|e| LedgerError::ParseError(format!("{}: {}", field, e)))
        };

        Ok(LedgerEntry {
            chain_id: raw.chain_id,
            content: decode("content", &raw.content)?,
            ext_ids: raw
                .ext_ids
                .iter()
                .map(|id| decode("extids", id))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    async fn current_minute(&self) -> Result<CurrentMinute, LedgerError> {
        self.rpc.call_as("current-minute", Value::Null).await
    }

    async fn entry_ack(&self, entry_hash: &str, chain_id: &str) -> Result<EntryAck, LedgerError> {
        let result = self
            .rpc
            .call("ack", json!({ "hash": entry_hash, "chainid": chain_id }))
            .await?;

        let entry_data = result.get("entrydata");
        Ok(EntryAck {
            status: AckStatus::parse(
                entry_data
                    .and_then(|d| d.get("status"))
                    .and_then(Value::as_str)
                    .unwrap_or_default(),
            ),
            block_date: entry_data
                .and_then(|d| d.get("blockdate"))
                .and_then(Value::as_i64)
                .filter(|d| *d > 0),
        })
    }
}
