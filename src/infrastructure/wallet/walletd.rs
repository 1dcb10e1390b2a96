//! Wallet backed by factom-walletd.
//!
//! walletd holds the EC private key and signs the commit; this gateway only checks the
//! balance, forwards the composed commit and reveal to factomd and reports the result.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::WalletConfig;
use crate::domain::models::entry::{self, CHAIN_EC_COST};
use crate::domain::models::{Chain, Entry};
use crate::infrastructure::factom::{FactomdClient, JsonRpcClient, LedgerError};
use crate::infrastructure::wallet::{Wallet, WalletError};
use crate::utils::logging;

/// Commit already accepted earlier; the reveal may still be missing
const REPEATED_COMMIT: &str = "Repeated Commit";

#[derive(Debug, Clone)]
pub struct WalletdWallet {
    walletd: JsonRpcClient,
    factomd: FactomdClient,
    ec_address: Option<String>,
}

impl WalletdWallet {
    pub fn new(config: &WalletConfig, factomd: FactomdClient) -> Result<Self, WalletError> {
        Ok(Self {
            walletd: JsonRpcClient::new(&config.url, None, config.rpc_timeout)?,
            factomd,
            ec_address: config.ec_address.clone(),
        })
    }

    fn ec_address(&self) -> Result<&str, WalletError> {
        self.ec_address.as_deref().ok_or(WalletError::NotConfigured)
    }

    async fn ensure_balance(&self, required: u64) -> Result<(), WalletError> {
        let balance = self.balance().await?;
        if balance < required as i64 {
            return Err(WalletError::InsufficientFunds { required, balance });
        }
        Ok(())
    }

    /// Sends the commit and reveal requests composed by walletd to factomd
    async fn submit(&self, composed: Value) -> Result<Value, WalletError> {
        let commit = composed
            .get("commit")
            .ok_or_else(|| WalletError::ComposeError("missing commit".to_string()))?;
        let reveal = composed
            .get("reveal")
            .ok_or_else(|| WalletError::ComposeError("missing reveal".to_string()))?;

        let (commit_method, commit_params) = split_request(commit)?;
        match self.factomd.rpc().call(commit_method, commit_params).await {
            Ok(_) => {}
            Err(LedgerError::RpcError { message, .. }) if message.contains(REPEATED_COMMIT) => {
                logging::log_debug("[WALLET] Commit already accepted, revealing");
            }
            Err(e) => return Err(e.into()),
        }

        let (reveal_method, reveal_params) = split_request(reveal)?;
        Ok(self.factomd.rpc().call(reveal_method, reveal_params).await?)
    }
}

fn split_request(request: &Value) -> Result<(&str, Value), WalletError> {
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| WalletError::ComposeError("missing method".to_string()))?;
    let params = request.get("params").cloned().unwrap_or(Value::Null);
    Ok((method, params))
}

fn hex_ids(ext_ids: &[Vec<u8>]) -> Vec<String> {
    ext_ids.iter().map(hex::encode).collect()
}

#[async_trait]
impl Wallet for WalletdWallet {
    async fn commit_reveal_entry(&self, entry: &Entry) -> Result<String, WalletError> {
        let ec_address = self.ec_address()?;
        let cost = entry::entry_cost(&entry.ext_ids, &entry.content)?;
        self.ensure_balance(cost).await?;

        let composed = self
            .walletd
            .call(
                "compose-entry",
                json!({
                    "entry": {
                        "chainid": entry.chain_id,
                        "extids": hex_ids(&entry.ext_ids),
                        "content": hex::encode(&entry.content),
                    },
                    "ecpub": ec_address,
                }),
            )
            .await?;

        let revealed = self.submit(composed).await?;
        Ok(revealed
            .get("entryhash")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| entry.entry_hash.clone()))
    }

    async fn commit_reveal_chain(&self, chain: &Chain) -> Result<String, WalletError> {
        let ec_address = self.ec_address()?;
        let content = chain.content.as_deref().unwrap_or_default();
        let cost = entry::entry_cost(&chain.ext_ids, content)? + CHAIN_EC_COST;
        self.ensure_balance(cost).await?;

        let composed = self
            .walletd
            .call(
                "compose-chain",
                json!({
                    "chain": {
                        "firstentry": {
                            "extids": hex_ids(&chain.ext_ids),
                            "content": hex::encode(content),
                        }
                    },
                    "ecpub": ec_address,
                }),
            )
            .await?;

        let revealed = self.submit(composed).await?;
        Ok(revealed
            .get("chainid")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| chain.chain_id.clone()))
    }

    async fn balance(&self) -> Result<i64, WalletError> {
        let ec_address = self.ec_address()?;
        let result = self
            .factomd
            .rpc()
            .call("entry-credit-balance", json!({ "address": ec_address }))
            .await?;

        result
            .get("balance")
            .and_then(Value::as_i64)
            .ok_or_else(|| LedgerError::ParseError("Invalid balance".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_request() {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": "commit-entry",
            "params": { "message": "00ab" }
        });
        let (method, params) = split_request(&request).unwrap();
        assert_eq!(method, "commit-entry");
        assert_eq!(params, json!({ "message": "00ab" }));

        assert!(matches!(
            split_request(&json!({ "params": {} })),
            Err(WalletError::ComposeError(_))
        ));
    }

    #[test]
    fn test_hex_ids() {
        assert_eq!(hex_ids(&[b"a".to_vec(), vec![0xff]]), vec!["61", "ff"]);
    }

    /// factomd stand-in answering every call with an EC balance
    async fn balance_node() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let body = r#"{"jsonrpc":"2.0","id":0,"result":{"balance":1000}}"#;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    /// walletd stand-in that accepts connections and never answers
    async fn silent_node() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_walletd_calls_use_configured_timeout() {
        use crate::config::FactomConfig;
        use crate::domain::models::Status;
        use std::time::Duration;

        let factomd = FactomdClient::new(&FactomConfig {
            url: balance_node().await,
            user: None,
            password: None,
            rpc_timeout: Duration::from_secs(5),
        })
        .unwrap();
        let wallet = WalletdWallet::new(
            &WalletConfig {
                url: silent_node().await,
                ec_address: Some("EC2test".to_string()),
                rpc_timeout: Duration::from_millis(300),
            },
            factomd,
        )
        .unwrap();

        let entry = Entry::new(&"ab".repeat(32), vec![], b"x".to_vec(), Status::Queue).unwrap();
        let attempt =
            tokio::time::timeout(Duration::from_secs(10), wallet.commit_reveal_entry(&entry)).await;

        assert!(matches!(attempt, Ok(Err(_))));
    }
}
