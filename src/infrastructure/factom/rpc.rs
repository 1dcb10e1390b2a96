//! Minimal JSON-RPC 2.0 transport shared by factomd and factom-walletd

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

use crate::infrastructure::factom::error::LedgerError;

#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    endpoint: String,
    credentials: Option<(String, String)>,
    client: Client,
}

impl JsonRpcClient {
    pub fn new(
        endpoint: &str,
        credentials: Option<(String, String)>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LedgerError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            credentials,
            client,
        })
    }

    /// Make a JSON-RPC call and return the raw `result`
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let mut request_body = json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": method,
        });
        if !params.is_null() {
            request_body["params"] = params;
        }

        let mut request = self.client.post(&self.endpoint).json(&request_body);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        let response_json: Value = match serde_json::from_str(&response_text) {
            Ok(json) => json,
            Err(_) if !status.is_success() => {
                return Err(LedgerError::NetworkError(format!(
                    "{} returned HTTP {}",
                    method, status
                )))
            }
            Err(e) => return Err(LedgerError::ParseError(e.to_string())),
        };

        if let Some(error) = response_json.get("error").filter(|e| !e.is_null()) {
            return Err(LedgerError::RpcError {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        response_json
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::ParseError(format!("No result in {} response", method)))
    }

    /// Make a JSON-RPC call and deserialize its `result`
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let result = self.call(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| LedgerError::ParseError(format!("{}: {}", method, e)))
    }
}
