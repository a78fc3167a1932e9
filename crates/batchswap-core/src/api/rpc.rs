//! JSON-RPC client for Ethereum nodes.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::signing::wallet::RpcTransport;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// HTTP JSON-RPC client.
///
/// The generic [`RpcClient::send`] accepts any method; a few typed
/// helpers cover the common read calls.
#[derive(Debug, Clone)]
pub struct RpcClient {
    url: String,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            url: url.into(),
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a raw JSON-RPC request.
    ///
    /// Node-reported errors surface as [`Error::Rpc`]; an absent
    /// result field becomes JSON null.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        debug!(method, url = %self.url, "Sending JSON-RPC request");

        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::RpcTransport {
                message: format!("JSON-RPC endpoint returned HTTP {status}"),
                status: Some(status.as_u16()),
            });
        }

        let body: JsonRpcResponse = response.json().await?;
        if let Some(error) = body.error {
            warn!(method, code = error.code, "JSON-RPC node reported an error");
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(body.result.unwrap_or(Value::Null))
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let result = self.send("eth_chainId", json!([])).await?;
        parse_quantity(&result)
    }

    pub async fn get_balance(&self, address: Address) -> Result<U256> {
        let result = self
            .send("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_u256(&result)
    }

    /// Execute a read-only contract call against the latest block.
    pub async fn call(&self, to: Address, data: &Bytes) -> Result<Vec<u8>> {
        let params = json!([
            { "to": to, "data": format!("0x{}", hex::encode(data)) },
            "latest",
        ]);
        let result = self.send("eth_call", params).await?;
        let text = result.as_str().ok_or_else(|| Error::RpcTransport {
            message: format!("eth_call returned a non-string result: {result}"),
            status: None,
        })?;
        hex::decode(text.trim_start_matches("0x")).map_err(|e| Error::RpcTransport {
            message: format!("invalid eth_call result hex: {e}"),
            status: None,
        })
    }
}

#[async_trait]
impl RpcTransport for RpcClient {
    async fn send(&self, method: &str, params: Value) -> Result<Value> {
        RpcClient::send(self, method, params).await
    }
}

/// Parse a JSON-RPC hex quantity like `"0x64"`.
pub(crate) fn parse_quantity(value: &Value) -> Result<u64> {
    let text = value.as_str().ok_or_else(|| Error::RpcTransport {
        message: format!("expected a hex quantity, got {value}"),
        status: None,
    })?;
    u64::from_str_radix(text.trim_start_matches("0x"), 16).map_err(|e| Error::RpcTransport {
        message: format!("invalid hex quantity {text}: {e}"),
        status: None,
    })
}

fn parse_u256(value: &Value) -> Result<U256> {
    let text = value.as_str().ok_or_else(|| Error::RpcTransport {
        message: format!("expected a hex quantity, got {value}"),
        status: None,
    })?;
    U256::from_str_radix(text.trim_start_matches("0x"), 16).map_err(|e| Error::RpcTransport {
        message: format!("invalid hex quantity {text}: {e}"),
        status: None,
    })
}
