//! JSON-RPC settlement backend
//!
//! Speaks JSON-RPC 2.0 over HTTP to a settlement gateway that custodies the
//! treasury keys and signs on the game's behalf. `getBalance` follows the
//! Solana RPC shape (`{"context": .., "value": <lamports>}`); `transfer` and
//! `mintAsset` return the transaction signature as a string.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use crate::error::{LedgerError, LedgerResult, SettlementError};
use crate::wallet::WalletIdentity;
use super::{MintRequest, SettlementBackend, SettlementFuture, TransferRequest};

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Which call a response belongs to, used to classify gateway errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RpcMethod {
    GetBalance,
    Transfer,
    MintAsset,
}

impl RpcMethod {
    fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::GetBalance => "getBalance",
            RpcMethod::Transfer => "transfer",
            RpcMethod::MintAsset => "mintAsset",
        }
    }

    fn rejected(&self, message: String) -> SettlementError {
        match self {
            RpcMethod::GetBalance => SettlementError::Network { message },
            RpcMethod::Transfer => SettlementError::Transaction { message },
            RpcMethod::MintAsset => SettlementError::Mint { message },
        }
    }
}

/// Settlement backend backed by a remote JSON-RPC gateway
#[derive(Debug)]
pub struct RpcSettlement {
    endpoint: String,
    http_client: HttpClient,
    next_id: AtomicU64,
}

impl RpcSettlement {
    /// Create a client for `endpoint` with a per-request timeout
    pub fn new(endpoint: &str, request_timeout: Duration) -> LedgerResult<Self> {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(LedgerError::Configuration {
                message: format!("Settlement endpoint {} must be an http(s) URL", endpoint),
                field: "settlement.rpc_endpoint".to_string(),
            });
        }

        let http_client = HttpClient::builder()
            .timeout(request_timeout)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| LedgerError::Configuration {
                message: format!("Failed to build HTTP client: {}", e),
                field: "settlement".to_string(),
            })?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, method: RpcMethod, params: Value) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method.as_str(),
            "params": params,
        })
    }

    async fn call(&self, method: RpcMethod, params: Value) -> Result<Value, SettlementError> {
        let body = self.request_body(method, params);
        debug!(method = method.as_str(), endpoint = %self.endpoint, "Sending settlement request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, method))?;

        let status = response.status();
        if !status.is_success() {
            return Err(method.rejected(format!("Gateway returned HTTP {}", status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(e, method))?;
        parse_response(&text, method)
    }
}

fn classify_transport_error(err: reqwest::Error, method: RpcMethod) -> SettlementError {
    let outcome = if err.is_timeout() { "timed out" } else { "failed" };
    SettlementError::Network {
        message: format!("{} {}: {}", method.as_str(), outcome, err),
    }
}

fn parse_response(text: &str, method: RpcMethod) -> Result<Value, SettlementError> {
    let response: RpcResponse = serde_json::from_str(text).map_err(|e| SettlementError::InvalidResponse {
        message: format!("{} response is not JSON-RPC: {}", method.as_str(), e),
    })?;

    if let Some(error) = response.error {
        return Err(method.rejected(format!("{} (code {})", error.message, error.code)));
    }

    response.result.ok_or_else(|| SettlementError::InvalidResponse {
        message: format!("{} response has neither result nor error", method.as_str()),
    })
}

fn parse_balance(result: &Value) -> Result<u64, SettlementError> {
    let value = result.get("value").unwrap_or(result);
    value.as_u64().ok_or_else(|| SettlementError::InvalidResponse {
        message: format!("Balance is not an unsigned integer: {}", value),
    })
}

fn parse_signature(result: &Value, method: RpcMethod) -> Result<String, SettlementError> {
    result
        .as_str()
        .filter(|signature| !signature.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SettlementError::InvalidResponse {
            message: format!("{} did not return a signature", method.as_str()),
        })
}

impl SettlementBackend for RpcSettlement {
    fn name(&self) -> &'static str {
        "rpc"
    }

    fn get_balance<'a>(&'a self, identity: &'a WalletIdentity) -> SettlementFuture<'a, u64> {
        Box::pin(async move {
            let result = self.call(RpcMethod::GetBalance, json!([identity.as_str()])).await?;
            parse_balance(&result)
        })
    }

    fn transfer<'a>(&'a self, request: &'a TransferRequest) -> SettlementFuture<'a, String> {
        Box::pin(async move {
            let params = json!([{
                "from": request.from.as_str(),
                "to": request.to.as_str(),
                "lamports": request.base_units,
                "idempotencyKey": request.idempotency_key,
            }]);
            let result = self.call(RpcMethod::Transfer, params).await?;
            parse_signature(&result, RpcMethod::Transfer)
        })
    }

    fn mint_asset<'a>(&'a self, request: &'a MintRequest) -> SettlementFuture<'a, String> {
        Box::pin(async move {
            let params = json!([{
                "to": request.to.as_str(),
                "amount": request.amount,
                "idempotencyKey": request.idempotency_key,
            }]);
            let result = self.call(RpcMethod::MintAsset, params).await?;
            parse_signature(&result, RpcMethod::MintAsset)
        })
    }
}
