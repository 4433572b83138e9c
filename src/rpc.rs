//! NEAR JSON-RPC transport.
//!
//! Executes JSON request/response calls against a NEAR view/RPC endpoint and
//! decodes byte-array view results into strings. Calls are single-shot: a
//! transport or HTTP failure surfaces as [`SweepError::Rpc`] and is never
//! retried at this layer.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};

use crate::error::{SweepError, SweepResult};
use crate::types::{AccessKeyRecord, AccountId};

/// Identifier sent in every JSON-RPC envelope.
const RPC_ID: &str = "stablesweep";

// ═══════════════════════════════════════════════════════════════════════════════
// RPC CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// NEAR JSON-RPC client.
pub struct NearRpcClient {
    rpc_url: String,
    http: reqwest::Client,
}

impl NearRpcClient {
    /// Create a new RPC client with the given request timeout.
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> SweepResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SweepError::Http(e.to_string()))?;
        Ok(Self {
            rpc_url: rpc_url.into(),
            http,
        })
    }

    /// Execute a `query` sub-request (`view_access_key_list`,
    /// `view_access_key`, `call_function`, `view_account`) against final
    /// state and return the `result` value.
    pub async fn query(&self, request_type: &str, params: Value) -> SweepResult<Value> {
        let mut merged = json!({
            "request_type": request_type,
            "finality": "final",
        });
        if let (Some(envelope), Some(extra)) = (merged.as_object_mut(), params.as_object()) {
            for (key, value) in extra {
                envelope.insert(key.clone(), value.clone());
            }
        }
        self.raw_call("query", merged).await
    }

    /// Fetch the hash of the latest finalized block.
    pub async fn fetch_latest_block_hash(&self) -> SweepResult<String> {
        let result = self
            .raw_call("block", json!({ "finality": "final" }))
            .await?;
        let block_hash = result
            .pointer("/header/hash")
            .and_then(Value::as_str)
            .ok_or_else(|| SweepError::Rpc("block response missing header hash".to_string()))?
            .to_string();
        tracing::debug!(%block_hash, "fetched latest block hash");
        Ok(block_hash)
    }

    /// List all access keys of an account.
    pub async fn view_access_key_list(
        &self,
        account_id: &AccountId,
    ) -> SweepResult<Vec<AccessKeyRecord>> {
        let result = self
            .query(
                "view_access_key_list",
                json!({ "account_id": account_id.as_str() }),
            )
            .await?;
        let keys = result
            .get("keys")
            .cloned()
            .unwrap_or_else(|| json!([]));
        serde_json::from_value(keys).map_err(|e| {
            SweepError::Decode(format!(
                "malformed access key list for {account_id}: {e}"
            ))
        })
    }

    /// Fetch the access-key entry for `(account_id, public_key)`.
    pub async fn view_access_key(
        &self,
        account_id: &AccountId,
        public_key: &str,
    ) -> SweepResult<Value> {
        self.query(
            "view_access_key",
            json!({
                "account_id": account_id.as_str(),
                "public_key": public_key,
            }),
        )
        .await
    }

    /// Call a contract view function, base64-encoding the JSON args as the
    /// view-call convention requires, and decode the byte-array result into
    /// a string.
    pub async fn call_view_function(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &Value,
    ) -> SweepResult<String> {
        let args_json = serde_json::to_string(args)
            .map_err(|e| SweepError::Decode(format!("unserializable view args: {e}")))?;
        let result = self
            .query(
                "call_function",
                json!({
                    "account_id": contract_id,
                    "method_name": method_name,
                    "args_base64": BASE64.encode(args_json.as_bytes()),
                }),
            )
            .await?;
        parse_view_result(&result)
    }

    /// Fetch an account's balance in yoctoNEAR.
    pub async fn view_account_balance(&self, account_id: &AccountId) -> SweepResult<String> {
        let result = self
            .query("view_account", json!({ "account_id": account_id.as_str() }))
            .await?;
        result
            .get("amount")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                SweepError::Rpc(format!("view_account for {account_id} returned no amount"))
            })
    }

    async fn raw_call(&self, method: &str, params: Value) -> SweepResult<Value> {
        tracing::debug!(method, "NEAR RPC call");
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": RPC_ID,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(method, error = %e, "NEAR RPC transport failure");
                SweepError::Rpc(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(method, %status, "NEAR RPC returned non-success status");
            return Err(SweepError::Rpc(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SweepError::Rpc(format!("unparseable RPC response: {e}")))?;

        if let Some(error) = body.get("error") {
            tracing::error!(method, %error, "NEAR RPC returned error");
            return Err(SweepError::Rpc(error.to_string()));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| SweepError::Rpc("missing result in RPC response".to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIEW RESULT DECODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a view-call result from its byte-array form to a string.
///
/// The RPC returns view results as arrays of integers interpreted as UTF-8
/// bytes; string-typed contract returns arrive wrapped in one layer of JSON
/// quotes, which is stripped.
pub fn parse_view_result(response: &Value) -> SweepResult<String> {
    let values = response
        .get("result")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut bytes = Vec::with_capacity(values.len());
    for value in values {
        let byte = value
            .as_u64()
            .filter(|n| *n <= u8::MAX as u64)
            .ok_or_else(|| {
                SweepError::Decode(format!("view result entry is not a byte: {value}"))
            })?;
        bytes.push(byte as u8);
    }

    let decoded = String::from_utf8(bytes)
        .map_err(|e| SweepError::Decode(format!("view result is not valid UTF-8: {e}")))?;
    Ok(strip_quotes(&decoded).to_string())
}

/// Strip a single layer of surrounding quote characters, if present.
pub(crate) fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_view_result_strips_one_quote_layer() {
        // `"secp256k1:abc"` as UTF-8 bytes, quotes included.
        let mut bytes: Vec<Value> = vec![json!(34)];
        bytes.extend("secp256k1:abc".bytes().map(|b| json!(b)));
        bytes.push(json!(34));
        let response = json!({ "result": bytes });

        let parsed = parse_view_result(&response).unwrap();
        assert_eq!(parsed, "secp256k1:abc");
    }

    #[test]
    fn test_parse_view_result_without_quotes() {
        let bytes: Vec<Value> = "ed25519:xyz".bytes().map(|b| json!(b)).collect();
        let response = json!({ "result": bytes });
        assert_eq!(parse_view_result(&response).unwrap(), "ed25519:xyz");
    }

    #[test]
    fn test_parse_view_result_rejects_invalid_utf8() {
        let response = json!({ "result": [0xff, 0xfe] });
        assert!(matches!(
            parse_view_result(&response),
            Err(SweepError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_view_result_rejects_non_byte_entries() {
        // Out of range for a byte.
        let response = json!({ "result": [72, 300, 105] });
        assert!(matches!(
            parse_view_result(&response),
            Err(SweepError::Decode(_))
        ));

        // Not an unsigned integer at all.
        for entry in [json!(-1), json!("72"), json!(1.5)] {
            let response = json!({ "result": [entry] });
            assert!(matches!(
                parse_view_result(&response),
                Err(SweepError::Decode(_))
            ));
        }
    }

    #[test]
    fn test_parse_view_result_empty() {
        let response = json!({ "result": [] });
        assert_eq!(parse_view_result(&response).unwrap(), "");
    }

    #[test]
    fn test_strip_quotes_requires_both_sides() {
        assert_eq!(strip_quotes("\"value\""), "value");
        assert_eq!(strip_quotes("\"dangling"), "\"dangling");
        assert_eq!(strip_quotes("plain"), "plain");
        // Only one layer comes off.
        assert_eq!(strip_quotes("\"\"double\"\""), "\"double\"");
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = NearRpcClient::new("https://rpc.testnet.fastnear.com", Duration::from_secs(5));
        assert!(client.is_ok());
    }
}
