//! Threshold co-signature orchestration.
//!
//! Submits a [`SignatureRequest`] through the proxy contract call gateway
//! and decodes the returned success value from its transport encoding
//! (base64, then one layer of JSON quoting) into a signature string. No
//! retry happens at this layer: after a rejection the nonce and block hash
//! are stale, so the caller decides whether to rebuild and resubmit.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};

use crate::error::{SweepError, SweepResult};
use crate::rpc::strip_quotes;
use crate::types::{AccountId, SignatureRequest};

// ═══════════════════════════════════════════════════════════════════════════════
// GATEWAY CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Client for the HTTP relay that executes proxy contract calls on behalf
/// of the agent account.
pub struct GatewayClient {
    gateway_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(gateway_url: impl Into<String>, timeout: Duration) -> SweepResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SweepError::Http(e.to_string()))?;
        Ok(Self {
            gateway_url: gateway_url.into(),
            http,
        })
    }

    /// Relay a method call to the proxy contract, returning the raw
    /// transaction-outcome object.
    pub async fn call_contract(
        &self,
        proxy_account_id: &AccountId,
        method_name: &str,
        params: &Value,
    ) -> SweepResult<Value> {
        tracing::debug!(proxy = %proxy_account_id, method = method_name, "relaying contract call");

        let response = self
            .http
            .post(&self.gateway_url)
            .json(&json!({
                "proxy_account_id": proxy_account_id.as_str(),
                "method_name": method_name,
                "params": params,
            }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(proxy = %proxy_account_id, error = %e, "gateway transport failure");
                SweepError::Rpc(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(proxy = %proxy_account_id, %status, "gateway returned non-success");
            return Err(SweepError::Rpc(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| SweepError::Rpc(format!("unparseable gateway response: {e}")))
    }

    /// Submit a signature request to the proxy contract and decode the
    /// resulting co-signature.
    ///
    /// The outcome's `status` must carry a `SuccessValue` marker; anything
    /// else is surfaced as [`SweepError::ContractCall`] with the raw status
    /// preserved for diagnosis.
    pub async fn request_signature(
        &self,
        proxy_account_id: &AccountId,
        request: &SignatureRequest,
    ) -> SweepResult<String> {
        let params = serde_json::to_value(request)
            .map_err(|e| SweepError::Decode(format!("unserializable signature request: {e}")))?;

        let outcome = self
            .call_contract(proxy_account_id, "request_signature", &params)
            .await?;

        let status = outcome.get("status").cloned().unwrap_or(Value::Null);
        let success_value = status
            .get("SuccessValue")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                tracing::error!(proxy = %proxy_account_id, %status, "signature request rejected");
                SweepError::ContractCall { status: status.clone() }
            })?;

        let signature = decode_success_value(success_value)?;
        tracing::info!(proxy = %proxy_account_id, "received co-signature");
        Ok(signature)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUCCESS-VALUE DECODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Decode a contract success value from its transport encoding.
///
/// Success values arrive base64-encoded; string-typed returns additionally
/// carry one layer of JSON quotes. The result is the raw signature string.
pub fn decode_success_value(encoded: &str) -> SweepResult<String> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| SweepError::Decode(format!("success value is not valid base64: {e}")))?;
    let decoded = String::from_utf8(bytes)
        .map_err(|e| SweepError::Decode(format!("success value is not valid UTF-8: {e}")))?;
    Ok(strip_quotes(&decoded).to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const BASE58_ALPHABET: &str =
        "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    #[test]
    fn test_decode_success_value_round_trip() {
        let signature =
            "secp256k1:3R64TGr9wxtGmXBjgZmEEqCMDycaYSRsrq6hAbTJdk8ZQ6gc3FuyiF5Scw2FPx3evaEfScjiGARN7GVrpXuEZCq3";
        let encoded = BASE64.encode(format!("\"{signature}\""));
        let decoded = decode_success_value(&encoded).unwrap();
        assert_eq!(decoded, signature);

        // Prefix plus base58-safe payload only.
        let payload = decoded.strip_prefix("secp256k1:").unwrap();
        assert!(payload.chars().all(|c| BASE58_ALPHABET.contains(c)));
    }

    #[test]
    fn test_decode_success_value_without_quotes() {
        let encoded = BASE64.encode("ed25519:5KDy");
        assert_eq!(decode_success_value(&encoded).unwrap(), "ed25519:5KDy");
    }

    #[test]
    fn test_decode_success_value_rejects_bad_base64() {
        assert!(matches!(
            decode_success_value("not-base64!!!"),
            Err(SweepError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_success_value_rejects_invalid_utf8() {
        let encoded = BASE64.encode([0xffu8, 0xfe]);
        assert!(matches!(
            decode_success_value(&encoded),
            Err(SweepError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = GatewayClient::new("http://localhost:8080", Duration::from_secs(5));
        assert!(client.is_ok());
    }
}
