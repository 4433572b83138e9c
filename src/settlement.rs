//! Swap settlement status tracking.
//!
//! Single-shot status queries against the quote service's status endpoint.
//! Polling cadence and timeout belong to the caller (see
//! [`crate::client::SweepClient::wait_for_settlement`]); this module never
//! loops.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SweepError, SweepResult};

/// Status values the service reports while a swap is still in flight.
/// Anything outside this set is treated as terminal, conservatively, since
/// the service's full vocabulary is not enumerated.
const IN_PROGRESS_STATUSES: &[&str] = &[
    "PENDING_DEPOSIT",
    "KNOWN_DEPOSIT_TX",
    "PROCESSING",
    "INCOMPLETE_DEPOSIT",
];

// ═══════════════════════════════════════════════════════════════════════════════
// SWAP STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Settlement state of one swap, keyed by its deposit address.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapStatus {
    pub status: String,
    #[serde(default)]
    pub deposit_address: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub swap_details: Option<serde_json::Value>,
}

impl SwapStatus {
    /// The empty status returned when the service knows nothing about the
    /// queried address.
    pub fn unknown(deposit_address: &str) -> Self {
        Self {
            status: "UNKNOWN".to_string(),
            deposit_address: Some(deposit_address.to_string()),
            updated_at: None,
            swap_details: None,
        }
    }

    /// Whether polling can stop. True for every status outside the known
    /// in-progress set, including unrecognized ones.
    pub fn is_terminal(&self) -> bool {
        !IN_PROGRESS_STATUSES.contains(&self.status.as_str()) && self.status != "UNKNOWN"
    }

    pub fn is_success(&self) -> bool {
        self.status == "SUCCESS"
    }
}

/// One token supported by the settlement service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub asset_id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(default)]
    pub blockchain: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTLEMENT CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Client for the swap status endpoints.
pub struct SettlementClient {
    base_url: String,
    http: reqwest::Client,
}

impl SettlementClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SweepResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SweepError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Query the settlement status for a deposit address, once.
    ///
    /// A non-success HTTP status yields [`SwapStatus::unknown`] rather than
    /// an error, so repeated checks for not-yet-known addresses stay
    /// idempotent; hard transport failures propagate.
    pub async fn check_status(&self, deposit_address: &str) -> SweepResult<SwapStatus> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("depositAddress", deposit_address)])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(deposit_address, error = %e, "status check transport failure");
                SweepError::Settlement(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::debug!(
                deposit_address,
                status = %response.status(),
                "status endpoint returned non-success; reporting unknown"
            );
            return Ok(SwapStatus::unknown(deposit_address));
        }

        response
            .json()
            .await
            .map_err(|e| SweepError::Settlement(format!("malformed status response: {e}")))
    }

    /// List the tokens the settlement service supports.
    pub async fn list_tokens(&self) -> SweepResult<Vec<TokenInfo>> {
        let url = format!("{}/tokens", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SweepError::Settlement(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(SweepError::Settlement(format!("HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| SweepError::Settlement(format!("malformed token list: {e}")))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn status(value: &str) -> SwapStatus {
        SwapStatus {
            status: value.to_string(),
            deposit_address: Some("addr.near".to_string()),
            updated_at: None,
            swap_details: None,
        }
    }

    #[test]
    fn test_in_progress_statuses_are_not_terminal() {
        for value in IN_PROGRESS_STATUSES {
            assert!(!status(value).is_terminal(), "{value} should keep polling");
        }
    }

    #[test]
    fn test_known_terminal_statuses() {
        for value in ["SUCCESS", "REFUNDED", "FAILED", "EXPIRED"] {
            assert!(status(value).is_terminal());
        }
        assert!(status("SUCCESS").is_success());
        assert!(!status("REFUNDED").is_success());
    }

    #[test]
    fn test_unrecognized_status_is_terminal() {
        // Conservative: an unknown non-pending vocabulary entry stops polling.
        assert!(status("SETTLEMENT_HALTED").is_terminal());
    }

    #[test]
    fn test_unknown_placeholder_keeps_polling() {
        let unknown = SwapStatus::unknown("addr.near");
        assert_eq!(unknown.status, "UNKNOWN");
        assert_eq!(unknown.deposit_address.as_deref(), Some("addr.near"));
        assert!(!unknown.is_terminal());
    }

    #[test]
    fn test_status_parsing() {
        let body = r#"{
            "status": "PROCESSING",
            "depositAddress": "addr.near",
            "updatedAt": "2025-05-01T12:00:00.000Z",
            "swapDetails": {"amountIn": "1000"}
        }"#;
        let parsed: SwapStatus = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "PROCESSING");
        assert!(!parsed.is_terminal());
    }
}
