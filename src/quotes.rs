//! Stablecoin quote aggregation.
//!
//! Requests swap quotes for the two stablecoin destinations (USDC and USDT)
//! from the external quote service, concurrently, and selects the best offer
//! by minimum-guaranteed-output comparison. A failed quote for one venue
//! never fails the aggregation as a whole: internally each venue carries a
//! `Result`, and only the successes survive into the public map.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SweepError, SweepResult};
use crate::types::AccountId;

/// Slippage tolerance applied to every quote request, in basis points.
pub const SLIPPAGE_TOLERANCE_BPS: u32 = 100;

/// Default quote deadline horizon.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(15 * 60);

// ═══════════════════════════════════════════════════════════════════════════════
// STABLECOIN DESTINATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Stablecoin destination venues. Ordering matters: USDC sorts first, which
/// is what makes it win min-amount-out ties in [`select_best_stablecoin_quote`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stablecoin {
    Usdc,
    Usdt,
}

impl Stablecoin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stablecoin::Usdc => "USDC",
            Stablecoin::Usdt => "USDT",
        }
    }
}

impl std::fmt::Display for Stablecoin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolve the destination-asset identifier for a stablecoin as a function
/// of the source asset. Cross-chain inputs route through Ethereum-bridged
/// token identifiers; wrapped-native input maps to the canonical identifier.
pub fn destination_asset(coin: Stablecoin, token_in: &str) -> &'static str {
    const USDC_CANONICAL: &str =
        "nep141:17208628f84f5d6ad33f0da3bbbeb27ffcb398eac501a31bd6ad2011e36133a1";
    const USDC_BRIDGED: &str = "nep141:eth-0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48.omft.near";
    const USDT_CANONICAL: &str = "nep141:usdt.tether-token.near";
    const USDT_BRIDGED: &str = "nep141:eth-0xdac17f958d2ee523a2206206994597c13d831ec7.omft.near";

    let cross_chain = matches!(token_in, "nep141:eth.omft.near" | "nep141:sol.omft.near");
    match (coin, cross_chain) {
        (Stablecoin::Usdc, true) => USDC_BRIDGED,
        (Stablecoin::Usdc, false) => USDC_CANONICAL,
        (Stablecoin::Usdt, true) => USDT_BRIDGED,
        (Stablecoin::Usdt, false) => USDT_CANONICAL,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIRE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// Body of a `POST /quote` request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Dry-run quotes are informational and assign no deposit address.
    pub dry: bool,
    pub swap_type: String,
    pub slippage_tolerance: u32,
    pub origin_asset: String,
    pub deposit_type: String,
    pub destination_asset: String,
    pub amount: String,
    pub refund_to: String,
    pub refund_type: String,
    pub recipient: String,
    pub recipient_type: String,
    /// RFC3339 deadline after which the quote is void.
    pub deadline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
}

impl QuoteRequest {
    /// An exact-input quote request settling into the intents layer, with
    /// refunds and the output routed back to the proxy account.
    pub fn exact_input(
        token_in: &str,
        amount_in: &str,
        destination_asset: &str,
        proxy_account: &AccountId,
        dry: bool,
        deadline: DateTime<Utc>,
        referral: Option<String>,
    ) -> Self {
        Self {
            dry,
            swap_type: "EXACT_INPUT".to_string(),
            slippage_tolerance: SLIPPAGE_TOLERANCE_BPS,
            origin_asset: token_in.to_string(),
            deposit_type: "INTENTS".to_string(),
            destination_asset: destination_asset.to_string(),
            amount: amount_in.to_string(),
            refund_to: proxy_account.to_string(),
            refund_type: "INTENTS".to_string(),
            recipient: proxy_account.to_string(),
            recipient_type: "INTENTS".to_string(),
            deadline: deadline.to_rfc3339_opts(SecondsFormat::Millis, true),
            referral,
        }
    }
}

/// A quote: an immutable snapshot of one venue's offer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Service-side timestamp of the quote.
    pub timestamp: Option<String>,
    /// Service signature over the quote.
    pub signature: Option<String>,
    /// Echo of the request the quote answers.
    pub quote_request: Option<serde_json::Value>,
    #[serde(rename = "quote")]
    pub detail: QuoteDetail,
}

/// Execution terms of a quote.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetail {
    /// Venue-assigned address that triggers settlement once funded. Absent
    /// on dry quotes.
    #[serde(default)]
    pub deposit_address: Option<String>,
    pub amount_in: String,
    #[serde(default)]
    pub min_amount_in: Option<String>,
    pub amount_out: String,
    /// Minimum guaranteed output after slippage; the comparison key for
    /// best-quote selection.
    pub min_amount_out: String,
    /// Deadline after which the quote is void. Not enforced by the client;
    /// callers must check it before acting on the quote.
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub time_estimate: Option<u64>,
}

impl Quote {
    /// Comparison key for best-quote selection. A malformed value loses
    /// every comparison rather than failing the aggregation.
    fn min_amount_out(&self) -> u128 {
        match self.detail.min_amount_out.parse() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    value = %self.detail.min_amount_out,
                    error = %e,
                    "unparseable minAmountOut; quote cannot win selection"
                );
                0
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUOTE CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Client for the swap quote service.
pub struct QuoteClient {
    base_url: String,
    referral: Option<String>,
    http: reqwest::Client,
}

impl QuoteClient {
    pub fn new(
        base_url: impl Into<String>,
        referral: Option<String>,
        timeout: Duration,
    ) -> SweepResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SweepError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            referral,
            http,
        })
    }

    /// Request a single quote.
    pub async fn request_quote(&self, request: &QuoteRequest) -> SweepResult<Quote> {
        let url = format!("{}/quote", self.base_url);
        tracing::debug!(
            origin = %request.origin_asset,
            destination = %request.destination_asset,
            amount = %request.amount,
            dry = request.dry,
            "requesting quote"
        );

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| SweepError::QuoteService(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SweepError::QuoteService(format!("HTTP {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| SweepError::QuoteService(format!("malformed quote response: {e}")))
    }

    /// Request quotes for both stablecoin destinations concurrently,
    /// returning each venue's result separately. Used by tests and by the
    /// public aggregation below; a venue failure here is data, not an error.
    pub async fn fetch_stablecoin_quotes(
        &self,
        token_in: &str,
        amount_in: &str,
        proxy_account: &AccountId,
        dry: bool,
        deadline: Option<DateTime<Utc>>,
    ) -> SweepResult<BTreeMap<Stablecoin, SweepResult<Quote>>> {
        if !proxy_account.is_delegated() {
            tracing::error!(account = %proxy_account, "account lacks delegation prefix");
            return Err(SweepError::InvalidAccount(proxy_account.to_string()));
        }

        let deadline = deadline.unwrap_or_else(|| {
            Utc::now() + chrono::Duration::seconds(DEFAULT_DEADLINE.as_secs() as i64)
        });

        let request_for = |coin: Stablecoin| {
            QuoteRequest::exact_input(
                token_in,
                amount_in,
                destination_asset(coin, token_in),
                proxy_account,
                dry,
                deadline,
                self.referral.clone(),
            )
        };

        let usdc_request = request_for(Stablecoin::Usdc);
        let usdt_request = request_for(Stablecoin::Usdt);
        let (usdc, usdt) = tokio::join!(
            self.request_quote(&usdc_request),
            self.request_quote(&usdt_request),
        );

        let mut results = BTreeMap::new();
        results.insert(Stablecoin::Usdc, usdc);
        results.insert(Stablecoin::Usdt, usdt);
        Ok(results)
    }

    /// Request quotes for both stablecoin destinations, dropping failed
    /// venues. Returns whatever succeeded, possibly an empty map.
    ///
    /// Precondition: `proxy_account` must carry the delegation prefix;
    /// checked before any network call.
    pub async fn get_stablecoin_quotes(
        &self,
        token_in: &str,
        amount_in: &str,
        proxy_account: &AccountId,
        dry: bool,
        deadline: Option<DateTime<Utc>>,
    ) -> SweepResult<BTreeMap<Stablecoin, Quote>> {
        let per_venue = self
            .fetch_stablecoin_quotes(token_in, amount_in, proxy_account, dry, deadline)
            .await?;

        let mut quotes = BTreeMap::new();
        for (coin, result) in per_venue {
            match result {
                Ok(quote) => {
                    quotes.insert(coin, quote);
                }
                Err(e) => {
                    tracing::warn!(venue = %coin, error = %e, "dropping failed quote venue");
                }
            }
        }
        Ok(quotes)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BEST-QUOTE SELECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Select the quote with the greatest minimum guaranteed output.
///
/// A greedy, slippage-aware best-execution rule: USDT must strictly beat
/// USDC to win, so ties favor USDC. Gas and settlement-time differences
/// between venues are not considered.
pub fn select_best_stablecoin_quote(
    quotes: &BTreeMap<Stablecoin, Quote>,
) -> Option<&Quote> {
    match (quotes.get(&Stablecoin::Usdc), quotes.get(&Stablecoin::Usdt)) {
        (Some(usdc), Some(usdt)) => {
            if usdt.min_amount_out() > usdc.min_amount_out() {
                Some(usdt)
            } else {
                Some(usdc)
            }
        }
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(min_amount_out: &str) -> Quote {
        Quote {
            timestamp: None,
            signature: None,
            quote_request: None,
            detail: QuoteDetail {
                deposit_address: Some("deposit.near".to_string()),
                amount_in: "1000".to_string(),
                min_amount_in: None,
                amount_out: min_amount_out.to_string(),
                min_amount_out: min_amount_out.to_string(),
                deadline: None,
                time_estimate: None,
            },
        }
    }

    #[test]
    fn test_destination_asset_mapping() {
        // Wrapped-native input maps to canonical identifiers.
        assert_eq!(
            destination_asset(Stablecoin::Usdt, "nep141:wrap.near"),
            "nep141:usdt.tether-token.near"
        );
        assert!(destination_asset(Stablecoin::Usdc, "nep141:wrap.near").starts_with("nep141:172"));

        // Cross-chain inputs route through bridged identifiers.
        for token_in in ["nep141:eth.omft.near", "nep141:sol.omft.near"] {
            assert_eq!(
                destination_asset(Stablecoin::Usdc, token_in),
                "nep141:eth-0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48.omft.near"
            );
            assert_eq!(
                destination_asset(Stablecoin::Usdt, token_in),
                "nep141:eth-0xdac17f958d2ee523a2206206994597c13d831ec7.omft.near"
            );
        }
    }

    #[test]
    fn test_select_best_prefers_higher_min_out() {
        let mut quotes = BTreeMap::new();
        quotes.insert(Stablecoin::Usdc, quote("100"));
        quotes.insert(Stablecoin::Usdt, quote("120"));
        let best = select_best_stablecoin_quote(&quotes).unwrap();
        assert_eq!(best.detail.min_amount_out, "120");
    }

    #[test]
    fn test_select_best_tie_favors_usdc() {
        let mut quotes = BTreeMap::new();
        quotes.insert(Stablecoin::Usdc, quote("100"));
        quotes.insert(Stablecoin::Usdt, quote("100"));
        let best = select_best_stablecoin_quote(&quotes).unwrap() as *const Quote;
        let usdc = quotes.get(&Stablecoin::Usdc).unwrap() as *const Quote;
        assert_eq!(best, usdc);
    }

    #[test]
    fn test_select_best_single_and_empty() {
        let mut quotes = BTreeMap::new();
        quotes.insert(Stablecoin::Usdt, quote("50"));
        assert!(select_best_stablecoin_quote(&quotes).is_some());
        assert!(select_best_stablecoin_quote(&BTreeMap::new()).is_none());
    }

    #[test]
    fn test_quote_request_wire_shape() {
        let request = QuoteRequest::exact_input(
            "nep141:wrap.near",
            "1000000000000000000000000",
            destination_asset(Stablecoin::Usdc, "nep141:wrap.near"),
            &AccountId::new("agent.alice.near"),
            true,
            Utc::now(),
            Some("sweep.referral.near".to_string()),
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["swapType"], "EXACT_INPUT");
        assert_eq!(json["depositType"], "INTENTS");
        assert_eq!(json["slippageTolerance"], SLIPPAGE_TOLERANCE_BPS);
        assert_eq!(json["refundTo"], "agent.alice.near");
        assert_eq!(json["recipient"], "agent.alice.near");
        assert_eq!(json["referral"], "sweep.referral.near");
        assert!(json.get("origin_asset").is_none());
    }

    #[test]
    fn test_quote_response_parsing() {
        let body = r#"{
            "timestamp": "2025-05-01T12:00:00.000Z",
            "signature": "ed25519:sig",
            "quoteRequest": {"dry": false},
            "quote": {
                "depositAddress": "addr.near",
                "amountIn": "1000000000000000000000000",
                "minAmountIn": "999000000000000000000000",
                "amountOut": "2500000",
                "minAmountOut": "2475000",
                "deadline": "2025-05-01T12:15:00.000Z",
                "timeEstimate": 120
            }
        }"#;
        let parsed: Quote = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.detail.deposit_address.as_deref(), Some("addr.near"));
        assert_eq!(parsed.detail.min_amount_out, "2475000");
        assert_eq!(parsed.min_amount_out(), 2_475_000);
    }

    #[test]
    fn test_malformed_min_amount_out_loses_selection() {
        let mut quotes = BTreeMap::new();
        let mut corrupt = quote("100");
        corrupt.detail.min_amount_out = "not-a-number".to_string();
        quotes.insert(Stablecoin::Usdc, corrupt);
        quotes.insert(Stablecoin::Usdt, quote("50"));
        let best = select_best_stablecoin_quote(&quotes).unwrap();
        assert_eq!(best.detail.min_amount_out, "50");
    }

    #[tokio::test]
    async fn test_fetch_returns_per_venue_errors() {
        // Unroutable base URL: both venue requests run to completion and
        // each venue carries its own transport error.
        let client = QuoteClient::new(
            "http://127.0.0.1:1/v0",
            None,
            Duration::from_millis(100),
        )
        .unwrap();
        let per_venue = client
            .fetch_stablecoin_quotes(
                "nep141:wrap.near",
                "1000",
                &AccountId::new("agent.alice.near"),
                true,
                None,
            )
            .await
            .unwrap();
        assert_eq!(per_venue.len(), 2);
        assert!(matches!(
            per_venue[&Stablecoin::Usdc],
            Err(SweepError::QuoteService(_))
        ));
        assert!(matches!(
            per_venue[&Stablecoin::Usdt],
            Err(SweepError::QuoteService(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_undelegated_account_before_any_request() {
        // The base URL is unroutable; reaching the network would error
        // differently than the precondition does.
        let client = QuoteClient::new(
            "http://127.0.0.1:1/v0",
            None,
            Duration::from_millis(100),
        )
        .unwrap();
        let result = client
            .get_stablecoin_quotes(
                "nep141:wrap.near",
                "1000",
                &AccountId::new("alice.near"),
                true,
                None,
            )
            .await;
        assert!(matches!(result, Err(SweepError::InvalidAccount(_))));
    }
}
