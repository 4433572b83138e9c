//! Error types for the stablesweep client.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type SweepResult<T> = Result<T, SweepError>;

/// Errors that can occur while quoting, signing, or settling a swap.
#[derive(Debug, Error)]
pub enum SweepError {
    // ═══════════════════════════════════════════════════════════════════════════════
    // TRANSPORT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════
    /// NEAR RPC transport or HTTP failure. Not retried here; surfaced to the caller.
    #[error("NEAR RPC request failed: {0}")]
    Rpc(String),

    /// Quote service request failed for one venue. Recovered locally during
    /// aggregation; fatal when a single quote was requested explicitly.
    #[error("quote service request failed: {0}")]
    QuoteService(String),

    /// Settlement status service transport failure.
    #[error("settlement service request failed: {0}")]
    Settlement(String),

    /// HTTP client construction failed.
    #[error("failed to build HTTP client: {0}")]
    Http(String),

    // ═══════════════════════════════════════════════════════════════════════════════
    // PROTOCOL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════
    /// Malformed byte/base64/UTF-8 payload. Indicates a protocol mismatch.
    #[error("failed to decode payload: {0}")]
    Decode(String),

    /// The proxy contract rejected the signature request. The raw status is
    /// kept for operator diagnosis; the caller may retry with a fresh nonce
    /// and block hash since both are stale after a rejection.
    #[error("proxy contract call rejected with status {status}")]
    ContractCall { status: serde_json::Value },

    // ═══════════════════════════════════════════════════════════════════════════════
    // PRECONDITION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════════
    /// The account has no access keys on chain.
    #[error("no access keys found for account {0}")]
    NoKeysFound(String),

    /// No full-access ed25519 key usable as the MPC derivation path.
    #[error("no full-access ed25519 key found for account {0}")]
    NoFullAccessKey(String),

    /// Access-key lookup for the derived key returned no nonce.
    #[error("no nonce found for key {public_key} on account {account_id}")]
    NoNonceFound {
        account_id: String,
        public_key: String,
    },

    /// Proxy account is missing the required delegation prefix.
    #[error("invalid proxy account `{0}`: delegated accounts must start with `agent.`")]
    InvalidAccount(String),

    /// Action builder was given a source asset it cannot move.
    #[error("unsupported source token `{0}`: only the wrapped native token can be deposited")]
    UnsupportedToken(String),

    /// Operation restricted to mainnet.
    #[error("{0} is only supported on mainnet")]
    MainnetOnly(&'static str),
}
