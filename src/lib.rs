//! MPC-delegated stablecoin sweep client for NEAR.
//!
//! Rebalances a NEAR portfolio into stablecoins without the client ever
//! holding a private key: a proxy contract relays signature requests to a
//! threshold MPC signer, while an external quote service prices the swap
//! and settles it through the intents layer.
//!
//! The flow, end to end:
//!
//! 1. Aggregate USDC and USDT quotes concurrently and pick the best by
//!    minimum guaranteed output ([`quotes`]).
//! 2. Build the two-action deposit transaction against the winning quote's
//!    deposit address ([`actions`]).
//! 3. Derive the proxy account's MPC signing key and sequence a fresh
//!    nonce for it ([`mpc`]).
//! 4. Relay the signature request through the proxy contract gateway and
//!    decode the co-signature ([`signer`]).
//! 5. Poll the settlement service until the swap reaches a terminal
//!    status ([`settlement`]).
//!
//! [`SweepClient`] ties the steps together and owns the derived-key cache.
//!
//! # Example
//!
//! ```no_run
//! use stablesweep::{AccountId, ClientConfig, SweepClient};
//!
//! # async fn run() -> stablesweep::SweepResult<()> {
//! let config = ClientConfig::mainnet("https://gateway.example.com/call");
//! let mut client = SweepClient::new(config)?;
//!
//! let proxy = AccountId::new("agent.alice.near");
//! let outcome = client
//!     .swap_to_stablecoin(&proxy, "nep141:wrap.near", "1000000000000000000000000")
//!     .await?;
//!
//! let status = client
//!     .wait_for_settlement(
//!         &outcome.deposit_address,
//!         std::time::Duration::from_secs(5),
//!         std::time::Duration::from_secs(300),
//!     )
//!     .await?;
//! assert!(status.is_terminal());
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod error;
pub mod mpc;
pub mod quotes;
pub mod rpc;
pub mod settlement;
pub mod signer;
pub mod types;

pub use client::{SweepClient, SwapOutcome};
pub use config::{ClientConfig, NearNetwork};
pub use error::{SweepError, SweepResult};
pub use quotes::{select_best_stablecoin_quote, Quote, QuoteClient, Stablecoin};
pub use rpc::NearRpcClient;
pub use settlement::{SettlementClient, SwapStatus};
pub use signer::GatewayClient;
pub use types::{
    AccountId, Action, DerivedKeyState, Intent, IntentAction, MpcKey, SignatureRequest,
    SignedIntent,
};
