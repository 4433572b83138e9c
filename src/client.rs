//! The sweep client: explicit state object tying the swap flow together.
//!
//! Control flow: quote aggregation → action building → key derivation and
//! nonce sequencing → co-signature request → settlement polling. Each step
//! is exposed individually; [`SweepClient::swap_to_stablecoin`] runs the
//! whole sequence.
//!
//! The derived signing identity is memoized here, one per client instance,
//! as an explicit field rather than a hidden side effect. The cache must
//! not be shared across concurrent signing flows for the same proxy
//! account: nonce fetch-then-use is not atomic, and two concurrent flows
//! can compute the same nonce.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

use crate::actions::build_deposit_and_transfer_actions;
use crate::config::{ClientConfig, NearNetwork};
use crate::error::{SweepError, SweepResult};
use crate::mpc;
use crate::quotes::{select_best_stablecoin_quote, Quote, QuoteClient, Stablecoin};
use crate::rpc::NearRpcClient;
use crate::settlement::{SettlementClient, SwapStatus, TokenInfo};
use crate::signer::GatewayClient;
use crate::types::{
    AccountId, Action, DerivedKeyState, Intent, IntentAction, SignatureRequest, SignedIntent,
    SETTLEMENT_CONTRACT, SIGNATURE_REQUEST_GAS, TGAS,
};

/// Everything a caller needs after an executed swap: the winning quote, the
/// funded deposit address to poll, and the decoded co-signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub quote: Quote,
    pub deposit_address: String,
    pub signature: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SWEEP CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Client for MPC-delegated stablecoin swaps.
pub struct SweepClient {
    config: ClientConfig,
    rpc: NearRpcClient,
    quotes: QuoteClient,
    gateway: GatewayClient,
    settlement: SettlementClient,
    /// Signing identity resolved lazily on first use, held for the client's
    /// lifetime. No expiry; call [`SweepClient::invalidate_derived_key`] to
    /// force re-derivation.
    key_state: Option<DerivedKeyState>,
}

impl SweepClient {
    pub fn new(config: ClientConfig) -> SweepResult<Self> {
        let rpc = NearRpcClient::new(config.rpc_url.clone(), config.timeout)?;
        let quotes = QuoteClient::new(
            config.quote_base_url.clone(),
            config.referral.clone(),
            config.timeout,
        )?;
        let gateway = GatewayClient::new(config.gateway_url.clone(), config.timeout)?;
        let settlement = SettlementClient::new(config.quote_base_url.clone(), config.timeout)?;
        Ok(Self {
            config,
            rpc,
            quotes,
            gateway,
            settlement,
            key_state: None,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SIGNING IDENTITY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Resolve the signing identity for a proxy account, deriving it on
    /// first use and from the cache afterwards. A second call for the same
    /// account performs no RPC.
    pub async fn derived_key(&mut self, proxy_account: &AccountId) -> SweepResult<DerivedKeyState> {
        if let Some(state) = &self.key_state {
            if &state.derived_key.account_id == proxy_account {
                return Ok(state.clone());
            }
            tracing::warn!(
                cached = %state.derived_key.account_id,
                requested = %proxy_account,
                "cached key belongs to a different proxy account; re-deriving"
            );
        }

        let state = mpc::derive_key(&self.rpc, &self.config.mpc_signer, proxy_account).await?;
        self.key_state = Some(state.clone());
        Ok(state)
    }

    /// Drop the cached signing identity.
    pub fn invalidate_derived_key(&mut self) {
        self.key_state = None;
    }

    /// Next usable nonce for a proxy account's derived key, deriving the
    /// key first if needed. Freshly fetched per call; never reuse a nonce
    /// across signature requests.
    pub async fn next_nonce(&mut self, proxy_account: &AccountId) -> SweepResult<u64> {
        let state = self.derived_key(proxy_account).await?;
        mpc::next_nonce(&self.rpc, proxy_account, &state.derived_key.public_key).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUOTING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Aggregate stablecoin quotes for a source asset. See
    /// [`QuoteClient::get_stablecoin_quotes`].
    pub async fn get_stablecoin_quotes(
        &self,
        token_in: &str,
        amount_in: &str,
        proxy_account: &AccountId,
        dry: bool,
        deadline: Option<DateTime<Utc>>,
    ) -> SweepResult<BTreeMap<Stablecoin, Quote>> {
        self.quotes
            .get_stablecoin_quotes(token_in, amount_in, proxy_account, dry, deadline)
            .await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SIGNING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Request a threshold co-signature over a multi-action transaction.
    ///
    /// Fetches a fresh block hash and nonce, assembles the signature
    /// request, relays it through the proxy contract, and decodes the
    /// returned signature. Once submitted the request cannot be cancelled;
    /// a committed co-signature must be handled by the caller.
    pub async fn request_multi_action_signature(
        &mut self,
        contract_id: &str,
        actions: &[Action],
        proxy_account: &AccountId,
    ) -> SweepResult<String> {
        let block_hash = self.rpc.fetch_latest_block_hash().await?;
        let nonce = self.next_nonce(proxy_account).await?;
        let state = self.derived_key(proxy_account).await?;

        let actions_json = serde_json::to_string(actions)
            .map_err(|e| SweepError::Decode(format!("unserializable actions: {e}")))?;

        let request = SignatureRequest {
            contract_id: contract_id.to_string(),
            args: actions_json,
            deposit: "0".to_string(),
            nonce: nonce.to_string(),
            block_hash,
            mpc_signer_pk: state.derived_key.public_key.clone(),
            account_pk_for_mpc: state.account_public_key.clone(),
            method_name: None,
            gas: SIGNATURE_REQUEST_GAS.to_string(),
        };

        self.gateway
            .request_signature(proxy_account, &request)
            .await
    }

    /// Execute the full swap flow: pick the best stablecoin quote, build
    /// the deposit-and-transfer actions against its deposit address, and
    /// request the co-signature.
    pub async fn swap_to_stablecoin(
        &mut self,
        proxy_account: &AccountId,
        token_in: &str,
        amount_in: &str,
    ) -> SweepResult<SwapOutcome> {
        let quotes = self
            .get_stablecoin_quotes(token_in, amount_in, proxy_account, false, None)
            .await?;
        let quote = select_best_stablecoin_quote(&quotes)
            .ok_or_else(|| {
                SweepError::QuoteService("no venue returned a usable quote".to_string())
            })?
            .clone();

        let deposit_address = quote.detail.deposit_address.clone().ok_or_else(|| {
            SweepError::QuoteService("quote carries no deposit address".to_string())
        })?;

        // "nep141:wrap.near" quotes settle through the wrap.near contract.
        let token_contract = token_in.strip_prefix("nep141:").unwrap_or(token_in);
        let actions =
            build_deposit_and_transfer_actions(token_contract, amount_in, &deposit_address)?;

        let signature = self
            .request_multi_action_signature(token_contract, &actions, proxy_account)
            .await?;

        tracing::info!(
            proxy = %proxy_account,
            %deposit_address,
            "swap signed and deposit actions authorized"
        );
        Ok(SwapOutcome {
            quote,
            deposit_address,
            signature,
        })
    }

    /// Co-sign a `token_diff` swap intent against the intents verifying
    /// contract. Mainnet only.
    #[allow(clippy::too_many_arguments)]
    pub async fn sign_intent(
        &mut self,
        proxy_account: &AccountId,
        token_in: &str,
        token_out: &str,
        amount_in: &str,
        amount_out: &str,
        quote_hash: &str,
        deadline: &str,
        intent_nonce: &str,
    ) -> SweepResult<SignedIntent> {
        if self.config.network != NearNetwork::Mainnet {
            tracing::error!(network = %self.config.network, "intent signing attempted off mainnet");
            return Err(SweepError::MainnetOnly("intent signing"));
        }

        let intent = Intent {
            signer_id: proxy_account.clone(),
            nonce: intent_nonce.to_string(),
            verifying_contract: SETTLEMENT_CONTRACT.to_string(),
            deadline: deadline.to_string(),
            intents: vec![IntentAction::token_diff(
                token_in, amount_in, token_out, amount_out,
            )],
        };

        let block_hash = self.rpc.fetch_latest_block_hash().await?;
        let nonce = self.next_nonce(proxy_account).await?;
        let state = self.derived_key(proxy_account).await?;

        let request = SignatureRequest {
            contract_id: intent.verifying_contract.clone(),
            args: serde_json::to_string(&intent)
                .map_err(|e| SweepError::Decode(format!("unserializable intent: {e}")))?,
            deposit: (100 * TGAS).to_string(),
            nonce: nonce.to_string(),
            block_hash,
            mpc_signer_pk: state.derived_key.public_key.clone(),
            account_pk_for_mpc: state.account_public_key.clone(),
            method_name: None,
            gas: SIGNATURE_REQUEST_GAS.to_string(),
        };

        let raw = self
            .gateway
            .request_signature(proxy_account, &request)
            .await?;

        Ok(SignedIntent {
            signature: format!("secp256k1:{raw}"),
            intent,
            quote_hash: quote_hash.to_string(),
            public_key: state.derived_key.public_key,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SETTLEMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Single-shot settlement status check. See
    /// [`SettlementClient::check_status`].
    pub async fn check_status(&self, deposit_address: &str) -> SweepResult<SwapStatus> {
        self.settlement.check_status(deposit_address).await
    }

    /// Poll settlement status until a terminal state or the timeout
    /// elapses, returning the last observed status either way. Callers
    /// inspect [`SwapStatus::is_terminal`] to tell the two apart.
    pub async fn wait_for_settlement(
        &self,
        deposit_address: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> SweepResult<SwapStatus> {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.check_status(deposit_address).await?;
            if status.is_terminal() {
                tracing::info!(deposit_address, status = %status.status, "swap settled");
                return Ok(status);
            }
            if Instant::now() >= deadline {
                tracing::warn!(deposit_address, status = %status.status, "settlement poll timed out");
                return Ok(status);
            }
            sleep(poll_interval).await;
        }
    }

    /// Tokens supported by the settlement service.
    pub async fn list_tokens(&self) -> SweepResult<Vec<TokenInfo>> {
        self.settlement.list_tokens().await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLABORATOR QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// An account's balance in yoctoNEAR.
    pub async fn account_balance(&self, account_id: &AccountId) -> SweepResult<String> {
        self.rpc.view_account_balance(account_id).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
