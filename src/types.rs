//! Shared protocol types and constants.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// One TGas in gas units.
pub const TGAS: u64 = 1_000_000_000_000;

/// One NEAR in yoctoNEAR.
pub const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

/// Gas attached to each action in a multi-action transaction.
pub const ACTION_GAS: u64 = 100 * TGAS;

/// Default gas for a `request_signature` proxy call, as a string for the wire.
pub const SIGNATURE_REQUEST_GAS: &str = "50000000000000";

/// Prefix a proxy account must carry before it may quote or sign.
pub const DELEGATION_PREFIX: &str = "agent.";

/// Curve prefix of keys eligible as the MPC derivation path.
pub const ED25519_PREFIX: &str = "ed25519:";

/// Canonical wrapped native token contract.
pub const WRAP_NEAR: &str = "wrap.near";

/// Settlement routing contract receiving wrapped-token deposits.
pub const SETTLEMENT_CONTRACT: &str = "intents.near";

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNTS AND KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// A NEAR account identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this account carries the delegation prefix required of a
    /// proxy account.
    pub fn is_delegated(&self) -> bool {
        self.0.starts_with(crate::types::DELEGATION_PREFIX)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Access-key permission as reported by `view_access_key_list`. Full access
/// is the bare string `"FullAccess"`; function-call keys carry an object.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessKeyPermission {
    Named(String),
    FunctionCall(serde_json::Value),
}

impl AccessKeyPermission {
    pub fn is_full_access(&self) -> bool {
        matches!(self, AccessKeyPermission::Named(name) if name == "FullAccess")
    }
}

/// On-chain access-key state for one key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessKeyInfo {
    pub nonce: u64,
    pub permission: AccessKeyPermission,
}

/// One entry of a `view_access_key_list` result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessKeyRecord {
    pub public_key: String,
    pub access_key: AccessKeyInfo,
}

/// A public key derived for a proxy account through the MPC signer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpcKey {
    /// The derived public key.
    pub public_key: String,
    /// Proxy account the key was derived for.
    pub account_id: AccountId,
}

/// Signing identity resolved for a proxy account: the MPC-derived key plus
/// the full-access account key used as its derivation path. Produced once
/// per proxy account per client instance and memoized by the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedKeyState {
    pub derived_key: MpcKey,
    pub account_public_key: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION ACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// One action of a multi-action transaction intent, in the JSON shape the
/// proxy contract parses. Gas and deposit travel as strings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    FunctionCall {
        method_name: String,
        args: serde_json::Value,
        gas: String,
        deposit: String,
    },
}

impl Action {
    pub fn function_call(
        method_name: impl Into<String>,
        args: serde_json::Value,
        gas: u64,
        deposit: impl Into<String>,
    ) -> Self {
        Action::FunctionCall {
            method_name: method_name.into(),
            args,
            gas: gas.to_string(),
            deposit: deposit.into(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIGNATURE REQUEST
// ═══════════════════════════════════════════════════════════════════════════════

/// Payload relayed to the proxy contract's `request_signature` method.
/// Nonce and block hash must be freshly fetched per request; reuse across
/// requests is invalid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureRequest {
    /// Receiver contract of the transaction being signed.
    pub contract_id: String,
    /// Serialized actions or intent payload.
    pub args: String,
    /// Deposit the proxy attaches to the signed transaction.
    pub deposit: String,
    /// Next usable nonce for the derived key.
    pub nonce: String,
    /// Latest finalized block hash.
    pub block_hash: String,
    /// MPC-derived public key authorizing the transaction.
    pub mpc_signer_pk: String,
    /// Full-access account key used as the derivation path.
    pub account_pk_for_mpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,
    pub gas: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SWAP INTENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// One intent entry of a signed swap intent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntentAction {
    pub intent: String,
    pub diff: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl IntentAction {
    /// A `token_diff` entry swapping `amount_in` of `token_in` for
    /// `amount_out` of `token_out`.
    pub fn token_diff(
        token_in: &str,
        amount_in: &str,
        token_out: &str,
        amount_out: &str,
    ) -> Self {
        let mut diff = BTreeMap::new();
        diff.insert(token_in.to_string(), format!("-{amount_in}"));
        diff.insert(token_out.to_string(), amount_out.to_string());
        Self {
            intent: "token_diff".to_string(),
            diff,
            referral: None,
            receiver_id: None,
            tokens: None,
            memo: None,
        }
    }
}

/// A swap intent to be co-signed and published against the intents
/// verifying contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intent {
    pub signer_id: AccountId,
    pub nonce: String,
    pub verifying_contract: String,
    pub deadline: String,
    pub intents: Vec<IntentAction>,
}

/// A co-signed intent ready for publication.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedIntent {
    /// Prefixed signature string (e.g. `secp256k1:…`).
    pub signature: String,
    pub intent: Intent,
    pub quote_hash: String,
    /// MPC-derived public key that authorized the intent.
    pub public_key: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
