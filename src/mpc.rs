//! MPC key derivation and nonce sequencing.
//!
//! A proxy account's signing identity is resolved in two steps: the first
//! full-access ed25519 key of the account becomes the derivation path, then
//! the MPC signer contract's `derived_public_key` view method produces the
//! delegated signing key scoped to that account. The resulting
//! [`DerivedKeyState`] is returned as new state; memoization is the caller's
//! concern (see [`crate::client::SweepClient`]), never a hidden side effect
//! here.

use serde_json::json;

use crate::error::{SweepError, SweepResult};
use crate::rpc::NearRpcClient;
use crate::types::{AccessKeyRecord, AccountId, DerivedKeyState, MpcKey, ED25519_PREFIX};

/// Safety increment applied over the on-chain nonce to tolerate pending
/// transactions. A heuristic, not a guarantee: concurrent signing with the
/// same derived key can still race.
pub const NONCE_GAP: u64 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// KEY DERIVATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Select the first full-access ed25519 key from an access-key list.
///
/// Keys are considered in returned order, unsorted; callers must not depend
/// on a specific key being chosen when multiple qualify.
pub fn select_full_access_key(keys: &[AccessKeyRecord]) -> Option<&AccessKeyRecord> {
    keys.iter().find(|key| {
        key.access_key.permission.is_full_access() && key.public_key.starts_with(ED25519_PREFIX)
    })
}

/// Derive the MPC signing key for a proxy account.
///
/// Fetches the account's access keys, selects the derivation-path key, and
/// calls the MPC signer's `derived_public_key` view method with
/// `{predecessor, path}`. Returns the full signing identity as new state.
pub async fn derive_key(
    rpc: &NearRpcClient,
    mpc_signer: &str,
    proxy_account: &AccountId,
) -> SweepResult<DerivedKeyState> {
    tracing::debug!(account = %proxy_account, "deriving MPC key");

    let keys = rpc.view_access_key_list(proxy_account).await?;
    if keys.is_empty() {
        tracing::error!(account = %proxy_account, "account has no access keys");
        return Err(SweepError::NoKeysFound(proxy_account.to_string()));
    }

    let path_key = select_full_access_key(&keys).ok_or_else(|| {
        tracing::error!(account = %proxy_account, "no full-access ed25519 key found");
        SweepError::NoFullAccessKey(proxy_account.to_string())
    })?;

    let derived = rpc
        .call_view_function(
            mpc_signer,
            "derived_public_key",
            &json!({
                "predecessor": proxy_account.as_str(),
                "path": path_key.public_key,
            }),
        )
        .await?;

    tracing::info!(account = %proxy_account, derived_key = %derived, "derived MPC key");
    Ok(DerivedKeyState {
        derived_key: MpcKey {
            public_key: derived,
            account_id: proxy_account.clone(),
        },
        account_public_key: path_key.public_key.clone(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// NONCE SEQUENCING
// ═══════════════════════════════════════════════════════════════════════════════

/// Compute the next usable nonce from the chain-observed one.
pub fn nonce_with_gap(on_chain_nonce: u64) -> u64 {
    on_chain_nonce + NONCE_GAP
}

/// Fetch the next usable nonce for a derived key.
///
/// Queries the access-key entry for `(proxy_account, derived_key)` and
/// applies [`NONCE_GAP`]. The fetch-then-use sequence is not atomic: two
/// concurrent signing flows over the same derived key can compute the same
/// nonce, so callers must serialize signing per proxy account externally.
pub async fn next_nonce(
    rpc: &NearRpcClient,
    proxy_account: &AccountId,
    derived_key: &str,
) -> SweepResult<u64> {
    let entry = rpc.view_access_key(proxy_account, derived_key).await?;
    let on_chain = entry.get("nonce").and_then(|n| n.as_u64()).ok_or_else(|| {
        tracing::error!(account = %proxy_account, key = %derived_key, "access key has no nonce");
        SweepError::NoNonceFound {
            account_id: proxy_account.to_string(),
            public_key: derived_key.to_string(),
        }
    })?;

    let next = nonce_with_gap(on_chain);
    tracing::debug!(account = %proxy_account, on_chain, next, "computed next nonce");
    Ok(next)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessKeyInfo, AccessKeyPermission};

    fn key(public_key: &str, permission: &str) -> AccessKeyRecord {
        AccessKeyRecord {
            public_key: public_key.to_string(),
            access_key: AccessKeyInfo {
                nonce: 0,
                permission: AccessKeyPermission::Named(permission.to_string()),
            },
        }
    }

    fn function_call_key(public_key: &str) -> AccessKeyRecord {
        AccessKeyRecord {
            public_key: public_key.to_string(),
            access_key: AccessKeyInfo {
                nonce: 0,
                permission: AccessKeyPermission::FunctionCall(serde_json::json!({
                    "allowance": "250000000000000000000000",
                    "receiver_id": "wrap.near",
                    "method_names": [],
                })),
            },
        }
    }

    #[test]
    fn test_selects_first_full_access_ed25519() {
        let keys = vec![
            function_call_key("ed25519:limited"),
            key("secp256k1:wrongcurve", "FullAccess"),
            key("ed25519:first", "FullAccess"),
            key("ed25519:second", "FullAccess"),
        ];
        let selected = select_full_access_key(&keys).unwrap();
        assert_eq!(selected.public_key, "ed25519:first");
    }

    #[test]
    fn test_no_eligible_key() {
        let keys = vec![
            function_call_key("ed25519:limited"),
            key("secp256k1:wrongcurve", "FullAccess"),
        ];
        assert!(select_full_access_key(&keys).is_none());
        assert!(select_full_access_key(&[]).is_none());
    }

    #[test]
    fn test_nonce_gap() {
        assert_eq!(nonce_with_gap(87), 97);
        assert_eq!(nonce_with_gap(0), 10);
    }
}
