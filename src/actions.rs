//! Multi-action transaction assembly.
//!
//! Builds the ordered action sequence that moves a wrapped-native-token
//! balance into a swap-settlement deposit address: a `near_deposit` wrap
//! call followed by an `ft_transfer_call` into the settlement routing
//! contract. Order matters: the transfer spends the freshly wrapped balance.

use serde_json::json;

use crate::error::{SweepError, SweepResult};
use crate::types::{Action, ACTION_GAS, SETTLEMENT_CONTRACT, WRAP_NEAR};

/// Deposit attached to an `ft_transfer_call`, per the NEP-141 convention.
const ONE_YOCTO: &str = "1";

/// Build the deposit-then-transfer action pair funding a swap's deposit
/// address with `amount_in` of wrapped native token.
///
/// Only the canonical wrapped-native contract is supported as the source;
/// other tokens already live as NEP-141 balances and need no wrap step.
pub fn build_deposit_and_transfer_actions(
    token_in_address: &str,
    amount_in: &str,
    deposit_address: &str,
) -> SweepResult<Vec<Action>> {
    if token_in_address != WRAP_NEAR {
        tracing::error!(token = %token_in_address, "unsupported source token for deposit");
        return Err(SweepError::UnsupportedToken(token_in_address.to_string()));
    }

    let msg = json!({ "receiver_id": deposit_address }).to_string();

    let actions = vec![
        Action::function_call("near_deposit", json!({}), ACTION_GAS, amount_in),
        Action::function_call(
            "ft_transfer_call",
            json!({
                "receiver_id": SETTLEMENT_CONTRACT,
                "amount": amount_in,
                "msg": msg,
            }),
            ACTION_GAS,
            ONE_YOCTO,
        ),
    ];

    tracing::debug!(
        amount = %amount_in,
        deposit_address = %deposit_address,
        "built deposit and transfer actions"
    );
    Ok(actions)
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_NEAR_STR: &str = "1000000000000000000000000";

    #[test]
    fn test_builds_two_actions_in_order() {
        let actions =
            build_deposit_and_transfer_actions(WRAP_NEAR, ONE_NEAR_STR, "addr.near").unwrap();
        assert_eq!(actions.len(), 2);

        let Action::FunctionCall {
            method_name,
            deposit,
            gas,
            ..
        } = &actions[0];
        assert_eq!(method_name, "near_deposit");
        assert_eq!(deposit, ONE_NEAR_STR);
        assert_eq!(gas, &ACTION_GAS.to_string());

        let Action::FunctionCall {
            method_name,
            args,
            deposit,
            ..
        } = &actions[1];
        assert_eq!(method_name, "ft_transfer_call");
        assert_eq!(deposit, ONE_YOCTO);
        assert_eq!(args["receiver_id"], SETTLEMENT_CONTRACT);
        assert_eq!(args["amount"], ONE_NEAR_STR);
    }

    #[test]
    fn test_transfer_message_names_deposit_address() {
        let actions =
            build_deposit_and_transfer_actions(WRAP_NEAR, ONE_NEAR_STR, "addr.near").unwrap();
        let Action::FunctionCall { args, .. } = &actions[1];
        let msg: serde_json::Value =
            serde_json::from_str(args["msg"].as_str().unwrap()).unwrap();
        assert_eq!(msg, serde_json::json!({ "receiver_id": "addr.near" }));
    }

    #[test]
    fn test_rejects_unsupported_token() {
        let result = build_deposit_and_transfer_actions("unknown.token", "1000", "addr.near");
        assert!(matches!(result, Err(SweepError::UnsupportedToken(t)) if t == "unknown.token"));
    }

    #[test]
    fn test_actions_serialize_for_proxy_contract() {
        let actions =
            build_deposit_and_transfer_actions(WRAP_NEAR, ONE_NEAR_STR, "addr.near").unwrap();
        let json = serde_json::to_value(&actions).unwrap();
        assert_eq!(json[0]["type"], "FunctionCall");
        assert_eq!(json[1]["type"], "FunctionCall");
        assert_eq!(json[1]["args"]["msg"], r#"{"receiver_id":"addr.near"}"#);
    }
}
