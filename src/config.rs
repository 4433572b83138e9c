//! Client configuration and network selection.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// NETWORK
// ═══════════════════════════════════════════════════════════════════════════════

/// NEAR network selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NearNetwork {
    Mainnet,
    Testnet,
}

impl NearNetwork {
    /// Default RPC endpoint for the network.
    pub fn rpc_url(&self) -> &'static str {
        match self {
            NearNetwork::Mainnet => "https://rpc.mainnet.fastnear.com",
            NearNetwork::Testnet => "https://rpc.testnet.fastnear.com",
        }
    }

    /// MPC signer contract for the network.
    pub fn mpc_signer(&self) -> &'static str {
        match self {
            NearNetwork::Mainnet => "v1.signer",
            NearNetwork::Testnet => "v1.signer-prod.testnet",
        }
    }
}

impl std::fmt::Display for NearNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NearNetwork::Mainnet => write!(f, "mainnet"),
            NearNetwork::Testnet => write!(f, "testnet"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLIENT CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for the sweep client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// NEAR network (mainnet/testnet).
    pub network: NearNetwork,
    /// NEAR JSON-RPC endpoint.
    pub rpc_url: String,
    /// MPC signer contract account.
    pub mpc_signer: String,
    /// Base URL of the swap quote service.
    pub quote_base_url: String,
    /// URL of the proxy contract call gateway.
    pub gateway_url: String,
    /// Referral tag attached to quote requests.
    pub referral: Option<String>,
    /// Timeout applied to every HTTP request.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn mainnet(gateway_url: impl Into<String>) -> Self {
        Self::for_network(NearNetwork::Mainnet, gateway_url)
    }

    pub fn testnet(gateway_url: impl Into<String>) -> Self {
        Self::for_network(NearNetwork::Testnet, gateway_url)
    }

    fn for_network(network: NearNetwork, gateway_url: impl Into<String>) -> Self {
        Self {
            network,
            rpc_url: network.rpc_url().to_string(),
            mpc_signer: network.mpc_signer().to_string(),
            quote_base_url: "https://1click.chaindefuser.com/v0".to_string(),
            gateway_url: gateway_url.into(),
            referral: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Override the RPC endpoint.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Override the quote service base URL.
    pub fn with_quote_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.quote_base_url = base_url.into();
        self
    }

    /// Attach a referral tag to every quote request.
    pub fn with_referral(mut self, referral: impl Into<String>) -> Self {
        self.referral = Some(referral.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_defaults() {
        assert_eq!(NearNetwork::Mainnet.mpc_signer(), "v1.signer");
        assert_eq!(NearNetwork::Testnet.mpc_signer(), "v1.signer-prod.testnet");
        assert!(NearNetwork::Mainnet.rpc_url().contains("mainnet"));
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::mainnet("https://gateway.example.com")
            .with_referral("sweep.referral.near");
        assert_eq!(config.network, NearNetwork::Mainnet);
        assert_eq!(config.mpc_signer, "v1.signer");
        assert_eq!(config.referral.as_deref(), Some("sweep.referral.near"));
        assert_eq!(config.gateway_url, "https://gateway.example.com");
    }
}
