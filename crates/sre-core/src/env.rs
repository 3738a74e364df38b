// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed view over the process environment.

/// Default ledger RPC endpoint when `SOLANA_RPC_URL` is unset.
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";

/// Configuration read once at startup from environment variables.
///
/// Constructors are explicit so tests can build a [`RuntimeEnv`] by hand
/// instead of mutating the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    /// Ledger RPC endpoint for transaction submission.
    pub solana_rpc_url: Option<String>,
    /// WebSocket credential for the listener.
    pub helius_api_key: Option<String>,
    /// When present, selects the gist storage provider.
    pub github_token: Option<String>,
    /// Preferred AI provider credential.
    pub deepseek_api_key: Option<String>,
    /// Fallback AI provider credential.
    pub openai_api_key: Option<String>,
    /// Executor signing identity (base58 secret).
    pub executor_keypair: Option<String>,
    /// Challenger signing identity (base58 secret).
    pub challenger_keypair: Option<String>,
    /// Seed orders for offline watcher runs, comma separated.
    pub test_orders: Vec<String>,
    /// Single seed order for demo runs.
    pub test_order_pubkey: Option<String>,
}

impl RuntimeEnv {
    /// Snapshot the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            solana_rpc_url: read("SOLANA_RPC_URL"),
            helius_api_key: read("HELIUS_API_KEY"),
            github_token: read("GITHUB_TOKEN"),
            deepseek_api_key: read("DEEPSEEK_API_KEY"),
            openai_api_key: read("OPENAI_API_KEY"),
            executor_keypair: read("EXECUTOR_KEYPAIR"),
            challenger_keypair: read("CHALLENGER_KEYPAIR"),
            test_orders: read("TEST_ORDERS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            test_order_pubkey: read("TEST_ORDER_PUBKEY"),
        }
    }

    /// RPC endpoint with the devnet default applied.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        self.solana_rpc_url.as_deref().unwrap_or(DEVNET_RPC_URL)
    }
}

fn read(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_env_uses_devnet() {
        let env = RuntimeEnv::default();
        assert_eq!(env.rpc_url(), DEVNET_RPC_URL);
    }

    #[test]
    fn explicit_rpc_wins() {
        let env = RuntimeEnv {
            solana_rpc_url: Some("https://rpc.example".into()),
            ..RuntimeEnv::default()
        };
        assert_eq!(env.rpc_url(), "https://rpc.example");
    }

    #[test]
    fn test_order_lists_split_and_trim() {
        assert_eq!(
            split_list(" a , b ,, c"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(split_list("  ").is_empty());
    }
}
