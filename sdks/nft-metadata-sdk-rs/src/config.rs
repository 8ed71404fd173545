//! Cluster connection settings read from the process environment.

use std::str::FromStr;

use anyhow::Context as _;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";
pub const RPC_URL_ENV: &str = "SOLANA_RPC_URL";
pub const COMMITMENT_ENV: &str = "SOLANA_COMMITMENT";

#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            commitment: CommitmentConfig::finalized(),
        }
    }
}

impl ClusterConfig {
    /// Read `SOLANA_RPC_URL` and `SOLANA_COMMITMENT`, falling back to a local
    /// validator at `finalized`. Call after `dotenvy` has loaded the env file.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let rpc_url = lookup(RPC_URL_ENV).filter(|v| !v.is_empty());
        let commitment = lookup(COMMITMENT_ENV).filter(|v| !v.is_empty());
        Self::with_overrides(rpc_url, commitment.as_deref())
            .with_context(|| format!("reading {COMMITMENT_ENV}"))
    }

    /// Defaults with explicit overrides applied, e.g. from command-line flags.
    pub fn with_overrides(
        rpc_url: Option<String>,
        commitment: Option<&str>,
    ) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(url) = rpc_url {
            config.rpc_url = url;
        }
        if let Some(level) = commitment {
            config.commitment = CommitmentConfig::from_str(level)
                .with_context(|| format!("{level} is not a commitment level"))?;
        }
        Ok(config)
    }

    pub fn rpc_client(&self) -> RpcClient {
        RpcClient::new_with_commitment(self.rpc_url.clone(), self.commitment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::commitment_config::CommitmentLevel;

    #[test]
    fn defaults_to_local_finalized() {
        let config = ClusterConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.commitment.commitment, CommitmentLevel::Finalized);
    }

    #[test]
    fn reads_overrides() {
        let config = ClusterConfig::from_lookup(|key| match key {
            RPC_URL_ENV => Some("https://api.devnet.solana.com".into()),
            COMMITMENT_ENV => Some("confirmed".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.rpc_url, "https://api.devnet.solana.com");
        assert_eq!(config.commitment.commitment, CommitmentLevel::Confirmed);
    }

    #[test]
    fn rejects_unknown_commitment() {
        let err = ClusterConfig::from_lookup(|key| {
            (key == COMMITMENT_ENV).then(|| "eventually".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("SOLANA_COMMITMENT"));
    }

    #[test]
    fn explicit_overrides_keep_remaining_defaults() {
        let config =
            ClusterConfig::with_overrides(Some("http://localhost:9000".into()), None).unwrap();
        assert_eq!(config.rpc_url, "http://localhost:9000");
        assert_eq!(config.commitment, CommitmentConfig::finalized());

        let config = ClusterConfig::with_overrides(None, Some("processed")).unwrap();
        assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.commitment.commitment, CommitmentLevel::Processed);

        let err = ClusterConfig::with_overrides(None, Some("eventually")).unwrap_err();
        assert!(err.to_string().contains("eventually"));
    }
}
