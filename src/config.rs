use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::ethereum::params::TxParams;

/// Settings threaded into every contract class and instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    pub rpc_url: String,
    /// Artifact network to bind; detected from the node when unset
    pub network: Option<String>,
    /// Artifact JSON to load instead of the embedded Offer artifact
    pub artifact: Option<PathBuf>,
    /// Milliseconds to wait for a receipt
    pub synchronization_timeout: u64,
    /// Milliseconds between receipt probes
    pub poll_interval: u64,
    /// Resolve transactions with receipt and decoded events
    pub next_gen: bool,
    pub defaults: TxDefaults,
}

/// Class-level transaction defaults as written in the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxDefaults {
    pub from: Option<String>,
    pub gas: Option<u64>,
    pub gas_price: Option<String>,
    pub value: Option<String>,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            network: None,
            artifact: None,
            synchronization_timeout: 240_000,
            poll_interval: 1_000,
            next_gen: false,
            defaults: TxDefaults::default(),
        }
    }
}

impl TxDefaults {
    pub fn to_params(&self) -> Result<TxParams> {
        let value = serde_json::json!({
            "from": self.from,
            "gas": self.gas,
            "gasPrice": self.gas_price,
            "value": self.value,
        });
        TxParams::from_json(&value).map_err(|e| anyhow!("Invalid [defaults] section: {}", e))
    }
}

impl BindingConfig {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: BindingConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    fn apply_env_vars(&mut self) {
        if let Ok(rpc_url) = std::env::var("OFFER_RPC_URL") {
            tracing::info!("Using OFFER_RPC_URL environment variable for the RPC endpoint");
            self.rpc_url = rpc_url;
        }

        if let Ok(network) = std::env::var("OFFER_NETWORK") {
            tracing::debug!("Using OFFER_NETWORK={} as the artifact network", network);
            self.network = Some(network);
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("offer-binding").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# Offer binding configuration

# JSON-RPC endpoint; the node signs transactions for unlocked accounts
rpc_url = "http://localhost:8545"

# Artifact network to bind ("default", "*", or a network id). Detected from
# the node when omitted.
# network = "default"

# Artifact to load instead of the embedded Offer artifact
# artifact = "build/contracts/Offer.json"

# Milliseconds to wait for a transaction receipt
synchronization_timeout = 240000

# Milliseconds between receipt probes
poll_interval = 1000

# Resolve transactions with receipt and decoded events instead of the hash
next_gen = false

# Transaction defaults merged under every call's options
[defaults]
# from = "0x0000000000000000000000000000000000000000"
# gas = 3000000
# gas_price = "20000000000"

# Environment variables that can be used:
# OFFER_RPC_URL - overrides rpc_url
# OFFER_NETWORK - overrides network
"#;
        sample_config.to_string()
    }
}
