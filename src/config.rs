use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

use crate::network::Commitment;
use crate::transfer::MachineConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Per-RPC debug lines from the network layer
    pub enable_tracing: bool,
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    pub name: String,
    pub rpc_url: String,
    /// Commitment for balance reads and subscriptions
    #[serde(default)]
    pub commitment: Commitment,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    /// Smallest transfer in whole tokens
    pub min_transfer: Decimal,
    /// How long a validation error stays visible
    pub error_display_ms: u64,
    pub submit_timeout_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            min_transfer: Decimal::new(1, 3),
            error_display_ms: 3000,
            submit_timeout_ms: 30_000,
        }
    }
}

impl TransferConfig {
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            min_transfer: self.min_transfer,
            submit_timeout: Duration::from_millis(self.submit_timeout_ms),
        }
    }

    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Io {
            path: config_path.clone(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Anything under one lamport truncates to an empty transfer
        if self.transfer.min_transfer < Decimal::new(1, 9) {
            return Err(ConfigError::Invalid(format!(
                "transfer.min_transfer must be at least 0.000000001, got {}",
                self.transfer.min_transfer
            )));
        }
        if self.transfer.submit_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "transfer.submit_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
