// condenser/core/execution/src/config.rs

use condenser_primitives::Gas;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A config value outside its allowed range
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid executor config: {0}")]
pub struct ConfigError(pub String);

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Gas charged to every invocation before any contract logic runs
    #[serde(default = "default_base_fee")]
    pub base_fee: Gas,

    /// Largest bytecode accepted by the create path
    #[serde(default = "default_max_code_size")]
    pub max_code_size: usize,

    /// Reject modules that expose no methods
    #[serde(default = "default_require_entry_points")]
    pub require_entry_points: bool,
}

fn default_base_fee() -> Gas {
    Gas::new(10_000)
}

fn default_max_code_size() -> usize {
    24 * 1024
}

fn default_require_entry_points() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            base_fee: default_base_fee(),
            max_code_size: default_max_code_size(),
            require_entry_points: default_require_entry_points(),
        }
    }
}

impl ExecutorConfig {
    /// Validate configuration constraints
    pub fn validate(&self) -> Result<(), String> {
        if self.base_fee == Gas::ZERO {
            return Err("base_fee must be positive".to_string());
        }
        if self.max_code_size == 0 {
            return Err("max_code_size must be positive".to_string());
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: ExecutorConfig = toml::from_str(content)?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save to file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}
