//! Configuration management for ForgeChain

use crate::crypto::{address_from_hex, Address};
use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub miner: MinerConfig,
    #[serde(default)]
    pub chain: ChainConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MinerConfig {
    /// Worker threads; 0 means one per available CPU.
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_coinbase")]
    pub coinbase: String,
    #[serde(default = "default_mining_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    #[serde(default = "default_initial_difficulty")]
    pub initial_difficulty: u64,
    #[serde(default = "default_max_block_transactions")]
    pub max_block_transactions: usize,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            coinbase: default_coinbase(),
            enabled: default_mining_enabled(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            initial_difficulty: default_initial_difficulty(),
            max_block_transactions: default_max_block_transactions(),
        }
    }
}

impl MinerConfig {
    pub fn coinbase_address(&self) -> Result<Address, ChainError> {
        address_from_hex(&self.coinbase)
            .map_err(|e| ChainError::ConfigError(format!("miner.coinbase: {}", e)))
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ChainError> {
        self.miner.coinbase_address()?;
        if self.chain.max_block_transactions == 0 {
            return Err(ChainError::ConfigError(
                "chain.max_block_transactions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads the config at `path`, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path)?;
    Config::from_toml_str(&text)
}

fn default_coinbase() -> String {
    "00".repeat(32)
}

fn default_mining_enabled() -> bool {
    true
}

fn default_initial_difficulty() -> u64 {
    1000
}

fn default_max_block_transactions() -> usize {
    1000
}
