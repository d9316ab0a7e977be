use crate::history::abi::AUCTION_BID;
use crate::history::{FailurePolicy, ReconstructOptions};
use alloy::primitives::Address;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// A named RPC network the auction house is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkPreset {
    pub name: &'static str,
    pub chain_id: Option<u64>,
    pub rpc_url: &'static str,
}

pub const NETWORKS: &[NetworkPreset] = &[
    NetworkPreset {
        name: "coverage",
        chain_id: None,
        rpc_url: "http://127.0.0.1:8555",
    },
    NetworkPreset {
        name: "localhost",
        chain_id: Some(1),
        rpc_url: "http://127.0.0.1:8545",
    },
    NetworkPreset {
        name: "ftmtestnet",
        chain_id: Some(4002),
        rpc_url: "https://xapi.testnet.fantom.network/lachesis",
    },
    NetworkPreset {
        name: "ftm",
        chain_id: Some(250),
        rpc_url: "https://rpc.ftm.tools/",
    },
];

pub fn network_preset(name: &str) -> Option<&'static NetworkPreset> {
    NETWORKS.iter().find(|n| n.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Network preset name (coverage, localhost, ftmtestnet, ftm).
    #[serde(default = "default_network")]
    pub network: String,
    /// Explicit RPC URL; overrides the preset URL when non-empty.
    /// Loaded from env PODHOUSE_RPC_URL when set.
    #[serde(default)]
    pub rpc_url: String,
    /// Tried in order when the primary endpoint is unreachable.
    #[serde(default)]
    pub fallback_rpc_urls: Vec<String>,
    /// Compare eth_chainId against the preset's chain id after connecting.
    #[serde(default = "default_true")]
    pub verify_chain_id: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Auction house proxy address.
    #[serde(default = "default_contract_address")]
    pub contract_address: String,
    /// Event name or full signature.
    #[serde(default = "default_event")]
    pub event: String,
    /// First block (inclusive) of the bid history.
    #[serde(default = "default_start_block")]
    pub start_block: u64,
    /// Last block (inclusive); latest block when unset.
    #[serde(default)]
    pub end_block: Option<u64>,
    /// Max blocks per eth_getLogs request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Max concurrent block lookups.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Overall deadline; 0 disables it.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    #[serde(default)]
    pub on_event_error: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_network() -> String {
    "ftm".to_string()
}
fn default_true() -> bool {
    true
}
fn default_contract_address() -> String {
    "0xc7d41396b44D7Eb650fb164DCf4bCd4d9Ef93990".to_string()
}
fn default_event() -> String {
    AUCTION_BID.to_string()
}
fn default_start_block() -> u64 {
    25_809_105
}
fn default_chunk_size() -> u64 {
    10_000
}
fn default_concurrency() -> usize {
    8
}
fn default_call_timeout_secs() -> u64 {
    30
}
fn default_deadline_secs() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            rpc_url: String::new(),
            fallback_rpc_urls: Vec::new(),
            verify_chain_id: true,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            contract_address: default_contract_address(),
            event: default_event(),
            start_block: default_start_block(),
            end_block: None,
            chunk_size: default_chunk_size(),
            concurrency: default_concurrency(),
            call_timeout_secs: default_call_timeout_secs(),
            deadline_secs: default_deadline_secs(),
            on_event_error: FailurePolicy::Abort,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables (no file needed).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("PODHOUSE_RPC_URL") {
            self.ledger.rpc_url = url;
        }
        if let Ok(network) = std::env::var("PODHOUSE_NETWORK") {
            self.ledger.network = network;
        }
        if let Ok(contract) = std::env::var("PODHOUSE_CONTRACT") {
            self.history.contract_address = contract;
        }
        if let Ok(block) = std::env::var("PODHOUSE_START_BLOCK") {
            self.history.start_block =
                block
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        field: "PODHOUSE_START_BLOCK",
                        reason: e.to_string(),
                    })?;
        }
        Ok(())
    }

    pub fn network(&self) -> Option<&'static NetworkPreset> {
        network_preset(&self.ledger.network)
    }

    /// Endpoints to try, in order: explicit URL or preset URL, then fallbacks.
    pub fn rpc_urls(&self) -> Result<Vec<String>, ConfigError> {
        let primary = if !self.ledger.rpc_url.is_empty() {
            self.ledger.rpc_url.clone()
        } else {
            self.network()
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "ledger.network",
                    reason: format!("unknown network {:?}", self.ledger.network),
                })?
                .rpc_url
                .to_string()
        };

        let mut urls = vec![primary];
        for url in &self.ledger.fallback_rpc_urls {
            if !url.is_empty() && !urls.contains(url) {
                urls.push(url.clone());
            }
        }
        Ok(urls)
    }

    pub fn contract_address(&self) -> Result<Address, ConfigError> {
        Address::from_str(self.history.contract_address.trim()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "history.contract_address",
                reason: e.to_string(),
            }
        })
    }

    pub fn reconstruct_options(&self) -> ReconstructOptions {
        let history = &self.history;
        ReconstructOptions {
            end_block: history.end_block,
            chunk_size: history.chunk_size.max(1),
            concurrency: history.concurrency.max(1),
            call_timeout: Duration::from_secs(history.call_timeout_secs),
            deadline: (history.deadline_secs > 0)
                .then(|| Duration::from_secs(history.deadline_secs)),
            on_event_error: history.on_event_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [ledger]
            network = "ftmtestnet"
            fallback_rpc_urls = ["https://rpc.testnet.fantom.network", ""]
            verify_chain_id = false

            [history]
            contract_address = "0x00000000000000000000000000000000000000aa"
            event = "AuctionBid(uint256,address,uint256,bool)"
            start_block = 100
            end_block = 200
            chunk_size = 2000
            concurrency = 4
            deadline_secs = 0
            on_event_error = "skip"

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.network().map(|n| n.chain_id), Some(Some(4002)));
        assert_eq!(
            config.rpc_urls().unwrap(),
            vec![
                "https://xapi.testnet.fantom.network/lachesis".to_string(),
                "https://rpc.testnet.fantom.network".to_string(),
            ]
        );
        assert!(!config.ledger.verify_chain_id);

        let options = config.reconstruct_options();
        assert_eq!(options.end_block, Some(200));
        assert_eq!(options.chunk_size, 2000);
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.call_timeout, Duration::from_secs(30));
        assert_eq!(options.deadline, None);
        assert_eq!(options.on_event_error, FailurePolicy::Skip);

        assert_eq!(
            config.contract_address().unwrap(),
            alloy::primitives::address!("00000000000000000000000000000000000000aa")
        );
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_defaults_track_deployment() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.history.start_block, 25_809_105);
        assert_eq!(config.history.event, "AuctionBid");
        assert_eq!(config.rpc_urls().unwrap(), vec!["https://rpc.ftm.tools/".to_string()]);
        assert_eq!(config.network().and_then(|n| n.chain_id), Some(250));
        assert!(config.contract_address().is_ok());
        assert_eq!(config.reconstruct_options().deadline, Some(Duration::from_secs(600)));
        assert_eq!(config.history.on_event_error, FailurePolicy::Abort);
    }

    #[test]
    fn test_explicit_rpc_url_and_bad_values() {
        let mut config = Config::default();
        config.ledger.rpc_url = "http://127.0.0.1:9999".to_string();
        config.ledger.fallback_rpc_urls = vec!["http://127.0.0.1:9999".to_string()];
        assert_eq!(config.rpc_urls().unwrap(), vec!["http://127.0.0.1:9999".to_string()]);

        config.ledger.rpc_url.clear();
        config.ledger.network = "mainnet".to_string();
        assert!(matches!(
            config.rpc_urls(),
            Err(ConfigError::InvalidValue { field: "ledger.network", .. })
        ));

        config.history.contract_address = "0x1234".to_string();
        assert!(config.contract_address().is_err());

        assert!(toml::from_str::<Config>("[history]\non_event_error = \"retry\"").is_err());
    }
}
