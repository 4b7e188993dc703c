//! Client Configuration
//!
//! Defaults target the Arbitrum Sepolia deployment. Every field can be
//! overridden from the environment.

use std::time::Duration;

use thiserror::Error;

use crate::core::address::Address;
use crate::core::amount::{DEFAULT_DECIMALS, MAX_DECIMALS};

/// MatchUp contract on Arbitrum Sepolia.
pub const DEFAULT_CONTRACT: &str = "0x284A4234FBed1714e5406880996BbC5820b63A6C";

/// Arbitrum Sepolia.
pub const DEFAULT_CHAIN_ID: u64 = 421614;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Variable present but unparseable.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// Environment variable.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Match client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket RPC endpoint. `None` means no live chain.
    pub rpc_url: Option<String>,
    /// MatchUp contract address.
    pub contract: Address,
    /// Chain the contract lives on.
    pub chain_id: u64,
    /// Give up waiting for a receipt after this long.
    pub confirmation_timeout: Duration,
    /// Receipt and log polling interval.
    pub poll_interval: Duration,
    /// Wager token decimals (USDC = 6).
    pub token_decimals: u8,
    /// Reject out-of-order calls locally before submitting.
    pub precheck: bool,
    /// Deadline for a single RPC request.
    pub request_timeout: Duration,
    /// Event broadcast buffer.
    pub event_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract: default_contract(),
            chain_id: DEFAULT_CHAIN_ID,
            confirmation_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(1000),
            token_decimals: DEFAULT_DECIMALS,
            precheck: true,
            request_timeout: Duration::from_secs(30),
            event_channel_capacity: 256,
        }
    }
}

fn default_contract() -> Address {
    DEFAULT_CONTRACT.parse().unwrap_or(Address::ZERO)
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            rpc_url: lookup("MATCHUP_RPC_URL").filter(|url| !url.is_empty()),
            contract: parse_var(&lookup, "MATCHUP_CONTRACT")?.unwrap_or(defaults.contract),
            chain_id: parse_var(&lookup, "MATCHUP_CHAIN_ID")?.unwrap_or(defaults.chain_id),
            confirmation_timeout: parse_var(&lookup, "MATCHUP_CONFIRM_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.confirmation_timeout),
            poll_interval: parse_var(&lookup, "MATCHUP_POLL_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            token_decimals: parse_decimals(&lookup)?.unwrap_or(defaults.token_decimals),
            precheck: match lookup("MATCHUP_PRECHECK") {
                Some(v) => parse_bool("MATCHUP_PRECHECK", &v)?,
                None => defaults.precheck,
            },
            request_timeout: defaults.request_timeout,
            event_channel_capacity: defaults.event_channel_capacity,
        })
    }

    /// Check if a live endpoint is configured.
    pub fn has_rpc(&self) -> bool {
        self.rpc_url.is_some()
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn parse_decimals(lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<u8>, ConfigError> {
    const VAR: &str = "MATCHUP_TOKEN_DECIMALS";
    match parse_var::<u8>(lookup, VAR)? {
        Some(decimals) if decimals > MAX_DECIMALS => Err(ConfigError::InvalidValue {
            var: VAR,
            value: decimals.to_string(),
        }),
        other => Ok(other),
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value: value.to_string() }),
    }
}
