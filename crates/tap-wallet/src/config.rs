//! Wallet session configuration.
//!
//! Provides [`WalletConfig`] with defaults for the target network, storage
//! location and history scan window. Values can be overridden from
//! `TAP_WALLET_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use tap_core::chain::TargetNetwork;
use tap_core::constants::{
    BALANCE_DISPLAY_PLACES, DEFAULT_HISTORY_LIMIT, HISTORY_BLOCK_WINDOW, SESSION_STORAGE_KEY,
};

use crate::error::WalletError;

/// Configuration for a [`WalletManager`](crate::WalletManager).
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Network the wallet is asked to switch to.
    pub target: TargetNetwork,
    /// Directory for the file-backed session store.
    pub data_dir: PathBuf,
    /// Namespace key of the persisted session blob.
    pub storage_key: String,
    /// Maximum number of blocks scanned for transaction history.
    pub history_window: u64,
    /// Records fetched by the recent-transactions refresh.
    pub default_history_limit: usize,
    /// Fractional digits of the session balance.
    pub balance_places: usize,
    /// Delay between receipt polls while waiting for inclusion.
    pub receipt_poll_interval: Duration,
    /// Log level filter string (e.g. "info", "tap_wallet=debug").
    pub log_level: String,
    /// Log output format: "text" or "json".
    pub log_format: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bnbtap");

        Self {
            target: TargetNetwork::bnb(),
            data_dir,
            storage_key: SESSION_STORAGE_KEY.to_string(),
            history_window: HISTORY_BLOCK_WINDOW,
            default_history_limit: DEFAULT_HISTORY_LIMIT,
            balance_places: BALANCE_DISPLAY_PLACES,
            receipt_poll_interval: Duration::from_millis(1_000),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl WalletConfig {
    /// Load overrides from the process environment.
    pub fn from_env() -> Result<Self, WalletError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WalletError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(name) = lookup("TAP_WALLET_NETWORK") {
            cfg.target = TargetNetwork::by_name(&name)
                .ok_or_else(|| WalletError::Config(format!("unknown network: {name}")))?;
        }
        if let Some(dir) = lookup("TAP_WALLET_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup("TAP_WALLET_STORAGE_KEY") {
            cfg.storage_key = key;
        }
        if let Some(window) = lookup("TAP_WALLET_HISTORY_WINDOW") {
            cfg.history_window = window.parse().map_err(|_| {
                WalletError::Config("TAP_WALLET_HISTORY_WINDOW must be a positive integer".into())
            })?;
            if cfg.history_window == 0 {
                return Err(WalletError::Config(
                    "TAP_WALLET_HISTORY_WINDOW must be a positive integer".into(),
                ));
            }
            if cfg.history_window > HISTORY_BLOCK_WINDOW {
                return Err(WalletError::Config(format!(
                    "TAP_WALLET_HISTORY_WINDOW may not exceed {HISTORY_BLOCK_WINDOW}"
                )));
            }
        }
        if let Some(ms) = lookup("TAP_WALLET_RECEIPT_POLL_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                WalletError::Config("TAP_WALLET_RECEIPT_POLL_MS must be a positive integer".into())
            })?;
            cfg.receipt_poll_interval = Duration::from_millis(ms);
        }
        if let Some(level) = lookup("TAP_WALLET_LOG_LEVEL") {
            cfg.log_level = level;
        }
        if let Some(format) = lookup("TAP_WALLET_LOG_FORMAT") {
            if format != "text" && format != "json" {
                return Err(WalletError::Config(format!(
                    "TAP_WALLET_LOG_FORMAT must be \"text\" or \"json\", got {format}"
                )));
            }
            cfg.log_format = format;
        }

        Ok(cfg)
    }

    /// Directory of the session store.
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tap_core::chain::ChainId;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = WalletConfig::default();
        assert_eq!(cfg.storage_key, "wallet-storage");
        assert_eq!(cfg.history_window, 100);
        assert_eq!(cfg.default_history_limit, 15);
        assert_eq!(cfg.balance_places, 4);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.log_format, "text");
        assert!(cfg.data_dir.ends_with("bnbtap"));
        assert_eq!(cfg.target.mainnet.chain_id, ChainId(56));
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = WalletConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.history_window, WalletConfig::default().history_window);
    }

    #[test]
    fn overrides_apply() {
        let cfg = WalletConfig::from_lookup(lookup(&[
            ("TAP_WALLET_NETWORK", "testnet"),
            ("TAP_WALLET_DATA_DIR", "/tmp/bnbtap-test"),
            ("TAP_WALLET_HISTORY_WINDOW", "20"),
            ("TAP_WALLET_RECEIPT_POLL_MS", "50"),
            ("TAP_WALLET_LOG_LEVEL", "tap_wallet=debug"),
            ("TAP_WALLET_LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(cfg.target.mainnet.chain_id, ChainId(97));
        assert_eq!(cfg.storage_dir(), PathBuf::from("/tmp/bnbtap-test/storage"));
        assert_eq!(cfg.history_window, 20);
        assert_eq!(cfg.receipt_poll_interval, Duration::from_millis(50));
        assert_eq!(cfg.log_level, "tap_wallet=debug");
        assert_eq!(cfg.log_format, "json");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = WalletConfig::from_lookup(lookup(&[("TAP_WALLET_NETWORK", "solana")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "config: unknown network: solana");
        assert!(WalletConfig::from_lookup(lookup(&[("TAP_WALLET_HISTORY_WINDOW", "500")])).is_err());
        let err = WalletConfig::from_lookup(lookup(&[("TAP_WALLET_HISTORY_WINDOW", "0")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "config: TAP_WALLET_HISTORY_WINDOW must be a positive integer"
        );
        assert!(WalletConfig::from_lookup(lookup(&[("TAP_WALLET_LOG_FORMAT", "yaml")])).is_err());
        assert!(WalletConfig::from_lookup(lookup(&[("TAP_WALLET_RECEIPT_POLL_MS", "soon")])).is_err());
    }
}
