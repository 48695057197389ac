//! Wallet session error types.

use tap_core::error::{ChainIdError, UnitsError};
use thiserror::Error;

use crate::provider::RpcError;

/// Errors surfaced by wallet session operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    /// No injected provider at all.
    #[error("no wallet detected, please install a Web3 wallet")]
    NoWallet,

    /// A specific wallet brand was requested but is not injected.
    #[error("{0} wallet not found, please install the wallet extension")]
    WalletNotFound(String),

    /// The provider granted access to zero accounts.
    #[error("no accounts found")]
    NoAccounts,

    /// Operation requires a connected session.
    #[error("wallet not connected")]
    NotConnected,

    /// Error object returned by the provider.
    #[error(transparent)]
    Provider(#[from] RpcError),

    /// Malformed account or contract address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid monetary amount.
    #[error(transparent)]
    Units(#[from] UnitsError),

    /// Invalid chain identifier.
    #[error(transparent)]
    ChainId(#[from] ChainIdError),

    /// ABI fragment parsing or encoding failure.
    #[error("abi: {0}")]
    Abi(String),

    /// Unexpected shape of a provider response.
    #[error("unexpected response to {method}: {reason}")]
    Decode {
        /// JSON-RPC method whose result could not be decoded.
        method: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(String),

    /// Durable storage failure.
    #[error("storage: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization: {0}")]
    Serialization(String),

    /// Invalid configuration value.
    #[error("config: {0}")]
    Config(String),
}

impl WalletError {
    /// The user declined the wallet prompt or never granted access.
    pub fn is_user_declined(&self) -> bool {
        matches!(self, Self::Provider(rpc) if rpc.is_user_rejection() || rpc.is_unauthorized())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for WalletError {
    fn from(e: std::io::Error) -> Self {
        WalletError::Storage(e.to_string())
    }
}
