//! Session state and its persisted subset.

use serde::{Deserialize, Serialize};

use tap_core::chain::{ChainId, TargetNetwork};
use tap_core::constants::ZERO_BALANCE;

use crate::error::WalletError;

/// Current persisted-session format version.
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// Connection state of the wallet session.
///
/// `is_connected` implies `address.is_some()`; every mutation path keeps
/// the two in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_connected: bool,
    pub address: Option<String>,
    pub chain_id: Option<ChainId>,
    /// Native balance with four fractional digits, `"0"` when unknown.
    pub balance: String,
    pub connected_wallet_name: Option<String>,
    pub last_error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::empty()
    }
}

/// Derived connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connected { on_target_chain: bool },
}

impl Session {
    pub fn empty() -> Self {
        Self {
            is_connected: false,
            address: None,
            chain_id: None,
            balance: ZERO_BALANCE.to_string(),
            connected_wallet_name: None,
            last_error: None,
        }
    }

    /// Mark connected with `address`.
    pub fn connect(&mut self, address: String, wallet_name: String) {
        self.is_connected = true;
        self.address = Some(address);
        self.connected_wallet_name = Some(wallet_name);
    }

    /// Reset every field in place.
    pub fn reset(&mut self) {
        *self = Self::empty();
    }

    pub fn is_on_target_chain(&self, target: &TargetNetwork) -> bool {
        self.chain_id.is_some_and(|id| target.is_target(&id))
    }

    pub fn status(&self, target: &TargetNetwork) -> SessionStatus {
        if self.is_connected {
            SessionStatus::Connected {
                on_target_chain: self.is_on_target_chain(target),
            }
        } else {
            SessionStatus::Disconnected
        }
    }

    /// Shortened address for display: `0x1234...abcd`.
    pub fn formatted_address(&self) -> String {
        match &self.address {
            Some(addr) if addr.len() > 10 && addr.is_ascii() => {
                format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
            }
            Some(addr) => addr.clone(),
            None => String::new(),
        }
    }

    /// Restore the persisted subset; `last_error` is never persisted.
    pub fn restore(&mut self, persisted: &PersistedSession) {
        self.is_connected = persisted.is_connected && persisted.address.is_some();
        self.address = persisted.address.clone();
        self.balance = persisted.balance.clone();
        self.chain_id = persisted.chain_id;
        self.connected_wallet_name = persisted.connected_wallet_name.clone();
    }
}

/// The subset of [`Session`] mirrored to durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub version: u32,
    pub is_connected: bool,
    pub address: Option<String>,
    pub balance: String,
    pub chain_id: Option<ChainId>,
    pub connected_wallet_name: Option<String>,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            version: SESSION_FORMAT_VERSION,
            is_connected: session.is_connected,
            address: session.address.clone(),
            balance: session.balance.clone(),
            chain_id: session.chain_id,
            connected_wallet_name: session.connected_wallet_name.clone(),
        }
    }
}

/// Structured outcome of a user-initiated operation, shaped for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            hash: None,
            error: None,
        }
    }

    pub fn failed(error: &WalletError) -> Self {
        Self {
            success: false,
            hash: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<&Result<(), WalletError>> for ActionResult {
    fn from(result: &Result<(), WalletError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e),
        }
    }
}

impl From<&Result<String, WalletError>> for ActionResult {
    fn from(result: &Result<String, WalletError>) -> Self {
        match result {
            Ok(hash) => Self {
                hash: Some(hash.clone()),
                ..Self::ok()
            },
            Err(e) => Self::failed(e),
        }
    }
}
