//! Injected wallet providers (EIP-1193).
//!
//! A browser wallet exposes a `request({method, params})` entry point, a
//! handful of notifications (`accountsChanged`, `chainChanged`,
//! `disconnect`) and a bag of boolean brand flags. [`Eip1193Provider`]
//! captures that contract; [`HostEnvironment`] models the set of globals
//! under which wallets inject themselves.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

use tap_core::chain::{ChainId, NetworkDescriptor};
use tap_core::constants::{ERR_UNAUTHORIZED, ERR_UNRECOGNIZED_CHAIN, ERR_USER_REJECTED};

use crate::brand::WalletKey;
use crate::error::WalletError;

/// Error object returned by a provider request (`ProviderRpcError`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// The wallet does not know the requested chain yet.
    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == ERR_UNRECOGNIZED_CHAIN
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == ERR_USER_REJECTED
    }

    /// The origin has not been granted access to the requested account.
    pub fn is_unauthorized(&self) -> bool {
        self.code == ERR_UNAUTHORIZED
    }
}

/// Notification pushed by a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// New list of authorized accounts; empty means access was revoked.
    AccountsChanged(Vec<String>),
    /// Raw chain id as emitted by the provider (hex or decimal).
    ChainChanged(String),
    /// Provider lost its connection to every chain.
    Disconnect(Option<RpcError>),
}

impl fmt::Display for ProviderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountsChanged(accounts) => write!(f, "accountsChanged({})", accounts.len()),
            Self::ChainChanged(id) => write!(f, "chainChanged({id})"),
            Self::Disconnect(_) => write!(f, "disconnect"),
        }
    }
}

/// Brand-identifying flags set by wallets on their provider object.
///
/// Field names deserialize from the JavaScript property names, so a flag
/// bag read off an injected object maps directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandFlags {
    #[serde(rename = "isMetaMask")]
    pub is_metamask: bool,
    #[serde(rename = "isTokenPocket")]
    pub is_token_pocket: bool,
    #[serde(rename = "isTrust")]
    pub is_trust: bool,
    #[serde(rename = "isSafePal")]
    pub is_safe_pal: bool,
    #[serde(rename = "isCoinbaseWallet")]
    pub is_coinbase_wallet: bool,
    #[serde(rename = "isWalletConnect")]
    pub is_wallet_connect: bool,
    #[serde(rename = "isBinance")]
    pub is_binance: bool,
    #[serde(rename = "isOkxWallet")]
    pub is_okx_wallet: bool,
}

impl BrandFlags {
    /// True when a wallet other than MetaMask has claimed the provider.
    ///
    /// These wallets also set `isMetaMask` for dapp compatibility.
    pub fn shadows_metamask(&self) -> bool {
        self.is_token_pocket || self.is_trust || self.is_safe_pal || self.is_binance
    }
}

/// An injected EIP-1193 wallet provider.
///
/// Implemented by the embedding layer (a wasm binding to `window.ethereum`
/// in the browser) and by the scriptable provider used in tests.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    /// Send a JSON-RPC request. May suspend until the user answers a prompt.
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Brand flags exposed by this provider object.
    fn flags(&self) -> BrandFlags;

    /// Subscribe to provider notifications.
    ///
    /// Dropping the receiver removes the listener.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

impl dyn Eip1193Provider {
    async fn call(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        debug!(method, "provider request");
        let result = self.request(method, params).await;
        if let Err(e) = &result {
            debug!(method, code = e.code, "provider request failed: {}", e.message);
        }
        Ok(result?)
    }

    /// Accounts already authorized for this origin (never prompts).
    pub async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        let value = self.call("eth_accounts", json!([])).await?;
        decode("eth_accounts", value)
    }

    /// Ask the user to authorize accounts.
    pub async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let value = self.call("eth_requestAccounts", json!([])).await?;
        decode("eth_requestAccounts", value)
    }

    /// Current chain id, normalized.
    pub async fn chain_id(&self) -> Result<ChainId, WalletError> {
        let value = self.call("eth_chainId", json!([])).await?;
        Ok(ChainId::from_value(&value)?)
    }

    /// `wallet_switchEthereumChain`.
    pub async fn switch_chain(&self, chain_id: ChainId) -> Result<(), WalletError> {
        self.call(
            "wallet_switchEthereumChain",
            json!([{ "chainId": chain_id.to_hex() }]),
        )
        .await?;
        Ok(())
    }

    /// `wallet_addEthereumChain` with a full network descriptor.
    pub async fn add_chain(&self, network: &NetworkDescriptor) -> Result<(), WalletError> {
        self.call("wallet_addEthereumChain", json!([network])).await?;
        Ok(())
    }

    /// `wallet_watchAsset` for an ERC-20 token; returns the provider's answer.
    pub async fn watch_asset(
        &self,
        address: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<bool, WalletError> {
        let value = self
            .call(
                "wallet_watchAsset",
                json!({
                    "type": "ERC20",
                    "options": {
                        "address": address,
                        "symbol": symbol,
                        "decimals": decimals,
                    }
                }),
            )
            .await?;
        Ok(is_truthy(&value))
    }
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    method: &str,
    value: Value,
) -> Result<T, WalletError> {
    serde_json::from_value(value).map_err(|e| WalletError::Decode {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Shared handle to an injected provider.
pub type SharedProvider = Arc<dyn Eip1193Provider>;

/// The globals under which wallets inject providers.
///
/// Most wallets claim the generic `ethereum` slot; Trust, Binance and OKX
/// additionally publish a brand-specific object that is preferred when that
/// brand is requested explicitly.
#[derive(Clone, Default)]
pub struct HostEnvironment {
    pub ethereum: Option<SharedProvider>,
    pub trust_wallet: Option<SharedProvider>,
    pub binance_chain: Option<SharedProvider>,
    pub okx_wallet: Option<SharedProvider>,
}

impl fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("ethereum", &self.ethereum.as_ref().map(|p| p.flags()))
            .field("trust_wallet", &self.trust_wallet.is_some())
            .field("binance_chain", &self.binance_chain.is_some())
            .field("okx_wallet", &self.okx_wallet.is_some())
            .finish()
    }
}

impl HostEnvironment {
    /// An environment with no wallet installed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_ethereum(mut self, provider: SharedProvider) -> Self {
        self.ethereum = Some(provider);
        self
    }

    pub fn with_trust_wallet(mut self, provider: SharedProvider) -> Self {
        self.trust_wallet = Some(provider);
        self
    }

    pub fn with_binance_chain(mut self, provider: SharedProvider) -> Self {
        self.binance_chain = Some(provider);
        self
    }

    pub fn with_okx_wallet(mut self, provider: SharedProvider) -> Self {
        self.okx_wallet = Some(provider);
        self
    }

    /// Flags of the generic provider, or all-false when absent.
    pub fn ethereum_flags(&self) -> BrandFlags {
        self.ethereum.as_ref().map(|p| p.flags()).unwrap_or_default()
    }

    /// Resolve the provider to use for a wallet key.
    ///
    /// Returns `None` when the requested brand is not injected.
    pub fn resolve(&self, key: &WalletKey) -> Option<SharedProvider> {
        let flags = self.ethereum_flags();
        let generic_if = |present: bool| {
            if present {
                self.ethereum.clone()
            } else {
                None
            }
        };

        let provider = match key {
            WalletKey::Auto | WalletKey::Web3 | WalletKey::Other(_) => self.ethereum.clone(),
            WalletKey::TokenPocket => generic_if(flags.is_token_pocket),
            WalletKey::Trust => self
                .trust_wallet
                .clone()
                .or_else(|| generic_if(flags.is_trust)),
            WalletKey::SafePal => generic_if(flags.is_safe_pal),
            WalletKey::Binance => self
                .binance_chain
                .clone()
                .or_else(|| generic_if(flags.is_binance)),
            WalletKey::Okx => self
                .okx_wallet
                .clone()
                .or_else(|| generic_if(flags.is_okx_wallet)),
            WalletKey::Coinbase => generic_if(flags.is_coinbase_wallet),
            WalletKey::MetaMask => generic_if(
                flags.is_metamask
                    && !flags.is_token_pocket
                    && !flags.is_trust
                    && !flags.is_safe_pal,
            ),
        };

        if provider.is_some() {
            debug!(wallet = %key, "resolved provider");
        }
        provider
    }
}
