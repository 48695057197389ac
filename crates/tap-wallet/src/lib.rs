//! # tap-wallet: browser wallet session manager.
//!
//! Tracks the connection between the application and an injected
//! EIP-1193 wallet: which wallet brands are present, which account and
//! chain are active, the native balance, and the provider's account and
//! chain notifications. Failures of user-initiated operations come back as
//! [`WalletError`]; background refreshes degrade to logged warnings.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`provider`]: `Eip1193Provider` trait, provider events, host globals
//! - [`brand`]: wallet brand detection and descriptors
//! - [`ledger`]: balance, block, call and transfer queries over a provider
//! - [`session`]: session state and the persisted subset
//! - [`storage`]: durable key-value stores for the session blob
//! - [`config`]: `WalletConfig`
//! - [`logging`]: tracing subscriber setup
//! - [`manager`]: `WalletManager`, the public operations

pub mod brand;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod manager;
pub mod provider;
pub mod session;
pub mod storage;

// Re-exports for convenient access
pub use brand::{detect_wallet_name, detect_wallets, WalletBrand, WalletDescriptor, WalletKey};
pub use config::WalletConfig;
pub use error::WalletError;
pub use ledger::ProviderLedger;
pub use logging::{init_tracing, init_tracing_from};
pub use manager::WalletManager;
pub use provider::{
    BrandFlags, Eip1193Provider, HostEnvironment, ProviderEvent, RpcError, SharedProvider,
};
pub use session::{ActionResult, PersistedSession, Session, SessionStatus};
pub use storage::{FileStore, MemoryStore, SessionStore};
