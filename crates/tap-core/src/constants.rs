//! Protocol and application constants. Monetary values are in wei-style
//! base units (1 BNB = 10^18 base units).

/// BNB Smart Chain mainnet chain id (`0x38`).
pub const BNB_MAINNET_CHAIN_ID: u64 = 56;

/// BNB Smart Chain testnet chain id (`0x61`).
pub const BNB_TESTNET_CHAIN_ID: u64 = 97;

/// Decimals of the native currency.
pub const NATIVE_DECIMALS: u8 = 18;

/// Fractional digits kept in the session balance string.
pub const BALANCE_DISPLAY_PLACES: usize = 4;

/// Maximum number of blocks scanned backwards for transaction history.
pub const HISTORY_BLOCK_WINDOW: u64 = 100;

/// Default number of records fetched by the recent-transactions refresh.
pub const DEFAULT_HISTORY_LIMIT: usize = 15;

/// Storage namespace of the persisted session blob.
pub const SESSION_STORAGE_KEY: &str = "wallet-storage";

/// EIP-1193: the user rejected the request.
pub const ERR_USER_REJECTED: i64 = 4001;

/// EIP-1193: the requested method or account has not been authorized.
pub const ERR_UNAUTHORIZED: i64 = 4100;

/// EIP-1193: the provider is disconnected from all chains.
pub const ERR_DISCONNECTED: i64 = 4900;

/// EIP-3326: the wallet does not recognize the requested chain.
pub const ERR_UNRECOGNIZED_CHAIN: i64 = 4902;

/// Display name when a MetaMask flag is only a compatibility shim.
pub const GENERIC_WALLET_NAME: &str = "Web3 Wallet";

/// Display name when no brand flag matches.
pub const UNKNOWN_WALLET_NAME: &str = "Unknown Wallet";

/// Descriptor name for an unbranded injected provider.
pub const WEB3_BROWSER_NAME: &str = "Web3 Browser";

/// Balance reported while unknown.
pub const ZERO_BALANCE: &str = "0";
