//! Chain identifiers and the target network.
//!
//! Wallets report chain ids inconsistently: most return `0x`-prefixed hex
//! from `eth_chainId`, some return decimal strings, and a few emit JSON
//! numbers in `chainChanged`. [`ChainId`] parses all of these and always
//! renders the canonical form (`0x` + lowercase hex, no leading zeros), so
//! two ids are compared only after both sides are normalized.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::constants::{BNB_MAINNET_CHAIN_ID, BNB_TESTNET_CHAIN_ID, NATIVE_DECIMALS};
use crate::error::ChainIdError;

/// A normalized EVM chain identifier.
///
/// # Examples
///
/// ```
/// use tap_core::ChainId;
/// let a: ChainId = "56".parse().unwrap();
/// let b: ChainId = "0x38".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "0x38");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Canonical hex form, e.g. `"0x38"`.
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }

    /// Parse a JSON value as delivered by a provider (string or number).
    pub fn from_value(value: &Value) -> Result<Self, ChainIdError> {
        match value {
            Value::String(s) => s.parse(),
            Value::Number(n) => n
                .as_u64()
                .map(Self)
                .ok_or_else(|| ChainIdError::Invalid(n.to_string())),
            Value::Null => Err(ChainIdError::Empty),
            other => Err(ChainIdError::Invalid(other.to_string())),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for ChainId {
    type Err = ChainIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ChainIdError::Empty);
        }

        let (digits, radix) = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => (hex, 16),
            None => (trimmed, 10),
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return Err(ChainIdError::Invalid(s.to_string()));
        }

        u64::from_str_radix(digits, radix)
            .map(Self)
            .map_err(|_| ChainIdError::Overflow(s.to_string()))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Normalize a provider-reported chain id, returning `None` when absent or
/// malformed.
pub fn normalize_chain_id(value: &Value) -> Option<ChainId> {
    ChainId::from_value(value).ok()
}

/// Native currency of a network, as sent to `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Full network descriptor in the `wallet_addEthereumChain` parameter shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescriptor {
    pub chain_id: ChainId,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

impl NetworkDescriptor {
    /// BNB Smart Chain mainnet.
    pub fn bnb_mainnet() -> Self {
        Self {
            chain_id: ChainId(BNB_MAINNET_CHAIN_ID),
            chain_name: "BNB Smart Chain".to_string(),
            native_currency: NativeCurrency {
                name: "BNB".to_string(),
                symbol: "BNB".to_string(),
                decimals: NATIVE_DECIMALS,
            },
            rpc_urls: vec!["https://bsc-dataseed1.binance.org/".to_string()],
            block_explorer_urls: vec!["https://bscscan.com/".to_string()],
        }
    }

    /// BNB Smart Chain testnet.
    pub fn bnb_testnet() -> Self {
        Self {
            chain_id: ChainId(BNB_TESTNET_CHAIN_ID),
            chain_name: "BNB Smart Chain Testnet".to_string(),
            native_currency: NativeCurrency {
                name: "tBNB".to_string(),
                symbol: "tBNB".to_string(),
                decimals: NATIVE_DECIMALS,
            },
            rpc_urls: vec!["https://data-seed-prebsc-1-s1.binance.org:8545/".to_string()],
            block_explorer_urls: vec!["https://testnet.bscscan.com/".to_string()],
        }
    }
}

/// The network the application wants the wallet to be on.
///
/// The mainnet descriptor is tried first when switching; the testnet
/// descriptor is the fallback for wallets that refuse to add mainnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNetwork {
    pub mainnet: NetworkDescriptor,
    pub testnet: NetworkDescriptor,
}

impl Default for TargetNetwork {
    fn default() -> Self {
        Self::bnb()
    }
}

impl TargetNetwork {
    pub fn bnb() -> Self {
        Self {
            mainnet: NetworkDescriptor::bnb_mainnet(),
            testnet: NetworkDescriptor::bnb_testnet(),
        }
    }

    /// Look up a target by configuration name.
    ///
    /// `"testnet"` and `"bnb-testnet"` swap the roles so that the testnet is
    /// requested first.
    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "bnb" | "bsc" => Some(Self::bnb()),
            "testnet" | "bnb-testnet" | "bsc-testnet" => Some(Self {
                mainnet: NetworkDescriptor::bnb_testnet(),
                testnet: NetworkDescriptor::bnb_mainnet(),
            }),
            _ => None,
        }
    }

    /// True if `chain_id` is either of the target's chains.
    pub fn is_target(&self, chain_id: &ChainId) -> bool {
        *chain_id == self.mainnet.chain_id || *chain_id == self.testnet.chain_id
    }

    /// Like [`is_target`](Self::is_target) for a raw provider value.
    pub fn is_target_value(&self, value: &Value) -> bool {
        normalize_chain_id(value).is_some_and(|id| self.is_target(&id))
    }
}
