//! Wallet brand detection.
//!
//! Several wallets set `isMetaMask` on their provider so that dapps written
//! against MetaMask keep working. Brand checks therefore run most specific
//! first and MetaMask last; a MetaMask flag that coexists with another
//! brand's flag is reported as a generic wallet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tap_core::constants::{GENERIC_WALLET_NAME, UNKNOWN_WALLET_NAME, WEB3_BROWSER_NAME};

use crate::provider::{BrandFlags, HostEnvironment};

/// Key used by the UI to request a specific wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum WalletKey {
    /// Whatever generic provider is present.
    #[default]
    Auto,
    TokenPocket,
    Trust,
    SafePal,
    Binance,
    Okx,
    Coinbase,
    MetaMask,
    /// The generic "Web3 Browser" entry.
    Web3,
    /// A key this crate does not know; resolves like `Auto`.
    Other(String),
}

impl WalletKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Auto => "auto",
            Self::TokenPocket => "tokenpocket",
            Self::Trust => "trust",
            Self::SafePal => "safepal",
            Self::Binance => "binance",
            Self::Okx => "okx",
            Self::Coinbase => "coinbase",
            Self::MetaMask => "metamask",
            Self::Web3 => "web3",
            Self::Other(key) => key,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

impl fmt::Display for WalletKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_key(s))
    }
}

impl WalletKey {
    /// Case-insensitive parse; unknown keys are kept as [`WalletKey::Other`].
    pub fn parse_key(s: &str) -> Self {
        let key = s.trim().to_ascii_lowercase();
        match key.as_str() {
            "" | "auto" => Self::Auto,
            "tokenpocket" => Self::TokenPocket,
            "trust" => Self::Trust,
            "safepal" => Self::SafePal,
            "binance" => Self::Binance,
            "okx" => Self::Okx,
            "coinbase" => Self::Coinbase,
            "metamask" => Self::MetaMask,
            "web3" => Self::Web3,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

impl From<Option<&str>> for WalletKey {
    fn from(key: Option<&str>) -> Self {
        key.map_or(Self::Auto, Self::parse_key)
    }
}

/// Known wallet brands in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletBrand {
    TokenPocket,
    Trust,
    SafePal,
    Binance,
    Okx,
    Coinbase,
    MetaMask,
}

impl WalletBrand {
    /// Every brand, most specific first.
    pub const ALL: [WalletBrand; 7] = [
        Self::TokenPocket,
        Self::Trust,
        Self::SafePal,
        Self::Binance,
        Self::Okx,
        Self::Coinbase,
        Self::MetaMask,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenPocket => "TokenPocket",
            Self::Trust => "Trust Wallet",
            Self::SafePal => "SafePal",
            Self::Binance => "Binance Wallet",
            Self::Okx => "OKX Wallet",
            Self::Coinbase => "Coinbase Wallet",
            Self::MetaMask => "MetaMask",
        }
    }

    pub fn key(&self) -> WalletKey {
        match self {
            Self::TokenPocket => WalletKey::TokenPocket,
            Self::Trust => WalletKey::Trust,
            Self::SafePal => WalletKey::SafePal,
            Self::Binance => WalletKey::Binance,
            Self::Okx => WalletKey::Okx,
            Self::Coinbase => WalletKey::Coinbase,
            Self::MetaMask => WalletKey::MetaMask,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::TokenPocket => "Multi-chain crypto wallet",
            Self::Trust => "Secure cryptocurrency wallet",
            Self::SafePal => "Hardware and software wallet",
            Self::Binance => "Official Binance wallet",
            Self::Okx => "Multi-chain Web3 wallet",
            Self::Coinbase => "Self-custody crypto wallet",
            Self::MetaMask => "Popular Ethereum wallet",
        }
    }

    pub fn download_url(&self) -> &'static str {
        match self {
            Self::TokenPocket => "https://tokenpocket.pro/en/download/app",
            Self::Trust => "https://trustwallet.com/download",
            Self::SafePal => "https://safepal.io/download",
            Self::Binance => "https://www.bnbchain.org/en/wallets",
            Self::Okx => "https://www.okx.com/web3",
            Self::Coinbase => "https://www.coinbase.com/wallet/downloads",
            Self::MetaMask => "https://metamask.io/download/",
        }
    }

    /// Whether this brand's provider is injected in `env`.
    pub fn is_available(&self, env: &HostEnvironment) -> bool {
        let flags = env.ethereum_flags();
        match self {
            Self::TokenPocket => flags.is_token_pocket,
            Self::Trust => flags.is_trust || env.trust_wallet.is_some(),
            Self::SafePal => flags.is_safe_pal,
            Self::Binance => flags.is_binance || env.binance_chain.is_some(),
            Self::Okx => flags.is_okx_wallet || env.okx_wallet.is_some(),
            Self::Coinbase => flags.is_coinbase_wallet,
            Self::MetaMask => flags.is_metamask && !flags.shadows_metamask(),
        }
    }
}

/// A wallet option shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDescriptor {
    pub name: String,
    pub key: String,
    pub available: bool,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl From<(WalletBrand, bool)> for WalletDescriptor {
    fn from((brand, available): (WalletBrand, bool)) -> Self {
        Self {
            name: brand.name().to_string(),
            key: brand.key().to_string(),
            available,
            description: brand.description().to_string(),
            download_url: Some(brand.download_url().to_string()),
        }
    }
}

/// One descriptor per known brand, plus a generic entry when an unbranded
/// provider is the only thing injected.
pub fn detect_wallets(env: &HostEnvironment) -> Vec<WalletDescriptor> {
    let mut wallets: Vec<WalletDescriptor> = WalletBrand::ALL
        .iter()
        .map(|brand| WalletDescriptor::from((*brand, brand.is_available(env))))
        .collect();

    let has_specific = wallets.iter().any(|w| w.available);
    if env.ethereum.is_some() && !has_specific {
        wallets.push(WalletDescriptor {
            name: WEB3_BROWSER_NAME.to_string(),
            key: WalletKey::Web3.to_string(),
            available: true,
            description: "Generic Web3 provider".to_string(),
            download_url: None,
        });
    }

    debug!(
        available = wallets.iter().filter(|w| w.available).count(),
        "wallet discovery"
    );
    wallets
}

/// Display name of the wallet behind a provider with `flags`.
///
/// `env` is consulted for brand-specific globals and for the generic
/// provider's flags, which decide whether a MetaMask flag is genuine.
pub fn detect_wallet_name(flags: &BrandFlags, env: &HostEnvironment) -> String {
    let name = if flags.is_token_pocket {
        WalletBrand::TokenPocket.name()
    } else if flags.is_trust || env.trust_wallet.is_some() {
        WalletBrand::Trust.name()
    } else if flags.is_safe_pal {
        WalletBrand::SafePal.name()
    } else if flags.is_binance || env.binance_chain.is_some() {
        WalletBrand::Binance.name()
    } else if flags.is_okx_wallet || env.okx_wallet.is_some() {
        WalletBrand::Okx.name()
    } else if flags.is_coinbase_wallet {
        WalletBrand::Coinbase.name()
    } else if flags.is_metamask {
        if env.ethereum_flags().shadows_metamask() {
            GENERIC_WALLET_NAME
        } else {
            WalletBrand::MetaMask.name()
        }
    } else {
        UNKNOWN_WALLET_NAME
    };
    debug!(wallet = name, "detected wallet");
    name.to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::broadcast;

    use super::*;
    use crate::provider::{Eip1193Provider, ProviderEvent, RpcError, SharedProvider};

    struct Flagged(BrandFlags);

    #[async_trait]
    impl Eip1193Provider for Flagged {
        async fn request(&self, _method: &str, _params: Value) -> Result<Value, RpcError> {
            Ok(Value::Null)
        }

        fn flags(&self) -> BrandFlags {
            self.0
        }

        fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
            broadcast::channel(1).1
        }
    }

    fn env_with(flags: BrandFlags) -> HostEnvironment {
        let provider: SharedProvider = Arc::new(Flagged(flags));
        HostEnvironment::empty().with_ethereum(provider)
    }

    fn available(wallets: &[WalletDescriptor]) -> Vec<&str> {
        wallets
            .iter()
            .filter(|w| w.available)
            .map(|w| w.name.as_str())
            .collect()
    }

    #[test]
    fn wallet_key_parsing() {
        assert_eq!("".parse::<WalletKey>().unwrap(), WalletKey::Auto);
        assert_eq!("MetaMask".parse::<WalletKey>().unwrap(), WalletKey::MetaMask);
        assert_eq!(
            "Rabby".parse::<WalletKey>().unwrap(),
            WalletKey::Other("Rabby".into())
        );
        assert_eq!(WalletKey::from(None), WalletKey::Auto);
        assert_eq!(WalletKey::from(Some("okx")), WalletKey::Okx);
        assert_eq!(WalletKey::Binance.to_string(), "binance");
    }

    #[test]
    fn no_provider_lists_brands_unavailable() {
        let wallets = detect_wallets(&HostEnvironment::empty());
        assert_eq!(wallets.len(), 7);
        assert!(available(&wallets).is_empty());
    }

    #[test]
    fn unbranded_provider_adds_web3_browser() {
        let wallets = detect_wallets(&env_with(BrandFlags::default()));
        assert_eq!(wallets.len(), 8);
        assert_eq!(available(&wallets), vec!["Web3 Browser"]);
        assert_eq!(wallets[7].key, "web3");
        assert!(wallets[7].download_url.is_none());
    }

    #[test]
    fn genuine_metamask_is_available() {
        let wallets = detect_wallets(&env_with(BrandFlags {
            is_metamask: true,
            ..BrandFlags::default()
        }));
        assert_eq!(available(&wallets), vec!["MetaMask"]);
    }

    #[test]
    fn metamask_shim_is_not_reported_as_metamask() {
        let wallets = detect_wallets(&env_with(BrandFlags {
            is_metamask: true,
            is_trust: true,
            ..BrandFlags::default()
        }));
        assert_eq!(available(&wallets), vec!["Trust Wallet"]);
    }

    #[test]
    fn brand_globals_count_as_available() {
        let provider: SharedProvider = Arc::new(Flagged(BrandFlags::default()));
        let env = HostEnvironment::empty()
            .with_okx_wallet(Arc::clone(&provider))
            .with_binance_chain(provider);
        let wallets = detect_wallets(&env);
        assert_eq!(available(&wallets), vec!["Binance Wallet", "OKX Wallet"]);
    }

    #[test]
    fn name_prefers_specific_brand_over_metamask() {
        let flags = BrandFlags {
            is_metamask: true,
            is_trust: true,
            ..BrandFlags::default()
        };
        assert_eq!(detect_wallet_name(&flags, &env_with(flags)), "Trust Wallet");

        let flags = BrandFlags {
            is_metamask: true,
            is_token_pocket: true,
            is_trust: true,
            ..BrandFlags::default()
        };
        assert_eq!(detect_wallet_name(&flags, &env_with(flags)), "TokenPocket");
    }

    #[test]
    fn name_reports_shim_as_generic_wallet() {
        // The active provider only claims MetaMask, but the global one is
        // a SafePal shim.
        let active = BrandFlags {
            is_metamask: true,
            ..BrandFlags::default()
        };
        let global = BrandFlags {
            is_metamask: true,
            is_safe_pal: true,
            ..BrandFlags::default()
        };
        assert_eq!(detect_wallet_name(&active, &env_with(global)), "Web3 Wallet");
        assert_eq!(detect_wallet_name(&active, &env_with(active)), "MetaMask");
    }

    #[test]
    fn name_falls_back_to_unknown() {
        let flags = BrandFlags::default();
        assert_eq!(detect_wallet_name(&flags, &env_with(flags)), "Unknown Wallet");
        let flags = BrandFlags {
            is_coinbase_wallet: true,
            ..BrandFlags::default()
        };
        assert_eq!(
            detect_wallet_name(&flags, &HostEnvironment::empty()),
            "Coinbase Wallet"
        );
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        fn brand_flags() -> impl Strategy<Value = BrandFlags> {
            any::<[bool; 8]>().prop_map(|b| BrandFlags {
                is_metamask: b[0],
                is_token_pocket: b[1],
                is_trust: b[2],
                is_safe_pal: b[3],
                is_coinbase_wallet: b[4],
                is_wallet_connect: b[5],
                is_binance: b[6],
                is_okx_wallet: b[7],
            })
        }

        fn specific_brands(flags: &BrandFlags) -> Vec<WalletBrand> {
            [
                (flags.is_token_pocket, WalletBrand::TokenPocket),
                (flags.is_trust, WalletBrand::Trust),
                (flags.is_safe_pal, WalletBrand::SafePal),
                (flags.is_binance, WalletBrand::Binance),
                (flags.is_okx_wallet, WalletBrand::Okx),
                (flags.is_coinbase_wallet, WalletBrand::Coinbase),
            ]
            .into_iter()
            .filter_map(|(set, brand)| set.then_some(brand))
            .collect()
        }

        proptest! {
            #[test]
            fn known_keys_parse_in_any_case(
                index in 0..WalletBrand::ALL.len(),
                upper in prop::collection::vec(any::<bool>(), 16),
                pad in "[ \t]{0,3}",
            ) {
                let key = WalletBrand::ALL[index].key();
                let mixed: String = key
                    .as_str()
                    .chars()
                    .zip(upper.iter().cycle())
                    .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
                    .collect();
                let padded = format!("{pad}{mixed}{pad}");
                prop_assert_eq!(WalletKey::parse_key(&padded), key);
            }

            #[test]
            fn parsed_keys_reparse_to_themselves(raw in "\\PC{0,12}") {
                let key = WalletKey::parse_key(&raw);
                prop_assert_eq!(WalletKey::parse_key(key.as_str()), key.clone());
                prop_assert_eq!(key.to_string().parse::<WalletKey>().unwrap(), key);
            }

            #[test]
            fn most_specific_flag_names_the_wallet(flags in brand_flags()) {
                let name = detect_wallet_name(&flags, &env_with(flags));
                let specific = specific_brands(&flags);
                match specific.first() {
                    Some(brand) => prop_assert_eq!(name.as_str(), brand.name()),
                    None if flags.is_metamask => prop_assert_eq!(name.as_str(), "MetaMask"),
                    None => prop_assert_eq!(name.as_str(), "Unknown Wallet"),
                }
            }

            #[test]
            fn metamask_listed_only_without_shim(flags in brand_flags()) {
                let wallets = detect_wallets(&env_with(flags));
                let listed = available(&wallets).contains(&"MetaMask");
                prop_assert_eq!(listed, flags.is_metamask && !flags.shadows_metamask());
                let specific = specific_brands(&flags);
                for brand in &specific {
                    prop_assert!(available(&wallets).contains(&brand.name()));
                }
                let generic = wallets.iter().any(|w| w.key == "web3");
                prop_assert_eq!(generic, specific.is_empty() && !listed);
            }
        }
    }
}
