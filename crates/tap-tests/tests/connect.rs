//! Connection flow: provider resolution, account authorization, chain
//! switching and the add-chain fallback.

use serde_json::json;

use tap_core::chain::ChainId;
use tap_core::constants::ERR_USER_REJECTED;
use tap_tests::helpers::*;
use tap_wallet::{
    ActionResult, BrandFlags, HostEnvironment, RpcError, SessionStatus, WalletError,
};

#[tokio::test]
async fn connect_without_any_provider_fails() {
    let (m, _) = manager_with(HostEnvironment::empty()).await;

    let result = m.connect(None).await;
    assert_eq!(result, Err(WalletError::NoWallet));
    assert!(!m.session().is_connected);
    assert_eq!(
        m.session().last_error.as_deref(),
        Some("no wallet detected, please install a Web3 wallet")
    );

    let action = ActionResult::from(&result);
    assert!(!action.success);
}

#[tokio::test]
async fn connect_success_populates_session() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE, BOB]);
    mock.set_balance(ALICE, bnb(2) + bnb(1) / alloy_primitives::U256::from(8));
    let (m, _) = manager_with(env_with(&mock)).await;
    assert!(!m.session().is_connected);

    m.connect(None).await.unwrap();

    let s = m.session();
    assert!(s.is_connected);
    assert_eq!(s.address.as_deref(), Some(ALICE));
    assert_eq!(s.chain_id, Some(ChainId(56)));
    assert_eq!(s.connected_wallet_name.as_deref(), Some("MetaMask"));
    assert_eq!(s.balance, "2.1250");
    assert!(s.last_error.is_none());
    assert_eq!(m.status(), SessionStatus::Connected { on_target_chain: true });
    assert_eq!(m.formatted_address(), "0xa11c...0001");
    assert_eq!(mock.request_count("wallet_switchEthereumChain"), 0);
}

#[tokio::test]
async fn connect_with_no_accounts_fails() {
    let mock = MockProvider::metamask();
    let (m, _) = manager_with(env_with(&mock)).await;

    assert_eq!(m.connect(None).await, Err(WalletError::NoAccounts));
    let s = m.session();
    assert!(!s.is_connected);
    assert_eq!(s.last_error.as_deref(), Some("no accounts found"));
}

#[tokio::test]
async fn user_rejection_surfaces_provider_message() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    mock.reject_request_accounts();
    let (m, _) = manager_with(env_with(&mock)).await;

    let err = m.connect(Some("metamask")).await.unwrap_err();
    assert_eq!(
        err,
        WalletError::Provider(RpcError::new(ERR_USER_REJECTED, "User rejected the request."))
    );
    assert!(!m.session().is_connected);
    assert_eq!(m.session().last_error.as_deref(), Some("User rejected the request."));
}

#[tokio::test]
async fn successful_connect_clears_previous_error() {
    let mock = MockProvider::metamask();
    let (m, _) = manager_with(env_with(&mock)).await;
    assert!(m.connect(None).await.is_err());
    assert!(m.session().last_error.is_some());

    mock.set_accounts(&[ALICE]);
    m.connect(None).await.unwrap();
    assert!(m.session().last_error.is_none());
}

#[tokio::test]
async fn missing_brand_reports_key() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    let (m, _) = manager_with(env_with(&mock)).await;

    let err = m.connect(Some("okx")).await.unwrap_err();
    assert_eq!(err, WalletError::WalletNotFound("okx".into()));
    assert_eq!(
        err.to_string(),
        "okx wallet not found, please install the wallet extension"
    );
    assert!(!m.session().is_connected);
    assert_eq!(mock.request_count("eth_requestAccounts"), 0);
}

#[tokio::test]
async fn trust_wallet_posing_as_metamask_is_named_trust() {
    let mock = MockProvider::new(BrandFlags {
        is_metamask: true,
        is_trust: true,
        ..BrandFlags::default()
    });
    mock.set_accounts(&[ALICE]);
    let (m, _) = manager_with(env_with(&mock)).await;

    let wallets = m.available_wallets();
    let trust = wallets.iter().find(|w| w.key == "trust").unwrap();
    let metamask = wallets.iter().find(|w| w.key == "metamask").unwrap();
    assert!(trust.available);
    assert!(!metamask.available);

    m.connect(None).await.unwrap();
    assert_eq!(m.session().connected_wallet_name.as_deref(), Some("Trust Wallet"));

    assert_eq!(
        m.connect(Some("metamask")).await,
        Err(WalletError::WalletNotFound("metamask".into()))
    );
}

#[tokio::test]
async fn brand_global_is_preferred_for_explicit_key() {
    let generic = MockProvider::metamask();
    generic.set_accounts(&[ALICE]);
    let trust = MockProvider::new(BrandFlags {
        is_trust: true,
        ..BrandFlags::default()
    });
    trust.set_accounts(&[BOB]);
    let env = HostEnvironment::empty()
        .with_ethereum(generic.clone())
        .with_trust_wallet(trust.clone());
    let (m, _) = manager_with(env).await;

    m.connect(Some("trust")).await.unwrap();
    let s = m.session();
    assert_eq!(s.address.as_deref(), Some(BOB));
    assert_eq!(s.connected_wallet_name.as_deref(), Some("Trust Wallet"));
    assert_eq!(trust.request_count("eth_requestAccounts"), 1);
    assert_eq!(generic.request_count("eth_requestAccounts"), 0);
}

#[tokio::test]
async fn unbranded_provider_is_listed_as_web3_browser() {
    let mock = MockProvider::new(BrandFlags::default());
    mock.set_accounts(&[ALICE]);
    let (m, _) = manager_with(env_with(&mock)).await;

    let wallets = m.available_wallets();
    assert_eq!(wallets.len(), 8);
    let web3 = wallets.last().unwrap();
    assert_eq!(web3.name, "Web3 Browser");
    assert_eq!(web3.key, "web3");
    assert!(web3.download_url.is_none());

    m.connect(Some("web3")).await.unwrap();
    assert_eq!(m.session().connected_wallet_name.as_deref(), Some("Unknown Wallet"));
}

#[tokio::test]
async fn rejected_switch_still_connects_on_original_chain() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    mock.set_chain_id(json!("0x1"));
    mock.fail_switch_with(ERR_USER_REJECTED);
    let (m, _) = manager_with(env_with(&mock)).await;

    let result = m.connect(None).await;
    assert!(ActionResult::from(&result).success);

    let s = m.session();
    assert!(s.is_connected);
    assert_eq!(s.chain_id, Some(ChainId(1)));
    assert!(s.last_error.is_none());
    assert!(!m.is_on_target_chain());
    assert_eq!(m.status(), SessionStatus::Connected { on_target_chain: false });
    assert_eq!(mock.request_count("wallet_switchEthereumChain"), 1);
    assert_eq!(mock.request_count("wallet_addEthereumChain"), 0);
}

#[tokio::test]
async fn off_target_connect_switches_to_mainnet() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    mock.set_chain_id(json!("0x1"));
    let (m, _) = manager_with(env_with(&mock)).await;

    m.connect(None).await.unwrap();
    assert_eq!(m.session().chain_id, Some(ChainId(56)));
    assert!(m.is_on_target_chain());
}

#[tokio::test]
async fn unknown_chain_is_added() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    mock.set_chain_id(json!(1));
    mock.forget_chains();
    let (m, _) = manager_with(env_with(&mock)).await;

    m.connect(None).await.unwrap();
    assert_eq!(mock.request_count("wallet_addEthereumChain"), 1);
    assert_eq!(mock.known_chains(), vec!["0x38".to_string()]);
    assert_eq!(m.session().chain_id, Some(ChainId(56)));
}

#[tokio::test]
async fn testnet_is_added_when_mainnet_add_fails() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    mock.set_chain_id(json!("0x1"));
    mock.forget_chains();
    mock.fail_add_for("0x38");
    let (m, _) = manager_with(env_with(&mock)).await;

    m.connect(None).await.unwrap();
    assert_eq!(mock.request_count("wallet_addEthereumChain"), 2);
    assert_eq!(m.session().chain_id, Some(ChainId(97)));
    assert!(m.is_on_target_chain());
}

#[tokio::test]
async fn failed_fallback_keeps_connection() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    mock.set_chain_id(json!("0x1"));
    mock.forget_chains();
    mock.fail_add_for("0x38");
    mock.fail_add_for("0x61");
    let (m, _) = manager_with(env_with(&mock)).await;

    m.connect(None).await.unwrap();
    assert!(m.session().is_connected);
    assert_eq!(m.session().chain_id, Some(ChainId(1)));
    assert!(matches!(
        m.switch_to_target().await,
        Err(WalletError::Provider(_))
    ));
}

#[tokio::test]
async fn other_switch_errors_skip_add() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    mock.set_chain_id(json!("0x1"));
    mock.fail_switch_with(-32603);
    let (m, _) = manager_with(env_with(&mock)).await;

    m.connect(None).await.unwrap();
    assert_eq!(mock.request_count("wallet_addEthereumChain"), 0);
    assert_eq!(m.session().chain_id, Some(ChainId(1)));
}

#[tokio::test]
async fn chain_id_is_read_before_switching() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    mock.set_chain_id(json!("0x1"));
    let (m, _) = manager_with(env_with(&mock)).await;

    m.connect(None).await.unwrap();
    let requests = mock.requests();
    let request_accounts = requests.iter().position(|r| r == "eth_requestAccounts").unwrap();
    let chain_read = request_accounts
        + requests[request_accounts..]
            .iter()
            .position(|r| r == "eth_chainId")
            .unwrap();
    let switch = requests
        .iter()
        .position(|r| r == "wallet_switchEthereumChain")
        .unwrap();
    assert!(chain_read < switch);
}

#[tokio::test]
async fn disconnect_is_idempotent() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    let (m, _) = manager_with(env_with(&mock)).await;
    m.connect(None).await.unwrap();

    m.disconnect();
    let once = m.session();
    m.disconnect();
    assert_eq!(m.session(), once);
    assert!(!once.is_connected);
    assert!(once.address.is_none());
    assert!(once.chain_id.is_none());
    assert_eq!(once.balance, "0");
    assert!(once.connected_wallet_name.is_none());
}

#[tokio::test]
async fn reconnect_after_disconnect() {
    let mock = MockProvider::metamask();
    mock.set_accounts(&[ALICE]);
    let (m, _) = manager_with(env_with(&mock)).await;

    m.connect(None).await.unwrap();
    m.disconnect();
    m.connect(None).await.unwrap();
    assert!(m.session().is_connected);
    assert_eq!(mock.request_count("eth_requestAccounts"), 2);
}
