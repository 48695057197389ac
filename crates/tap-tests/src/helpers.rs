//! Shared test helpers: a scriptable wallet provider and manager builders.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use tap_core::constants::{ERR_UNRECOGNIZED_CHAIN, ERR_USER_REJECTED};
use tap_wallet::{
    BrandFlags, Eip1193Provider, HostEnvironment, MemoryStore, ProviderEvent, RpcError,
    SessionStore, WalletConfig, WalletManager,
};

pub const ALICE: &str = "0xa11ce00000000000000000000000000000000001";
pub const BOB: &str = "0xb0b0000000000000000000000000000000000002";
pub const CAROL: &str = "0xca40100000000000000000000000000000000003";

/// One BNB in wei.
pub fn bnb(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(18))
}

/// A full transaction object as returned inside a block.
pub fn tx_json(hash: &str, from: &str, to: &str, wei: U256) -> Value {
    json!({ "hash": hash, "from": from, "to": to, "value": wei })
}

#[derive(Default)]
struct MockState {
    accounts: Vec<String>,
    authorized: bool,
    reject_request_accounts: bool,
    chain_id: Value,
    known_chains: HashSet<String>,
    switch_error: Option<RpcError>,
    add_failures: HashSet<String>,
    watch_result: Value,
    balances: HashMap<String, U256>,
    height: u64,
    blocks: HashMap<u64, Value>,
    failing_blocks: HashSet<u64>,
    call_results: HashMap<String, String>,
    receipt_delay: usize,
    receipt_status: String,
    pending: HashMap<String, usize>,
    sent: Vec<Value>,
    requests: Vec<String>,
}

/// In-process EIP-1193 wallet whose answers are scripted by the test.
///
/// Defaults: BNB mainnet selected, chains 0x1, 0x38 and 0x61 known, no
/// accounts, every block empty.
pub struct MockProvider {
    flags: BrandFlags,
    state: Mutex<MockState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockProvider {
    pub fn new(flags: BrandFlags) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        let state = MockState {
            chain_id: json!("0x38"),
            known_chains: ["0x1", "0x38", "0x61"].iter().map(|c| c.to_string()).collect(),
            watch_result: json!(true),
            receipt_status: "0x1".to_string(),
            ..MockState::default()
        };
        Arc::new(Self {
            flags,
            state: Mutex::new(state),
            events,
        })
    }

    /// A plain MetaMask provider.
    pub fn metamask() -> Arc<Self> {
        Self::new(BrandFlags {
            is_metamask: true,
            ..BrandFlags::default()
        })
    }

    /// Accounts the user will grant; `eth_accounts` stays empty until
    /// `eth_requestAccounts` succeeds.
    pub fn set_accounts(&self, accounts: &[&str]) {
        self.state.lock().accounts = accounts.iter().map(|a| a.to_string()).collect();
    }

    /// Accounts that are already authorized for this origin.
    pub fn authorize(&self, accounts: &[&str]) {
        let mut state = self.state.lock();
        state.accounts = accounts.iter().map(|a| a.to_string()).collect();
        state.authorized = true;
    }

    pub fn reject_request_accounts(&self) {
        self.state.lock().reject_request_accounts = true;
    }

    /// Raw `eth_chainId` answer (hex string, decimal string or number).
    pub fn set_chain_id(&self, chain_id: Value) {
        self.state.lock().chain_id = chain_id;
    }

    /// Forget every chain so switching fails with 4902.
    pub fn forget_chains(&self) {
        self.state.lock().known_chains.clear();
    }

    pub fn fail_switch_with(&self, code: i64) {
        self.state.lock().switch_error = Some(RpcError::new(code, "switch failed"));
    }

    /// Make `wallet_addEthereumChain` fail for `chain_id` (hex).
    pub fn fail_add_for(&self, chain_id: &str) {
        self.state.lock().add_failures.insert(chain_id.to_string());
    }

    pub fn set_watch_result(&self, result: Value) {
        self.state.lock().watch_result = result;
    }

    pub fn set_balance(&self, address: &str, wei: U256) {
        self.state.lock().balances.insert(address.to_lowercase(), wei);
    }

    pub fn set_height(&self, height: u64) {
        self.state.lock().height = height;
    }

    pub fn set_block_transactions(&self, number: u64, transactions: Vec<Value>) {
        let block = json!({
            "number": format!("{number:#x}"),
            "timestamp": format!("{:#x}", 1_700_000_000 + number * 3),
            "transactions": transactions,
        });
        self.state.lock().blocks.insert(number, block);
    }

    pub fn fail_block(&self, number: u64) {
        self.state.lock().failing_blocks.insert(number);
    }

    /// `eth_call` answer for calldata starting with `selector` (hex, no 0x).
    pub fn set_call_result(&self, selector: &str, output: &[u8]) {
        let encoded = format!("0x{}", output.iter().map(|b| format!("{b:02x}")).collect::<String>());
        self.state.lock().call_results.insert(selector.to_string(), encoded);
    }

    /// Receipts appear after `polls` empty answers with the given status.
    pub fn set_receipt(&self, polls: usize, status: &str) {
        let mut state = self.state.lock();
        state.receipt_delay = polls;
        state.receipt_status = status.to_string();
    }

    /// Push a notification to subscribers.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    /// Methods requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self, method: &str) -> usize {
        self.state.lock().requests.iter().filter(|m| *m == method).count()
    }

    /// `eth_sendTransaction` parameter objects received.
    pub fn sent(&self) -> Vec<Value> {
        self.state.lock().sent.clone()
    }

    /// Chain ids (hex) the wallet knows, sorted.
    pub fn known_chains(&self) -> Vec<String> {
        let mut chains: Vec<String> = self.state.lock().known_chains.iter().cloned().collect();
        chains.sort();
        chains
    }

    fn answer(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        let mut state = self.state.lock();
        state.requests.push(method.to_string());

        match method {
            "eth_accounts" => Ok(if state.authorized {
                json!(state.accounts)
            } else {
                json!([])
            }),
            "eth_requestAccounts" => {
                if state.reject_request_accounts {
                    return Err(RpcError::new(ERR_USER_REJECTED, "User rejected the request."));
                }
                state.authorized = true;
                Ok(json!(state.accounts))
            }
            "eth_chainId" => Ok(state.chain_id.clone()),
            "wallet_switchEthereumChain" => {
                if let Some(err) = state.switch_error.clone() {
                    return Err(err);
                }
                let chain = param_chain_id(params);
                if state.known_chains.contains(&chain) {
                    state.chain_id = json!(chain);
                    Ok(Value::Null)
                } else {
                    Err(RpcError::new(ERR_UNRECOGNIZED_CHAIN, "Unrecognized chain ID"))
                }
            }
            "wallet_addEthereumChain" => {
                let chain = param_chain_id(params);
                if state.add_failures.contains(&chain) {
                    return Err(RpcError::new(-32603, "add failed"));
                }
                state.known_chains.insert(chain.clone());
                state.chain_id = json!(chain);
                Ok(Value::Null)
            }
            "wallet_watchAsset" => Ok(state.watch_result.clone()),
            "eth_getBalance" => {
                let address = params[0].as_str().unwrap_or_default().to_lowercase();
                let wei = state.balances.get(&address).copied().unwrap_or_default();
                Ok(json!(wei))
            }
            "eth_blockNumber" => Ok(json!(format!("{:#x}", state.height))),
            "eth_getBlockByNumber" => {
                let raw = params[0].as_str().unwrap_or_default();
                let number = u64::from_str_radix(raw.trim_start_matches("0x"), 16)
                    .map_err(|e| RpcError::new(-32602, e.to_string()))?;
                if state.failing_blocks.contains(&number) {
                    return Err(RpcError::new(-32603, format!("block {number} unavailable")));
                }
                Ok(state.blocks.get(&number).cloned().unwrap_or_else(|| {
                    json!({ "number": format!("{number:#x}"), "transactions": [] })
                }))
            }
            "eth_call" => {
                let data = params[0]["data"].as_str().unwrap_or_default();
                let selector = data.trim_start_matches("0x").get(..8).unwrap_or_default();
                state
                    .call_results
                    .get(selector)
                    .map(|out| json!(out))
                    .ok_or_else(|| RpcError::new(3, "execution reverted"))
            }
            "eth_sendTransaction" => {
                state.sent.push(params[0].clone());
                let hash = format!("0x{:064x}", state.sent.len());
                let delay = state.receipt_delay;
                state.pending.insert(hash.clone(), delay);
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => {
                let hash = params[0].as_str().unwrap_or_default().to_string();
                let status = state.receipt_status.clone();
                match state.pending.get_mut(&hash) {
                    Some(0) => Ok(json!({
                        "transactionHash": hash,
                        "blockNumber": "0x10",
                        "status": status,
                    })),
                    Some(remaining) => {
                        *remaining -= 1;
                        Ok(Value::Null)
                    }
                    None => Ok(Value::Null),
                }
            }
            _ => Err(RpcError::new(4200, format!("unsupported method {method}"))),
        }
    }
}

fn param_chain_id(params: &Value) -> String {
    params[0]["chainId"].as_str().unwrap_or_default().to_string()
}

#[async_trait]
impl Eip1193Provider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.answer(method, &params)
    }

    fn flags(&self) -> BrandFlags {
        self.flags
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Config with a fast receipt poll.
pub fn test_config() -> WalletConfig {
    WalletConfig {
        receipt_poll_interval: Duration::from_millis(5),
        ..WalletConfig::default()
    }
}

/// Host with `provider` injected as the generic `ethereum` global.
pub fn env_with(provider: &Arc<MockProvider>) -> HostEnvironment {
    HostEnvironment::empty().with_ethereum(provider.clone())
}

/// Initialized manager over an in-memory store.
pub async fn manager_with(env: HostEnvironment) -> (Arc<WalletManager>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn SessionStore> = store.clone();
    let manager = WalletManager::new(env, test_config(), shared);
    manager.init().await;
    (manager, store)
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
