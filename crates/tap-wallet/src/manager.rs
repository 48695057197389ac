//! The wallet session manager.
//!
//! [`WalletManager`] owns the [`Session`] and drives it from two directions:
//! explicit operations called by the UI (`connect`, `disconnect`,
//! `update_balance`, ...) and notifications pushed by the active provider
//! (`accountsChanged`, `chainChanged`, `disconnect`). Every mutation is
//! applied atomically under the session lock and mirrored to the
//! [`SessionStore`].
//!
//! Only `connect` and `send_native` report failures to the caller. Balance
//! refreshes, chain switching, token reads and history scans log a warning
//! and fall back to a safe value.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tap_core::chain::{ChainId, TargetNetwork};
use tap_core::constants::{NATIVE_DECIMALS, ZERO_BALANCE};
use tap_core::types::TxRecord;
use tap_core::units::{format_fixed, parse_native};

use crate::brand::{detect_wallet_name, detect_wallets, WalletDescriptor, WalletKey};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::ledger::{parse_address, ProviderLedger};
use crate::provider::{HostEnvironment, ProviderEvent, SharedProvider};
use crate::session::{PersistedSession, Session, SessionStatus};
use crate::storage::{load_snapshot, save_snapshot, FileStore, MemoryStore, SessionStore};

/// Wallet session manager. Shared as `Arc<WalletManager>`.
pub struct WalletManager {
    env: HostEnvironment,
    config: WalletConfig,
    store: Arc<dyn SessionStore>,
    session: RwLock<Session>,
    wallets: RwLock<Vec<WalletDescriptor>>,
    /// Provider whose events are being listened to.
    active: RwLock<Option<SharedProvider>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl WalletManager {
    /// Create a manager with an empty session. Call [`init`](Self::init)
    /// before use.
    pub fn new(env: HostEnvironment, config: WalletConfig, store: Arc<dyn SessionStore>) -> Arc<Self> {
        let wallets = detect_wallets(&env);
        Arc::new(Self {
            env,
            config,
            store,
            session: RwLock::new(Session::empty()),
            wallets: RwLock::new(wallets),
            active: RwLock::new(None),
            listener: Mutex::new(None),
        })
    }

    /// Manager persisting to a [`FileStore`] under the configured data dir.
    pub fn with_file_store(env: HostEnvironment, config: WalletConfig) -> Result<Arc<Self>, WalletError> {
        let store = FileStore::open(config.storage_dir())?;
        Ok(Self::new(env, config, Arc::new(store)))
    }

    /// Manager whose session does not outlive the process.
    pub fn in_memory(env: HostEnvironment, config: WalletConfig) -> Arc<Self> {
        Self::new(env, config, Arc::new(MemoryStore::new()))
    }

    /// Boot sequence: discover wallets, rehydrate the persisted session,
    /// subscribe to the generic provider and reconcile against it.
    pub async fn init(self: &Arc<Self>) {
        self.refresh_wallets();
        self.rehydrate();
        if let Some(provider) = self.env.ethereum.clone() {
            self.activate(&provider);
        }
        self.reconcile().await;
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn target(&self) -> &TargetNetwork {
        &self.config.target
    }

    pub fn available_wallets(&self) -> Vec<WalletDescriptor> {
        self.wallets.read().clone()
    }

    /// Re-run wallet discovery.
    pub fn refresh_wallets(&self) -> Vec<WalletDescriptor> {
        let wallets = detect_wallets(&self.env);
        *self.wallets.write() = wallets.clone();
        wallets
    }

    pub fn is_on_target_chain(&self) -> bool {
        self.session.read().is_on_target_chain(&self.config.target)
    }

    pub fn status(&self) -> SessionStatus {
        self.session.read().status(&self.config.target)
    }

    pub fn formatted_address(&self) -> String {
        self.session.read().formatted_address()
    }

    fn current_address(&self) -> Option<String> {
        self.session.read().address.clone()
    }

    /// The provider operations run against: the active one, else the
    /// generic injected provider.
    fn provider(&self) -> Option<SharedProvider> {
        self.active.read().clone().or_else(|| self.env.ethereum.clone())
    }

    // ------------------------------------------------------------------
    // State mutation
    // ------------------------------------------------------------------

    /// Apply `f` atomically and persist the result.
    fn update<F: FnOnce(&mut Session)>(&self, f: F) {
        let mut session = self.session.write();
        f(&mut session);
        let snapshot = PersistedSession::from(&*session);
        if let Err(e) = save_snapshot(self.store.as_ref(), &self.config.storage_key, &snapshot) {
            warn!("failed to persist wallet session: {e}");
        }
    }

    fn set_chain_id(&self, chain_id: ChainId) {
        self.update(|s| s.chain_id = Some(chain_id));
        debug!(
            %chain_id,
            on_target = self.config.target.is_target(&chain_id),
            "chain id updated"
        );
    }

    fn rehydrate(&self) {
        match load_snapshot(self.store.as_ref(), &self.config.storage_key) {
            Ok(Some(snapshot)) => {
                self.session.write().restore(&snapshot);
                debug!(connected = snapshot.is_connected, "rehydrated wallet session");
            }
            Ok(None) => {}
            Err(e) => warn!("failed to load persisted wallet session: {e}"),
        }
    }

    /// Make `provider` the active one and listen to its events. The
    /// previous listener, if any, is stopped.
    fn activate(self: &Arc<Self>, provider: &SharedProvider) {
        {
            let mut active = self.active.write();
            if active.as_ref().is_some_and(|p| Arc::ptr_eq(p, provider)) {
                return;
            }
            *active = Some(Arc::clone(provider));
        }

        let mut events = provider.subscribe();
        let manager: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(manager) = manager.upgrade() else {
                            break;
                        };
                        manager.handle_event(event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "provider event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("provider event listener stopped");
        });

        if let Some(previous) = self.listener.lock().replace(handle) {
            previous.abort();
        }
    }

    // ------------------------------------------------------------------
    // Reconciliation and events
    // ------------------------------------------------------------------

    /// Silent check against the live provider; never prompts the user.
    ///
    /// The provider's answer overrides whatever was rehydrated.
    pub async fn reconcile(&self) {
        let Some(provider) = self.provider() else {
            debug!("no injected provider, clearing rehydrated connection");
            self.update(|s| s.reset());
            return;
        };

        let accounts = match provider.accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("failed to check existing wallet connection: {e}");
                return;
            }
        };
        let chain_id = match provider.chain_id().await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("failed to read chain id during reconciliation: {e}");
                None
            }
        };

        match accounts.into_iter().next() {
            Some(address) => {
                let name = detect_wallet_name(&provider.flags(), &self.env);
                self.update(|s| {
                    s.connect(address.clone(), name);
                    if chain_id.is_some() {
                        s.chain_id = chain_id;
                    }
                });
                info!(%address, "restored existing wallet connection");
                self.refresh_balance(&provider, &address).await;
            }
            None => {
                self.update(|s| {
                    s.reset();
                    s.chain_id = chain_id;
                });
                debug!("no authorized accounts");
            }
        }
    }

    /// Apply a provider notification.
    pub async fn handle_event(&self, event: ProviderEvent) {
        debug!(%event, "provider event");
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
                Some(address) => {
                    self.update(|s| s.address = Some(address.clone()));
                    info!(%address, "active account changed");
                    if let Some(provider) = self.provider() {
                        self.refresh_balance(&provider, &address).await;
                    }
                }
                None => {
                    info!("wallet revoked account access");
                    self.disconnect();
                }
            },
            ProviderEvent::ChainChanged(raw) => {
                match raw.parse::<ChainId>() {
                    Ok(chain_id) => self.set_chain_id(chain_id),
                    Err(e) => warn!("ignoring malformed chainChanged payload: {e}"),
                }
                self.update_balance().await;
            }
            ProviderEvent::Disconnect(reason) => {
                match reason {
                    Some(e) => info!(code = e.code, "provider disconnected: {}", e.message),
                    None => info!("provider disconnected"),
                }
                self.disconnect();
            }
        }
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// Connect to the wallet identified by `wallet_key` (`None` or `"auto"`
    /// for whichever provider is injected).
    ///
    /// A failed switch to the target chain does not fail the connection;
    /// it shows up only as [`is_on_target_chain`](Self::is_on_target_chain)
    /// being false.
    pub async fn connect(self: &Arc<Self>, wallet_key: Option<&str>) -> Result<(), WalletError> {
        self.update(|s| s.last_error = None);

        let key = WalletKey::from(wallet_key);
        info!(wallet = %key, "connecting wallet");
        let result = self.try_connect(&key).await;
        if let Err(e) = &result {
            if e.is_user_declined() {
                info!(wallet = %key, "wallet connection declined: {e}");
            } else {
                warn!(wallet = %key, "wallet connection failed: {e}");
            }
            let message = e.to_string();
            self.update(|s| s.last_error = Some(message));
        }
        result
    }

    async fn try_connect(self: &Arc<Self>, key: &WalletKey) -> Result<(), WalletError> {
        let provider = self.env.resolve(key).ok_or_else(|| {
            if key.is_auto() {
                WalletError::NoWallet
            } else {
                WalletError::WalletNotFound(key.to_string())
            }
        })?;
        debug!(flags = ?provider.flags(), "provider flags");

        let accounts = provider.request_accounts().await?;
        let address = accounts.into_iter().next().ok_or(WalletError::NoAccounts)?;
        // The previous provider keeps its listener until this one authorizes.
        self.activate(&provider);

        // Stored before any switch attempt so observers never see a
        // connected session with an unknown chain.
        let chain_id = provider.chain_id().await?;
        self.set_chain_id(chain_id);

        let name = detect_wallet_name(&provider.flags(), &self.env);
        self.update(|s| s.connect(address.clone(), name.clone()));
        info!(%address, wallet = %name, %chain_id, "wallet connected");

        self.refresh_balance(&provider, &address).await;

        if !self.config.target.is_target(&chain_id) {
            match self.switch_or_add(&provider).await {
                Ok(()) => match provider.chain_id().await {
                    Ok(id) => self.set_chain_id(id),
                    Err(e) => warn!("failed to read chain id after switch: {e}"),
                },
                Err(e) => warn!("failed to switch chain, continuing with connection: {e}"),
            }
        }

        Ok(())
    }

    /// Move the active provider onto the target network.
    pub async fn switch_to_target(&self) -> Result<(), WalletError> {
        let provider = self.provider().ok_or(WalletError::NoWallet)?;
        self.switch_or_add(&provider).await
    }

    /// Switch to the target mainnet; if the wallet does not know it, add
    /// mainnet, and if that fails, add the testnet.
    async fn switch_or_add(&self, provider: &SharedProvider) -> Result<(), WalletError> {
        let target = &self.config.target;
        let err = match provider.switch_chain(target.mainnet.chain_id).await {
            Ok(()) => {
                info!(chain = %target.mainnet.chain_name, "switched network");
                return Ok(());
            }
            Err(e) => e,
        };

        let unrecognized = matches!(&err, WalletError::Provider(rpc) if rpc.is_unrecognized_chain());
        if !unrecognized {
            return Err(err);
        }

        info!(chain = %target.mainnet.chain_name, "adding network to wallet");
        match provider.add_chain(&target.mainnet).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("failed to add {}: {e}", target.mainnet.chain_name);
                info!(chain = %target.testnet.chain_name, "adding fallback network to wallet");
                provider.add_chain(&target.testnet).await.inspect_err(|e| {
                    warn!("failed to add {}: {e}", target.testnet.chain_name);
                })
            }
        }
    }

    /// Reset the session. Event listeners stay installed so a later
    /// reconnect from the wallet side is still noticed.
    pub fn disconnect(&self) {
        self.update(|s| s.reset());
        info!("wallet session reset");
    }

    /// Refresh chain id and native balance. No-op without an address.
    pub async fn update_balance(&self) {
        let Some(address) = self.current_address() else {
            return;
        };
        let Some(provider) = self.provider() else {
            return;
        };
        self.refresh_balance(&provider, &address).await;
    }

    async fn refresh_balance(&self, provider: &SharedProvider, address: &str) {
        if let Err(e) = self.try_refresh_balance(provider, address).await {
            warn!(%address, "failed to get balance: {e}");
        }
    }

    async fn try_refresh_balance(&self, provider: &SharedProvider, address: &str) -> Result<(), WalletError> {
        let chain_id = provider.chain_id().await?;
        self.set_chain_id(chain_id);

        let wei = ProviderLedger::new(Arc::clone(provider))
            .balance_of(address)
            .await?;
        let balance = format_fixed(wei, NATIVE_DECIMALS, self.config.balance_places)?;
        self.update(|s| {
            // The account may have changed while the query was in flight.
            if s.address.as_deref() == Some(address) {
                s.balance = balance.clone();
            }
        });
        debug!(%address, %balance, "balance updated");
        Ok(())
    }

    /// Send `amount` (whole native units, e.g. `"0.01"`) to `recipient` and
    /// wait for inclusion. Returns the transaction hash.
    pub async fn send_native(&self, recipient: &str, amount: &str) -> Result<String, WalletError> {
        let (Some(provider), Some(from)) = (self.provider(), self.current_address()) else {
            return Err(WalletError::NotConnected);
        };

        let result = async {
            let from = parse_address(&from)?;
            let to = parse_address(recipient)?;
            let value = parse_native(amount)?;
            let ledger = ProviderLedger::new(provider);
            let hash = ledger.send_transaction(from, to, value).await?;
            ledger
                .wait_for_receipt(&hash, self.config.receipt_poll_interval)
                .await?;
            Ok::<_, WalletError>(hash)
        }
        .await;

        if let Err(e) = &result {
            warn!(%recipient, %amount, "transaction failed: {e}");
        }
        result
    }

    /// Ask the wallet to display an ERC-20 token. False on any failure.
    pub async fn watch_token(&self, token_address: &str, symbol: &str, decimals: u8) -> bool {
        let Some(provider) = self.provider() else {
            return false;
        };
        match provider.watch_asset(token_address, symbol, decimals).await {
            Ok(added) => added,
            Err(e) => {
                warn!(token = %token_address, "failed to add token: {e}");
                false
            }
        }
    }

    /// ERC-20 balance of the session address, `"0"` when not connected or
    /// on any failure.
    pub async fn token_balance_of(&self, token_address: &str, abi: &[&str]) -> String {
        let (Some(provider), Some(holder)) = (self.provider(), self.current_address()) else {
            return ZERO_BALANCE.to_string();
        };
        match ProviderLedger::new(provider)
            .erc20_balance(token_address, &holder, abi)
            .await
        {
            Ok(balance) => balance,
            Err(e) => {
                warn!(token = %token_address, "failed to get token balance: {e}");
                ZERO_BALANCE.to_string()
            }
        }
    }

    /// Transactions from or to the session address within the most recent
    /// blocks, newest first, at most `limit` of them.
    pub async fn recent_transactions(&self, limit: usize) -> Vec<TxRecord> {
        let (Some(provider), Some(address)) = (self.provider(), self.current_address()) else {
            return Vec::new();
        };
        if limit == 0 {
            return Vec::new();
        }

        let ledger = ProviderLedger::new(provider);
        let current = match ledger.block_number().await {
            Ok(height) => height,
            Err(e) => {
                warn!("failed to get transaction history: {e}");
                return Vec::new();
            }
        };

        let window = self.config.history_window.min(current.saturating_add(1));
        let mut records = Vec::new();
        for offset in 0..window {
            if records.len() >= limit {
                break;
            }
            let number = current - offset;
            let block = match ledger.block_with_transactions(number).await {
                Ok(Some(block)) => block,
                Ok(None) => {
                    debug!(block = number, "block not available");
                    continue;
                }
                Err(e) => {
                    warn!(block = number, "failed to get block: {e}");
                    continue;
                }
            };
            for tx in block.full_transactions().filter(|tx| tx.involves(&address)) {
                records.push(TxRecord::from_rpc(tx, &block));
                if records.len() >= limit {
                    break;
                }
            }
        }

        debug!(found = records.len(), scanned_from = current, "transaction history scan");
        records
    }

    /// [`recent_transactions`](Self::recent_transactions) with the
    /// configured default limit.
    pub async fn refresh_recent_transactions(&self) -> Vec<TxRecord> {
        let records = self.recent_transactions(self.config.default_history_limit).await;
        info!(count = records.len(), "recent transactions");
        records
    }
}

impl Drop for WalletManager {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}
