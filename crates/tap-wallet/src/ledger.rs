//! Ledger queries and transfers routed through the wallet provider.
//!
//! Wallet providers proxy the standard `eth_*` JSON-RPC methods to their
//! own node, so balance reads, block fetches, contract calls and
//! transaction submission all go through the same [`Eip1193Provider`]
//! the session is connected to. Signing happens inside the wallet.

use std::str::FromStr;
use std::time::Duration;

use alloy_dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::Function;
use alloy_primitives::{Address, U256, U64};
use alloy_rpc_types::TransactionRequest;
use serde_json::{json, Value};
use tracing::{debug, info};

use tap_core::types::{RpcBlock, RpcReceipt};
use tap_core::units::format_units_trimmed;

use crate::error::WalletError;
use crate::provider::{decode, SharedProvider};

/// Parse a `0x`-prefixed account or contract address.
pub fn parse_address(s: &str) -> Result<Address, WalletError> {
    Address::from_str(s.trim()).map_err(|e| WalletError::InvalidAddress(format!("{s}: {e}")))
}

/// Native transfer request; gas, nonce and fees are left to the wallet.
pub(crate) fn transfer_request(from: Address, to: Address, value: U256) -> TransactionRequest {
    TransactionRequest::default().from(from).to(to).value(value)
}

/// Read/write access to the chain through a wallet provider.
#[derive(Clone)]
pub struct ProviderLedger {
    provider: SharedProvider,
}

impl ProviderLedger {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        debug!(method, "ledger request");
        Ok(self.provider.request(method, params).await?)
    }

    /// Native balance of `address` at the latest block, in base units.
    pub async fn balance_of(&self, address: &str) -> Result<U256, WalletError> {
        let value = self.rpc("eth_getBalance", json!([address, "latest"])).await?;
        decode("eth_getBalance", value)
    }

    /// Height of the latest block.
    pub async fn block_number(&self) -> Result<u64, WalletError> {
        let value = self.rpc("eth_blockNumber", json!([])).await?;
        let height: U64 = decode("eth_blockNumber", value)?;
        Ok(height.to::<u64>())
    }

    /// Block `number` with full transaction objects, `None` if unknown.
    pub async fn block_with_transactions(&self, number: u64) -> Result<Option<RpcBlock>, WalletError> {
        let value = self
            .rpc("eth_getBlockByNumber", json!([format!("{number:#x}"), true]))
            .await?;
        decode("eth_getBlockByNumber", value)
    }

    /// `eth_call` against the latest block.
    pub async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, WalletError> {
        let value = self
            .rpc(
                "eth_call",
                json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;
        let raw: String = decode("eth_call", value)?;
        hex::decode(raw.trim_start_matches("0x")).map_err(|e| WalletError::Decode {
            method: "eth_call".to_string(),
            reason: e.to_string(),
        })
    }

    /// Submit a native transfer signed by the wallet; returns the tx hash.
    pub async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<String, WalletError> {
        let params = json!([transfer_request(from, to, value)]);
        let value = self.rpc("eth_sendTransaction", params).await?;
        let hash: String = decode("eth_sendTransaction", value)?;
        info!(%hash, "transaction submitted");
        Ok(hash)
    }

    /// Poll until `hash` has a receipt. Reverted transactions are errors.
    ///
    /// There is no deadline; the caller decides how long to wait.
    pub async fn wait_for_receipt(
        &self,
        hash: &str,
        poll_interval: Duration,
    ) -> Result<RpcReceipt, WalletError> {
        loop {
            let value = self
                .rpc("eth_getTransactionReceipt", json!([hash]))
                .await?;
            let receipt: Option<RpcReceipt> = decode("eth_getTransactionReceipt", value)?;
            match receipt {
                Some(receipt) if receipt.succeeded() => {
                    info!(%hash, block = ?receipt.block_number, "transaction included");
                    return Ok(receipt);
                }
                Some(_) => return Err(WalletError::Reverted(hash.to_string())),
                None => tokio::time::sleep(poll_interval).await,
            }
        }
    }

    /// ERC-20 balance of `holder`, formatted with the token's decimals.
    ///
    /// `abi` is a list of human-readable fragments that must include
    /// `balanceOf(address)` and `decimals()`.
    pub async fn erc20_balance(
        &self,
        token: &str,
        holder: &str,
        abi: &[&str],
    ) -> Result<String, WalletError> {
        let token = parse_address(token)?;
        let holder = parse_address(holder)?;
        let balance_of = find_function(abi, "balanceOf")?;
        let decimals_fn = find_function(abi, "decimals")?;

        let input = balance_of
            .abi_encode_input(&[DynSolValue::Address(holder)])
            .map_err(|e| WalletError::Abi(e.to_string()))?;
        let output = self.call(token, &input).await?;
        let balance = first_uint(&balance_of, &output)?;

        let input = decimals_fn
            .abi_encode_input(&[])
            .map_err(|e| WalletError::Abi(e.to_string()))?;
        let output = self.call(token, &input).await?;
        let decimals = first_uint(&decimals_fn, &output)?;
        if decimals > U256::from(u8::MAX) {
            return Err(WalletError::Abi(format!("decimals out of range: {decimals}")));
        }

        Ok(format_units_trimmed(balance, decimals.to::<u8>())?)
    }
}

/// Find and parse the fragment declaring function `name`.
fn find_function(abi: &[&str], name: &str) -> Result<Function, WalletError> {
    abi.iter()
        .filter_map(|fragment| Function::parse(fragment).ok())
        .find(|f| f.name == name)
        .ok_or_else(|| WalletError::Abi(format!("fragment for {name} not supplied")))
}

fn first_uint(function: &Function, output: &[u8]) -> Result<U256, WalletError> {
    let values = function
        .abi_decode_output(output, true)
        .map_err(|e| WalletError::Abi(format!("{}: {e}", function.name)))?;
    values
        .first()
        .and_then(DynSolValue::as_uint)
        .map(|(value, _)| value)
        .ok_or_else(|| WalletError::Abi(format!("{} returned no integer", function.name)))
}
