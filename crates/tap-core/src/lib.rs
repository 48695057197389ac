//! # tap-core
//! Foundation types for the BNBTap wallet session: chain identifiers,
//! target-network descriptors, unit conversion, and JSON-RPC data shapes.

pub mod chain;
pub mod constants;
pub mod error;
pub mod types;
pub mod units;

pub use chain::{normalize_chain_id, ChainId, NativeCurrency, NetworkDescriptor, TargetNetwork};
pub use error::{ChainIdError, UnitsError};
pub use types::{RpcBlock, RpcReceipt, RpcTransaction, TxRecord};
