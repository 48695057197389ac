//! Integration test suite for the BNBTap wallet session manager.
//!
//! The tests drive [`tap_wallet::WalletManager`] against a scriptable
//! in-process wallet provider and check the session invariants the UI
//! relies on.

pub mod helpers;
