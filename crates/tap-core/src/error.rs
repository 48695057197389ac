//! Error types for chain identifiers and unit conversion.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainIdError {
    #[error("empty chain id")] Empty,
    #[error("invalid chain id: {0}")] Invalid(String),
    #[error("chain id out of range: {0}")] Overflow(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")] Empty,
    #[error("invalid amount: {0}")] InvalidAmount(String),
    #[error("negative amount: {0}")] Negative(String),
    #[error("unsupported decimals: {0}")] Decimals(u8),
}
