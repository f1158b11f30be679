//! Error types for the Coinflow core.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")] Empty,
    #[error("invalid character in amount: {0}")] InvalidCharacter(char),
    #[error("negative amount")] Negative,
    #[error("too many decimal places: {got} > {max}")] TooPrecise { got: usize, max: u32 },
    #[error("amount overflow")] Overflow,
    #[error("zero exchange rate")] ZeroRate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid transaction hash length: {0}")] InvalidHash(usize),
    #[error("transaction has no inputs and no outputs")] EmptyTransaction,
    #[error("value of own input {index} is unknown")] UnknownInputValue { index: usize },
    #[error("value overflow")] ValueOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")] Empty,
    #[error("invalid address: {0}")] Invalid(String),
    #[error("address belongs to another network: {0}")] WrongNetwork(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config: {0}")] Load(String),
    #[error("completion threshold must be positive")] ZeroCompletionThreshold,
    #[error("currency decimals {0} exceed 8")] CurrencyTooPrecise(u32),
    #[error("page size must be positive")] ZeroPageSize,
}

#[derive(Error, Debug)]
pub enum CoinflowError {
    #[error(transparent)] Amount(#[from] AmountError),
    #[error(transparent)] Record(#[from] RecordError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Config(#[from] ConfigError),
    #[error("chain adapter: {0}")] Adapter(String),
}
