//! # coinflow-core
//! Transaction records, the transaction pool, and balance reconciliation
//! for the Coinflow wallet core.
//!
//! # Modules
//!
//! - [`amount`]: fixed-point amounts, exchange rates, rounding
//! - [`balance`]: `BalanceAdapter` and `WalletEvent`
//! - [`config`]: `WalletConfig` loading
//! - [`constants`]: wallet constants
//! - [`error`]: error enums
//! - [`pool`]: `TransactionPool` with filtered, paginated history
//! - [`record`]: `TransactionRecord` derivation from raw chain data
//! - [`traits`]: `ChainAdapter` interface
//! - [`types`]: hashes, raw chain data, unspent outputs

pub mod amount;
pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod pool;
pub mod record;
pub mod traits;
pub mod types;

pub use amount::{Rate, Rounding};
pub use balance::{BalanceAdapter, WalletEvent};
pub use config::{CurrencyConfig, WalletConfig};
pub use error::CoinflowError;
pub use pool::{TransactionFilter, TransactionPool};
pub use record::TransactionRecord;
pub use traits::ChainAdapter;
pub use types::{InputType, TransactionStatus, TxHash};
