//! Trait interfaces for chain collaborators.
//!
//! One implementation per supported blockchain wraps that chain's sync SDK.
//! The core is written against these traits only.

use crate::error::CoinflowError;
use crate::types::{RawTransaction, UnspentOutput};

/// Read access to a chain sync engine's wallet data.
///
/// Everything returned is already fetched and persisted by the engine;
/// implementations must not block on the network.
pub trait ChainAdapter: Send + Sync {
    /// Current chain tip height.
    fn last_block_height(&self) -> Result<u64, CoinflowError>;

    /// All outputs currently spendable by the wallet.
    fn unspent_outputs(&self) -> Result<Vec<UnspentOutput>, CoinflowError>;

    /// All wallet transactions, pending and confirmed.
    fn transactions(&self) -> Result<Vec<RawTransaction>, CoinflowError>;

    /// Address for receiving funds.
    fn receive_address(&self) -> String;

    /// Sum of spendable output values.
    ///
    /// Default implementation sums [`unspent_outputs`](Self::unspent_outputs),
    /// saturating at `u64::MAX`.
    fn spendable_balance(&self) -> Result<u64, CoinflowError> {
        Ok(self
            .unspent_outputs()?
            .iter()
            .fold(0u64, |acc, o| acc.saturating_add(o.value)))
    }
}
