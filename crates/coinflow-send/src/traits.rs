//! Collaborator interfaces used by the send flow.

use async_trait::async_trait;
use coinflow_core::amount::Rate;
use coinflow_core::error::AddressError;

use crate::error::BroadcastError;
use crate::fee::AddressKind;
use crate::input::FeeRatePriority;

/// Send-side capabilities of a chain adapter.
#[async_trait]
pub trait SendAdapter: Send + Sync {
    /// Validate a destination address and report its script type.
    fn validate_address(&self, address: &str) -> Result<AddressKind, AddressError>;

    /// Fee in base units for sending `amount` to `address` (or to a generic
    /// destination when `None`) at `fee_rate` base units per virtual byte.
    fn fee(&self, amount: u64, address: Option<&str>, fee_rate: u64) -> u64;

    /// Build, sign and broadcast a transaction.
    async fn send(&self, address: &str, amount: u64) -> Result<(), BroadcastError>;
}

/// Source of the coin's exchange rate.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Rate for `coin_code` in the configured fiat currency, if known.
    async fn current_rate(&self, coin_code: &str) -> Option<Rate>;
}

/// Source of network fee rates.
#[async_trait]
pub trait FeeRateProvider: Send + Sync {
    /// Fee rate in base units per virtual byte for `priority`, if known.
    async fn fee_rate(&self, priority: FeeRatePriority) -> Option<u64>;
}
