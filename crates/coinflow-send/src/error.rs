//! Send-flow error types.

use coinflow_core::error::{AddressError, AmountError};
use thiserror::Error;

/// Errors that interrupt the send flow.
///
/// Invalid user input is not an error: it shows up as warnings on the
/// derived state and a disabled send button.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Amounts are entered in fiat but no exchange rate exists. The flow
    /// cannot continue and must be dismissed.
    #[error("exchange rate unavailable")]
    RateUnavailable,

    /// No recipient address has been entered.
    #[error("no recipient address")]
    NoAddress,

    /// The state is not confirmable (button would be disabled).
    #[error("send state is not confirmable")]
    NotConfirmable,

    /// The broadcast collaborator reported a failure.
    #[error("broadcast failed: {0}")]
    Broadcast(String),

    /// The flow was already dismissed.
    #[error("send flow dismissed")]
    Dismissed,

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error(transparent)]
    Address(#[from] AddressError),
}

/// Failure reported by a chain's broadcast implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BroadcastError(pub String);

impl From<BroadcastError> for SendError {
    fn from(e: BroadcastError) -> Self {
        Self::Broadcast(e.0)
    }
}
