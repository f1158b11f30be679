//! # coinflow-send
//!
//! The send-money workflow: user input, asynchronous quotes, fee
//! estimation, state derivation, view items and the [`SendSession`] that
//! drives them.

pub mod error;
pub mod fee;
pub mod input;
pub mod payment;
pub mod quote;
pub mod session;
pub mod state;
pub mod traits;
pub mod view_item;

pub use error::{BroadcastError, SendError};
pub use fee::{AddressKind, FeeEstimator, SizeFeeEstimator};
pub use input::{FeeRatePriority, SendUserInput};
pub use quote::Quote;
pub use session::{SendEvent, SendSession};
pub use state::{derive_state, max_amount, SendContext, SendState};
pub use traits::{FeeRateProvider, RateProvider, SendAdapter};
pub use view_item::{SendConfirmationViewItem, SendStateViewItemFactory, SendViewItem};
