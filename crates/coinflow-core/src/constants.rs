//! Wallet constants. All monetary values in base units (1 coin = 10^8 units).

/// Base units per whole coin.
pub const COIN: u64 = 100_000_000;

/// Number of decimal places carried by every fixed-point amount.
///
/// Coin amounts, currency amounts and exchange rates all share this scale,
/// so a value of `COIN` means "one" in any of them.
pub const DECIMALS: u32 = 8;

/// Confirmations after which a transaction is reported as completed.
///
/// # Examples
///
/// ```
/// use coinflow_core::constants::COMPLETION_THRESHOLD;
/// assert_eq!(COMPLETION_THRESHOLD, 6);
/// ```
pub const COMPLETION_THRESHOLD: u64 = 6;

/// Length in bytes of a transaction hash.
pub const TX_HASH_LEN: usize = 32;

/// Default number of records returned per history page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Outputs below this value are not worth creating (change is folded into the fee).
pub const DEFAULT_DUST_THRESHOLD: u64 = 546;

/// Capacity of the wallet event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
