//! Core wallet types: hashes, raw chain data, unspent outputs.
//!
//! Raw types are what a chain adapter hands over after fetching; they carry
//! per-input and per-output ownership flags already resolved by the chain
//! SDK. [`TransactionRecord`](crate::record::TransactionRecord) is derived
//! from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::TX_HASH_LEN;
use crate::error::RecordError;

/// A 32-byte transaction hash. Serialized as lowercase hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TxHash(pub [u8; TX_HASH_LEN]);

impl TxHash {
    /// Create a hash from a byte array.
    pub fn from_bytes(bytes: [u8; TX_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Create a hash from a slice, rejecting any length other than 32.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RecordError> {
        let arr: [u8; TX_HASH_LEN] = bytes
            .try_into()
            .map_err(|_| RecordError::InvalidHash(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; TX_HASH_LEN] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| RecordError::InvalidHash(s.len() / 2))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for TxHash {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<[u8; TX_HASH_LEN]> for TxHash {
    fn from(bytes: [u8; TX_HASH_LEN]) -> Self {
        Self(bytes)
    }
}

/// One party of a transaction as shown in history.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransactionAddress {
    pub address: String,
    /// Whether the address belongs to this wallet.
    pub is_mine: bool,
}

/// Confirmation status of a transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum TransactionStatus {
    /// Not yet mined.
    Processing,
    /// Mined, but below the completion threshold. `progress` is in `0.0..1.0`.
    Verifying { progress: f64 },
    /// Buried under at least the completion threshold.
    Completed,
}

impl TransactionStatus {
    /// Derive the status from the confirming block height and the chain tip.
    ///
    /// `confirmations = tip - height + 1`. A block above the tip (the tip
    /// has not caught up yet) counts as zero confirmations.
    ///
    /// # Examples
    ///
    /// ```
    /// use coinflow_core::types::TransactionStatus;
    /// assert_eq!(TransactionStatus::derive(None, 100, 6), TransactionStatus::Processing);
    /// assert_eq!(TransactionStatus::derive(Some(95), 100, 6), TransactionStatus::Completed);
    /// assert_eq!(
    ///     TransactionStatus::derive(Some(98), 100, 6),
    ///     TransactionStatus::Verifying { progress: 0.5 }
    /// );
    /// ```
    pub fn derive(block_height: Option<u64>, tip: u64, threshold: u64) -> Self {
        let Some(height) = block_height else {
            return Self::Processing;
        };
        let confirmations = tip.saturating_add(1).saturating_sub(height);
        if confirmations >= threshold {
            Self::Completed
        } else {
            Self::Verifying {
                progress: confirmations as f64 / threshold as f64,
            }
        }
    }

    /// Whether the transaction has reached the completion threshold.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Unit in which the user types a send amount.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Coin,
    Currency,
}

impl InputType {
    /// The other unit.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Coin => Self::Currency,
            Self::Currency => Self::Coin,
        }
    }
}

/// The previous output spent by an input, as resolved by the chain adapter.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RawPrevOutput {
    /// Value in base units, when known.
    pub value: Option<u64>,
    /// Whether the output is spendable by this wallet.
    pub is_mine: bool,
}

/// A raw transaction input.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RawInput {
    pub address: Option<String>,
    /// `None` for inputs the chain adapter could not resolve (foreign, value unknown).
    pub previous_output: Option<RawPrevOutput>,
}

impl RawInput {
    /// Whether this input spends one of the wallet's outputs.
    pub fn is_mine(&self) -> bool {
        self.previous_output.as_ref().is_some_and(|p| p.is_mine)
    }
}

/// A raw transaction output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RawOutput {
    pub address: Option<String>,
    pub value: u64,
    pub is_mine: bool,
}

/// The block that confirmed a transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawBlock {
    pub height: u64,
    /// Unix seconds.
    pub timestamp: u64,
}

/// Transaction data as delivered by the chain sync engine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RawTransaction {
    /// Opaque transaction hash (must be 32 bytes).
    #[serde(with = "hex_bytes")]
    pub hash: Vec<u8>,
    pub inputs: Vec<RawInput>,
    pub outputs: Vec<RawOutput>,
    /// Confirming block, `None` while unconfirmed.
    pub block: Option<RawBlock>,
    /// Position of the transaction inside its block.
    pub block_index: Option<u32>,
}

/// An unspent output owned by the wallet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UnspentOutput {
    #[serde(with = "hex_bytes")]
    pub tx_hash: Vec<u8>,
    pub index: u32,
    /// Value in base units.
    pub value: u64,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
