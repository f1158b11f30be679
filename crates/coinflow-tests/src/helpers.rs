//! Shared test helpers: raw transaction builders and an in-memory chain.

use async_trait::async_trait;
use coinflow_core::constants::{COMPLETION_THRESHOLD, DEFAULT_DUST_THRESHOLD};
use coinflow_core::error::{AddressError, CoinflowError};
use coinflow_core::traits::ChainAdapter;
use coinflow_core::types::{
    RawBlock, RawInput, RawOutput, RawPrevOutput, RawTransaction, TxHash, UnspentOutput,
};
use coinflow_core::TransactionRecord;
use coinflow_send::{AddressKind, BroadcastError, FeeEstimator, SendAdapter, SizeFeeEstimator};
use parking_lot::Mutex;

/// Tip used by [`record`].
pub const TIP: u64 = 1_000;

/// 32-byte hash filled with `seed`.
pub fn raw_hash(seed: u8) -> Vec<u8> {
    vec![seed; 32]
}

pub fn tx_hash(seed: u8) -> TxHash {
    TxHash::from_bytes([seed; 32])
}

fn block(height: Option<u64>) -> Option<RawBlock> {
    height.map(|height| RawBlock {
        height,
        timestamp: 1_600_000_000 + height * 600,
    })
}

/// A payment of `value` from a foreign address to the wallet.
pub fn incoming(seed: u8, value: u64, height: Option<u64>, block_index: u32) -> RawTransaction {
    RawTransaction {
        hash: raw_hash(seed),
        inputs: vec![RawInput {
            address: Some("1ForeignSender".into()),
            previous_output: None,
        }],
        outputs: vec![RawOutput {
            address: Some("1WalletReceive".into()),
            value,
            is_mine: true,
        }],
        block: block(height),
        block_index: height.map(|_| block_index),
    }
}

/// A payment of `sent` from the wallet, spending one output of `spent`
/// and returning the rest minus `fee` as change.
pub fn outgoing(seed: u8, spent: u64, sent: u64, fee: u64, height: Option<u64>) -> RawTransaction {
    RawTransaction {
        hash: raw_hash(seed),
        inputs: vec![RawInput {
            address: Some("1WalletReceive".into()),
            previous_output: Some(RawPrevOutput {
                value: Some(spent),
                is_mine: true,
            }),
        }],
        outputs: vec![
            RawOutput {
                address: Some("1ForeignRecipient".into()),
                value: sent,
                is_mine: false,
            },
            RawOutput {
                address: Some("1WalletChange".into()),
                value: spent - sent - fee,
                is_mine: true,
            },
        ],
        block: block(height),
        block_index: height.map(|_| 0),
    }
}

/// Derived record of an incoming (`amount >= 0`) or outgoing transaction.
pub fn record(seed: u8, amount: i64, height: Option<u64>, block_index: u32) -> TransactionRecord {
    let raw = if amount >= 0 {
        incoming(seed, amount as u64, height, block_index)
    } else {
        let sent = amount.unsigned_abs();
        let mut raw = outgoing(seed, sent + 1_000, sent, 0, height);
        raw.block_index = height.map(|_| block_index);
        raw
    };
    TransactionRecord::from_raw(&raw, TIP, COMPLETION_THRESHOLD)
        .unwrap_or_else(|e| panic!("helper built a malformed transaction: {e}"))
}

#[derive(Default)]
struct ChainData {
    tip: u64,
    unspent: Vec<UnspentOutput>,
    transactions: Vec<RawTransaction>,
    broadcasts: Vec<(String, u64)>,
    reject_broadcast: Option<String>,
}

/// In-memory chain serving both the wallet core and the send flow.
///
/// Addresses starting with `1` are P2PKH, `3` P2SH and `bc1q` P2WPKH.
#[derive(Default)]
pub struct MemoryChain {
    data: Mutex<ChainData>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tip(&self, tip: u64) {
        self.data.lock().tip = tip;
    }

    /// Replace the unspent outputs with one output per value.
    pub fn set_unspent(&self, values: &[u64]) {
        self.data.lock().unspent = values
            .iter()
            .enumerate()
            .map(|(i, value)| UnspentOutput {
                tx_hash: raw_hash(0xEE),
                index: i as u32,
                value: *value,
            })
            .collect();
    }

    pub fn set_transactions(&self, transactions: Vec<RawTransaction>) {
        self.data.lock().transactions = transactions;
    }

    pub fn reject_broadcasts(&self, message: &str) {
        self.data.lock().reject_broadcast = Some(message.to_string());
    }

    pub fn broadcasts(&self) -> Vec<(String, u64)> {
        self.data.lock().broadcasts.clone()
    }

    fn estimator(&self) -> SizeFeeEstimator {
        SizeFeeEstimator::from_outputs(&self.data.lock().unspent, DEFAULT_DUST_THRESHOLD)
    }
}

impl ChainAdapter for MemoryChain {
    fn last_block_height(&self) -> Result<u64, CoinflowError> {
        Ok(self.data.lock().tip)
    }

    fn unspent_outputs(&self) -> Result<Vec<UnspentOutput>, CoinflowError> {
        Ok(self.data.lock().unspent.clone())
    }

    fn transactions(&self) -> Result<Vec<RawTransaction>, CoinflowError> {
        Ok(self.data.lock().transactions.clone())
    }

    fn receive_address(&self) -> String {
        "1WalletReceive".to_string()
    }
}

#[async_trait]
impl SendAdapter for MemoryChain {
    fn validate_address(&self, address: &str) -> Result<AddressKind, AddressError> {
        if address.is_empty() {
            return Err(AddressError::Empty);
        }
        if address.starts_with("bc1q") {
            Ok(AddressKind::P2wpkh)
        } else if address.starts_with('1') {
            Ok(AddressKind::P2pkh)
        } else if address.starts_with('3') {
            Ok(AddressKind::P2sh)
        } else if address.starts_with("tb1") || address.starts_with('m') {
            Err(AddressError::WrongNetwork(address.to_string()))
        } else {
            Err(AddressError::Invalid(address.to_string()))
        }
    }

    fn fee(&self, amount: u64, address: Option<&str>, fee_rate: u64) -> u64 {
        let kind = address
            .and_then(|a| self.validate_address(a).ok())
            .unwrap_or_default();
        self.estimator().fee(amount, kind, fee_rate)
    }

    async fn send(&self, address: &str, amount: u64) -> Result<(), BroadcastError> {
        let mut data = self.data.lock();
        if let Some(message) = &data.reject_broadcast {
            return Err(BroadcastError(message.clone()));
        }
        data.broadcasts.push((address.to_string(), amount));
        Ok(())
    }
}
