//! Chain-agnostic transaction records.
//!
//! A [`TransactionRecord`] is derived from a [`RawTransaction`] and the
//! current chain tip. Records are immutable; when the tip advances the
//! caller derives a fresh record (or calls [`TransactionRecord::with_tip`])
//! instead of patching the old one.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::types::{RawTransaction, TransactionAddress, TransactionStatus, TxHash};

/// One wallet transaction as shown in history.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub hash: TxHash,
    /// Input addresses in input order.
    pub from: Vec<TransactionAddress>,
    /// Output addresses in output order.
    pub to: Vec<TransactionAddress>,
    /// Net effect on the wallet in base units: mine outputs minus mine inputs.
    pub amount: i64,
    /// Miner fee, when every input value is known.
    pub fee: Option<u64>,
    pub status: TransactionStatus,
    /// Block time (Unix seconds), absent until mined.
    pub timestamp: Option<u64>,
    pub block_height: Option<u64>,
    /// Position inside the confirming block.
    pub block_index: Option<u32>,
}

impl TransactionRecord {
    /// Derive a record from raw chain data.
    ///
    /// Fails on malformed data; callers reconciling a whole set drop the
    /// offending transaction and keep going.
    pub fn from_raw(raw: &RawTransaction, tip: u64, threshold: u64) -> Result<Self, RecordError> {
        let hash = TxHash::from_slice(&raw.hash)?;
        if raw.inputs.is_empty() && raw.outputs.is_empty() {
            return Err(RecordError::EmptyTransaction);
        }

        let mut mine_input: u64 = 0;
        let mut all_inputs: Option<u64> = Some(0);
        let mut from = Vec::with_capacity(raw.inputs.len());

        for (index, input) in raw.inputs.iter().enumerate() {
            let value = input.previous_output.as_ref().and_then(|p| p.value);
            if input.is_mine() {
                let value = value.ok_or(RecordError::UnknownInputValue { index })?;
                mine_input = mine_input
                    .checked_add(value)
                    .ok_or(RecordError::ValueOverflow)?;
            }
            all_inputs = match (all_inputs, value) {
                (Some(total), Some(v)) => Some(total.checked_add(v).ok_or(RecordError::ValueOverflow)?),
                _ => None,
            };
            if let Some(address) = &input.address {
                from.push(TransactionAddress {
                    address: address.clone(),
                    is_mine: input.is_mine(),
                });
            }
        }

        let mut mine_output: u64 = 0;
        let mut all_outputs: u64 = 0;
        let mut to = Vec::with_capacity(raw.outputs.len());

        for output in &raw.outputs {
            all_outputs = all_outputs
                .checked_add(output.value)
                .ok_or(RecordError::ValueOverflow)?;
            if output.is_mine {
                mine_output = mine_output
                    .checked_add(output.value)
                    .ok_or(RecordError::ValueOverflow)?;
            }
            if let Some(address) = &output.address {
                to.push(TransactionAddress {
                    address: address.clone(),
                    is_mine: output.is_mine,
                });
            }
        }

        let amount = i64::try_from(i128::from(mine_output) - i128::from(mine_input))
            .map_err(|_| RecordError::ValueOverflow)?;

        let fee = all_inputs
            .filter(|_| !raw.inputs.is_empty())
            .and_then(|total| total.checked_sub(all_outputs));

        let block_height = raw.block.map(|b| b.height);

        Ok(Self {
            hash,
            from,
            to,
            amount,
            fee,
            status: TransactionStatus::derive(block_height, tip, threshold),
            timestamp: raw.block.map(|b| b.timestamp),
            block_height,
            block_index: raw.block.and(raw.block_index),
        })
    }

    /// Copy of this record with the status re-derived for a new chain tip.
    pub fn with_tip(&self, tip: u64, threshold: u64) -> Self {
        Self {
            status: TransactionStatus::derive(self.block_height, tip, threshold),
            ..self.clone()
        }
    }

    /// Whether the wallet lost value in this transaction.
    pub fn is_sent(&self) -> bool {
        self.amount < 0
    }

    /// Whether the transaction has a confirming block.
    pub fn is_confirmed(&self) -> bool {
        self.block_height.is_some()
    }

    /// Whether the sign of `amount` agrees with the ownership flags of the
    /// listed parties.
    ///
    /// Only parties with a known address are listed, so a record without
    /// addressed parties is trivially consistent.
    pub fn is_direction_consistent(&self) -> bool {
        let any_mine_from = self.from.iter().any(|a| a.is_mine);
        let any_mine_to = self.to.iter().any(|a| a.is_mine);
        match self.amount.signum() {
            -1 => any_mine_from || self.from.is_empty(),
            1 => any_mine_to || self.to.is_empty(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COIN, COMPLETION_THRESHOLD};
    use crate::types::{RawBlock, RawInput, RawOutput, RawPrevOutput};

    fn input(addr: &str, value: Option<u64>, is_mine: bool) -> RawInput {
        RawInput {
            address: Some(addr.to_string()),
            previous_output: Some(RawPrevOutput { value, is_mine }),
        }
    }

    fn output(addr: &str, value: u64, is_mine: bool) -> RawOutput {
        RawOutput {
            address: Some(addr.to_string()),
            value,
            is_mine,
        }
    }

    fn raw(inputs: Vec<RawInput>, outputs: Vec<RawOutput>, block: Option<u64>) -> RawTransaction {
        RawTransaction {
            hash: vec![0x11; 32],
            inputs,
            outputs,
            block: block.map(|height| RawBlock { height, timestamp: 1_700_000_000 + height }),
            block_index: block.map(|_| 3),
        }
    }

    #[test]
    fn incoming_amount_is_positive() {
        let tx = raw(
            vec![input("them", Some(2 * COIN), false)],
            vec![output("me", COIN, true), output("them-change", COIN - 500, false)],
            Some(100),
        );
        let rec = TransactionRecord::from_raw(&tx, 100, COMPLETION_THRESHOLD).unwrap();
        assert_eq!(rec.amount, COIN as i64);
        assert!(!rec.is_sent());
        assert_eq!(rec.fee, Some(500));
        assert_eq!(rec.timestamp, Some(1_700_000_100));
        assert_eq!(rec.block_index, Some(3));
        assert!(rec.is_direction_consistent());
    }

    #[test]
    fn outgoing_amount_nets_change() {
        let tx = raw(
            vec![input("me", Some(5 * COIN), true)],
            vec![output("them", 2 * COIN, false), output("me-change", 3 * COIN - 1_000, true)],
            None,
        );
        let rec = TransactionRecord::from_raw(&tx, 100, COMPLETION_THRESHOLD).unwrap();
        assert_eq!(rec.amount, -(2 * COIN as i64) - 1_000);
        assert!(rec.is_sent());
        assert_eq!(rec.status, TransactionStatus::Processing);
        assert_eq!(rec.timestamp, None);
        assert_eq!(rec.block_index, None);
        assert!(rec.is_direction_consistent());
    }

    #[test]
    fn foreign_input_without_previous_output_is_ignored() {
        let tx = raw(
            vec![RawInput { address: None, previous_output: None }],
            vec![output("me", COIN, true)],
            Some(10),
        );
        let rec = TransactionRecord::from_raw(&tx, 20, COMPLETION_THRESHOLD).unwrap();
        assert_eq!(rec.amount, COIN as i64);
        assert!(rec.from.is_empty());
        assert_eq!(rec.fee, None);
    }

    #[test]
    fn mine_input_with_unknown_value_is_malformed() {
        let tx = raw(vec![input("me", None, true)], vec![output("them", 1, false)], None);
        assert_eq!(
            TransactionRecord::from_raw(&tx, 0, COMPLETION_THRESHOLD),
            Err(RecordError::UnknownInputValue { index: 0 })
        );
    }

    #[test]
    fn bad_hash_is_malformed() {
        let mut tx = raw(vec![], vec![output("me", 1, true)], None);
        tx.hash = vec![1, 2];
        assert_eq!(
            TransactionRecord::from_raw(&tx, 0, COMPLETION_THRESHOLD),
            Err(RecordError::InvalidHash(2))
        );
    }

    #[test]
    fn empty_transaction_is_malformed() {
        let tx = raw(vec![], vec![], None);
        assert_eq!(
            TransactionRecord::from_raw(&tx, 0, COMPLETION_THRESHOLD),
            Err(RecordError::EmptyTransaction)
        );
    }

    #[test]
    fn output_overflow_is_malformed() {
        let tx = raw(
            vec![],
            vec![output("me", u64::MAX, true), output("me", 1, true)],
            None,
        );
        assert_eq!(
            TransactionRecord::from_raw(&tx, 0, COMPLETION_THRESHOLD),
            Err(RecordError::ValueOverflow)
        );
    }

    #[test]
    fn status_follows_tip() {
        let tx = raw(vec![], vec![output("me", COIN, true)], Some(100));
        let rec = TransactionRecord::from_raw(&tx, 102, COMPLETION_THRESHOLD).unwrap();
        assert_eq!(rec.status, TransactionStatus::Verifying { progress: 0.5 });

        let later = rec.with_tip(105, COMPLETION_THRESHOLD);
        assert_eq!(later.status, TransactionStatus::Completed);
        assert_eq!(later.hash, rec.hash);
        assert_eq!(later.amount, rec.amount);
    }

    #[test]
    fn self_transfer_is_zero_and_not_sent() {
        let tx = raw(
            vec![input("me", Some(COIN), true)],
            vec![output("me2", COIN, true)],
            Some(1),
        );
        let rec = TransactionRecord::from_raw(&tx, 1, COMPLETION_THRESHOLD).unwrap();
        assert_eq!(rec.amount, 0);
        assert!(!rec.is_sent());
        assert_eq!(rec.fee, Some(0));
    }
}
