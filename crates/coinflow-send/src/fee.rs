//! Size-based fee estimation.
//!
//! Transaction size is modelled in virtual bytes:
//! `overhead + inputs * input_size + outputs * output_size(kind)`.
//! Unspent outputs are selected largest-first until `amount + fee` is
//! covered. A change output is added only when the leftover is at or above
//! the dust threshold; dust change is left to the miner.

use coinflow_core::types::UnspentOutput;
use serde::{Deserialize, Serialize};

/// Fixed per-transaction overhead (version, locktime, counts).
pub const TX_OVERHEAD_VBYTES: u64 = 10;

/// Size of one signed legacy input.
pub const INPUT_VBYTES: u64 = 148;

/// Script type of a destination address, as reported by the chain adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    /// Destination not known yet; sized like a legacy output.
    #[default]
    Unknown,
}

impl AddressKind {
    /// Serialized size of an output paying to this kind of address.
    pub fn output_vbytes(&self) -> u64 {
        match self {
            Self::P2pkh | Self::Unknown => 34,
            Self::P2sh => 32,
            Self::P2wpkh => 31,
            Self::P2wsh | Self::P2tr => 43,
        }
    }
}

/// Estimate of the network fee for sending `amount` to an address of `kind`.
pub trait FeeEstimator: Send + Sync {
    /// Fee in coin base units. `fee_rate` is in base units per virtual byte.
    fn fee(&self, amount: u64, kind: AddressKind, fee_rate: u64) -> u64;
}

/// [`FeeEstimator`] over a snapshot of the wallet's unspent outputs.
#[derive(Debug, Clone)]
pub struct SizeFeeEstimator {
    /// Values sorted descending.
    values: Vec<u64>,
    dust_threshold: u64,
    change_kind: AddressKind,
}

impl SizeFeeEstimator {
    pub fn new(mut values: Vec<u64>, dust_threshold: u64) -> Self {
        values.sort_unstable_by(|a, b| b.cmp(a));
        Self {
            values,
            dust_threshold,
            change_kind: AddressKind::P2pkh,
        }
    }

    pub fn from_outputs(outputs: &[UnspentOutput], dust_threshold: u64) -> Self {
        Self::new(outputs.iter().map(|o| o.value).collect(), dust_threshold)
    }

    /// Script type used for the wallet's own change output.
    pub fn with_change_kind(mut self, kind: AddressKind) -> Self {
        self.change_kind = kind;
        self
    }

    fn vbytes(inputs: usize, output_vbytes: u64) -> u64 {
        TX_OVERHEAD_VBYTES
            .saturating_add(INPUT_VBYTES.saturating_mul(inputs as u64))
            .saturating_add(output_vbytes)
    }
}

impl FeeEstimator for SizeFeeEstimator {
    fn fee(&self, amount: u64, kind: AddressKind, fee_rate: u64) -> u64 {
        let to = kind.output_vbytes();
        let with_change = to.saturating_add(self.change_kind.output_vbytes());

        let mut selected: u64 = 0;
        for (i, value) in self.values.iter().enumerate() {
            selected = selected.saturating_add(*value);
            let inputs = i + 1;

            let fee = Self::vbytes(inputs, to).saturating_mul(fee_rate);
            if selected < amount.saturating_add(fee) {
                continue;
            }

            let fee_change = Self::vbytes(inputs, with_change).saturating_mul(fee_rate);
            let needed = amount.saturating_add(fee_change);
            if selected >= needed && selected - needed >= self.dust_threshold {
                return fee_change;
            }
            return fee;
        }

        // Not enough funds: every input, no change.
        Self::vbytes(self.values.len().max(1), to).saturating_mul(fee_rate)
    }
}
