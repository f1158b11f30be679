//! Wallet snapshot file: a JSON dump of what a chain sync engine knows.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use coinflow_core::amount::Rate;
use coinflow_core::error::{AddressError, CoinflowError};
use coinflow_core::traits::ChainAdapter;
use coinflow_core::types::{RawTransaction, UnspentOutput};
use coinflow_send::{
    AddressKind, BroadcastError, FeeEstimator, FeeRatePriority, FeeRateProvider, RateProvider,
    SendAdapter, SizeFeeEstimator,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub tip: u64,
    pub receive_address: String,
    pub unspent: Vec<UnspentOutput>,
    pub transactions: Vec<RawTransaction>,
    /// Exchange rate as a decimal string, e.g. "2000".
    pub rate: Option<String>,
    /// Base units per virtual byte.
    pub fee_rates: HashMap<FeeRatePriority, u64>,
}

/// Read-only chain backed by a [`Snapshot`].
#[derive(Debug)]
pub struct SnapshotChain {
    snapshot: Snapshot,
    estimator: SizeFeeEstimator,
}

impl SnapshotChain {
    pub fn new(snapshot: Snapshot, dust_threshold: u64) -> Self {
        let estimator = SizeFeeEstimator::from_outputs(&snapshot.unspent, dust_threshold);
        Self { snapshot, estimator }
    }

    pub fn load(path: &Path, dust_threshold: u64) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&data)
            .with_context(|| format!("Invalid snapshot: {}", path.display()))?;
        Ok(Self::new(snapshot, dust_threshold))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl ChainAdapter for SnapshotChain {
    fn last_block_height(&self) -> Result<u64, CoinflowError> {
        Ok(self.snapshot.tip)
    }

    fn unspent_outputs(&self) -> Result<Vec<UnspentOutput>, CoinflowError> {
        Ok(self.snapshot.unspent.clone())
    }

    fn transactions(&self) -> Result<Vec<RawTransaction>, CoinflowError> {
        Ok(self.snapshot.transactions.clone())
    }

    fn receive_address(&self) -> String {
        self.snapshot.receive_address.clone()
    }
}

/// Classify a Bitcoin-style address by its prefix and length.
pub fn address_kind(address: &str) -> Result<AddressKind, AddressError> {
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if !address.chars().all(|c| c.is_ascii_alphanumeric()) || !(26..=90).contains(&address.len()) {
        return Err(AddressError::Invalid(address.to_string()));
    }
    let lower = address.to_ascii_lowercase();
    if lower.starts_with("bc1q") {
        return Ok(if address.len() > 50 { AddressKind::P2wsh } else { AddressKind::P2wpkh });
    }
    if lower.starts_with("bc1p") {
        return Ok(AddressKind::P2tr);
    }
    if lower.starts_with("tb1") || address.starts_with(['m', 'n', '2']) {
        return Err(AddressError::WrongNetwork(address.to_string()));
    }
    match address.as_bytes()[0] {
        b'1' => Ok(AddressKind::P2pkh),
        b'3' => Ok(AddressKind::P2sh),
        _ => Err(AddressError::Invalid(address.to_string())),
    }
}

#[async_trait]
impl SendAdapter for SnapshotChain {
    fn validate_address(&self, address: &str) -> Result<AddressKind, AddressError> {
        address_kind(address)
    }

    fn fee(&self, amount: u64, address: Option<&str>, fee_rate: u64) -> u64 {
        let kind = address
            .and_then(|a| address_kind(a).ok())
            .unwrap_or_default();
        self.estimator.fee(amount, kind, fee_rate)
    }

    async fn send(&self, _address: &str, _amount: u64) -> Result<(), BroadcastError> {
        Err(BroadcastError("snapshot wallets cannot broadcast".into()))
    }
}

/// Rate and fee rates from the snapshot, optionally overridden on the
/// command line.
#[derive(Debug, Default)]
pub struct StaticQuotes {
    pub rate: Option<Rate>,
    pub fee_rates: HashMap<FeeRatePriority, u64>,
}

#[async_trait]
impl RateProvider for StaticQuotes {
    async fn current_rate(&self, _coin_code: &str) -> Option<Rate> {
        self.rate
    }
}

#[async_trait]
impl FeeRateProvider for StaticQuotes {
    async fn fee_rate(&self, priority: FeeRatePriority) -> Option<u64> {
        self.fee_rates.get(&priority).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_addresses() {
        assert_eq!(address_kind("1BoatSLRHtKNngkdXEeobR76b53LETtpyT"), Ok(AddressKind::P2pkh));
        assert_eq!(address_kind("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy"), Ok(AddressKind::P2sh));
        assert_eq!(
            address_kind("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq"),
            Ok(AddressKind::P2wpkh)
        );
        assert_eq!(address_kind(""), Err(AddressError::Empty));
        assert!(matches!(address_kind("1short"), Err(AddressError::Invalid(_))));
        assert!(matches!(
            address_kind("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"),
            Err(AddressError::WrongNetwork(_))
        ));
    }

    #[test]
    fn load_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        std::fs::write(
            &path,
            r#"{
                "tip": 120,
                "receive_address": "1BoatSLRHtKNngkdXEeobR76b53LETtpyT",
                "unspent": [{"tx_hash": "aa", "index": 0, "value": 100000000}],
                "rate": "2000",
                "fee_rates": {"medium": 10}
            }"#,
        )
        .unwrap();

        let chain = SnapshotChain::load(&path, 546).unwrap();
        assert_eq!(chain.last_block_height().unwrap(), 120);
        assert_eq!(chain.spendable_balance().unwrap(), 100_000_000);
        assert_eq!(chain.snapshot().fee_rates.get(&FeeRatePriority::Medium), Some(&10));
        // 10 + 148 + 34 vbytes, no change when spending everything
        assert_eq!(chain.fee(100_000_000, None, 10), 1_920);
    }

    #[tokio::test]
    async fn snapshot_cannot_broadcast() {
        let chain = SnapshotChain::new(Snapshot::default(), 546);
        assert!(chain.send("1BoatSLRHtKNngkdXEeobR76b53LETtpyT", 1).await.is_err());
    }
}
