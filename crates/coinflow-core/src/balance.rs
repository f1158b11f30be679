//! Balance and history reconciliation against a chain sync engine.
//!
//! The [`BalanceAdapter`] is driven by change notifications from the sync
//! engine's background thread and read from the foreground. It never patches
//! derived state: the balance is re-summed from the full unspent-output set,
//! and every transaction record is re-derived when the transaction set or
//! the chain tip changes, since confirmation depth moves for all of them at
//! once and reorganizations can remove outputs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::WalletConfig;
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::error::CoinflowError;
use crate::pool::{TransactionFilter, TransactionPool};
use crate::record::TransactionRecord;
use crate::traits::ChainAdapter;
use crate::types::{RawTransaction, TxHash, UnspentOutput};

/// Change notifications published by a [`BalanceAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Spendable balance changed; new value in base units.
    BalanceChanged(u64),
    /// Transactions not seen before, in arrival order.
    TransactionsReceived(Vec<TxHash>),
    /// Chain tip moved.
    LastBlockHeightChanged(u64),
}

/// Sum output values, saturating at `u64::MAX`.
pub fn sum_unspent(outputs: &[UnspentOutput]) -> u64 {
    let mut total: u64 = 0;
    for output in outputs {
        match total.checked_add(output.value) {
            Some(t) => total = t,
            None => {
                warn!(count = outputs.len(), "unspent output total overflows; saturating");
                return u64::MAX;
            }
        }
    }
    total
}

/// Reconciles a chain adapter's outputs and transactions into a balance and
/// a [`TransactionPool`].
pub struct BalanceAdapter {
    chain: Arc<dyn ChainAdapter>,
    pool: TransactionPool,
    balance: AtomicU64,
    last_block_height: AtomicU64,
    /// Held from reading the tip until records derived from it are stored.
    reconcile: Mutex<()>,
    completion_threshold: u64,
    events: broadcast::Sender<WalletEvent>,
}

impl BalanceAdapter {
    /// Create an adapter over `chain`. Call [`start`](Self::start) to load
    /// the initial state.
    pub fn new(chain: Arc<dyn ChainAdapter>, config: &WalletConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            chain,
            pool: TransactionPool::new(),
            balance: AtomicU64::new(0),
            last_block_height: AtomicU64::new(0),
            reconcile: Mutex::new(()),
            completion_threshold: config.completion_threshold,
            events,
        }
    }

    /// Load tip, balance and history from the chain adapter.
    pub fn start(&self) -> Result<(), CoinflowError> {
        let tip = {
            let _guard = self.reconcile.lock();
            let tip = self.chain.last_block_height()?;
            self.last_block_height.store(tip, Ordering::SeqCst);
            tip
        };
        self.on_unspent_outputs_changed()?;
        let known = self.on_transactions_changed()?;
        info!(tip, transactions = known.len(), balance = self.balance(), "wallet adapter started");
        Ok(())
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: WalletEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Recompute the balance from the full unspent-output set.
    ///
    /// Returns the new balance. Publishes [`WalletEvent::BalanceChanged`]
    /// when it differs from the previous value.
    pub fn on_unspent_outputs_changed(&self) -> Result<u64, CoinflowError> {
        let outputs = self.chain.unspent_outputs()?;
        let balance = sum_unspent(&outputs);
        let previous = self.balance.swap(balance, Ordering::SeqCst);
        if previous != balance {
            debug!(previous, balance, outputs = outputs.len(), "balance changed");
            self.publish(WalletEvent::BalanceChanged(balance));
        }
        Ok(balance)
    }

    /// Re-derive every transaction record and replace the pool contents.
    ///
    /// Returns the hashes that were not in the pool before, which are also
    /// published as [`WalletEvent::TransactionsReceived`].
    pub fn on_transactions_changed(&self) -> Result<Vec<TxHash>, CoinflowError> {
        let _guard = self.reconcile.lock();
        self.reload_transactions()
    }

    /// Caller holds `reconcile`.
    fn reload_transactions(&self) -> Result<Vec<TxHash>, CoinflowError> {
        let raws = self.chain.transactions()?;
        let tip = self.last_block_height();
        let records = self.derive_records(&raws, tip);

        let (confirmed, pending): (Vec<_>, Vec<_>) =
            records.into_iter().partition(TransactionRecord::is_confirmed);
        let fresh: Vec<TxHash> = self
            .pool
            .refresh(confirmed, pending)
            .into_iter()
            .map(|r| r.hash)
            .collect();

        if !fresh.is_empty() {
            debug!(count = fresh.len(), "new transactions");
            self.publish(WalletEvent::TransactionsReceived(fresh.clone()));
        }
        Ok(fresh)
    }

    /// Pick up a new chain tip.
    ///
    /// When the tip moved, every record's status is re-derived.
    pub fn on_last_block_height_changed(&self) -> Result<u64, CoinflowError> {
        let _guard = self.reconcile.lock();
        let tip = self.chain.last_block_height()?;
        let previous = self.last_block_height.swap(tip, Ordering::SeqCst);
        if previous != tip {
            debug!(previous, tip, "chain tip changed");
            self.publish(WalletEvent::LastBlockHeightChanged(tip));
            self.reload_transactions()?;
        }
        Ok(tip)
    }

    /// Merge an incremental batch of unconfirmed transactions.
    pub fn sync_pending(&self, raws: &[RawTransaction]) -> Vec<TxHash> {
        let _guard = self.reconcile.lock();
        let records = self.derive_records(raws, self.last_block_height());
        let fresh = self.pool.sync_pending(records);
        self.notify_new(fresh)
    }

    /// Merge an incremental batch of confirmed transactions.
    pub fn sync_confirmed(&self, raws: &[RawTransaction]) -> Vec<TxHash> {
        let _guard = self.reconcile.lock();
        let records = self.derive_records(raws, self.last_block_height());
        let fresh = self.pool.sync_confirmed(records);
        self.notify_new(fresh)
    }

    fn notify_new(&self, fresh: Vec<TransactionRecord>) -> Vec<TxHash> {
        let hashes: Vec<TxHash> = fresh.into_iter().map(|r| r.hash).collect();
        if !hashes.is_empty() {
            self.publish(WalletEvent::TransactionsReceived(hashes.clone()));
        }
        hashes
    }

    /// Derive records, dropping malformed raw transactions.
    fn derive_records(&self, raws: &[RawTransaction], tip: u64) -> Vec<TransactionRecord> {
        raws.iter()
            .filter_map(|raw| {
                match TransactionRecord::from_raw(raw, tip, self.completion_threshold) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(hash = %hex::encode(&raw.hash), "dropping malformed transaction: {e}");
                        None
                    }
                }
            })
            .collect()
    }

    /// Last known spendable balance in base units.
    pub fn balance(&self) -> u64 {
        self.balance.load(Ordering::SeqCst)
    }

    /// Last known chain tip.
    pub fn last_block_height(&self) -> u64 {
        self.last_block_height.load(Ordering::SeqCst)
    }

    /// Receive address of the underlying wallet.
    pub fn receive_address(&self) -> String {
        self.chain.receive_address()
    }

    /// One page of history; see [`TransactionPool::transactions`].
    pub fn transactions(
        &self,
        filter: TransactionFilter,
        from: Option<&TxHash>,
        limit: usize,
    ) -> Vec<TransactionRecord> {
        self.pool.transactions(filter, from, limit)
    }

    /// Look up one transaction.
    pub fn transaction(&self, hash: &TxHash) -> Option<TransactionRecord> {
        self.pool.transaction(hash)
    }

    /// The underlying pool.
    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }
}

impl std::fmt::Debug for BalanceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceAdapter")
            .field("balance", &self.balance())
            .field("last_block_height", &self.last_block_height())
            .field("transactions", &self.pool.len())
            .finish()
    }
}
