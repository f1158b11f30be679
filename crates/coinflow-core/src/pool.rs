//! In-memory pool of wallet transactions.
//!
//! The pool keeps two deduplicated sets keyed by transaction hash:
//! - `pending`: unconfirmed transactions, in arrival order
//! - `confirmed`: mined transactions
//!
//! It provides:
//! - snapshot replacement ([`TransactionPool::store`])
//! - idempotent incremental merges that report only new hashes
//!   ([`TransactionPool::sync_pending`], [`TransactionPool::sync_confirmed`])
//! - filtered, cursor-paginated history in a deterministic total order
//!
//! # Ordering
//!
//! Pending entries always come first, most recently arrived first. Confirmed
//! entries follow, newest block first, then higher in-block index first,
//! then descending hash as the final tie-break.
//!
//! A hash present in both sets resolves to the confirmed entry. The pool
//! keeps the sets disjoint: confirming a hash drops its pending entry, and a
//! pending delta for an already confirmed hash is ignored.
//!
//! All state sits behind one `RwLock`: every mutation runs under a single
//! write guard, so readers only ever see complete `store`/`sync` results.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;
use tracing::debug;

use crate::record::TransactionRecord;
use crate::types::TxHash;

/// History filter.
///
/// The wallet knows more transaction kinds than a plain UTXO pool can tell
/// apart; the pool answers those with an empty page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionFilter {
    #[default]
    All,
    /// Received, i.e. not sent by this wallet.
    Incoming,
    /// Sent by this wallet.
    Outgoing,
    /// Token swaps. Not tracked by this pool.
    Swap,
    /// Token approvals. Not tracked by this pool.
    Approve,
}

impl TransactionFilter {
    /// Whether this pool can answer the filter at all.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::All | Self::Incoming | Self::Outgoing)
    }

    /// Whether `record` passes the filter. Unsupported filters match nothing.
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        match self {
            Self::All => true,
            Self::Incoming => !record.is_sent(),
            Self::Outgoing => record.is_sent(),
            Self::Swap | Self::Approve => false,
        }
    }
}

#[derive(Debug, Clone)]
struct PoolEntry {
    record: TransactionRecord,
    /// Monotonic arrival sequence; higher is newer.
    arrival: u64,
}

#[derive(Debug, Default)]
struct PoolSets {
    confirmed: HashMap<TxHash, PoolEntry>,
    pending: HashMap<TxHash, PoolEntry>,
    next_arrival: u64,
}

impl PoolSets {
    fn from_snapshot(
        confirmed: impl IntoIterator<Item = TransactionRecord>,
        pending: impl IntoIterator<Item = TransactionRecord>,
    ) -> Self {
        let mut sets = Self::default();
        for record in confirmed {
            let arrival = sets.bump();
            sets.confirmed.insert(record.hash, PoolEntry { record, arrival });
        }
        for record in pending {
            if sets.confirmed.contains_key(&record.hash) {
                continue;
            }
            let arrival = sets.bump();
            sets.pending.insert(record.hash, PoolEntry { record, arrival });
        }
        sets
    }

    fn bump(&mut self) -> u64 {
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        arrival
    }

    fn contains(&self, hash: &TxHash) -> bool {
        self.confirmed.contains_key(hash) || self.pending.contains_key(hash)
    }

    fn get(&self, hash: &TxHash) -> Option<&PoolEntry> {
        self.confirmed.get(hash).or_else(|| self.pending.get(hash))
    }
}

/// Total order for history: pending first (newest arrival first), then
/// confirmed by height, in-block index and hash, all descending.
fn history_order(a: &PoolEntry, b: &PoolEntry) -> Ordering {
    match (a.record.block_height, b.record.block_height) {
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => b
            .arrival
            .cmp(&a.arrival)
            .then_with(|| b.record.hash.cmp(&a.record.hash)),
        (Some(ha), Some(hb)) => hb
            .cmp(&ha)
            .then_with(|| b.record.block_index.cmp(&a.record.block_index))
            .then_with(|| b.record.hash.cmp(&a.record.hash)),
    }
}

/// Thread-safe pool of pending and confirmed wallet transactions.
#[derive(Debug, Default)]
pub struct TransactionPool {
    sets: RwLock<PoolSets>,
}

impl TransactionPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both sets with a snapshot.
    ///
    /// Duplicates within one sequence are resolved last-write-wins. A hash
    /// present in both sequences is kept only as confirmed.
    pub fn store(
        &self,
        confirmed: impl IntoIterator<Item = TransactionRecord>,
        pending: impl IntoIterator<Item = TransactionRecord>,
    ) {
        let next = PoolSets::from_snapshot(confirmed, pending);
        debug!(
            confirmed = next.confirmed.len(),
            pending = next.pending.len(),
            "stored transaction snapshot"
        );
        *self.sets.write() = next;
    }

    /// Replace both sets like [`store`](Self::store) and return the records
    /// whose hash was not in the pool before.
    ///
    /// The returned records are the stored ones (confirmed first), so a hash
    /// duplicated in the input is reported once.
    pub fn refresh(
        &self,
        confirmed: impl IntoIterator<Item = TransactionRecord>,
        pending: impl IntoIterator<Item = TransactionRecord>,
    ) -> Vec<TransactionRecord> {
        let next = PoolSets::from_snapshot(confirmed, pending);
        let mut sets = self.sets.write();

        let mut fresh: Vec<&PoolEntry> = next
            .confirmed
            .values()
            .chain(next.pending.values())
            .filter(|entry| !sets.contains(&entry.record.hash))
            .collect();
        fresh.sort_by_key(|entry| entry.arrival);
        let fresh: Vec<TransactionRecord> = fresh.into_iter().map(|e| e.record.clone()).collect();

        debug!(
            confirmed = next.confirmed.len(),
            pending = next.pending.len(),
            new = fresh.len(),
            "refreshed transaction snapshot"
        );
        *sets = next;
        fresh
    }

    /// Merge unconfirmed transactions.
    ///
    /// Returns exactly the records that were inserted, in input order.
    /// Hashes already pending, or already confirmed, are skipped.
    pub fn sync_pending(
        &self,
        delta: impl IntoIterator<Item = TransactionRecord>,
    ) -> Vec<TransactionRecord> {
        let mut guard = self.sets.write();
        let PoolSets {
            confirmed,
            pending,
            next_arrival,
        } = &mut *guard;

        let mut inserted = Vec::new();
        for record in delta {
            if confirmed.contains_key(&record.hash) {
                continue;
            }
            if let Entry::Vacant(slot) = pending.entry(record.hash) {
                inserted.push(record.clone());
                slot.insert(PoolEntry {
                    record,
                    arrival: *next_arrival,
                });
                *next_arrival += 1;
            }
        }

        if !inserted.is_empty() {
            debug!(new = inserted.len(), total = pending.len(), "synced pending transactions");
        }
        inserted
    }

    /// Merge confirmed transactions.
    ///
    /// Returns exactly the records that were inserted into the confirmed
    /// set, in input order. A newly confirmed hash supersedes its pending
    /// entry.
    pub fn sync_confirmed(
        &self,
        delta: impl IntoIterator<Item = TransactionRecord>,
    ) -> Vec<TransactionRecord> {
        let mut guard = self.sets.write();
        let PoolSets {
            confirmed,
            pending,
            next_arrival,
        } = &mut *guard;

        let mut inserted = Vec::new();
        for record in delta {
            if let Entry::Vacant(slot) = confirmed.entry(record.hash) {
                pending.remove(&record.hash);
                inserted.push(record.clone());
                slot.insert(PoolEntry {
                    record,
                    arrival: *next_arrival,
                });
                *next_arrival += 1;
            }
        }

        if !inserted.is_empty() {
            debug!(new = inserted.len(), total = confirmed.len(), "synced confirmed transactions");
        }
        inserted
    }

    /// One page of history.
    ///
    /// Returns at most `limit` records strictly after `from` in history
    /// order. A cursor that is not part of the filtered history yields an
    /// empty page, as does an unsupported filter.
    pub fn transactions(
        &self,
        filter: TransactionFilter,
        from: Option<&TxHash>,
        limit: usize,
    ) -> Vec<TransactionRecord> {
        if !filter.is_supported() {
            return Vec::new();
        }

        let sets = self.sets.read();
        let mut view: Vec<&PoolEntry> = sets
            .confirmed
            .values()
            .chain(sets.pending.values())
            .filter(|entry| filter.matches(&entry.record))
            .collect();
        view.sort_by(|a, b| history_order(a, b));

        let start = match from {
            None => 0,
            Some(cursor) => match view.iter().position(|e| e.record.hash == *cursor) {
                Some(index) => index + 1,
                None => return Vec::new(),
            },
        };

        view.into_iter()
            .skip(start)
            .take(limit)
            .map(|entry| entry.record.clone())
            .collect()
    }

    /// Look up a transaction by hash. Confirmed entries win.
    pub fn transaction(&self, hash: &TxHash) -> Option<TransactionRecord> {
        self.sets.read().get(hash).map(|entry| entry.record.clone())
    }

    /// Whether a hash is known in either set.
    pub fn contains(&self, hash: &TxHash) -> bool {
        self.sets.read().contains(hash)
    }

    /// Number of distinct transactions.
    pub fn len(&self) -> usize {
        let sets = self.sets.read();
        sets.confirmed.len() + sets.pending.len()
    }

    /// Whether the pool holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of pending transactions.
    pub fn pending_count(&self) -> usize {
        self.sets.read().pending.len()
    }

    /// Number of confirmed transactions.
    pub fn confirmed_count(&self) -> usize {
        self.sets.read().confirmed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionStatus;

    fn hash(seed: u8) -> TxHash {
        TxHash([seed; 32])
    }

    fn confirmed(seed: u8, height: u64, index: u32, amount: i64) -> TransactionRecord {
        TransactionRecord {
            hash: hash(seed),
            from: vec![],
            to: vec![],
            amount,
            fee: None,
            status: TransactionStatus::Completed,
            timestamp: Some(1_700_000_000 + height),
            block_height: Some(height),
            block_index: Some(index),
        }
    }

    fn pending(seed: u8, amount: i64) -> TransactionRecord {
        TransactionRecord {
            hash: hash(seed),
            from: vec![],
            to: vec![],
            amount,
            fee: None,
            status: TransactionStatus::Processing,
            timestamp: None,
            block_height: None,
            block_index: None,
        }
    }

    fn hashes(records: &[TransactionRecord]) -> Vec<TxHash> {
        records.iter().map(|r| r.hash).collect()
    }

    #[test]
    fn store_then_sync_reports_only_new() {
        let pool = TransactionPool::new();
        pool.store(
            vec![confirmed(0xA, 10, 0, 5), confirmed(0xB, 11, 0, -3)],
            vec![pending(0xC, 7)],
        );

        let new = pool.sync_confirmed(vec![confirmed(0xB, 11, 0, -3), confirmed(0xD, 12, 0, 1)]);
        assert_eq!(hashes(&new), vec![hash(0xD)]);

        let all = pool.transactions(TransactionFilter::All, None, 100);
        assert_eq!(all.len(), 4);
        for seed in [0xA, 0xB, 0xC, 0xD] {
            assert!(all.iter().any(|r| r.hash == hash(seed)));
        }
    }

    #[test]
    fn store_replaces_everything() {
        let pool = TransactionPool::new();
        pool.store(vec![confirmed(1, 1, 0, 1)], vec![pending(2, 1)]);
        pool.store(vec![confirmed(3, 2, 0, 1)], Vec::new());

        let all = pool.transactions(TransactionFilter::All, None, 100);
        assert_eq!(hashes(&all), vec![hash(3)]);
        assert!(pool.transaction(&hash(1)).is_none());
        assert!(pool.transaction(&hash(2)).is_none());
    }

    #[test]
    fn store_is_last_write_wins() {
        let pool = TransactionPool::new();
        pool.store(vec![confirmed(1, 1, 0, 1), confirmed(1, 1, 0, 99)], Vec::new());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.transaction(&hash(1)).unwrap().amount, 99);
    }

    #[test]
    fn store_prefers_confirmed_on_collision() {
        let pool = TransactionPool::new();
        pool.store(vec![confirmed(1, 5, 0, 1)], vec![pending(1, 1)]);
        assert_eq!(pool.pending_count(), 0);
        assert_eq!(pool.confirmed_count(), 1);
        assert!(pool.transaction(&hash(1)).unwrap().is_confirmed());
    }

    #[test]
    fn sync_is_idempotent() {
        let pool = TransactionPool::new();
        assert_eq!(pool.sync_pending(vec![pending(1, 1)]).len(), 1);
        assert!(pool.sync_pending(vec![pending(1, 1)]).is_empty());
        assert_eq!(pool.transactions(TransactionFilter::All, None, 10).len(), 1);
    }

    #[test]
    fn sync_reports_duplicates_within_delta_once() {
        let pool = TransactionPool::new();
        let new = pool.sync_pending(vec![pending(1, 1), pending(1, 1), pending(2, 1)]);
        assert_eq!(hashes(&new), vec![hash(1), hash(2)]);
    }

    #[test]
    fn sync_then_lookup() {
        let pool = TransactionPool::new();
        let rec = pending(9, -4);
        pool.sync_pending(vec![rec.clone()]);
        assert_eq!(pool.transaction(&rec.hash), Some(rec));
    }

    #[test]
    fn confirmation_supersedes_pending() {
        let pool = TransactionPool::new();
        pool.sync_pending(vec![pending(1, 1)]);
        let new = pool.sync_confirmed(vec![confirmed(1, 3, 0, 1)]);
        assert_eq!(new.len(), 1);
        assert_eq!(pool.pending_count(), 0);
        assert_eq!(pool.len(), 1);

        // A late pending echo of a confirmed hash is ignored.
        assert!(pool.sync_pending(vec![pending(1, 1)]).is_empty());
        assert!(pool.transaction(&hash(1)).unwrap().is_confirmed());
    }

    #[test]
    fn history_order_pending_first_then_height() {
        let pool = TransactionPool::new();
        pool.store(
            vec![
                confirmed(1, 10, 0, 1),
                confirmed(2, 12, 0, 1),
                confirmed(3, 12, 4, 1),
                confirmed(4, 11, 0, 1),
            ],
            vec![pending(5, 1)],
        );
        pool.sync_pending(vec![pending(6, 1)]);

        let all = pool.transactions(TransactionFilter::All, None, 100);
        assert_eq!(
            hashes(&all),
            vec![hash(6), hash(5), hash(3), hash(2), hash(4), hash(1)]
        );
    }

    #[test]
    fn filters_split_by_direction() {
        let pool = TransactionPool::new();
        pool.store(
            vec![confirmed(1, 1, 0, 10), confirmed(2, 2, 0, -10)],
            vec![pending(3, -1), pending(4, 0)],
        );

        let incoming = pool.transactions(TransactionFilter::Incoming, None, 100);
        let outgoing = pool.transactions(TransactionFilter::Outgoing, None, 100);
        assert_eq!(hashes(&incoming), vec![hash(4), hash(1)]);
        assert_eq!(hashes(&outgoing), vec![hash(3), hash(2)]);
        assert!(incoming.iter().all(|r| !r.is_sent()));
        assert!(outgoing.iter().all(|r| r.is_sent()));
    }

    #[test]
    fn unsupported_filter_is_empty() {
        let pool = TransactionPool::new();
        pool.store(vec![confirmed(1, 1, 0, 10)], Vec::new());
        assert!(pool.transactions(TransactionFilter::Swap, None, 10).is_empty());
        assert!(pool.transactions(TransactionFilter::Approve, None, 10).is_empty());
    }

    #[test]
    fn pagination_with_cursor() {
        let pool = TransactionPool::new();
        pool.store((1..=5).map(|i| confirmed(i, u64::from(i), 0, 1)), Vec::new());

        let first = pool.transactions(TransactionFilter::All, None, 2);
        assert_eq!(hashes(&first), vec![hash(5), hash(4)]);
        let second = pool.transactions(TransactionFilter::All, Some(&hash(4)), 2);
        assert_eq!(hashes(&second), vec![hash(3), hash(2)]);
        let third = pool.transactions(TransactionFilter::All, Some(&hash(2)), 2);
        assert_eq!(hashes(&third), vec![hash(1)]);
        assert!(pool.transactions(TransactionFilter::All, Some(&hash(1)), 2).is_empty());
    }

    #[test]
    fn unknown_cursor_yields_empty_page() {
        let pool = TransactionPool::new();
        pool.store(vec![confirmed(1, 1, 0, 1)], Vec::new());
        assert!(pool.transactions(TransactionFilter::All, Some(&hash(42)), 10).is_empty());
    }

    #[test]
    fn cursor_outside_filter_yields_empty_page() {
        let pool = TransactionPool::new();
        pool.store(vec![confirmed(1, 1, 0, 1), confirmed(2, 2, 0, -1)], Vec::new());
        assert!(pool
            .transactions(TransactionFilter::Incoming, Some(&hash(2)), 10)
            .is_empty());
    }

    #[test]
    fn refresh_reports_unknown_hashes() {
        let pool = TransactionPool::new();
        pool.store(vec![confirmed(1, 1, 0, 1)], vec![pending(2, 1)]);

        let fresh = pool.refresh(vec![confirmed(1, 1, 0, 1), confirmed(2, 2, 0, 1)], vec![pending(3, 1)]);
        assert_eq!(hashes(&fresh), vec![hash(3)]);
        assert_eq!(pool.confirmed_count(), 2);
        assert_eq!(pool.pending_count(), 1);
    }

    #[test]
    fn empty_pool() {
        let pool = TransactionPool::new();
        assert!(pool.is_empty());
        assert!(pool.transactions(TransactionFilter::All, None, 10).is_empty());
        assert!(!pool.contains(&hash(1)));
    }
}
