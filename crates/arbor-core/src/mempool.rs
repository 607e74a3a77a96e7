//! Pending pool of unconfirmed transactions.
//!
//! Holds transactions that passed validation against the canonical tip but
//! are not yet in any admitted block. Entries are indexed by txid and by
//! arrival sequence, so [`PendingPool::transactions`] yields them oldest first
//! for block assembly.
//!
//! The pool does not validate. [`ForkManager::add_transaction`](crate::fork::ForkManager::add_transaction)
//! checks candidates before insertion.

use std::collections::{BTreeMap, HashMap};

use crate::constants::DEFAULT_MAX_PENDING;
use crate::error::PoolError;
use crate::types::{Block, Hash256, Transaction};

#[derive(Debug, Clone)]
struct PoolEntry {
    tx: Transaction,
    seq: u64,
}

/// In-memory pool of unconfirmed transactions.
///
/// Not thread-safe; the node keeps it behind the same lock as the block tree.
#[derive(Debug, Clone)]
pub struct PendingPool {
    entries: HashMap<Hash256, PoolEntry>,
    /// Arrival sequence → txid.
    by_arrival: BTreeMap<u64, Hash256>,
    next_seq: u64,
    max_count: usize,
}

impl PendingPool {
    pub fn new(max_count: usize) -> Self {
        Self {
            entries: HashMap::new(),
            by_arrival: BTreeMap::new(),
            next_seq: 0,
            max_count,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }

    pub fn contains(&self, txid: &Hash256) -> bool {
        self.entries.contains_key(txid)
    }

    pub fn get(&self, txid: &Hash256) -> Option<&Transaction> {
        self.entries.get(txid).map(|e| &e.tx)
    }

    /// Insert `tx`, returning its txid.
    ///
    /// Rejects duplicates, and new entries once `max_count` is reached.
    pub fn insert(&mut self, tx: Transaction) -> Result<Hash256, PoolError> {
        let txid = tx.txid().map_err(|e| PoolError::Internal(e.to_string()))?;
        if self.entries.contains_key(&txid) {
            return Err(PoolError::AlreadyExists(txid.to_string()));
        }
        if self.entries.len() >= self.max_count {
            return Err(PoolError::PoolFull);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_arrival.insert(seq, txid);
        self.entries.insert(txid, PoolEntry { tx, seq });
        Ok(txid)
    }

    pub fn remove(&mut self, txid: &Hash256) -> Option<Transaction> {
        let entry = self.entries.remove(txid)?;
        self.by_arrival.remove(&entry.seq);
        Some(entry.tx)
    }

    /// Drop every transaction confirmed by `block`. Returns how many were present.
    pub fn remove_block(&mut self, block: &Block) -> usize {
        block
            .transactions
            .iter()
            .filter_map(|tx| tx.txid().ok())
            .filter(|txid| self.remove(txid).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Pending transactions, oldest first.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.by_arrival
            .values()
            .filter_map(|txid| self.entries.get(txid))
            .map(|e| e.tx.clone())
            .collect()
    }
}

impl Default for PendingPool {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutPoint, TxOutput};

    fn tx(seed: u8) -> Transaction {
        Transaction::new(
            vec![OutPoint::new(Hash256([seed; 32]), 0)],
            vec![TxOutput { value: seed as i64, owner: [seed; 32] }],
        )
    }

    #[test]
    fn insert_and_lookup() {
        let mut pool = PendingPool::with_defaults();
        let txid = pool.insert(tx(1)).unwrap();
        assert!(pool.contains(&txid));
        assert_eq!(pool.get(&txid), Some(&tx(1)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn duplicate_rejected() {
        let mut pool = PendingPool::with_defaults();
        pool.insert(tx(1)).unwrap();
        assert!(matches!(pool.insert(tx(1)), Err(PoolError::AlreadyExists(_))));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn full_pool_rejects() {
        let mut pool = PendingPool::new(2);
        pool.insert(tx(1)).unwrap();
        pool.insert(tx(2)).unwrap();
        assert_eq!(pool.insert(tx(3)), Err(PoolError::PoolFull));
    }

    #[test]
    fn transactions_in_arrival_order() {
        let mut pool = PendingPool::with_defaults();
        for seed in [5, 1, 3] {
            pool.insert(tx(seed)).unwrap();
        }
        pool.remove(&tx(1).txid().unwrap());
        assert_eq!(pool.transactions(), vec![tx(5), tx(3)]);
    }

    #[test]
    fn remove_block_drops_confirmed() {
        let mut pool = PendingPool::with_defaults();
        pool.insert(tx(1)).unwrap();
        pool.insert(tx(2)).unwrap();
        let block = Block::new(
            Hash256::ZERO,
            Transaction::coinbase(vec![], 1),
            vec![tx(2), tx(9)],
            0,
        )
        .unwrap();
        assert_eq!(pool.remove_block(&block), 1);
        assert!(pool.contains(&tx(1).txid().unwrap()));
        assert!(!pool.contains(&tx(2).txid().unwrap()));
    }

    #[test]
    fn remove_missing_is_none() {
        let mut pool = PendingPool::with_defaults();
        assert!(pool.remove(&Hash256([1; 32])).is_none());
        assert!(pool.is_empty());
    }
}
