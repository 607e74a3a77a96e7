//! Node: the block tree and pending pool behind a single lock.
//!
//! Block admission, transaction admission and tip reads may arrive from any
//! number of threads. Each call takes the lock for its whole duration, so no
//! caller ever observes a half-attached block or a pool that disagrees with
//! the tip it was validated against.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use arbor_core::error::{ArborError, BlockError};
use arbor_core::fork::{BlockOutcome, ChainTip, ForkManager};
use arbor_core::mempool::PendingPool;
use arbor_core::types::{Block, Hash256, Transaction};
use arbor_core::utxo::UtxoSet;

use crate::config::NodeConfig;
use crate::error::NodeError;

/// A running node.
pub struct Node {
    chain: Mutex<ForkManager>,
    config: NodeConfig,
}

impl Node {
    /// Start a node whose tree is rooted at `genesis`.
    pub fn new(genesis: Block, config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        let chain = ForkManager::with_config(genesis, config.fork.clone())?;
        info!(
            genesis = %chain.genesis_hash(),
            cut_off_age = config.fork.cut_off_age,
            max_pending = config.fork.max_pending,
            "node started"
        );
        Ok(Arc::new(Self {
            chain: Mutex::new(chain),
            config,
        }))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Admit a block. See [`ForkManager::add_block`].
    pub fn add_block(&self, block: &Block) -> bool {
        self.chain.lock().add_block(block)
    }

    /// Admit a block, reporting why it was rejected.
    pub fn process_block(&self, block: &Block) -> Result<BlockOutcome, BlockError> {
        self.chain.lock().process_block(block)
    }

    /// Offer a transaction to the pending pool. Invalid ones are dropped.
    pub fn add_transaction(&self, tx: Transaction) {
        self.chain.lock().add_transaction(tx);
    }

    /// Offer a transaction to the pending pool, reporting the outcome.
    pub fn try_add_transaction(&self, tx: Transaction) -> Result<Hash256, ArborError> {
        self.chain.lock().try_add_transaction(tx)
    }

    pub fn tip(&self) -> ChainTip {
        self.chain.lock().tip()
    }

    /// A copy of the canonical tip block.
    pub fn max_height_block(&self) -> Block {
        self.chain.lock().max_height_block().clone()
    }

    /// A copy of the ledger at the canonical tip.
    pub fn max_height_ledger(&self) -> UtxoSet {
        self.chain.lock().max_height_ledger().clone()
    }

    /// Pending transactions, oldest first.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.chain.lock().pending_pool().transactions()
    }

    /// Run `f` against the pending pool while holding the node lock.
    pub fn with_pending_pool<R>(&self, f: impl FnOnce(&mut PendingPool) -> R) -> R {
        f(self.chain.lock().pending_pool_mut())
    }

    /// Run `f` against the block tree while holding the node lock.
    pub fn with_chain<R>(&self, f: impl FnOnce(&ForkManager) -> R) -> R {
        let chain = self.chain.lock();
        f(&chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::crypto::{sign_transaction_input, KeyPair};
    use arbor_core::genesis::{genesis_block, genesis_outpoint};
    use arbor_core::types::{OutPoint, TxOutput};

    fn key() -> KeyPair {
        KeyPair::from_secret_bytes([1u8; 32])
    }

    fn test_node() -> (Arc<Node>, Block) {
        let genesis = genesis_block(&key().owner(), 100, 0).unwrap();
        let node = Node::new(genesis.clone(), NodeConfig::default()).unwrap();
        (node, genesis)
    }

    fn child_of(parent: Hash256, txs: Vec<Transaction>, depth: u64, timestamp: u64) -> Block {
        let coinbase = Transaction::coinbase(vec![TxOutput { value: 10, owner: key().owner() }], depth);
        Block::new(parent, coinbase, txs, timestamp).unwrap()
    }

    fn spend(from: OutPoint, value: i64) -> Transaction {
        let mut tx = Transaction::new(vec![from], vec![TxOutput { value, owner: [9u8; 32] }]);
        sign_transaction_input(&mut tx, 0, &key()).unwrap();
        tx
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    #[test]
    fn node_starts_at_genesis() {
        let (node, genesis) = test_node();
        assert_eq!(node.tip(), ChainTip { hash: genesis.hash(), depth: 1 });
        assert_eq!(node.max_height_block(), genesis);
        assert_eq!(node.max_height_ledger().total_value(), Some(100));
        assert!(node.pending_transactions().is_empty());
    }

    #[test]
    fn invalid_config_rejected() {
        let (_, genesis) = test_node();
        let mut config = NodeConfig::default();
        config.fork.cut_off_age = 0;
        assert!(matches!(
            Node::new(genesis, config),
            Err(NodeError::Core(ArborError::Config(_)))
        ));
    }

    // ------------------------------------------------------------------
    // Blocks and transactions
    // ------------------------------------------------------------------

    #[test]
    fn block_extends_tip() {
        let (node, genesis) = test_node();
        let block = child_of(genesis.hash(), vec![], 2, 2);
        assert_eq!(node.process_block(&block), Ok(BlockOutcome::Connected { depth: 2 }));
        assert_eq!(node.process_block(&block), Ok(BlockOutcome::Duplicate));
        assert_eq!(node.tip().hash, block.hash());
    }

    #[test]
    fn unknown_parent_rejected() {
        let (node, genesis) = test_node();
        assert!(!node.add_block(&child_of(Hash256([7; 32]), vec![], 2, 2)));
        assert_eq!(node.tip().hash, genesis.hash());
    }

    #[test]
    fn pooled_transaction_cleared_by_block() {
        let (node, genesis) = test_node();
        let tx = spend(genesis_outpoint(&genesis).unwrap(), 60);
        node.add_transaction(tx.clone());
        assert_eq!(node.pending_transactions(), vec![tx.clone()]);

        assert!(node.add_block(&child_of(genesis.hash(), vec![tx], 2, 2)));
        assert!(node.pending_transactions().is_empty());
    }

    #[test]
    fn invalid_transaction_not_pooled() {
        let (node, genesis) = test_node();
        let overspend = spend(genesis_outpoint(&genesis).unwrap(), 101);
        assert!(node.try_add_transaction(overspend.clone()).is_err());
        node.add_transaction(overspend);
        assert_eq!(node.with_pending_pool(|pool| pool.len()), 0);
    }

    #[test]
    fn with_chain_sees_tree() {
        let (node, genesis) = test_node();
        node.add_block(&child_of(genesis.hash(), vec![], 2, 2));
        assert_eq!(node.with_chain(|chain| chain.node_count()), 2);
    }

    #[test]
    fn concurrent_extension_is_serialised() {
        let genesis = genesis_block(&key().owner(), 100, 0).unwrap();
        let mut config = NodeConfig::default();
        config.fork.cut_off_age = 100;
        let node = Node::new(genesis.clone(), config).unwrap();
        // Four threads race to extend the same chain; each block is built on
        // whatever tip the thread observed, so some land as forks.
        std::thread::scope(|s| {
            for t in 0..4u64 {
                let node = &node;
                s.spawn(move || {
                    for i in 0..10u64 {
                        let tip = node.tip();
                        let block = child_of(tip.hash, vec![], tip.depth + 1, 1_000 * (t + 1) + i);
                        node.add_block(&block);
                    }
                });
            }
        });

        let tip = node.tip();
        assert!(tip.depth >= 11);
        assert_eq!(node.with_chain(|chain| chain.node_count()), 41);
        node.with_chain(|chain| {
            assert!(chain.contains_block(&tip.hash));
            assert!(chain.ledger_at(&tip.hash).is_some());
            assert!(!chain.contains_block(&Hash256::ZERO));
        });
        assert_ne!(tip.hash, genesis.hash());
    }

    #[derive(Clone, Default)]
    struct LogBuf(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuf {
        fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn connected_block_logged_once() {
        let (node, genesis) = test_node();
        let buf = LogBuf::default();
        let sink = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();

        let block = child_of(genesis.hash(), vec![], 2, 2);
        tracing::subscriber::with_default(subscriber, || {
            assert!(node.process_block(&block).is_ok());
        });

        let logged = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logged.matches("block connected").count(), 1);
    }
}
