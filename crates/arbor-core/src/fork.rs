//! Bounded block tree with per-branch ledger snapshots.
//!
//! [`ForkManager`] tracks competing branches rooted at a genesis block. Each
//! tracked node inside the appendable window keeps the [`UtxoSet`] produced
//! by applying every transaction from genesis down to it, so a new block is
//! validated against exactly the state of the branch it extends.
//!
//! # Layout
//!
//! Nodes live in a flat arena keyed by [`NodeId`]. Parent and child links are
//! ids, and a hash index gives O(1) parent lookup. Current leaves are kept in
//! the order they became leaves, which is also the tie-break order for the
//! canonical tip. A depth index makes pruning proportional to the number of
//! evicted nodes.
//!
//! # Window
//!
//! With `max` the deepest leaf depth, a node at depth `d` can be extended
//! only while `d > max - cut_off_age`. Whenever `max` grows, every node at or
//! below that horizon is dropped together with its snapshot. Genesis stays in
//! the arena as the root but loses its snapshot once it falls behind.
//! Survivors whose parent was dropped keep their cached depth and simply have
//! no parent link.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::constants::{CUT_OFF_AGE, DEFAULT_MAX_PENDING, GENESIS_DEPTH};
use crate::error::{ArborError, BlockError, ConfigError, PoolError, TransactionError};
use crate::mempool::PendingPool;
use crate::types::{Block, Hash256, Transaction};
use crate::utxo::UtxoSet;
use crate::validation::TxValidator;

/// Tunables for the block tree and its pending pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkConfig {
    /// Depth slack before a branch becomes permanently unextendable.
    pub cut_off_age: u64,
    /// Maximum number of pending transactions.
    pub max_pending: usize,
}

impl Default for ForkConfig {
    fn default() -> Self {
        Self {
            cut_off_age: CUT_OFF_AGE,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl ForkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cut_off_age == 0 {
            return Err(ConfigError::ZeroCutOffAge);
        }
        if self.max_pending == 0 {
            return Err(ConfigError::ZeroMaxPending);
        }
        Ok(())
    }
}

/// Opaque arena handle for a tracked block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

#[derive(Debug)]
struct ChainNode {
    block: Block,
    hash: Hash256,
    /// `None` for genesis, or once the parent has been pruned.
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Distance from genesis; genesis is 1.
    depth: u64,
}

/// Block hash and depth of a leaf, as of the call that returned it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainTip {
    pub hash: Hash256,
    pub depth: u64,
}

/// How an admitted block was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Attached as a new leaf at `depth`.
    Connected { depth: u64 },
    /// Already a child of its parent; nothing changed.
    Duplicate,
}

#[derive(Clone, Copy, Debug)]
struct Leaf {
    id: NodeId,
    depth: u64,
}

/// Tracks branches, selects the canonical tip, and enforces the pruning window.
///
/// Not thread-safe. Every mutation and every tip read must be serialised by
/// the caller; `arbor-node` wraps it in a single mutex.
#[derive(Debug)]
pub struct ForkManager {
    config: ForkConfig,
    nodes: HashMap<NodeId, ChainNode>,
    by_hash: HashMap<Hash256, NodeId>,
    /// Depth → non-genesis nodes at that depth.
    by_depth: BTreeMap<u64, Vec<NodeId>>,
    /// Current leaves, oldest first.
    leaves: Vec<Leaf>,
    /// Block hash → cumulative ledger for every appendable node.
    snapshots: HashMap<Hash256, UtxoSet>,
    pool: PendingPool,
    root: NodeId,
    next_id: u64,
}

impl ForkManager {
    /// Start a tree at `genesis` with default settings.
    pub fn new(genesis: Block) -> Result<Self, ArborError> {
        Self::with_config(genesis, ForkConfig::default())
    }

    /// Start a tree at `genesis`, which is assumed valid.
    ///
    /// The genesis snapshot is an empty set with every genesis transaction
    /// the validator accepts applied, followed by the genesis coinbase.
    pub fn with_config(genesis: Block, config: ForkConfig) -> Result<Self, ArborError> {
        config.validate()?;

        let mut validator = TxValidator::new(UtxoSet::new());
        validator.handle_txs(&genesis.transactions);
        let mut ledger = validator.into_utxo_set();
        ledger.add_outputs(&genesis.coinbase)?;

        let root = NodeId(0);
        let hash = genesis.hash();
        info!(%hash, utxos = ledger.len(), "block tree initialised at genesis");

        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            ChainNode {
                block: genesis,
                hash,
                parent: None,
                children: Vec::new(),
                depth: GENESIS_DEPTH,
            },
        );

        Ok(Self {
            pool: PendingPool::new(config.max_pending),
            config,
            nodes,
            by_hash: HashMap::from([(hash, root)]),
            by_depth: BTreeMap::new(),
            leaves: vec![Leaf { id: root, depth: GENESIS_DEPTH }],
            snapshots: HashMap::from([(hash, ledger)]),
            root,
            next_id: 1,
        })
    }

    pub fn config(&self) -> &ForkConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Block admission
    // ------------------------------------------------------------------

    /// Admit `block` if it extends an appendable node and every one of its
    /// transactions is valid on that branch.
    ///
    /// Returns `true` for a newly attached block and for a resubmission of a
    /// block already attached. A rejected block leaves all state untouched.
    pub fn add_block(&mut self, block: &Block) -> bool {
        match self.process_block(block) {
            Ok(_) => true,
            Err(reason) => {
                debug!(hash = %block.hash(), %reason, "block rejected");
                false
            }
        }
    }

    /// Like [`add_block`](Self::add_block), but reports why a block was rejected.
    pub fn process_block(&mut self, block: &Block) -> Result<BlockOutcome, BlockError> {
        let prev_hash = block.prev_hash();
        let parent_id = *self
            .by_hash
            .get(&prev_hash)
            .ok_or_else(|| BlockError::UnknownParent(prev_hash.to_string()))?;
        let parent = self.node(parent_id);

        // The header hash is the block's identity, so the body must match it.
        if block.compute_merkle_root().ok() != Some(block.header.merkle_root) {
            return Err(BlockError::InvalidMerkleRoot);
        }

        let hash = block.hash();
        if parent.children.iter().any(|&c| self.node(c).hash == hash) {
            trace!(%hash, "duplicate block resubmitted");
            return Ok(BlockOutcome::Duplicate);
        }

        let max_depth = self.max_depth();
        if parent.depth.saturating_add(self.config.cut_off_age) <= max_depth {
            return Err(BlockError::StaleParent {
                parent_depth: parent.depth,
                max_depth,
            });
        }
        let depth = parent.depth + 1;

        check_coinbase(&block.coinbase, depth)?;

        let parent_ledger = self.snapshots.get(&prev_hash).unwrap_or_else(|| {
            panic!("block tree invariant violated: appendable node {prev_hash} has no snapshot")
        });
        let mut validator = TxValidator::over(parent_ledger);
        let accepted = validator.handle_txs(&block.transactions);
        if accepted.len() != block.transactions.len() {
            return Err(BlockError::RejectedTransactions {
                accepted: accepted.len(),
                total: block.transactions.len(),
            });
        }
        let mut ledger = validator.into_utxo_set();
        for outpoint in block.coinbase.output_points()? {
            if ledger.contains(&outpoint) {
                return Err(TransactionError::InvalidCoinbase(format!(
                    "output {outpoint} already unspent"
                ))
                .into());
            }
        }
        ledger.add_outputs(&block.coinbase)?;

        // Everything below is infallible.
        self.attach(parent_id, block.clone(), hash, depth);
        self.snapshots.insert(hash, ledger);
        let confirmed = self.pool.remove_block(block);
        info!(%hash, depth, txs = block.transactions.len(), confirmed, "block connected");

        if depth > max_depth {
            self.prune();
        }
        Ok(BlockOutcome::Connected { depth })
    }

    fn attach(&mut self, parent_id: NodeId, block: Block, hash: Hash256, depth: u64) {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        self.node_mut(parent_id).children.push(id);
        self.nodes.insert(
            id,
            ChainNode {
                block,
                hash,
                parent: Some(parent_id),
                children: Vec::new(),
                depth,
            },
        );
        self.by_hash.insert(hash, id);
        self.by_depth.entry(depth).or_default().push(id);

        self.leaves.retain(|leaf| leaf.id != parent_id);
        self.leaves.push(Leaf { id, depth });
    }

    /// Drop every node at or below the horizon, with its snapshot.
    fn prune(&mut self) {
        let horizon = self.max_depth().saturating_sub(self.config.cut_off_age);

        let keep = self.by_depth.split_off(&(horizon + 1));
        let stale = std::mem::replace(&mut self.by_depth, keep);

        let mut evicted = 0usize;
        for id in stale.into_values().flatten() {
            let node = self.nodes.remove(&id).unwrap_or_else(|| {
                panic!("block tree invariant violated: {id:?} indexed by depth but not in arena")
            });
            self.by_hash.remove(&node.hash);
            self.snapshots.remove(&node.hash);
            self.leaves.retain(|leaf| leaf.id != id);
            for child in &node.children {
                if let Some(child) = self.nodes.get_mut(child) {
                    child.parent = None;
                }
            }
            if node.parent == Some(self.root) {
                self.node_mut(self.root).children.retain(|&c| c != id);
            }
            evicted += 1;
        }

        let (root_id, root_hash, root_depth) = {
            let root = self.node(self.root);
            (self.root, root.hash, root.depth)
        };
        if root_depth <= horizon && self.snapshots.remove(&root_hash).is_some() {
            self.leaves.retain(|leaf| leaf.id != root_id);
            evicted += 1;
        }

        if evicted > 0 {
            debug!(horizon, evicted, nodes = self.nodes.len(), "pruned block tree");
        }
    }

    // ------------------------------------------------------------------
    // Canonical tip
    // ------------------------------------------------------------------

    /// Depth of the deepest leaf.
    pub fn max_depth(&self) -> u64 {
        self.leaves.iter().map(|leaf| leaf.depth).max().unwrap_or_else(|| {
            panic!("block tree invariant violated: no leaves")
        })
    }

    /// The canonical tip: the deepest leaf, oldest leaf first on ties.
    pub fn tip(&self) -> ChainTip {
        let max_depth = self.max_depth();
        let leaf = self
            .leaves
            .iter()
            .find(|leaf| leaf.depth == max_depth)
            .unwrap_or_else(|| panic!("block tree invariant violated: no leaf at max depth"));
        ChainTip {
            hash: self.node(leaf.id).hash,
            depth: leaf.depth,
        }
    }

    /// Block at the canonical tip.
    pub fn max_height_block(&self) -> &Block {
        let max_depth = self.max_depth();
        self.leaves
            .iter()
            .find(|leaf| leaf.depth == max_depth)
            .map(|leaf| &self.node(leaf.id).block)
            .unwrap_or_else(|| panic!("block tree invariant violated: no leaf at max depth"))
    }

    /// Cumulative ledger from genesis through the canonical tip.
    pub fn max_height_ledger(&self) -> &UtxoSet {
        let tip = self.tip();
        self.snapshots.get(&tip.hash).unwrap_or_else(|| {
            panic!("block tree invariant violated: tip {} has no snapshot", tip.hash)
        })
    }

    /// Every current leaf, oldest first.
    pub fn leaves(&self) -> Vec<ChainTip> {
        self.leaves
            .iter()
            .map(|leaf| ChainTip {
                hash: self.node(leaf.id).hash,
                depth: leaf.depth,
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Pending pool
    // ------------------------------------------------------------------

    pub fn pending_pool(&self) -> &PendingPool {
        &self.pool
    }

    pub fn pending_pool_mut(&mut self) -> &mut PendingPool {
        &mut self.pool
    }

    /// Admit `tx` to the pending pool if it is valid on the canonical tip.
    ///
    /// Invalid, duplicate, or overflow transactions are dropped silently.
    pub fn add_transaction(&mut self, tx: Transaction) {
        match self.try_add_transaction(tx) {
            Ok(txid) => trace!(%txid, "transaction pooled"),
            Err(reason) => debug!(%reason, "transaction not pooled"),
        }
    }

    /// Like [`add_transaction`](Self::add_transaction), but reports the outcome.
    pub fn try_add_transaction(&mut self, tx: Transaction) -> Result<Hash256, ArborError> {
        let txid = tx.txid()?;
        if self.pool.contains(&txid) {
            return Err(PoolError::AlreadyExists(txid.to_string()).into());
        }
        TxValidator::over(self.max_height_ledger()).check_tx(&tx)?;
        Ok(self.pool.insert(tx)?)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn contains_block(&self, hash: &Hash256) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// A tracked block by hash. Genesis is always tracked.
    pub fn block(&self, hash: &Hash256) -> Option<&Block> {
        self.by_hash.get(hash).map(|&id| &self.node(id).block)
    }

    pub fn depth_of(&self, hash: &Hash256) -> Option<u64> {
        self.by_hash.get(hash).map(|&id| self.node(id).depth)
    }

    /// Parent hash of a tracked block, if the parent is still tracked.
    pub fn parent_of(&self, hash: &Hash256) -> Option<Hash256> {
        let id = self.by_hash.get(hash)?;
        self.node(*id).parent.map(|p| self.node(p).hash)
    }

    pub fn genesis_hash(&self) -> Hash256 {
        self.node(self.root).hash
    }

    /// Ledger snapshot of an appendable block.
    pub fn ledger_at(&self, hash: &Hash256) -> Option<&UtxoSet> {
        self.snapshots.get(hash)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    fn node(&self, id: NodeId) -> &ChainNode {
        self.nodes.get(&id).unwrap_or_else(|| {
            panic!("block tree invariant violated: {id:?} referenced but not in arena")
        })
    }

    fn node_mut(&mut self, id: NodeId) -> &mut ChainNode {
        self.nodes.get_mut(&id).unwrap_or_else(|| {
            panic!("block tree invariant violated: {id:?} referenced but not in arena")
        })
    }
}

/// A coinbase spends nothing, is stamped with its block's depth, and creates
/// only non-negative outputs.
fn check_coinbase(coinbase: &Transaction, depth: u64) -> Result<(), TransactionError> {
    if !coinbase.is_coinbase() {
        return Err(TransactionError::InvalidCoinbase(format!(
            "{} inputs",
            coinbase.inputs.len()
        )));
    }
    if coinbase.lock_time != depth {
        return Err(TransactionError::InvalidCoinbase(format!(
            "lock_time {} at depth {depth}",
            coinbase.lock_time
        )));
    }
    if let Some(index) = coinbase.outputs.iter().position(|out| out.value < 0) {
        return Err(TransactionError::NegativeOutput(index));
    }
    Ok(())
}
