//! Protocol constants.

/// Depth slack allowed between a branch and the deepest leaf.
///
/// A node at depth `d` may receive a child only while
/// `d > max_depth - CUT_OFF_AGE`.
pub const CUT_OFF_AGE: u64 = 10;

/// Depth of the genesis node.
pub const GENESIS_DEPTH: u64 = 1;

/// Default upper bound on unconfirmed transactions held in the pending pool.
pub const DEFAULT_MAX_PENDING: usize = 5_000;

/// Transaction format version produced by this crate.
pub const TX_VERSION: u64 = 1;

/// Block header format version produced by this crate.
pub const BLOCK_VERSION: u64 = 1;
