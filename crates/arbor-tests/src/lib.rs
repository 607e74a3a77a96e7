//! Integration and adversarial test suite for Arbor.
//!
//! The tests under `tests/` drive the block tree, the ledger validator and
//! the node the way a peer would, including with hostile inputs.

pub mod helpers;
