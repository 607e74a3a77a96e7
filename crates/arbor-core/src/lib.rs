//! # arbor-core
//! Bounded block tree with per-branch UTXO snapshots.
//!
//! - [`fork::ForkManager`]: block admission, canonical tip, pruning horizon
//! - [`validation::TxValidator`]: transaction checks and batch application
//! - [`utxo::UtxoSet`] and [`mempool::PendingPool`]: keyed containers

pub mod constants;
pub mod crypto;
pub mod error;
pub mod fork;
pub mod genesis;
pub mod mempool;
pub mod merkle;
pub mod types;
pub mod utxo;
pub mod validation;
