//! Genesis block construction.
//!
//! Genesis is the root of the block tree at depth 1. It has the zero hash as
//! its parent and is assumed valid: the tree never validates it, it only
//! applies it to an empty ledger.

use crate::constants::GENESIS_DEPTH;
use crate::error::TransactionError;
use crate::types::{Amount, Block, Hash256, OutPoint, Transaction, TxOutput};

/// A genesis block whose coinbase pays `value` to `owner`.
pub fn genesis_block(owner: &[u8; 32], value: Amount, timestamp: u64) -> Result<Block, TransactionError> {
    let coinbase = Transaction::coinbase(
        vec![TxOutput {
            value,
            owner: *owner,
        }],
        GENESIS_DEPTH,
    );
    Block::new(Hash256::ZERO, coinbase, Vec::new(), timestamp)
}

/// Outpoint of the first genesis coinbase output.
pub fn genesis_outpoint(genesis: &Block) -> Result<OutPoint, TransactionError> {
    Ok(OutPoint::new(genesis.coinbase.txid()?, 0))
}
