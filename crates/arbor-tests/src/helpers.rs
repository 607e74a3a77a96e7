//! Shared builders for integration tests.

use arbor_core::crypto::{sign_transaction_input, KeyPair};
use arbor_core::fork::ForkManager;
use arbor_core::genesis::{genesis_block, genesis_outpoint};
use arbor_core::types::{Amount, Block, Hash256, OutPoint, Transaction, TxOutput};

/// Base timestamp for generated blocks.
pub const BASE_TIME: u64 = 1_700_000_000;

/// Coinbase value used by [`make_block`].
pub const BLOCK_REWARD: Amount = 25;

/// Deterministic key from a seed byte.
pub fn key(seed: u8) -> KeyPair {
    KeyPair::from_secret_bytes([seed; 32])
}

/// Genesis block paying `value` to `owner`.
pub fn make_genesis(owner: &KeyPair, value: Amount) -> Block {
    genesis_block(&owner.owner(), value, BASE_TIME).unwrap()
}

/// Outpoint of the genesis coinbase output.
pub fn genesis_point(genesis: &Block) -> OutPoint {
    genesis_outpoint(genesis).unwrap()
}

/// Coinbase paying `value` to `owner`, unique per `height`.
pub fn make_coinbase(value: Amount, owner: &KeyPair, height: u64) -> Transaction {
    Transaction::coinbase(vec![TxOutput { value, owner: owner.owner() }], height)
}

/// Block on `prev_hash` carrying `txs`, with a reward to `miner`.
///
/// `salt` separates sibling blocks that would otherwise hash the same.
pub fn make_block(prev_hash: Hash256, height: u64, txs: Vec<Transaction>, miner: &KeyPair, salt: u64) -> Block {
    Block::new(
        prev_hash,
        make_coinbase(BLOCK_REWARD, miner, height),
        txs,
        BASE_TIME + height * 60 + salt,
    )
    .unwrap()
}

/// Spend `inputs`, each signed by its paired key, into `outputs`.
pub fn make_signed_tx(inputs: &[(OutPoint, &KeyPair)], outputs: Vec<(Amount, &KeyPair)>) -> Transaction {
    let mut tx = Transaction::new(
        inputs.iter().map(|(op, _)| op.clone()).collect(),
        outputs
            .into_iter()
            .map(|(value, kp)| TxOutput { value, owner: kp.owner() })
            .collect(),
    );
    for (index, (_, kp)) in inputs.iter().enumerate() {
        sign_transaction_input(&mut tx, index, kp).unwrap();
    }
    tx
}

/// Single-input payment of `value` from `from` to `to`.
pub fn pay(from: &KeyPair, outpoint: OutPoint, value: Amount, to: &KeyPair) -> Transaction {
    make_signed_tx(&[(outpoint, from)], vec![(value, to)])
}

/// Extend the canonical tip `n` times with empty blocks. Returns their hashes.
pub fn extend_tip(fm: &mut ForkManager, n: u64, miner: &KeyPair) -> Vec<Hash256> {
    (0..n)
        .map(|_| {
            let tip = fm.tip();
            let block = make_block(tip.hash, tip.depth + 1, vec![], miner, 0);
            assert!(fm.add_block(&block), "extending the tip must succeed");
            block.hash()
        })
        .collect()
}
