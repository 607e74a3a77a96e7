//! Criterion benchmarks for block admission and transaction validation.
//!
//! Covers: signature checks, batch application, and extending a chain long
//! enough that pruning runs on every block.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use arbor_core::crypto::{sign_transaction_input, KeyPair};
use arbor_core::fork::ForkManager;
use arbor_core::genesis::genesis_block;
use arbor_core::types::{Block, Hash256, OutPoint, Transaction, TxOutput};
use arbor_core::utxo::UtxoSet;
use arbor_core::validation::TxValidator;

/// `n` funded outputs owned by `kp` and one signed spend of each.
fn funded_batch(kp: &KeyPair, n: u8) -> (UtxoSet, Vec<Transaction>) {
    let mut set = UtxoSet::new();
    let mut txs = Vec::new();
    for seed in 0..n {
        let op = OutPoint::new(Hash256([seed; 32]), 0);
        set.insert(op.clone(), TxOutput { value: 100, owner: kp.owner() });
        let mut tx = Transaction::new(vec![op], vec![TxOutput { value: 99, owner: kp.owner() }]);
        sign_transaction_input(&mut tx, 0, kp).expect("sign failed");
        txs.push(tx);
    }
    (set, txs)
}

fn bench_check_tx(c: &mut Criterion) {
    let kp = KeyPair::from_secret_bytes([42u8; 32]);
    let (set, txs) = funded_batch(&kp, 1);
    let validator = TxValidator::over(&set);

    c.bench_function("check_tx_single_input", |b| {
        b.iter(|| validator.check_tx(black_box(&txs[0])))
    });
}

fn bench_handle_txs(c: &mut Criterion) {
    let kp = KeyPair::from_secret_bytes([42u8; 32]);
    let (set, txs) = funded_batch(&kp, 100);

    c.bench_function("handle_txs_100", |b| {
        b.iter(|| {
            let mut validator = TxValidator::over(&set);
            validator.handle_txs(black_box(&txs)).len()
        })
    });
}

fn bench_extend_chain(c: &mut Criterion) {
    let kp = KeyPair::from_secret_bytes([7u8; 32]);
    let genesis = genesis_block(&kp.owner(), 1_000, 0).expect("genesis");

    c.bench_function("add_block_100_empty", |b| {
        b.iter_batched(
            || ForkManager::new(genesis.clone()).expect("fork manager"),
            |mut fm| {
                for _ in 0..100 {
                    let tip = fm.tip();
                    let depth = tip.depth + 1;
                    let coinbase = Transaction::coinbase(
                        vec![TxOutput { value: 25, owner: kp.owner() }],
                        depth,
                    );
                    let block = Block::new(tip.hash, coinbase, Vec::new(), depth).expect("block");
                    fm.add_block(&block);
                }
                fm.node_count()
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_check_tx, bench_handle_txs, bench_extend_chain);
criterion_main!(benches);
