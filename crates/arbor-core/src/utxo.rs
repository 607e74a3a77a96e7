//! Unspent transaction output set.
//!
//! A plain keyed container: outpoint → output. Each branch of the block tree
//! owns its own copy, so `Clone` is the deep, independent snapshot operation.

use std::collections::HashMap;

use crate::error::TransactionError;
use crate::types::{Amount, OutPoint, Transaction, TxOutput};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UtxoSet {
    outputs: HashMap<OutPoint, TxOutput>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.outputs.contains_key(outpoint)
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.outputs.get(outpoint)
    }

    /// Insert an output, returning the one previously stored under `outpoint`.
    pub fn insert(&mut self, outpoint: OutPoint, output: TxOutput) -> Option<TxOutput> {
        self.outputs.insert(outpoint, output)
    }

    pub fn remove(&mut self, outpoint: &OutPoint) -> Option<TxOutput> {
        self.outputs.remove(outpoint)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TxOutput)> {
        self.outputs.iter()
    }

    /// Sum of every unspent value. `None` on overflow.
    pub fn total_value(&self) -> Option<Amount> {
        self.outputs
            .values()
            .try_fold(0 as Amount, |acc, out| acc.checked_add(out.value))
    }

    /// Insert every output of `tx` keyed by its txid.
    ///
    /// Used for coinbases, which have nothing to spend.
    pub fn add_outputs(&mut self, tx: &Transaction) -> Result<usize, TransactionError> {
        let points = tx.output_points()?;
        let created = points.len();
        for (outpoint, output) in points.into_iter().zip(&tx.outputs) {
            self.outputs.insert(outpoint, output.clone());
        }
        Ok(created)
    }
}

impl FromIterator<(OutPoint, TxOutput)> for UtxoSet {
    fn from_iter<I: IntoIterator<Item = (OutPoint, TxOutput)>>(iter: I) -> Self {
        Self {
            outputs: iter.into_iter().collect(),
        }
    }
}
