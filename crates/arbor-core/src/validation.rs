//! Transaction validation against a UTXO set.
//!
//! [`TxValidator`] works on a private copy of the unspent output set it was
//! built from. A validator built with [`TxValidator::over`] borrows the set
//! and only clones it on the first mutation, so read-only checks cost
//! nothing. [`TxValidator::check_tx`] is read-only;
//! [`TxValidator::handle_txs`] applies accepted transactions to the copy one
//! at a time, so each candidate is checked against the set as already
//! mutated by earlier candidates in the same batch. That sequential
//! application is what rejects a second claim on an outpoint within a batch.
//!
//! Batches are processed in the order given. When two candidates conflict,
//! the earlier one wins.

use std::borrow::Cow;
use std::collections::HashSet;

use tracing::debug;

use crate::crypto;
use crate::error::TransactionError;
use crate::types::{Amount, Transaction};
use crate::utxo::UtxoSet;

/// Summary of a successfully validated transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransaction {
    pub total_input: Amount,
    pub total_output: Amount,
    /// Implicit fee (`total_input - total_output`). Not collected by anyone here.
    pub fee: Amount,
}

/// Validates and applies transactions against a private UTXO set.
#[derive(Debug, Clone)]
pub struct TxValidator<'a> {
    utxos: Cow<'a, UtxoSet>,
}

impl TxValidator<'static> {
    /// Take ownership of `utxos`.
    pub fn new(utxos: UtxoSet) -> Self {
        Self { utxos: Cow::Owned(utxos) }
    }
}

impl<'a> TxValidator<'a> {
    /// Validate against `utxos` without copying it up front.
    ///
    /// The borrowed set is never modified; the first applied transaction
    /// clones it.
    pub fn over(utxos: &'a UtxoSet) -> Self {
        Self { utxos: Cow::Borrowed(utxos) }
    }

    /// The set as mutated by every transaction accepted so far.
    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxos
    }

    pub fn into_utxo_set(self) -> UtxoSet {
        self.utxos.into_owned()
    }

    /// Whether `tx` is valid against the current set.
    pub fn is_valid_tx(&self, tx: &Transaction) -> bool {
        self.check_tx(tx).is_ok()
    }

    /// Validate `tx` against the current set.
    ///
    /// Checks run in this order and stop at the first failure:
    /// 1. every input references an outpoint present in the set
    /// 2. every input is signed by the owner of the output it spends
    /// 3. no outpoint is claimed by two inputs
    /// 4. every output value is non-negative
    /// 5. total input value covers total output value
    pub fn check_tx(&self, tx: &Transaction) -> Result<ValidatedTransaction, TransactionError> {
        let mut spent = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            let output = self.utxos.get(&input.previous_output).ok_or_else(|| {
                TransactionError::UnknownUtxo(input.previous_output.to_string())
            })?;
            spent.push(output);
        }

        for (index, output) in spent.iter().enumerate() {
            crypto::verify_transaction_input(tx, index, &output.owner)
                .map_err(|_| TransactionError::InvalidSignature { index })?;
        }

        let mut seen = HashSet::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            if !seen.insert(&input.previous_output) {
                return Err(TransactionError::DuplicateInput(
                    input.previous_output.to_string(),
                ));
            }
        }

        if let Some(index) = tx.outputs.iter().position(|out| out.value < 0) {
            return Err(TransactionError::NegativeOutput(index));
        }

        let total_input = spent
            .iter()
            .try_fold(0 as Amount, |acc, out| acc.checked_add(out.value))
            .ok_or(TransactionError::ValueOverflow)?;
        let total_output = tx
            .total_output_value()
            .ok_or(TransactionError::ValueOverflow)?;

        if total_input < total_output {
            return Err(TransactionError::InsufficientFunds {
                have: total_input,
                need: total_output,
            });
        }

        Ok(ValidatedTransaction {
            total_input,
            total_output,
            fee: total_input - total_output,
        })
    }

    /// Validate `tx` and, if valid, spend its inputs and create its outputs.
    ///
    /// On error the set is untouched.
    pub fn apply_tx(&mut self, tx: &Transaction) -> Result<ValidatedTransaction, TransactionError> {
        let validated = self.check_tx(tx)?;
        // The txid keys the new outputs, so compute it before touching the set.
        let created = tx.output_points()?;

        let utxos = self.utxos.to_mut();
        for input in &tx.inputs {
            utxos.remove(&input.previous_output);
        }
        for (outpoint, output) in created.into_iter().zip(&tx.outputs) {
            utxos.insert(outpoint, output.clone());
        }
        Ok(validated)
    }

    /// Apply every valid candidate in order and return the accepted ones.
    ///
    /// The returned transactions appear in acceptance order, and the owned
    /// set reflects exactly their cumulative effect.
    pub fn handle_txs(&mut self, candidates: &[Transaction]) -> Vec<Transaction> {
        candidates
            .iter()
            .filter(|tx| match self.apply_tx(tx) {
                Ok(_) => true,
                Err(reason) => {
                    match tx.txid() {
                        Ok(txid) => debug!(%txid, %reason, "transaction rejected"),
                        Err(_) => debug!(%reason, "transaction rejected"),
                    }
                    false
                }
            })
            .cloned()
            .collect()
    }
}
