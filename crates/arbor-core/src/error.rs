//! Error types for the Arbor ledger core.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("unknown UTXO: {0}")] UnknownUtxo(String),
    #[error("invalid signature on input {index}")] InvalidSignature { index: usize },
    #[error("duplicate input: {0}")] DuplicateInput(String),
    #[error("negative value on output {0}")] NegativeOutput(usize),
    #[error("insufficient funds: have {have}, need {need}")] InsufficientFunds { have: i64, need: i64 },
    #[error("value overflow")] ValueOverflow,
    #[error("invalid coinbase: {0}")] InvalidCoinbase(String),
    #[error("serialization: {0}")] Serialization(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("input index out of bounds: {index} >= {len}")] InputIndexOutOfBounds { index: usize, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("unknown parent: {0}")] UnknownParent(String),
    #[error("invalid merkle root")] InvalidMerkleRoot,
    #[error("stale parent at depth {parent_depth}, max depth {max_depth}")] StaleParent { parent_depth: u64, max_depth: u64 },
    #[error("invalid coinbase: {0}")] InvalidCoinbase(#[from] TransactionError),
    #[error("only {accepted} of {total} transactions valid")] RejectedTransactions { accepted: usize, total: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("transaction already in pool: {0}")] AlreadyExists(String),
    #[error("pool full")] PoolFull,
    #[error("internal: {0}")] Internal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cut_off_age must be at least 1")] ZeroCutOffAge,
    #[error("max_pending must be at least 1")] ZeroMaxPending,
}

#[derive(Error, Debug)]
pub enum ArborError {
    #[error(transparent)] Transaction(#[from] TransactionError),
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Block(#[from] BlockError),
    #[error(transparent)] Pool(#[from] PoolError),
    #[error(transparent)] Config(#[from] ConfigError),
}
