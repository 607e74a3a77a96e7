//! Core protocol types: transactions, blocks, outpoints.
//!
//! Output values are signed ([`Amount`]) so that a negative value is
//! representable on the wire and can be rejected during validation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::constants::{BLOCK_VERSION, TX_VERSION};
use crate::error::TransactionError;
use crate::merkle;

/// Monetary value carried by an output.
pub type Amount = i64;

/// A 32-byte hash value.
///
/// Used for transaction IDs (BLAKE3), block header hashes (SHA-256d),
/// and merkle roots (BLAKE3).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes). Genesis blocks use it as their parent.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a Hash256 from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Reference to a specific output of a previous transaction.
///
/// This is the key of the unspent output set.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct OutPoint {
    /// Transaction ID containing the referenced output.
    pub txid: Hash256,
    /// Index of the output within the transaction.
    pub index: u64,
}

impl OutPoint {
    pub fn new(txid: Hash256, index: u64) -> Self {
        Self { txid, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.index)
    }
}

/// A transaction input, spending a previous output.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxInput {
    /// The outpoint being spent.
    pub previous_output: OutPoint,
    /// Ed25519 signature (64 bytes) by the owner of the spent output.
    pub signature: Vec<u8>,
}

/// A transaction output, creating a new UTXO.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxOutput {
    /// Value carried by this output. Must be non-negative to be valid.
    pub value: Amount,
    /// Raw Ed25519 public key of the recipient.
    pub owner: [u8; 32],
}

/// A transaction transferring value between keys.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    /// Format version.
    pub version: u64,
    /// Inputs consuming previous outputs.
    pub inputs: Vec<TxInput>,
    /// New outputs created by this transaction.
    pub outputs: Vec<TxOutput>,
    /// Height marker. Coinbases set it to their block height so that two
    /// coinbases paying the same key never share a txid.
    pub lock_time: u64,
}

impl Transaction {
    /// Unsigned transaction spending `inputs` into `outputs`.
    pub fn new(inputs: Vec<OutPoint>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: TX_VERSION,
            inputs: inputs
                .into_iter()
                .map(|previous_output| TxInput {
                    previous_output,
                    signature: Vec::new(),
                })
                .collect(),
            outputs,
            lock_time: 0,
        }
    }

    /// Coinbase paying `outputs` at `height`. Coinbases have no inputs.
    pub fn coinbase(outputs: Vec<TxOutput>, height: u64) -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs,
            lock_time: height,
        }
    }

    /// Compute the transaction ID (BLAKE3 hash of the canonical encoding).
    ///
    /// The ID commits to signatures, so it is only stable once every input
    /// has been signed.
    pub fn txid(&self) -> Result<Hash256, TransactionError> {
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TransactionError::Serialization(e.to_string()))?;
        Ok(Hash256(blake3::hash(&encoded).into()))
    }

    /// Check if this is a coinbase transaction (no inputs).
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Sum of all output values. Returns None on overflow.
    pub fn total_output_value(&self) -> Option<Amount> {
        self.outputs
            .iter()
            .try_fold(0 as Amount, |acc, out| acc.checked_add(out.value))
    }

    /// Outpoints of every output this transaction creates.
    pub fn output_points(&self) -> Result<Vec<OutPoint>, TransactionError> {
        let txid = self.txid()?;
        Ok((0..self.outputs.len() as u64)
            .map(|index| OutPoint { txid, index })
            .collect())
    }
}

/// Block header: parent link and transaction commitment.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct BlockHeader {
    /// Format version.
    pub version: u64,
    /// Hash of the parent block header. Zero for genesis.
    pub prev_hash: Hash256,
    /// Merkle root over the coinbase txid followed by every transaction id.
    pub merkle_root: Hash256,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

impl BlockHeader {
    /// Header size in bytes when serialized for hashing (2 u64 fields + 2 * 32-byte hashes).
    const HASH_SIZE: usize = 2 * 8 + 2 * 32;

    /// Compute the block header hash (double SHA-256).
    ///
    /// Fixed byte layout: version || prev_hash || merkle_root || timestamp,
    /// integers little-endian.
    pub fn hash(&self) -> Hash256 {
        let mut data = Vec::with_capacity(Self::HASH_SIZE);
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(self.prev_hash.as_bytes());
        data.extend_from_slice(self.merkle_root.as_bytes());
        data.extend_from_slice(&self.timestamp.to_le_bytes());
        let first = Sha256::digest(&data);
        Hash256(Sha256::digest(first).into())
    }
}

/// A complete block: header, coinbase, and ordered transactions.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Block {
    pub header: BlockHeader,
    /// Reward transaction, applied after `transactions`.
    pub coinbase: Transaction,
    /// Ordered regular transactions.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble a block on top of `prev_hash`, committing to every txid.
    pub fn new(
        prev_hash: Hash256,
        coinbase: Transaction,
        transactions: Vec<Transaction>,
        timestamp: u64,
    ) -> Result<Self, TransactionError> {
        let merkle_root = body_root(&coinbase, &transactions)?;
        Ok(Self {
            header: BlockHeader {
                version: BLOCK_VERSION,
                prev_hash,
                merkle_root,
                timestamp,
            },
            coinbase,
            transactions,
        })
    }

    /// Merkle root of the body as carried, for comparison with the header.
    pub fn compute_merkle_root(&self) -> Result<Hash256, TransactionError> {
        body_root(&self.coinbase, &self.transactions)
    }

    /// Block identity.
    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    pub fn prev_hash(&self) -> Hash256 {
        self.header.prev_hash
    }
}

/// Coinbase txid first, then every regular txid in order.
fn body_root(coinbase: &Transaction, transactions: &[Transaction]) -> Result<Hash256, TransactionError> {
    let mut txids = Vec::with_capacity(transactions.len() + 1);
    txids.push(coinbase.txid()?);
    for tx in transactions {
        txids.push(tx.txid()?);
    }
    Ok(merkle::merkle_root(&txids))
}
