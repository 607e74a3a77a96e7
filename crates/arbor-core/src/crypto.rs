//! Ed25519 keys and per-input transaction signatures.
//!
//! Each input is authorised by the owner of the output it spends. The
//! signed message is the input's **signing hash**, a BLAKE3 digest over:
//! - transaction version and lock_time
//! - the outpoint spent by that input, and its index
//! - every output (value + owner key)
//!
//! Signatures are excluded from the digest, so inputs can be signed in any
//! order once the outputs are fixed.

use ed25519_dalek::{Signer, Verifier};
use std::fmt;

use crate::error::CryptoError;
use crate::types::{Hash256, Transaction};

/// Ed25519 keypair for signing transaction inputs.
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a random keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a keypair from 32-byte secret key material.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(&bytes),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Raw public key bytes, as stored in [`TxOutput::owner`](crate::types::TxOutput::owner).
    pub fn owner(&self) -> [u8; 32] {
        self.public_key().to_bytes()
    }

    /// Sign a message, returning the raw 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self::from_secret_bytes(self.signing_key.to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key identifying the owner of an output.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: ed25519_dalek::VerifyingKey,
}

impl PublicKey {
    /// Parse a public key from raw bytes. Fails if the bytes are not a valid curve point.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self { verifying_key })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Verify an Ed25519 signature on a message.
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> Result<(), CryptoError> {
        let sig = ed25519_dalek::Signature::from_bytes(signature);
        self.verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

/// Compute the signing hash for input `input_index` of `tx`.
pub fn signing_hash(tx: &Transaction, input_index: usize) -> Result<Hash256, CryptoError> {
    let input = tx
        .inputs
        .get(input_index)
        .ok_or(CryptoError::InputIndexOutOfBounds {
            index: input_index,
            len: tx.inputs.len(),
        })?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(&tx.version.to_le_bytes());
    hasher.update(input.previous_output.txid.as_bytes());
    hasher.update(&input.previous_output.index.to_le_bytes());
    hasher.update(&(input_index as u64).to_le_bytes());
    hasher.update(&(tx.outputs.len() as u64).to_le_bytes());
    for output in &tx.outputs {
        hasher.update(&output.value.to_le_bytes());
        hasher.update(&output.owner);
    }
    hasher.update(&tx.lock_time.to_le_bytes());
    Ok(Hash256(hasher.finalize().into()))
}

/// Sign input `input_index` of `tx` in place.
pub fn sign_transaction_input(
    tx: &mut Transaction,
    input_index: usize,
    keypair: &KeyPair,
) -> Result<(), CryptoError> {
    let sighash = signing_hash(tx, input_index)?;
    tx.inputs[input_index].signature = keypair.sign(sighash.as_bytes()).to_vec();
    Ok(())
}

/// Verify that input `input_index` of `tx` is signed by `owner`.
///
/// `owner` is the key recorded on the output being spent.
pub fn verify_transaction_input(
    tx: &Transaction,
    input_index: usize,
    owner: &[u8; 32],
) -> Result<(), CryptoError> {
    let sighash = signing_hash(tx, input_index)?;
    let signature: [u8; 64] = tx.inputs[input_index]
        .signature
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidSignature)?;
    PublicKey::from_bytes(owner)?.verify(sighash.as_bytes(), &signature)
}
