//! Multi-Party Computation (MPC) and Secret Sharing.
//!
//! This module implements Shamir's Secret Sharing over the prime field GF(p)
//! carried by the round parameters.
//!
//! # Components
//! - `share`: Definition of a secret share.
//! - `quorum`: Threshold logic and polynomial generation.
//! - `reconstruct`: Lagrange interpolation and consistency-checked recovery.
//!
//! # Security
//! - **Zeroization**: Share values and recovered secrets are zeroized on drop.
//! - **Threshold**: Fewer than `t` shares are refused outright, never interpolated.

pub mod share;
pub mod quorum;
pub mod reconstruct;
pub(crate) mod polynomial;

use core::fmt;
use zeroize::Zeroizing;

use crate::core::PrimeField;
use crate::entropy::EntropySource;

/// Errors for MPC operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpcError {
    /// Invalid share index (must be non-zero).
    InvalidShareIndex,
    /// Share value is empty.
    EmptyShare,
    /// Threshold configuration error (t > n, t < 1, etc.).
    InvalidThreshold,
    /// Not enough shares to reconstruct.
    InsufficientShares,
    /// Duplicate share indices provided.
    DuplicateShareIndex,
    /// Share value is not a `PRIME_LEN`-byte encoding.
    ShareLengthMismatch,
    /// Share value is not a canonical field element.
    ValueOutOfRange,
    /// Secret does not fit the field, or the recovered secret does not fit its width.
    SecretOutOfRange,
    /// Random number generator failure.
    RngFailure,
    /// Shares do not agree on a single polynomial.
    InconsistentShares,
}

impl fmt::Display for MpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MpcError::InvalidShareIndex => write!(f, "share index must be non-zero"),
            MpcError::EmptyShare => write!(f, "share value is empty"),
            MpcError::InvalidThreshold => write!(f, "invalid threshold configuration"),
            MpcError::InsufficientShares => write!(f, "not enough shares to reconstruct"),
            MpcError::DuplicateShareIndex => write!(f, "duplicate share index"),
            MpcError::ShareLengthMismatch => write!(f, "share value has the wrong width"),
            MpcError::ValueOutOfRange => write!(f, "share value is not a field element"),
            MpcError::SecretOutOfRange => write!(f, "secret does not fit its width"),
            MpcError::RngFailure => write!(f, "random number generator failure"),
            MpcError::InconsistentShares => write!(f, "shares do not lie on one polynomial"),
        }
    }
}

impl std::error::Error for MpcError {}

/// Trait for Secret Sharing Schemes.
pub trait SecretSharingScheme {
    type Share;
    type Secret;
    type Error;

    /// Splits a secret into n shares with threshold t.
    fn split<R: EntropySource + ?Sized>(
        &self,
        secret: &[u8],
        t: usize,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<Self::Share>, Self::Error>;

    /// Reconstructs a secret from at least t shares.
    fn reconstruct(&self, shares: &[Self::Share], t: usize) -> Result<Self::Secret, Self::Error>;
}

/// Shamir's Secret Sharing over GF(p) with fixed-width secrets.
#[derive(Debug, Clone)]
pub struct ShamirPrimeField {
    field: PrimeField,
    secret_len: usize,
}

impl ShamirPrimeField {
    /// Scheme over `field` whose secrets are `secret_len` bytes wide.
    pub fn new(field: PrimeField, secret_len: usize) -> Self {
        Self { field, secret_len }
    }

    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    pub fn secret_len(&self) -> usize {
        self.secret_len
    }
}

impl SecretSharingScheme for ShamirPrimeField {
    type Share = share::Share;
    type Secret = Zeroizing<Vec<u8>>;
    type Error = MpcError;

    fn split<R: EntropySource + ?Sized>(
        &self,
        secret: &[u8],
        t: usize,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<Self::Share>, Self::Error> {
        if secret.len() > self.secret_len {
            return Err(MpcError::SecretOutOfRange);
        }
        quorum::split_secret(&self.field, secret, t, n, rng)
    }

    fn reconstruct(&self, shares: &[Self::Share], t: usize) -> Result<Self::Secret, Self::Error> {
        reconstruct::reconstruct_checked(&self.field, shares, t, self.secret_len).map(|r| r.secret)
    }
}
