//! Mask sign rule and noise vector arithmetic.
//!
//! For every pair of clients `(a, b)` both derive the same pairwise mask `m`.
//! The client with the byte-wise smaller id adds `+m` to its update, the other
//! adds `-m`, so the pair cancels exactly when both are aggregated. The rule
//! depends only on the two ids, never on message order.

use core::fmt;
use std::collections::BTreeMap;

use super::roster::ClientId;

/// Which way a client applied a pairwise mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSign {
    Positive,
    Negative,
}

impl MaskSign {
    pub fn opposite(self) -> Self {
        match self {
            MaskSign::Positive => MaskSign::Negative,
            MaskSign::Negative => MaskSign::Positive,
        }
    }

    pub fn apply(self, value: f32) -> f32 {
        match self {
            MaskSign::Positive => value,
            MaskSign::Negative => -value,
        }
    }
}

/// Sign with which `own` applied the mask it shares with `peer`.
///
/// Total order: byte-wise lexicographic comparison of the UTF-8 ids. A client
/// never pairs with itself; for equal ids the result is `Negative` from both
/// sides and carries no meaning.
pub fn sign(own: &ClientId, peer: &ClientId) -> MaskSign {
    if own.as_bytes() < peer.as_bytes() {
        MaskSign::Positive
    } else {
        MaskSign::Negative
    }
}

/// Errors from noise vector arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskError {
    LengthMismatch { expected: usize, found: usize },
}

impl fmt::Display for MaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskError::LengthMismatch { expected, found } => {
                write!(f, "noise length mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for MaskError {}

/// `acc += sign * mask`, element-wise.
pub fn apply_signed(acc: &mut [f32], mask: &[f32], sign: MaskSign) -> Result<(), MaskError> {
    if acc.len() != mask.len() {
        return Err(MaskError::LengthMismatch {
            expected: acc.len(),
            found: mask.len(),
        });
    }
    for (a, m) in acc.iter_mut().zip(mask) {
        *a += sign.apply(*m);
    }
    Ok(())
}

/// Element-wise sum of all reconstructed noise vectors.
pub fn noise_masks_sum(
    noise: &BTreeMap<ClientId, Vec<f32>>,
    length: usize,
) -> Result<Vec<f32>, MaskError> {
    let mut sum = vec![0.0f32; length];
    for vector in noise.values() {
        apply_signed(&mut sum, vector, MaskSign::Positive)?;
    }
    Ok(sum)
}

/// Removes reconstructed noise from the aggregated update.
pub fn subtract_noise(aggregate: &mut [f32], noise: &[f32]) -> Result<(), MaskError> {
    apply_signed(aggregate, noise, MaskSign::Negative)
}
