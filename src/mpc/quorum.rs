//! Quorum logic for Shamir's Secret Sharing over GF(p).
//!
//! This module implements the threshold logic and polynomial generation required
//! to split secrets into shares.
//!
//! # Security
//! - **Uniform Coefficients**: Coefficients are sampled with `PrimeField::random_element`.
//! - **Validation**: Checks threshold parameters ($1 \le t \le n$) and that the
//!   secret is a field element.

use num_bigint::BigUint;

use crate::core::PrimeField;
use crate::entropy::EntropySource;
use crate::mpc::polynomial::evaluate_polynomial;
use crate::mpc::{share::Share, MpcError};

/// Splits a secret into `n` shares, requiring `t` shares to reconstruct.
///
/// The secret bytes are read as a big-endian integer, which must be smaller
/// than the field modulus. Shares are evaluated at indices `1..=n`.
///
/// # Returns
/// * `Ok(Vec<Share>)` containing `n` shares on success.
/// * `Err(MpcError)` on failure (invalid params, rng failure, etc.).
pub fn split_secret<R: EntropySource + ?Sized>(
    field: &PrimeField,
    secret: &[u8],
    t: usize,
    n: usize,
    rng: &mut R,
) -> Result<Vec<Share>, MpcError> {
    if secret.is_empty() {
        return Err(MpcError::EmptyShare);
    }
    if t < 1 || t > n {
        return Err(MpcError::InvalidThreshold);
    }
    if u32::try_from(n).is_err() {
        return Err(MpcError::InvalidShareIndex);
    }

    let constant = BigUint::from_bytes_be(secret);
    if !field.contains(&constant) {
        return Err(MpcError::SecretOutOfRange);
    }

    // f(x) = s + a1*x + ... + a(t-1)*x^(t-1)
    let mut coeffs = Vec::with_capacity(t);
    coeffs.push(constant);
    for _ in 1..t {
        coeffs.push(field.random_element(rng).map_err(|_| MpcError::RngFailure)?);
    }

    let mut shares = Vec::with_capacity(n);
    for index in 1..=n as u32 {
        let y = evaluate_polynomial(field, &coeffs, &BigUint::from(index));
        let value = field.encode(&y).map_err(|_| MpcError::ValueOutOfRange)?;
        shares.push(Share::new(index, value)?);
    }

    Ok(shares)
}
