//! GF(p) arithmetic module.
//!
//! Finite field arithmetic modulo the round prime `p`. Elements are `BigUint`
//! values that are always kept fully reduced (`0 <= x < p`). On the wire and in
//! the parameter store every element is a fixed-width big-endian byte string of
//! `PRIME_LEN` bytes.
//!
//! # Design Choices
//! - **Fixed Width**: The prime is at most `PRIME_LEN` bytes, so every element
//!   encodes into exactly `PRIME_LEN` bytes.
//! - **Seed Headroom**: A usable prime must be wider than `SEED_LEN * 8` bits,
//!   so any mask seed or agreement key is a valid field element.
//! - **Inversion**: Fermat's little theorem (`a^(p-2) mod p`); the modulus is
//!   trusted to be prime, it arrives through validated round parameters.

use core::fmt;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::entropy::{EntropyError, EntropySource};

/// Byte width of the prime modulus and of every encoded field element.
pub const PRIME_LEN: usize = 33;

/// Byte width of mask seeds and key-agreement secrets.
pub const SEED_LEN: usize = 32;

/// Extra random bytes drawn when sampling, so reduction bias is below 2^-128.
const SAMPLE_SLACK: usize = 16;

/// Default round prime, 2^263 - 747, as hex.
pub const DEFAULT_PRIME_HEX: &str =
    "7ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffd15";

/// Errors raised by field construction and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// Modulus too small, or wider than `PRIME_LEN` bytes.
    InvalidModulus,
    /// Modulus does not leave room for `SEED_LEN`-byte secrets.
    ModulusTooNarrow,
    /// Zero has no multiplicative inverse.
    NotInvertible,
    /// Value does not fit the requested encoding width.
    ElementTooWide,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::InvalidModulus => write!(f, "invalid field modulus"),
            FieldError::ModulusTooNarrow => {
                write!(f, "field modulus must exceed {} bits", SEED_LEN * 8)
            }
            FieldError::NotInvertible => write!(f, "element is not invertible"),
            FieldError::ElementTooWide => write!(f, "element does not fit the encoding width"),
        }
    }
}

impl std::error::Error for FieldError {}

/// The prime field GF(p).
#[derive(Clone, PartialEq, Eq)]
pub struct PrimeField {
    modulus: BigUint,
}

impl fmt::Debug for PrimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimeField")
            .field("bits", &self.modulus.bits())
            .field("modulus", &hex::encode(self.modulus.to_bytes_be()))
            .finish()
    }
}

impl PrimeField {
    /// Creates a field from a modulus.
    ///
    /// # Errors
    /// * `InvalidModulus` if `p < 3` or `p` is wider than `PRIME_LEN` bytes.
    /// * `ModulusTooNarrow` if `p <= 2^(8 * SEED_LEN)`.
    pub fn new(modulus: BigUint) -> Result<Self, FieldError> {
        if modulus < BigUint::from(3u32) || modulus.bits() > (PRIME_LEN * 8) as u64 {
            return Err(FieldError::InvalidModulus);
        }
        if modulus.bits() <= (SEED_LEN * 8) as u64 {
            return Err(FieldError::ModulusTooNarrow);
        }
        Ok(Self { modulus })
    }

    /// Creates a field from a big-endian modulus encoding.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        Self::new(BigUint::from_bytes_be(bytes))
    }

    /// Field with the built-in default prime (2^263 - 747).
    pub fn default_prime() -> Self {
        Self {
            modulus: (BigUint::one() << 263usize) - BigUint::from(747u32),
        }
    }

    /// The modulus `p`.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Fixed-width encoding of the modulus itself.
    pub fn modulus_bytes(&self) -> Vec<u8> {
        left_pad(&self.modulus.to_bytes_be(), PRIME_LEN)
    }

    /// Returns true if `value` is a canonical element (`value < p`).
    pub fn contains(&self, value: &BigUint) -> bool {
        value < &self.modulus
    }

    pub fn reduce(&self, value: &BigUint) -> BigUint {
        value % &self.modulus
    }

    pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.modulus
    }

    pub fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        let b = b % &self.modulus;
        (a + &self.modulus - b) % &self.modulus
    }

    pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.modulus
    }

    /// Multiplicative inverse via `a^(p-2) mod p`.
    pub fn inv(&self, a: &BigUint) -> Result<BigUint, FieldError> {
        let a = self.reduce(a);
        if a.is_zero() {
            return Err(FieldError::NotInvertible);
        }
        let exponent = &self.modulus - BigUint::from(2u32);
        Ok(a.modpow(&exponent, &self.modulus))
    }

    /// Samples a uniformly distributed element.
    pub fn random_element<R: EntropySource + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<BigUint, EntropyError> {
        let mut buf = zeroize::Zeroizing::new(vec![0u8; PRIME_LEN + SAMPLE_SLACK]);
        rng.fill(&mut buf)?;
        Ok(self.reduce(&BigUint::from_bytes_be(&buf)))
    }

    /// Encodes an element as `PRIME_LEN` big-endian bytes.
    pub fn encode(&self, value: &BigUint) -> Result<Vec<u8>, FieldError> {
        if !self.contains(value) {
            return Err(FieldError::ElementTooWide);
        }
        Ok(left_pad(&value.to_bytes_be(), PRIME_LEN))
    }

    /// Decodes a `PRIME_LEN`-byte element, rejecting non-canonical values.
    pub fn decode(&self, bytes: &[u8]) -> Result<BigUint, FieldError> {
        if bytes.len() != PRIME_LEN {
            return Err(FieldError::ElementTooWide);
        }
        let value = BigUint::from_bytes_be(bytes);
        if !self.contains(&value) {
            return Err(FieldError::ElementTooWide);
        }
        Ok(value)
    }
}

/// Big-endian encoding of `value` in exactly `width` bytes.
pub fn to_width(value: &BigUint, width: usize) -> Result<Vec<u8>, FieldError> {
    let raw = value.to_bytes_be();
    let raw = if value.is_zero() { Vec::new() } else { raw };
    if raw.len() > width {
        return Err(FieldError::ElementTooWide);
    }
    Ok(left_pad(&raw, width))
}

fn left_pad(raw: &[u8], width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width.saturating_sub(raw.len())];
    out.extend_from_slice(raw);
    out
}
