//! Core arithmetic.
//!
//! Shares, secrets and interpolation all live in the prime field GF(p), where
//! `p` is the round prime distributed with the public parameters.

pub mod field;

pub use field::{FieldError, PrimeField, DEFAULT_PRIME_HEX, PRIME_LEN, SEED_LEN};
