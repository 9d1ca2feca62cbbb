//! Shamir share of a mask seed.
//!
//! A share is the point `(index, f(index))` of the owner's polynomial. The
//! index is public and non-zero; the value is a `PRIME_LEN`-byte big-endian
//! element of GF(p) and is wiped on drop. `Debug` never prints it.

use core::fmt;
use num_bigint::BigUint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::MpcError;
use crate::core::PrimeField;

/// A share of a secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Share {
    /// The x-coordinate (non-zero).
    /// Public information (who owns the share).
    #[zeroize(skip)]
    pub index: u32,

    /// The y-coordinate, big-endian.
    /// Highly sensitive information.
    pub value: Vec<u8>,
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("index", &self.index)
            .field("length", &self.value.len())
            .field("value", &"***SENSITIVE***")
            .finish()
    }
}

impl Share {
    /// Creates a new share with validation.
    ///
    /// # Arguments
    /// * `index` - The x-coordinate (must be non-zero).
    /// * `value` - The y-coordinate bytes (must not be empty).
    pub fn new(index: u32, value: Vec<u8>) -> Result<Self, MpcError> {
        if index == 0 {
            return Err(MpcError::InvalidShareIndex);
        }
        if value.is_empty() {
            return Err(MpcError::EmptyShare);
        }
        Ok(Self { index, value })
    }

    /// Returns a reference to the value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Decodes the value as a canonical element of `field`.
    pub fn element(&self, field: &PrimeField) -> Result<BigUint, MpcError> {
        if self.value.len() != crate::core::PRIME_LEN {
            return Err(MpcError::ShareLengthMismatch);
        }
        field.decode(&self.value).map_err(|_| MpcError::ValueOutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PRIME_LEN;

    #[test]
    fn test_share_creation() {
        let s = Share::new(1, vec![10, 20]).unwrap();
        assert_eq!(s.index, 1);
        assert_eq!(s.value(), &[10, 20]);
    }

    #[test]
    fn test_share_validation() {
        assert_eq!(Share::new(0, vec![1]), Err(MpcError::InvalidShareIndex));
        assert_eq!(Share::new(1, vec![]), Err(MpcError::EmptyShare));
    }

    #[test]
    fn test_share_element_checks() {
        let field = PrimeField::default_prime();

        let short = Share::new(1, vec![1, 2, 3]).unwrap();
        assert_eq!(short.element(&field), Err(MpcError::ShareLengthMismatch));

        let too_big = Share::new(1, vec![0xFF; PRIME_LEN]).unwrap();
        assert_eq!(too_big.element(&field), Err(MpcError::ValueOutOfRange));

        let mut bytes = vec![0u8; PRIME_LEN];
        bytes[PRIME_LEN - 1] = 9;
        let ok = Share::new(2, bytes).unwrap();
        assert_eq!(ok.element(&field).unwrap(), BigUint::from(9u32));
    }

    #[test]
    fn test_debug_redaction() {
        let s = Share::new(5, vec![0xFF; 32]).unwrap();
        let debug_str = format!("{:?}", s);
        assert!(debug_str.contains("index: 5"));
        assert!(debug_str.contains("length: 32"));
        assert!(debug_str.contains("***SENSITIVE***"));
        assert!(!debug_str.contains("255"));
    }
}
