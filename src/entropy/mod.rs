//! Entropy sources for share generation.
//!
//! Splitting a secret needs `t - 1` uniformly random polynomial coefficients
//! per secret. Callers hand in any `EntropySource`; production code uses
//! `OsEntropy`, tests use deterministic mocks.

pub mod os;

pub use os::OsEntropy;

use core::fmt;

/// Error types for entropy collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntropyError {
    /// Failed to collect sufficient entropy bytes.
    CollectionFailed,
    /// Source is exhausted (e.g., fixed buffer).
    Exhausted,
}

impl fmt::Display for EntropyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntropyError::CollectionFailed => write!(f, "entropy collection failed"),
            EntropyError::Exhausted => write!(f, "entropy source exhausted"),
        }
    }
}

impl std::error::Error for EntropyError {}

/// A trait for entropy sources.
pub trait EntropySource {
    /// Returns a unique identifier for the source.
    fn name(&self) -> &'static str;

    /// Fills `dest` with random bytes from the source.
    ///
    /// # Returns
    /// * `Ok(())` on success.
    /// * `Err(EntropyError)` if the source fails.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError>;
}
