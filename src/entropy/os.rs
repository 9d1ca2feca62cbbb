//! Operating-system entropy via `rand_core::OsRng`.

use rand_core::{OsRng, RngCore};

use super::{EntropyError, EntropySource};

/// Entropy drawn from the OS CSPRNG (`getrandom`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl OsEntropy {
    pub fn new() -> Self {
        Self
    }
}

impl EntropySource for OsEntropy {
    fn name(&self) -> &'static str {
        "OsRng"
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng.try_fill_bytes(dest).map_err(|err| {
            log::error!("OsRng failure: {}", err);
            EntropyError::CollectionFailed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_entropy_fills() {
        let mut rng = OsEntropy::new();
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        rng.fill(&mut a).unwrap();
        rng.fill(&mut b).unwrap();
        assert_ne!(a, b);
        assert_eq!(rng.name(), "OsRng");
    }
}
