//! Noise derivation and key agreement capabilities.
//!
//! The engine treats both as external capabilities behind traits. The default
//! implementations are:
//! - `Blake3NoiseDeriver`: BLAKE3 XOF keyed from the seed, one `u32` per
//!   element mapped onto `[0, 1]`.
//! - `X25519Agreement`: X25519 Diffie-Hellman, the shared point run through a
//!   BLAKE3 KDF to produce a pairwise seed.
//!
//! Clients must use the same derivations, otherwise reconstructed noise does
//! not match what they added.

use core::fmt;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::core::SEED_LEN;

const NOISE_CONTEXT: &str = "secagg-reconstruct 2024 mask noise v1";
const PAIRWISE_CONTEXT: &str = "secagg-reconstruct 2024 pairwise seed v1";

/// Errors from the noise capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseError {
    EmptySeed,
    InvalidKey,
    /// The backend produced fewer elements than requested.
    ShortOutput,
}

impl fmt::Display for NoiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseError::EmptySeed => write!(f, "empty noise seed"),
            NoiseError::InvalidKey => write!(f, "invalid key material"),
            NoiseError::ShortOutput => write!(f, "noise output shorter than requested"),
        }
    }
}

impl std::error::Error for NoiseError {}

/// Deterministic expansion of a seed into a noise vector.
pub trait NoiseDeriver: Send + Sync {
    fn derive_noise(&self, seed: &[u8], length: usize) -> Result<Vec<f32>, NoiseError>;
}

/// Pairwise seed agreement between a secret key and a peer's public key.
pub trait KeyAgreement: Send + Sync {
    fn agree(&self, secret: &[u8], peer_public: &[u8]) -> Result<Zeroizing<[u8; SEED_LEN]>, NoiseError>;
}

/// BLAKE3 XOF noise expansion.
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3NoiseDeriver;

impl NoiseDeriver for Blake3NoiseDeriver {
    fn derive_noise(&self, seed: &[u8], length: usize) -> Result<Vec<f32>, NoiseError> {
        if seed.is_empty() {
            return Err(NoiseError::EmptySeed);
        }
        let key: [u8; 32] = blake3::Hasher::new_derive_key(NOISE_CONTEXT)
            .update(seed)
            .finalize()
            .into();
        let key = Zeroizing::new(key);
        let mut reader = blake3::Hasher::new_keyed(&key).finalize_xof();

        let mut word = [0u8; 4];
        let mut noise = Vec::with_capacity(length);
        for _ in 0..length {
            reader.fill(&mut word);
            noise.push(u32::from_le_bytes(word) as f32 / u32::MAX as f32);
        }
        Ok(noise)
    }
}

/// X25519 key agreement.
#[derive(Debug, Default, Clone, Copy)]
pub struct X25519Agreement;

impl X25519Agreement {
    /// Public key matching a 32-byte secret; clients publish this.
    pub fn public_key(secret: &[u8; 32]) -> [u8; 32] {
        PublicKey::from(&StaticSecret::from(*secret)).to_bytes()
    }
}

impl KeyAgreement for X25519Agreement {
    fn agree(&self, secret: &[u8], peer_public: &[u8]) -> Result<Zeroizing<[u8; SEED_LEN]>, NoiseError> {
        let secret: [u8; 32] = secret.try_into().map_err(|_| NoiseError::InvalidKey)?;
        let secret = StaticSecret::from(secret);
        let peer: [u8; 32] = peer_public.try_into().map_err(|_| NoiseError::InvalidKey)?;

        let shared = secret.diffie_hellman(&PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(NoiseError::InvalidKey);
        }
        let mut hasher = blake3::Hasher::new_derive_key(PAIRWISE_CONTEXT);
        hasher.update(shared.as_bytes());
        Ok(Zeroizing::new(hasher.finalize().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_is_deterministic() {
        let deriver = Blake3NoiseDeriver;
        let a = deriver.derive_noise(&[7u8; 32], 64).unwrap();
        let b = deriver.derive_noise(&[7u8; 32], 64).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_noise_depends_on_seed() {
        let deriver = Blake3NoiseDeriver;
        let a = deriver.derive_noise(&[1u8; 32], 16).unwrap();
        let b = deriver.derive_noise(&[2u8; 32], 16).unwrap();
        assert_ne!(a, b);
        // Prefix-stable: a longer vector extends a shorter one.
        let long = deriver.derive_noise(&[1u8; 32], 32).unwrap();
        assert_eq!(&long[..16], a.as_slice());
    }

    #[test]
    fn test_empty_seed_rejected() {
        assert_eq!(Blake3NoiseDeriver.derive_noise(&[], 4), Err(NoiseError::EmptySeed));
    }

    #[test]
    fn test_agreement_is_symmetric() {
        let sk_a = [0x11u8; 32];
        let sk_b = [0x22u8; 32];
        let pk_a = X25519Agreement::public_key(&sk_a);
        let pk_b = X25519Agreement::public_key(&sk_b);

        let ab = X25519Agreement.agree(&sk_a, &pk_b).unwrap();
        let ba = X25519Agreement.agree(&sk_b, &pk_a).unwrap();
        assert_eq!(*ab, *ba);

        let sk_c = [0x33u8; 32];
        let ac = X25519Agreement.agree(&sk_a, &X25519Agreement::public_key(&sk_c)).unwrap();
        assert_ne!(*ab, *ac);
    }

    #[test]
    fn test_agreement_rejects_bad_keys() {
        assert_eq!(
            X25519Agreement.agree(&[1u8; 31], &[2u8; 32]).map(|_| ()),
            Err(NoiseError::InvalidKey)
        );
        // The all-zero point is low order.
        assert_eq!(
            X25519Agreement.agree(&[1u8; 32], &[0u8; 32]).map(|_| ()),
            Err(NoiseError::InvalidKey)
        );
    }
}
