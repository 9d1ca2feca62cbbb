//! Configuration management for secure aggregation rounds.
//!
//! Defines the structure for operator-configurable round settings.

use core::fmt;
use std::time::Duration;

use crate::core::{DEFAULT_PRIME_HEX, PRIME_LEN};
use crate::params::{DpParams, EncryptType, PublicParams, RoundCounts};

/// Errors raised while turning a configuration into round parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `prime_hex` is not valid hex.
    InvalidPrimeHex,
    /// The decoded prime is wider than `PRIME_LEN` bytes.
    PrimeTooWide(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPrimeHex => write!(f, "prime is not a hex string"),
            ConfigError::PrimeTooWide(len) => {
                write!(f, "prime is {} bytes, at most {} allowed", len, PRIME_LEN)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Main configuration structure for a round.
///
/// Populated by the host server and converted into `PublicParams` and
/// `RoundCounts` when a round starts.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CipherConfig {
    /// Big-endian prime modulus as hex; shorter values are left-padded.
    pub prime_hex: String,

    pub generator: u64,

    /// Secret-sharing threshold `t`.
    pub share_threshold: usize,

    pub initial_client_cnt: usize,
    pub exchange_secrets_cnt: usize,
    pub share_secrets_cnt: usize,
    pub get_clientlist_cnt: usize,

    /// Dropouts tolerated during reconstruction.
    pub reconstruct_secrets_down_cnt: usize,

    /// Bounded wait for live clients, in milliseconds.
    pub time_out_mutex_ms: u64,

    pub dp: DpParams,
    pub encrypt_type: EncryptType,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            prime_hex: String::from(DEFAULT_PRIME_HEX),
            generator: 1,
            share_threshold: 3,
            initial_client_cnt: 10,
            exchange_secrets_cnt: 10,
            share_secrets_cnt: 8,
            get_clientlist_cnt: 8,
            reconstruct_secrets_down_cnt: 3,
            time_out_mutex_ms: 5000,
            dp: DpParams {
                eps: 50.0,
                delta: 0.01,
                norm_clip: 1.0,
            },
            encrypt_type: EncryptType::PwEncrypt,
        }
    }
}

impl CipherConfig {
    pub fn public_params(&self) -> Result<PublicParams, ConfigError> {
        let raw = hex::decode(self.prime_hex.trim()).map_err(|_| ConfigError::InvalidPrimeHex)?;
        if raw.len() > PRIME_LEN {
            return Err(ConfigError::PrimeTooWide(raw.len()));
        }
        let mut prime = vec![0u8; PRIME_LEN - raw.len()];
        prime.extend_from_slice(&raw);
        Ok(PublicParams {
            prime,
            generator: self.generator,
            t: self.share_threshold,
            dp: self.dp,
            encrypt_type: self.encrypt_type,
        })
    }

    pub fn round_counts(&self) -> RoundCounts {
        RoundCounts {
            initial_client_cnt: self.initial_client_cnt,
            exchange_secrets_cnt: self.exchange_secrets_cnt,
            share_secrets_cnt: self.share_secrets_cnt,
            get_clientlist_cnt: self.get_clientlist_cnt,
            reconstruct_secrets_down_cnt: self.reconstruct_secrets_down_cnt,
            time_out_mutex: Duration::from_millis(self.time_out_mutex_ms),
        }
    }
}
