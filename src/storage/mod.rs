//! Storage Module.
//!
//! Interfaces to the collaborators that hold round state, plus in-memory
//! implementations:
//! - `params`: the key-value parameter store (round prime) and the model
//!   store (feature-vector size).
//! - `share_store`: the round-scoped store of client share submissions.

pub mod params;
pub mod share_store;

pub use params::{FixedModelStore, MemoryParameterStore, ModelStore, ParameterStore};
pub use share_store::{
    ClientShare, InsertOutcome, RoundShareStore, SecretKind, ShareEntry, ShareSource,
    ShareSubmission, StoredShare,
};

use core::fmt;

/// Errors related to storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Key not found.
    NotFound,
    /// Backend unavailable or refused the operation.
    Unavailable,
    /// Stored data does not match what was written.
    Corruption,
    /// Submission belongs to a different round.
    RoundMismatch,
    /// Submission is structurally invalid (zero index, empty value, self pairing).
    InvalidSubmission,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound => write!(f, "key not found"),
            StorageError::Unavailable => write!(f, "storage backend unavailable"),
            StorageError::Corruption => write!(f, "stored data is corrupted"),
            StorageError::RoundMismatch => write!(f, "submission is for another round"),
            StorageError::InvalidSubmission => write!(f, "invalid share submission"),
        }
    }
}

impl std::error::Error for StorageError {}
