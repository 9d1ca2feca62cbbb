//! Protocol Layer.
//!
//! This module implements the server side of mask reconstruction:
//! - Client roster (completed, live and dropped clients)
//! - Mask sign rule and noise arithmetic
//! - Noise derivation and key agreement capabilities
//! - Round state machine and the reconstruction engine
//! - Bounded wait for live clients and the response glue

pub mod roster;
pub mod mask;
pub mod noise;
pub mod state_machine;
pub mod arena;
pub mod engine;
pub mod gate;
pub mod response;

use core::fmt;

use self::state_machine::RoundState;
use crate::mpc::MpcError;
use crate::storage::{SecretKind, StorageError};
use roster::ClientId;

/// Coarse error classes; the coordinator picks its policy per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Not enough clients or shares. Wait or retry the round.
    Quorum,
    /// Misbehaving or corrupted client data. Abort the round.
    Data,
    /// Noise could not be derived. Abort the round.
    Derivation,
    /// Caller misuse or backend failure.
    Internal,
}

/// Errors raised while reconstructing dropped clients' noise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    /// Fewer live clients than `reconstruct_clients_num_need`.
    InsufficientClients { live: usize, required: usize },
    /// A needed secret has fewer than `t` shares among live peers.
    ThresholdNotMet {
        client: ClientId,
        kind: SecretKind,
        available: usize,
        required: usize,
    },
    /// Excluding malformed shares left a needed secret below threshold, or the
    /// shares interpolate to something that is not a valid secret.
    MalformedShare {
        client: ClientId,
        kind: SecretKind,
        reason: MpcError,
    },
    /// The noise of a dropped client could not be derived.
    NoiseDerivationFailed { client: ClientId },
    /// Operation not allowed in the current engine state.
    InvalidState { expected: RoundState, found: RoundState },
    /// Live client missing from the completed set, or roster differs from the frozen one.
    InvalidRoster { client: Option<ClientId> },
    /// Share store read failed.
    Storage(StorageError),
}

impl ReconstructError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ReconstructError::InsufficientClients { .. } | ReconstructError::ThresholdNotMet { .. } => {
                ErrorClass::Quorum
            }
            ReconstructError::MalformedShare { .. } => ErrorClass::Data,
            ReconstructError::NoiseDerivationFailed { .. } => ErrorClass::Derivation,
            ReconstructError::InvalidState { .. }
            | ReconstructError::InvalidRoster { .. }
            | ReconstructError::Storage(_) => ErrorClass::Internal,
        }
    }

    /// Whether waiting for more clients or re-running the round can help.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Quorum
    }
}

impl fmt::Display for ReconstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconstructError::InsufficientClients { live, required } => {
                write!(f, "insufficient live clients: {} < {}", live, required)
            }
            ReconstructError::ThresholdNotMet {
                client,
                kind,
                available,
                required,
            } => write!(
                f,
                "threshold not met for {} secret of {}: {} < {} shares",
                kind, client, available, required
            ),
            ReconstructError::MalformedShare { client, kind, reason } => {
                write!(f, "malformed shares for {} secret of {}: {}", kind, client, reason)
            }
            ReconstructError::NoiseDerivationFailed { client } => {
                write!(f, "noise derivation failed for {}", client)
            }
            ReconstructError::InvalidState { expected, found } => {
                write!(f, "invalid engine state: expected {:?}, found {:?}", expected, found)
            }
            ReconstructError::InvalidRoster { client: Some(client) } => {
                write!(f, "invalid roster: live client {} did not complete the round", client)
            }
            ReconstructError::InvalidRoster { client: None } => {
                write!(f, "invalid roster: differs from the frozen roster")
            }
            ReconstructError::Storage(err) => write!(f, "share store error: {}", err),
        }
    }
}

impl std::error::Error for ReconstructError {}

impl From<StorageError> for ReconstructError {
    fn from(err: StorageError) -> Self {
        ReconstructError::Storage(err)
    }
}
