//! Threshold secret-sharing reconstruction engine for secure aggregation.
//!
//! Clients in a federated-learning round hide their model updates behind an
//! individual mask and a set of pairwise masks. Pairwise masks cancel between
//! live clients; a client that drops out leaves its masks in the aggregate.
//! This crate recovers exactly that residual noise from the Shamir shares the
//! dropped client handed to its peers, so the server can subtract it.
//!
//! # Layout
//! - `core`: prime-field arithmetic.
//! - `mpc`: share splitting and Lagrange reconstruction over GF(p).
//! - `params`: per-round protocol parameters and their invariants.
//! - `storage`: parameter/model store interfaces and the round share store.
//! - `protocol`: roster, mask sign rule, noise derivation and the engine.
//! - `entropy`: randomness for share generation.
//! - `config`: operator-facing round configuration.

pub mod core;
pub mod entropy;
pub mod mpc;
pub mod params;
pub mod storage;
pub mod protocol;
pub mod config;

pub use crate::params::ProtocolParameters;
pub use crate::protocol::engine::ReconstructionEngine;
pub use crate::protocol::roster::{ClientId, ClientRoster};
pub use crate::protocol::ReconstructError;
