//! Per-round protocol parameters.
//!
//! Built once when a round starts, from the public parameters pushed by the
//! coordinator and the per-phase client counts. After `initialize` succeeds
//! the value is immutable and can be shared across threads without locking.
//!
//! # Invariants
//! - `featuremap >= 1` and `t >= 1`
//! - `share_clients_num_need >= reconstruct_clients_num_need`
//! - `reconstruct_clients_num_need > t`
//! - `client_num_need >= share_clients_num_need`

use core::fmt;
use std::time::Duration;

use crate::core::{FieldError, PrimeField, PRIME_LEN};
use crate::storage::{ModelStore, ParameterStore, StorageError};

/// Parameter store key of the round prime.
pub const PRIME_STORE_KEY: &str = "cipherPrime";

/// How clients protect their updates this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncryptType {
    NotEncrypt,
    DpEncrypt,
    PwEncrypt,
}

/// Differential-privacy knobs, passed through to clients.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DpParams {
    pub eps: f32,
    pub delta: f32,
    pub norm_clip: f32,
}

/// Public parameters of a round as pushed by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicParams {
    /// Big-endian prime modulus, `PRIME_LEN` bytes.
    pub prime: Vec<u8>,
    pub generator: u64,
    /// Secret-sharing threshold.
    pub t: usize,
    pub dp: DpParams,
    pub encrypt_type: EncryptType,
}

/// Minimum client counts per phase and the quorum wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundCounts {
    pub initial_client_cnt: usize,
    pub exchange_secrets_cnt: usize,
    pub share_secrets_cnt: usize,
    pub get_clientlist_cnt: usize,
    /// Dropouts tolerated at reconstruction; one more live client is required.
    pub reconstruct_secrets_down_cnt: usize,
    pub time_out_mutex: Duration,
}

/// A violated parameter inequality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamViolation {
    /// The model is smaller than one `f32`.
    EmptyFeatureMap,
    ZeroThreshold,
    ShareBelowReconstruct { share: usize, reconstruct: usize },
    ReconstructNotAboveThreshold { reconstruct: usize, t: usize },
    ClientBelowShare { client: usize, share: usize },
}

impl fmt::Display for ParamViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamViolation::EmptyFeatureMap => write!(f, "featuremap must be at least 1"),
            ParamViolation::ZeroThreshold => write!(f, "threshold t must be at least 1"),
            ParamViolation::ShareBelowReconstruct { share, reconstruct } => write!(
                f,
                "share_clients_num_need ({}) < reconstruct_clients_num_need ({})",
                share, reconstruct
            ),
            ParamViolation::ReconstructNotAboveThreshold { reconstruct, t } => write!(
                f,
                "reconstruct_clients_num_need ({}) must exceed t ({})",
                reconstruct, t
            ),
            ParamViolation::ClientBelowShare { client, share } => write!(
                f,
                "client_num_need ({}) < share_clients_num_need ({})",
                client, share
            ),
        }
    }
}

/// Errors from parameter initialization. All of them are fatal to the round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    /// The prime could not be stored, read back, or came back altered.
    ParameterStoreError(StorageError),
    /// No model registered, the feature length is unknown.
    ModelSizeError,
    InvalidPrime(FieldError),
    InvalidParameters(ParamViolation),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::ParameterStoreError(err) => write!(f, "parameter store error: {}", err),
            InitError::ModelSizeError => write!(f, "model size unavailable"),
            InitError::InvalidPrime(err) => write!(f, "invalid prime: {}", err),
            InitError::InvalidParameters(v) => write!(f, "invalid parameters: {}", v),
        }
    }
}

impl std::error::Error for InitError {}

impl From<StorageError> for InitError {
    fn from(err: StorageError) -> Self {
        InitError::ParameterStoreError(err)
    }
}

impl From<FieldError> for InitError {
    fn from(err: FieldError) -> Self {
        InitError::InvalidPrime(err)
    }
}

/// Validated, immutable parameters of one round.
#[derive(Debug, Clone)]
pub struct ProtocolParameters {
    field: PrimeField,
    generator: u64,
    t: usize,
    client_num_need: usize,
    share_clients_num_need: usize,
    reconstruct_clients_num_need: usize,
    get_model_num_need: usize,
    dp: DpParams,
    featuremap: usize,
    encrypt_type: EncryptType,
    time_out_mutex: Duration,
}

impl ProtocolParameters {
    /// Registers the prime, derives the feature length and checks the invariants.
    pub fn initialize(
        public: &PublicParams,
        counts: &RoundCounts,
        store: &dyn ParameterStore,
        models: &dyn ModelStore,
    ) -> Result<Self, InitError> {
        if public.prime.len() != PRIME_LEN {
            return Err(InitError::InvalidPrime(FieldError::ElementTooWide));
        }
        store.register_prime(PRIME_STORE_KEY, &public.prime)?;
        let stored = store.get_prime(PRIME_STORE_KEY)?;
        if stored != public.prime {
            log::error!("Round prime read back from the parameter store does not match");
            return Err(InitError::ParameterStoreError(StorageError::Corruption));
        }
        let field = PrimeField::from_be_bytes(&stored)?;

        let model_size = models.model_size_bytes().ok_or(InitError::ModelSizeError)?;

        let params = Self {
            field,
            generator: public.generator,
            t: public.t,
            client_num_need: counts.initial_client_cnt,
            share_clients_num_need: counts.share_secrets_cnt,
            reconstruct_clients_num_need: counts.reconstruct_secrets_down_cnt.saturating_add(1),
            get_model_num_need: counts.get_clientlist_cnt,
            dp: public.dp,
            featuremap: model_size / core::mem::size_of::<f32>(),
            encrypt_type: public.encrypt_type,
            time_out_mutex: counts.time_out_mutex,
        };

        log::info!("client_num_need: {}", params.client_num_need);
        log::info!("share_clients_num_need: {}", params.share_clients_num_need);
        log::info!("reconstruct_clients_num_need: {}", params.reconstruct_clients_num_need);
        log::info!("get_model_num_need: {}", params.get_model_num_need);
        log::info!("featuremap: {}", params.featuremap);

        if let Err(violation) = params.check() {
            log::error!("Rejected round parameters: {}", violation);
            return Err(InitError::InvalidParameters(violation));
        }
        Ok(params)
    }

    fn check(&self) -> Result<(), ParamViolation> {
        if self.featuremap < 1 {
            return Err(ParamViolation::EmptyFeatureMap);
        }
        if self.t < 1 {
            return Err(ParamViolation::ZeroThreshold);
        }
        if self.share_clients_num_need < self.reconstruct_clients_num_need {
            return Err(ParamViolation::ShareBelowReconstruct {
                share: self.share_clients_num_need,
                reconstruct: self.reconstruct_clients_num_need,
            });
        }
        if self.reconstruct_clients_num_need <= self.t {
            return Err(ParamViolation::ReconstructNotAboveThreshold {
                reconstruct: self.reconstruct_clients_num_need,
                t: self.t,
            });
        }
        if self.client_num_need < self.share_clients_num_need {
            return Err(ParamViolation::ClientBelowShare {
                client: self.client_num_need,
                share: self.share_clients_num_need,
            });
        }
        Ok(())
    }

    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    pub fn generator(&self) -> u64 {
        self.generator
    }

    /// Secret-sharing threshold.
    pub fn t(&self) -> usize {
        self.t
    }

    pub fn client_num_need(&self) -> usize {
        self.client_num_need
    }

    pub fn share_clients_num_need(&self) -> usize {
        self.share_clients_num_need
    }

    /// Live clients required to start reconstruction.
    pub fn reconstruct_clients_num_need(&self) -> usize {
        self.reconstruct_clients_num_need
    }

    pub fn get_model_num_need(&self) -> usize {
        self.get_model_num_need
    }

    pub fn dp(&self) -> DpParams {
        self.dp
    }

    /// Number of `f32` elements in a model update and in every noise vector.
    pub fn featuremap(&self) -> usize {
        self.featuremap
    }

    pub fn encrypt_type(&self) -> EncryptType {
        self.encrypt_type
    }

    /// Upper bound on the wait for live clients before reconstruction.
    pub fn time_out_mutex(&self) -> Duration {
        self.time_out_mutex
    }
}
