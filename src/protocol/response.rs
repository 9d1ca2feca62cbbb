//! Reply sent to clients after a reconstruction request.

use super::engine::NoiseMap;
use super::{ErrorClass, ReconstructError};

/// Status codes understood by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum ResponseCode {
    Succeed = 200,
    /// Not enough clients in time; retry at `next_req_time`.
    OutOfTime = 300,
    RequestError = 400,
    SystemError = 500,
}

impl ResponseCode {
    pub fn for_error(err: &ReconstructError) -> Self {
        match err.class() {
            ErrorClass::Quorum => ResponseCode::OutOfTime,
            ErrorClass::Data => ResponseCode::RequestError,
            ErrorClass::Derivation | ErrorClass::Internal => ResponseCode::SystemError,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Reconstruction reply.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconstructResponse {
    pub retcode: ResponseCode,
    pub reason: String,
    pub iteration: u64,
    /// When the client should try again, as the coordinator formats it.
    pub next_req_time: String,
}

impl ReconstructResponse {
    pub fn succeed(iteration: u64, next_req_time: impl Into<String>) -> Self {
        Self {
            retcode: ResponseCode::Succeed,
            reason: "Reconstructing secrets succeeded.".to_owned(),
            iteration,
            next_req_time: next_req_time.into(),
        }
    }

    /// Builds the reply for an engine result. Error reasons never carry share data.
    pub fn from_result(
        result: &Result<NoiseMap, ReconstructError>,
        iteration: u64,
        next_req_time: impl Into<String>,
    ) -> Self {
        match result {
            Ok(_) => Self::succeed(iteration, next_req_time),
            Err(err) => Self {
                retcode: ResponseCode::for_error(err),
                reason: err.to_string(),
                iteration,
                next_req_time: next_req_time.into(),
            },
        }
    }
}
