//! Bounded wait for live clients.
//!
//! Live clients report in before reconstruction starts. The coordinator waits
//! until `reconstruct_clients_num_need` of them did, but never longer than
//! `time_out_mutex`.

use std::collections::BTreeSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::roster::ClientId;
use super::ReconstructError;
use crate::params::ProtocolParameters;

/// Collects live-client reports and releases waiters once the quorum is met.
#[derive(Debug)]
pub struct LiveClientGate {
    need: usize,
    reported: Mutex<BTreeSet<ClientId>>,
    arrived: Condvar,
}

impl LiveClientGate {
    pub fn new(need: usize) -> Self {
        Self {
            need,
            reported: Mutex::new(BTreeSet::new()),
            arrived: Condvar::new(),
        }
    }

    pub fn from_params(params: &ProtocolParameters) -> Self {
        Self::new(params.reconstruct_clients_num_need())
    }

    /// Records a live client. Repeated reports count once.
    /// Returns the number of distinct clients reported so far.
    pub fn report(&self, client: ClientId) -> usize {
        let mut reported = self.reported.lock().unwrap_or_else(PoisonError::into_inner);
        reported.insert(client);
        let count = reported.len();
        if count >= self.need {
            self.arrived.notify_all();
        }
        count
    }

    /// Snapshot of the clients reported so far.
    pub fn reported(&self) -> BTreeSet<ClientId> {
        self.reported.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Blocks until enough clients reported or `timeout` elapsed.
    ///
    /// A `timeout` too large to add to the current instant waits without a
    /// deadline.
    ///
    /// # Errors
    /// `InsufficientClients` if the deadline passes first.
    pub fn wait_for_quorum(&self, timeout: Duration) -> Result<BTreeSet<ClientId>, ReconstructError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut reported = self.reported.lock().unwrap_or_else(PoisonError::into_inner);
        while reported.len() < self.need {
            let Some(deadline) = deadline else {
                reported = self
                    .arrived
                    .wait(reported)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            };
            let now = Instant::now();
            if now >= deadline {
                log::warn!(
                    "Timed out waiting for live clients: {} of {}",
                    reported.len(),
                    self.need
                );
                return Err(ReconstructError::InsufficientClients {
                    live: reported.len(),
                    required: self.need,
                });
            }
            // Spurious wakeups re-check the count against the same deadline.
            let (guard, _) = self
                .arrived
                .wait_timeout(reported, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            reported = guard;
        }
        Ok(reported.clone())
    }
}
