//! Client roster for one reconstruction phase.
//!
//! `completed` are the clients that submitted a masked update this round;
//! `live` are the ones still reachable at reconstruction time. The dropped set
//! is their difference and is the only set whose noise gets reconstructed.

use core::fmt;
use std::collections::BTreeSet;

use super::ReconstructError;

/// Client identifier as issued by client registration.
///
/// Ordering is byte-wise lexicographic over the UTF-8 encoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ClientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Completed and live clients of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRoster {
    completed: BTreeSet<ClientId>,
    live: BTreeSet<ClientId>,
}

impl ClientRoster {
    /// Builds a roster.
    ///
    /// # Errors
    /// `InvalidRoster` if a live client is not among the completed clients.
    pub fn new<C, L>(completed: C, live: L) -> Result<Self, ReconstructError>
    where
        C: IntoIterator<Item = ClientId>,
        L: IntoIterator<Item = ClientId>,
    {
        let completed: BTreeSet<ClientId> = completed.into_iter().collect();
        let live: BTreeSet<ClientId> = live.into_iter().collect();
        if let Some(stray) = live.iter().find(|c| !completed.contains(*c)) {
            return Err(ReconstructError::InvalidRoster {
                client: Some(stray.clone()),
            });
        }
        Ok(Self { completed, live })
    }

    pub fn completed(&self) -> &BTreeSet<ClientId> {
        &self.completed
    }

    pub fn live(&self) -> &BTreeSet<ClientId> {
        &self.live
    }

    /// `completed - live`, in id order.
    pub fn dropped(&self) -> impl Iterator<Item = &ClientId> + '_ {
        self.completed.difference(&self.live)
    }

    pub fn is_live(&self, client: &ClientId) -> bool {
        self.live.contains(client)
    }

    pub fn is_dropped(&self, client: &ClientId) -> bool {
        self.completed.contains(client) && !self.live.contains(client)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
