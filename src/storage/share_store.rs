//! Round-scoped share store.
//!
//! Every client splits its mask seeds into shares and hands one share of each
//! secret to every peer. Peers upload the shares they hold; the store indexes
//! them by holder. At most one share is accepted per
//! `(owner, holder, secret kind)`: a retried upload is ignored, never appended,
//! so a client cannot inflate the share count of a secret.
//!
//! The whole store belongs to one round and is dropped (or `clear`ed) at round
//! end; individual shares are never freed piecemeal.

use core::fmt;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::StorageError;
use crate::mpc::share::Share;
use crate::protocol::roster::ClientId;

/// Which secret of the owner a share belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SecretKind {
    /// The owner's individual mask seed.
    Individual,
    /// The owner's key-agreement secret key.
    AgreementKey,
    /// The pairwise mask seed shared between the owner and `peer`.
    Pairwise(ClientId),
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretKind::Individual => write!(f, "individual"),
            SecretKind::AgreementKey => write!(f, "agreement-key"),
            SecretKind::Pairwise(peer) => write!(f, "pairwise({})", peer),
        }
    }
}

/// One inbound share message.
#[derive(Clone)]
pub struct ShareSubmission {
    pub round: u64,
    /// Owner of the secret (the client that split it).
    pub client_id: ClientId,
    /// Holder of the share (the peer the owner sent it to).
    pub target_id: ClientId,
    pub share_index: u32,
    pub share_value: Vec<u8>,
    pub secret_kind: SecretKind,
}

impl fmt::Debug for ShareSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareSubmission")
            .field("round", &self.round)
            .field("client_id", &self.client_id)
            .field("target_id", &self.target_id)
            .field("share_index", &self.share_index)
            .field("secret_kind", &self.secret_kind)
            .finish_non_exhaustive()
    }
}

/// One `(target, kind, share)` entry of a `ClientShare`.
#[derive(Debug, Clone)]
pub struct ShareEntry {
    pub target_id: ClientId,
    pub secret_kind: SecretKind,
    pub share: Share,
}

/// Everything one client contributed: its shares to each peer and its public key.
#[derive(Debug, Clone)]
pub struct ClientShare {
    pub client_id: ClientId,
    pub public_key: Option<Vec<u8>>,
    pub shares: Vec<ShareEntry>,
}

/// A share as read back by the engine.
#[derive(Debug, Clone)]
pub struct StoredShare {
    pub owner: ClientId,
    pub holder: ClientId,
    pub kind: SecretKind,
    pub share: Share,
}

/// Result of an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Accepted,
    /// Key already present; the new value was ignored.
    Duplicate,
}

/// Read access the reconstruction engine needs.
pub trait ShareSource {
    /// All shares held by `holder`.
    fn shares_held_by(&self, holder: &ClientId) -> Result<Vec<StoredShare>, StorageError>;

    /// Public key material registered by `client`.
    fn public_key(&self, client: &ClientId) -> Result<Option<Vec<u8>>, StorageError>;
}

type HolderShares = BTreeMap<(ClientId, SecretKind), Share>;

/// Concurrent in-memory share store for one round.
#[derive(Debug)]
pub struct RoundShareStore {
    round: u64,
    by_holder: RwLock<BTreeMap<ClientId, HolderShares>>,
    public_keys: RwLock<BTreeMap<ClientId, Vec<u8>>>,
}

impl RoundShareStore {
    pub fn new(round: u64) -> Self {
        Self {
            round,
            by_holder: RwLock::new(BTreeMap::new()),
            public_keys: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Inserts one share submission.
    ///
    /// # Errors
    /// * `RoundMismatch` if the submission is for another round.
    /// * `InvalidSubmission` for a zero index, an empty value, or a pairwise
    ///   secret whose peer is the owner itself.
    pub fn insert(&self, submission: ShareSubmission) -> Result<InsertOutcome, StorageError> {
        if submission.round != self.round {
            log::warn!(
                "Rejecting share from {} for round {} (current round {})",
                submission.client_id,
                submission.round,
                self.round
            );
            return Err(StorageError::RoundMismatch);
        }
        let ShareSubmission {
            client_id,
            target_id,
            share_index,
            share_value,
            secret_kind,
            ..
        } = submission;
        let share = Share::new(share_index, share_value).map_err(|_| StorageError::InvalidSubmission)?;
        self.insert_share(client_id, target_id, secret_kind, share)
    }

    /// Inserts every share of a client's contribution and registers its public key.
    ///
    /// All or nothing: every entry and the key are checked before anything is
    /// written, so a rejected contribution leaves the store untouched and can be
    /// resubmitted corrected.
    ///
    /// Returns the number of newly accepted shares.
    pub fn insert_client_share(&self, round: u64, contribution: ClientShare) -> Result<usize, StorageError> {
        if round != self.round {
            return Err(StorageError::RoundMismatch);
        }
        let ClientShare {
            client_id,
            public_key,
            shares,
        } = contribution;
        if public_key.as_ref().is_some_and(Vec::is_empty) {
            log::warn!("Rejecting contribution from {}: empty public key", client_id);
            return Err(StorageError::InvalidSubmission);
        }
        for entry in &shares {
            if let Err(e) = check_share(&client_id, &entry.secret_kind, &entry.share) {
                log::warn!(
                    "Rejecting contribution from {}: bad {} share for {}",
                    client_id,
                    entry.secret_kind,
                    entry.target_id
                );
                return Err(e);
            }
        }

        let mut by_holder = self.by_holder.write().unwrap_or_else(PoisonError::into_inner);
        let mut keys = self.public_keys.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = public_key {
            if !keys.contains_key(&client_id) {
                log::debug!("Public key registered for {}: {}", client_id, hex::encode(&key));
                keys.insert(client_id.clone(), key);
            }
        }
        let mut accepted = 0;
        for entry in shares {
            let outcome = put_share(&mut by_holder, client_id.clone(), entry.target_id, entry.secret_kind, entry.share);
            if outcome == InsertOutcome::Accepted {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    fn insert_share(
        &self,
        owner: ClientId,
        holder: ClientId,
        kind: SecretKind,
        share: Share,
    ) -> Result<InsertOutcome, StorageError> {
        check_share(&owner, &kind, &share)?;
        let mut by_holder = self.by_holder.write().unwrap_or_else(PoisonError::into_inner);
        Ok(put_share(&mut by_holder, owner, holder, kind, share))
    }

    /// Registers a client's public key; the first registration wins.
    pub fn register_public_key(&self, client: ClientId, key: Vec<u8>) -> Result<InsertOutcome, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidSubmission);
        }
        let mut keys = self.public_keys.write().unwrap_or_else(PoisonError::into_inner);
        if keys.contains_key(&client) {
            return Ok(InsertOutcome::Duplicate);
        }
        log::debug!("Public key registered for {}: {}", client, hex::encode(&key));
        keys.insert(client, key);
        Ok(InsertOutcome::Accepted)
    }

    /// Total number of stored shares.
    pub fn len(&self) -> usize {
        let by_holder = self.by_holder.read().unwrap_or_else(PoisonError::into_inner);
        by_holder.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every share and public key of the round.
    pub fn clear(&self) {
        self.by_holder.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.public_keys.write().unwrap_or_else(PoisonError::into_inner).clear();
        log::info!("Share store for round {} cleared", self.round);
    }
}

fn check_share(owner: &ClientId, kind: &SecretKind, share: &Share) -> Result<(), StorageError> {
    if share.index == 0 || share.value.is_empty() {
        return Err(StorageError::InvalidSubmission);
    }
    match kind {
        SecretKind::Pairwise(peer) if peer == owner => Err(StorageError::InvalidSubmission),
        _ => Ok(()),
    }
}

fn put_share(
    by_holder: &mut BTreeMap<ClientId, HolderShares>,
    owner: ClientId,
    holder: ClientId,
    kind: SecretKind,
    share: Share,
) -> InsertOutcome {
    let held = by_holder.entry(holder).or_default();
    let key = (owner, kind);
    if held.contains_key(&key) {
        log::debug!("Ignoring duplicate {} share from {}", key.1, key.0);
        return InsertOutcome::Duplicate;
    }
    held.insert(key, share);
    InsertOutcome::Accepted
}

impl ShareSource for RoundShareStore {
    fn shares_held_by(&self, holder: &ClientId) -> Result<Vec<StoredShare>, StorageError> {
        let by_holder = self.by_holder.read().unwrap_or_else(PoisonError::into_inner);
        Ok(by_holder
            .get(holder)
            .map(|held| {
                held.iter()
                    .map(|((owner, kind), share)| StoredShare {
                        owner: owner.clone(),
                        holder: holder.clone(),
                        kind: kind.clone(),
                        share: share.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn public_key(&self, client: &ClientId) -> Result<Option<Vec<u8>>, StorageError> {
        let keys = self.public_keys.read().unwrap_or_else(PoisonError::into_inner);
        Ok(keys.get(client).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn submission(owner: &str, holder: &str, index: u32, kind: SecretKind) -> ShareSubmission {
        ShareSubmission {
            round: 7,
            client_id: ClientId::from(owner),
            target_id: ClientId::from(holder),
            share_index: index,
            share_value: vec![index as u8; 4],
            secret_kind: kind,
        }
    }

    #[test]
    fn test_insert_and_read_back() {
        let store = RoundShareStore::new(7);
        assert_eq!(
            store.insert(submission("a", "b", 2, SecretKind::Individual)).unwrap(),
            InsertOutcome::Accepted
        );
        assert_eq!(
            store
                .insert(submission("a", "b", 2, SecretKind::Pairwise(ClientId::from("c"))))
                .unwrap(),
            InsertOutcome::Accepted
        );

        let held = store.shares_held_by(&ClientId::from("b")).unwrap();
        assert_eq!(held.len(), 2);
        assert!(held.iter().all(|s| s.owner.as_str() == "a" && s.holder.as_str() == "b"));
        assert!(store.shares_held_by(&ClientId::from("zz")).unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let store = RoundShareStore::new(7);
        store.insert(submission("a", "b", 2, SecretKind::Individual)).unwrap();

        let mut retry = submission("a", "b", 2, SecretKind::Individual);
        retry.share_value = vec![0xEE; 4];
        assert_eq!(store.insert(retry).unwrap(), InsertOutcome::Duplicate);

        let held = store.shares_held_by(&ClientId::from("b")).unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].share.value(), &[2, 2, 2, 2]);
    }

    #[test]
    fn test_rejections() {
        let store = RoundShareStore::new(7);

        let mut stale = submission("a", "b", 1, SecretKind::Individual);
        stale.round = 6;
        assert_eq!(store.insert(stale), Err(StorageError::RoundMismatch));

        assert_eq!(
            store.insert(submission("a", "b", 0, SecretKind::Individual)),
            Err(StorageError::InvalidSubmission)
        );
        assert_eq!(
            store.insert(submission("a", "b", 1, SecretKind::Pairwise(ClientId::from("a")))),
            Err(StorageError::InvalidSubmission)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_client_share_and_public_keys() {
        let store = RoundShareStore::new(1);
        let contribution = ClientShare {
            client_id: ClientId::from("a"),
            public_key: Some(vec![9; 32]),
            shares: vec![
                ShareEntry {
                    target_id: ClientId::from("b"),
                    secret_kind: SecretKind::Individual,
                    share: Share::new(1, vec![1]).unwrap(),
                },
                ShareEntry {
                    target_id: ClientId::from("c"),
                    secret_kind: SecretKind::Individual,
                    share: Share::new(2, vec![2]).unwrap(),
                },
            ],
        };
        assert_eq!(store.insert_client_share(1, contribution.clone()).unwrap(), 2);
        assert_eq!(store.insert_client_share(1, contribution).unwrap(), 0);
        assert_eq!(store.len(), 2);

        assert_eq!(store.public_key(&ClientId::from("a")).unwrap(), Some(vec![9; 32]));
        assert_eq!(
            store.register_public_key(ClientId::from("a"), vec![1; 32]).unwrap(),
            InsertOutcome::Duplicate
        );
        assert_eq!(store.public_key(&ClientId::from("a")).unwrap(), Some(vec![9; 32]));

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.public_key(&ClientId::from("a")).unwrap(), None);
    }

    #[test]
    fn test_rejected_client_share_writes_nothing() {
        let store = RoundShareStore::new(1);
        let entry = |target: &str, kind: SecretKind, share: Share| ShareEntry {
            target_id: ClientId::from(target),
            secret_kind: kind,
            share,
        };
        let mut contribution = ClientShare {
            client_id: ClientId::from("a"),
            public_key: Some(vec![9; 32]),
            shares: vec![
                entry("b", SecretKind::Individual, Share::new(1, vec![1]).unwrap()),
                entry("c", SecretKind::Individual, Share::new(2, vec![2]).unwrap()),
                // Pairwise secret with itself.
                entry("d", SecretKind::Pairwise(ClientId::from("a")), Share::new(3, vec![3]).unwrap()),
            ],
        };
        assert_eq!(
            store.insert_client_share(1, contribution.clone()),
            Err(StorageError::InvalidSubmission)
        );
        assert!(store.is_empty());
        assert_eq!(store.public_key(&ClientId::from("a")).unwrap(), None);

        // A zero index built around the constructor is caught too.
        let mut zero = contribution.clone();
        zero.shares[2] = entry("d", SecretKind::Individual, Share { index: 0, value: vec![3] });
        assert_eq!(store.insert_client_share(1, zero), Err(StorageError::InvalidSubmission));
        assert!(store.is_empty());

        contribution.shares[2] = entry("d", SecretKind::Individual, Share::new(3, vec![3]).unwrap());
        assert_eq!(store.insert_client_share(1, contribution).unwrap(), 3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.public_key(&ClientId::from("a")).unwrap(), Some(vec![9; 32]));
    }

    #[test]
    fn test_concurrent_at_most_once() {
        let store = Arc::new(RoundShareStore::new(7));
        let mut handles = Vec::new();

        // 8 threads all submit the same 20 shares.
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let mut accepted = 0;
                for owner in 0..20u32 {
                    let sub = submission(&format!("c{}", owner), "holder", owner + 1, SecretKind::Individual);
                    if store.insert(sub).unwrap() == InsertOutcome::Accepted {
                        accepted += 1;
                    }
                }
                accepted
            }));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 20);
        assert_eq!(store.len(), 20);
    }
}
