//! Round-scoped working set of the reconstruction engine.
//!
//! The store indexes shares by holder (the live client that uploaded them).
//! Reconstruction needs them by owner, so the arena pulls every live holder's
//! shares once and regroups them per dropped owner and secret kind. Shares of
//! live owners are never copied in. The whole arena is dropped in one piece
//! when the engine finishes; share values are zeroized on drop.

use std::collections::BTreeMap;

use super::roster::{ClientId, ClientRoster};
use crate::mpc::share::Share;
use crate::storage::{SecretKind, ShareSource, StorageError};

/// A share together with the peer that held it.
#[derive(Debug, Clone)]
pub struct HeldShare {
    pub holder: ClientId,
    pub share: Share,
}

pub type OwnerSecrets = BTreeMap<SecretKind, Vec<HeldShare>>;

/// Shares of dropped clients, grouped by owner, plus live clients' public keys.
#[derive(Debug, Default)]
pub struct ShareArena {
    by_owner: BTreeMap<ClientId, OwnerSecrets>,
    public_keys: BTreeMap<ClientId, Vec<u8>>,
}

impl ShareArena {
    /// Pulls the shares held by every live client.
    pub fn collect<S: ShareSource + ?Sized>(store: &S, roster: &ClientRoster) -> Result<Self, StorageError> {
        let mut arena = Self::default();
        for holder in roster.live() {
            for stored in store.shares_held_by(holder)? {
                if !roster.is_dropped(&stored.owner) {
                    continue;
                }
                arena
                    .by_owner
                    .entry(stored.owner)
                    .or_default()
                    .entry(stored.kind)
                    .or_default()
                    .push(HeldShare {
                        holder: stored.holder,
                        share: stored.share,
                    });
            }
            if let Some(key) = store.public_key(holder)? {
                arena.public_keys.insert(holder.clone(), key);
            }
        }
        log::debug!(
            "Collected {} shares of {} dropped clients from {} live holders",
            arena.share_count(),
            arena.by_owner.len(),
            roster.live_count()
        );
        Ok(arena)
    }

    /// All collected secrets of `owner`.
    pub fn secrets_of(&self, owner: &ClientId) -> Option<&OwnerSecrets> {
        self.by_owner.get(owner)
    }

    /// Shares of one secret of `owner`; empty if none were collected.
    pub fn shares(&self, owner: &ClientId, kind: &SecretKind) -> &[HeldShare] {
        self.by_owner
            .get(owner)
            .and_then(|secrets| secrets.get(kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn public_key(&self, client: &ClientId) -> Option<&[u8]> {
        self.public_keys.get(client).map(Vec::as_slice)
    }

    pub fn share_count(&self) -> usize {
        self.by_owner
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }
}
