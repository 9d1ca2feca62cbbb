//! Mask reconstruction engine.
//!
//! One engine instance serves one round. It freezes the roster, pulls the
//! shares held by live clients, and for every dropped client reconstructs the
//! mask seeds it left behind and expands them into a noise vector.
//!
//! For a dropped client `c` the noise is
//! `DeriveNoise(s_c) + sum over live q of Sign(c, q) * DeriveNoise(s_cq)`,
//! where `s_c` is its individual seed and `s_cq` the pairwise seed with `q`.
//! A pairwise seed is taken from its own shares when `c` shared it directly,
//! otherwise it is agreed from `c`'s reconstructed agreement key and `q`'s
//! public key. Under `EncryptType::PwEncrypt` every live peer must be covered
//! one way or the other; other encrypt types skip peers without either.
//!
//! Any failure aborts the round. Aborted and finished engines are terminal;
//! a retry builds a new engine over the same parameters.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use zeroize::Zeroizing;

use super::arena::{HeldShare, ShareArena};
use super::mask::{apply_signed, sign, MaskSign};
use super::noise::{Blake3NoiseDeriver, KeyAgreement, NoiseDeriver, X25519Agreement};
use super::roster::{ClientId, ClientRoster};
use super::state_machine::{RoundObserver, RoundState, RoundStateMachine};
use super::ReconstructError;
use crate::core::SEED_LEN;
use crate::mpc::share::Share;
use crate::mpc::reconstruct::reconstruct_checked;
use crate::mpc::{MpcError, ShamirPrimeField};
use crate::params::{EncryptType, ProtocolParameters};
use crate::storage::{SecretKind, ShareSource};

/// Reconstructed noise per dropped client, in id order.
pub type NoiseMap = BTreeMap<ClientId, Vec<f32>>;

struct EngineState {
    machine: RoundStateMachine,
    roster: Option<ClientRoster>,
}

/// Per-round reconstruction engine.
pub struct ReconstructionEngine<'p, D = Blake3NoiseDeriver, K = X25519Agreement> {
    params: &'p ProtocolParameters,
    scheme: ShamirPrimeField,
    deriver: D,
    agreement: K,
    inner: Mutex<EngineState>,
}

impl<'p> ReconstructionEngine<'p> {
    /// Engine with the BLAKE3 noise deriver and X25519 key agreement.
    pub fn new(params: &'p ProtocolParameters) -> Self {
        Self::with_capabilities(params, Blake3NoiseDeriver, X25519Agreement)
    }
}

impl<'p, D: NoiseDeriver, K: KeyAgreement> ReconstructionEngine<'p, D, K> {
    pub fn with_capabilities(params: &'p ProtocolParameters, deriver: D, agreement: K) -> Self {
        Self {
            params,
            scheme: ShamirPrimeField::new(params.field().clone(), SEED_LEN),
            deriver,
            agreement,
            inner: Mutex::new(EngineState {
                machine: RoundStateMachine::new(),
                roster: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RoundState {
        self.lock().machine.state()
    }

    pub fn add_observer(&self, observer: Box<dyn RoundObserver>) {
        self.lock().machine.add_observer(observer);
    }

    /// Freezes the roster (Idle -> CollectingShares).
    ///
    /// Freezing the same roster again is a no-op while shares are collected.
    ///
    /// # Errors
    /// * `InsufficientClients` if fewer than `reconstruct_clients_num_need`
    ///   clients are live; the round is aborted.
    /// * `InvalidRoster` if a different roster is already frozen.
    /// * `InvalidState` once reconstruction started or the round ended.
    pub fn freeze_roster(&self, roster: &ClientRoster) -> Result<(), ReconstructError> {
        let mut inner = self.lock();
        match inner.machine.state() {
            RoundState::Idle => {
                let required = self.params.reconstruct_clients_num_need();
                if roster.live_count() < required {
                    log::error!(
                        "Aborting round: {} live clients, {} required",
                        roster.live_count(),
                        required
                    );
                    inner.machine.abort()?;
                    return Err(ReconstructError::InsufficientClients {
                        live: roster.live_count(),
                        required,
                    });
                }
                inner.machine.start_collecting()?;
                inner.roster = Some(roster.clone());
                Ok(())
            }
            RoundState::CollectingShares => match &inner.roster {
                Some(frozen) if frozen == roster => Ok(()),
                _ => Err(ReconstructError::InvalidRoster { client: None }),
            },
            found => Err(ReconstructError::InvalidState {
                expected: RoundState::Idle,
                found,
            }),
        }
    }

    /// Reconstructs the noise of every dropped client.
    ///
    /// Runs at most once per engine: concurrent or repeated callers get
    /// `InvalidState` and leave the round untouched. A finished or aborted
    /// engine stays that way, so retrying a round (after more shares arrived,
    /// or after a failure) means building a new engine over the same
    /// parameters; given the same roster and shares it returns bit-identical
    /// noise.
    pub fn reconstruct<S: ShareSource + ?Sized>(
        &self,
        roster: &ClientRoster,
        store: &S,
    ) -> Result<NoiseMap, ReconstructError> {
        self.freeze_roster(roster)?;

        let arena = match ShareArena::collect(store, roster) {
            Ok(arena) => arena,
            Err(err) => {
                let mut inner = self.lock();
                if inner.machine.state() == RoundState::CollectingShares {
                    log::error!("Aborting round: share store read failed: {}", err);
                    inner.machine.abort()?;
                }
                return Err(err.into());
            }
        };

        self.lock().machine.start_reconstructing()?;

        let result = self.recover_all(roster, &arena);
        drop(arena);

        let mut inner = self.lock();
        match result {
            Ok(noise) => {
                inner.machine.finish()?;
                log::info!("Reconstructed noise of {} dropped clients", noise.len());
                Ok(noise)
            }
            Err(err) => {
                log::error!("Aborting round: {}", err);
                inner.machine.abort()?;
                Err(err)
            }
        }
    }

    fn recover_all(&self, roster: &ClientRoster, arena: &ShareArena) -> Result<NoiseMap, ReconstructError> {
        let mut noise = NoiseMap::new();
        for client in roster.dropped() {
            let vector = self.recover_client(client, roster, arena)?;
            noise.insert(client.clone(), vector);
        }
        Ok(noise)
    }

    fn recover_client(
        &self,
        client: &ClientId,
        roster: &ClientRoster,
        arena: &ShareArena,
    ) -> Result<Vec<f32>, ReconstructError> {
        let mut acc = vec![0.0f32; self.params.featuremap()];

        let seed = self.recover_seed(client, &SecretKind::Individual, arena)?;
        self.accumulate(client, &mut acc, &seed, MaskSign::Positive)?;

        let mut covered = BTreeSet::new();
        let pairwise_peers = arena
            .secrets_of(client)
            .into_iter()
            .flat_map(|secrets| secrets.keys())
            .filter_map(|kind| match kind {
                SecretKind::Pairwise(peer) => Some(peer),
                _ => None,
            });
        for peer in pairwise_peers {
            if !roster.is_live(peer) {
                log::debug!("Skipping pairwise seed of {} with dropped peer {}", client, peer);
                continue;
            }
            let seed = self.recover_seed(client, &SecretKind::Pairwise(peer.clone()), arena)?;
            self.accumulate(client, &mut acc, &seed, sign(client, peer))?;
            covered.insert(peer);
        }

        let uncovered: Vec<&ClientId> = roster
            .live()
            .iter()
            .filter(|peer| !covered.contains(peer) && *peer != client)
            .collect();
        let Some(first_uncovered) = uncovered.first() else {
            log::debug!("Recovered noise of dropped client {}", client);
            return Ok(acc);
        };

        let required = self.params.encrypt_type() == EncryptType::PwEncrypt;
        if arena.shares(client, &SecretKind::AgreementKey).is_empty() {
            if required {
                log::warn!("No pairwise or agreement-key shares of {} for live peer {}", client, first_uncovered);
                return Err(ReconstructError::ThresholdNotMet {
                    client: client.clone(),
                    kind: SecretKind::Pairwise((*first_uncovered).clone()),
                    available: 0,
                    required: self.params.t(),
                });
            }
            log::debug!("No pairwise masks of {} with {} live peers", client, uncovered.len());
        } else {
            let secret = self.recover_seed(client, &SecretKind::AgreementKey, arena)?;
            for peer in uncovered {
                let Some(public) = arena.public_key(peer) else {
                    if required {
                        log::warn!("No public key for {}, cannot agree the mask of {}", peer, client);
                        return Err(ReconstructError::NoiseDerivationFailed { client: client.clone() });
                    }
                    log::debug!("No public key for {}, no agreed mask with {}", peer, client);
                    continue;
                };
                let seed = self.agreement.agree(&secret, public).map_err(|err| {
                    log::warn!("Key agreement of {} with {} failed: {}", client, peer, err);
                    ReconstructError::NoiseDerivationFailed { client: client.clone() }
                })?;
                self.accumulate(client, &mut acc, &seed[..], sign(client, peer))?;
            }
        }

        log::debug!("Recovered noise of dropped client {}", client);
        Ok(acc)
    }

    /// Reconstructs one secret of `owner` from the shares live peers hold.
    ///
    /// Shares that are not canonical field elements, and every share of an
    /// index claimed by more than one holder, are excluded before
    /// interpolation. Beyond `t` shares, those off the polynomial the others
    /// agree on are excluded too.
    fn recover_seed(
        &self,
        owner: &ClientId,
        kind: &SecretKind,
        arena: &ShareArena,
    ) -> Result<Zeroizing<Vec<u8>>, ReconstructError> {
        let t = self.params.t();
        let held = arena.shares(owner, kind);

        let mut first_fault = None;
        let mut usable: Vec<&HeldShare> = Vec::with_capacity(held.len());
        for entry in held {
            match entry.share.element(self.scheme.field()) {
                Ok(_) => usable.push(entry),
                Err(reason) => {
                    log::warn!(
                        "Excluding share {} of {} secret of {} held by {}: {}",
                        entry.share.index,
                        kind,
                        owner,
                        entry.holder,
                        reason
                    );
                    first_fault.get_or_insert(reason);
                }
            }
        }

        let mut index_count: BTreeMap<u32, usize> = BTreeMap::new();
        for entry in &usable {
            *index_count.entry(entry.share.index).or_default() += 1;
        }
        usable.retain(|entry| {
            let unique = index_count[&entry.share.index] == 1;
            if !unique {
                log::warn!(
                    "Excluding share {} of {} secret of {} held by {}: index reused",
                    entry.share.index,
                    kind,
                    owner,
                    entry.holder
                );
                first_fault.get_or_insert(MpcError::DuplicateShareIndex);
            }
            unique
        });

        if usable.len() < t {
            return Err(match first_fault {
                Some(reason) => ReconstructError::MalformedShare {
                    client: owner.clone(),
                    kind: kind.clone(),
                    reason,
                },
                None => ReconstructError::ThresholdNotMet {
                    client: owner.clone(),
                    kind: kind.clone(),
                    available: usable.len(),
                    required: t,
                },
            });
        }

        usable.sort_by_key(|entry| entry.share.index);
        let shares: Vec<Share> = usable.iter().map(|entry| entry.share.clone()).collect();
        let recovered = reconstruct_checked(self.scheme.field(), &shares, t, self.scheme.secret_len()).map_err(
            |reason| {
                log::warn!("Cannot reconstruct {} secret of {}: {}", kind, owner, reason);
                ReconstructError::MalformedShare {
                    client: owner.clone(),
                    kind: kind.clone(),
                    reason,
                }
            },
        )?;
        for entry in usable.iter().filter(|entry| recovered.rejected.contains(&entry.share.index)) {
            log::warn!(
                "Excluding share {} of {} secret of {} held by {}: off the shared polynomial",
                entry.share.index,
                kind,
                owner,
                entry.holder
            );
        }
        Ok(recovered.secret)
    }

    fn accumulate(
        &self,
        client: &ClientId,
        acc: &mut [f32],
        seed: &[u8],
        mask_sign: MaskSign,
    ) -> Result<(), ReconstructError> {
        let failed = || ReconstructError::NoiseDerivationFailed { client: client.clone() };
        let noise = self.deriver.derive_noise(seed, acc.len()).map_err(|err| {
            log::warn!("Noise derivation for {} failed: {}", client, err);
            failed()
        })?;
        apply_signed(acc, &noise, mask_sign).map_err(|err| {
            log::warn!("Noise derivation for {} failed: {}", client, err);
            failed()
        })
    }
}
