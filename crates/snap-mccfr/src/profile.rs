use crate::phase::Phase;
use crate::phase::Weighting;
use crate::policy::Policy;
use crate::store::RegretStore;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use snap_core::*;
use snap_nlhe::Fingerprint;
use snap_nlhe::Info;
use std::hash::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

/// One training run's accumulated state: the regret store plus the epoch
/// counter that drives walker rotation, the phase schedule, and the lazy
/// discount pushes. Tagged with the abstraction fingerprint it was
/// trained under so checkpoints can refuse to resume against a rebuilt
/// abstraction.
#[derive(Debug, Clone)]
pub struct Profile<S> {
    store: S,
    epochs: usize,
    players: usize,
    fingerprint: Fingerprint,
    weighting: Weighting,
}

impl<S: RegretStore> Profile<S> {
    pub fn new(store: S, players: usize, fingerprint: Fingerprint) -> Self {
        Self {
            store,
            epochs: 0,
            players,
            fingerprint,
            weighting: Weighting::default(),
        }
    }
    /// Reassembles a profile from checkpointed parts. The weighting is a
    /// caller configuration, not checkpoint state; set it again when
    /// resuming a constant-weighted run.
    pub fn reload(store: S, epochs: usize, players: usize, fingerprint: Fingerprint) -> Self {
        Self {
            store,
            epochs,
            players,
            fingerprint,
            weighting: Weighting::default(),
        }
    }
    /// Switches how epochs are weighted relative to each other.
    pub fn weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
    pub fn epochs(&self) -> usize {
        self.epochs
    }
    pub fn players(&self) -> usize {
        self.players
    }
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
    pub fn phase(&self) -> Phase {
        Phase::from(self.epochs)
    }
    /// Negative-regret pruning threshold for the current epoch.
    pub fn threshold(&self) -> Utility {
        Phase::threshold(self.epochs)
    }
    /// The seat whose regrets this epoch updates.
    pub fn walker(&self) -> Position {
        self.epochs % self.players
    }

    /// A reproducible stream for one infoset visit: same epoch and same
    /// infoset always sample the same way, across threads and restarts.
    pub fn rng(&self, info: &Info) -> SmallRng {
        let ref mut hasher = DefaultHasher::new();
        self.epochs.hash(hasher);
        info.hash(hasher);
        SmallRng::seed_from_u64(hasher.finish())
    }

    /// Closes out the current epoch: compounds its discount factors into
    /// the store, then moves the counter. Frozen epochs push nothing, the
    /// average strategy no longer moves; constant weighting never pushes
    /// at all.
    pub fn advance(&mut self) {
        let phase = self.phase();
        if self.weighting == Weighting::Linear && !phase.freezes() {
            let (regret, weight) = Phase::discounts(self.epochs);
            self.store.discount(regret, weight);
        }
        self.epochs += 1;
    }

    pub fn policy(&self, info: &Info) -> Policy {
        self.store.policy(info)
    }
    pub fn advice(&self, info: &Info) -> Policy {
        self.store.advice(info)
    }
    pub fn frontier(&self, info: &Info) -> Option<Utility> {
        self.store.frontier(info)
    }
}

impl<S: RegretStore> std::fmt::Display for Profile<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "epoch {:>8} ({:?}) over {} infosets",
            self.epochs,
            self.phase(),
            self.store.len(),
        )
    }
}
