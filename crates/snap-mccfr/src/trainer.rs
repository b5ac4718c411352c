use crate::phase::Weighting;
use crate::policy::Policy;
use crate::profile::Profile;
use crate::store::RegretStore;
use crate::store::TableStore;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use snap_core::*;
use snap_nlhe::Abstractor;
use snap_nlhe::Action;
use snap_nlhe::Info;
use snap_nlhe::Rules;
use snap_nlhe::Spot;
use snap_nlhe::Turn;
use std::hash::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::time::Instant;

/// Blueprint training by external-sampling MCCFR.
///
/// Each epoch rotates the walker seat and runs a batch of independent
/// traversals against a snapshot of the shared store. The walker explores
/// every legal action, accumulating regret and average strategy mass at
/// its own infosets; every other seat samples a single action from its
/// current matched strategy and play follows only that branch; chance
/// deals once. Per-lane deltas land in private [`TableStore`]s and merge
/// in lane order, so a run is reproducible regardless of how the thread
/// pool schedules it.
///
/// Linear regret and strategy weighting come from the epoch discount
/// schedule rather than from scaling the immediate updates: writes land
/// unscaled and the mass already in the store decays by `t/(t+1)` per
/// epoch, which leaves epoch `s` carrying weight `s+1` relative to its
/// peers.
pub struct Trainer<G, S> {
    game: G,
    profile: Profile<S>,
}

impl<G, S> Trainer<G, S>
where
    G: Rules + Abstractor + Sync,
    S: RegretStore + Sync,
{
    pub fn new(game: G) -> Self
    where
        S: Default,
    {
        let players = game.root().players();
        let fingerprint = game.fingerprint();
        Self {
            game,
            profile: Profile::new(S::default(), players, fingerprint),
        }
    }
    /// Picks up training from a checkpointed profile.
    pub fn resume(game: G, profile: Profile<S>) -> Self {
        Self { game, profile }
    }
    /// Switches the run off the default linear weighting.
    pub fn weighting(mut self, weighting: Weighting) -> Self {
        self.profile = self.profile.weighting(weighting);
        self
    }
    pub fn profile(&self) -> &Profile<S> {
        &self.profile
    }
    pub fn into_profile(self) -> Profile<S> {
        self.profile
    }

    /// Runs epochs until the count is reached or the process is told to
    /// wind down, logging progress at a steady cadence.
    pub fn solve(&mut self, epochs: usize) {
        let mut clock = Instant::now();
        for _ in 0..epochs {
            if interrupted() {
                log::warn!("training interrupted at {}", self.profile);
                break;
            }
            self.batch();
            if clock.elapsed() > TRAINING_LOG_INTERVAL {
                log::info!("{}", self.profile);
                clock = Instant::now();
            }
        }
    }

    /// One epoch: a parallel batch of traversals, merged in lane order,
    /// followed by the epoch's discount push.
    pub fn batch(&mut self) {
        let deltas = (0..CFR_BATCH_SIZE)
            .into_par_iter()
            .map(|lane| self.step(lane))
            .collect::<Vec<_>>();
        for delta in deltas {
            self.profile.store_mut().absorb(delta);
        }
        self.profile.advance();
    }

    /// One traversal from an undealt root, producing this lane's delta.
    fn step(&self, lane: usize) -> TableStore {
        let mut delta = TableStore::default();
        let ref mut rng = self.rng(lane);
        let ref root = self.game.root();
        self.descend(root, &mut delta, rng);
        delta
    }

    /// Lanes draw from disjoint reproducible streams: the same epoch and
    /// lane always deal and sample identically.
    fn rng(&self, lane: usize) -> SmallRng {
        let ref mut hasher = DefaultHasher::new();
        self.profile.epochs().hash(hasher);
        lane.hash(hasher);
        SmallRng::seed_from_u64(hasher.finish())
    }

    /// The infoset key of the spot's acting seat.
    fn recall(&self, spot: &Spot) -> Info {
        let seat = spot.turn().position();
        Info::new(
            self.game.version(),
            spot.street(),
            self.game.bucket(spot, seat),
            spot.path(),
        )
    }

    /// Current strategy over the game's menu, matched against the shared
    /// store's regrets. Rows not yet witnessed match on the per-action
    /// bias instead, so the earliest epochs play the seeded prior rather
    /// than uniform.
    fn matched(&self, info: &Info, menu: &[Action]) -> Policy {
        let store = self.profile.store();
        let mass = if store.contains(info) {
            menu.iter().map(|a| store.regret(info, a)).collect()
        } else {
            menu.iter().map(Action::bias).collect()
        };
        Policy::matched(menu.to_vec(), mass)
    }

    /// The walker's actions surviving negative-regret pruning. A row whose
    /// every action sits below the threshold keeps them all: pruning may
    /// narrow exploration, never extinguish it.
    fn unpruned(&self, info: &Info, menu: &[Action]) -> Vec<Action> {
        let threshold = self.profile.threshold();
        let store = self.profile.store();
        if store.should_prune(info, threshold) {
            menu.to_vec()
        } else {
            menu.iter()
                .copied()
                .filter(|a| store.regret(info, a) >= threshold)
                .collect()
        }
    }

    /// Walker utility of the subtree under `spot`.
    fn descend(&self, spot: &Spot, delta: &mut TableStore, rng: &mut SmallRng) -> Utility {
        let walker = self.profile.walker();
        match spot.turn() {
            Turn::Terminal => self.game.payoff(spot, walker),
            Turn::Chance => self.descend(&self.game.chance(spot, rng), delta, rng),
            Turn::Choice(seat) if seat == walker => self.explore(spot, delta, rng),
            Turn::Choice(_) => self.follow(spot, delta, rng),
        }
    }

    /// Walker node: explore every unpruned action, accumulate per-action
    /// regret against the node value, credit the matched strategy into
    /// the average, and record the node value for frontier lookups.
    /// Frozen epochs keep exploring but stop moving the average.
    fn explore(&self, spot: &Spot, delta: &mut TableStore, rng: &mut SmallRng) -> Utility {
        let ref info = self.recall(spot);
        let menu = self.game.choices(spot);
        let policy = self.matched(info, &menu);
        let explored = self.unpruned(info, &menu);
        let utilities = explored
            .iter()
            .map(|a| self.descend(&spot.apply(*a), delta, rng))
            .collect::<Vec<_>>();
        let value = explored
            .iter()
            .zip(utilities.iter())
            .map(|(a, u)| policy.density(a) * u)
            .sum::<Utility>();
        delta.reserve(info, &menu);
        if !self.profile.phase().freezes() {
            for action in &menu {
                delta.add_weight(info, action, policy.density(action));
            }
        }
        for (ref action, utility) in explored.into_iter().zip(utilities) {
            delta.add_regret(info, action, utility - value);
            delta.add_evalue(info, action, value);
            delta.add_counts(info, action, 1);
        }
        value
    }

    /// Opponent node: sample one action from the current strategy and
    /// follow only that branch. Nothing accumulates here; both regret
    /// and average strategy grow at walker nodes.
    ///
    /// The draw comes from the profile's (epoch, infoset) stream rather
    /// than the lane stream, so replaying an epoch after a crash samples
    /// the same opponent lines no matter how lanes were scheduled.
    fn follow(&self, spot: &Spot, delta: &mut TableStore, rng: &mut SmallRng) -> Utility {
        let ref info = self.recall(spot);
        let menu = self.game.choices(spot);
        let ref mut seeded = self.profile.rng(info);
        let ref action = self.matched(info, &menu).sample(seeded);
        self.descend(&spot.apply(*action), delta, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use snap_nlhe::Bucket;
    use snap_nlhe::Micro;
    use snap_nlhe::Odds;
    use snap_nlhe::Path;
    use snap_nlhe::Street;

    fn rows<S: RegretStore>(store: &S) -> Vec<(Info, Vec<(Action, Memory)>)> {
        store.scan().collect()
    }

    #[test]
    fn identical_runs_produce_identical_stores() {
        let mut a = Trainer::<Micro, TableStore>::new(Micro::default());
        let mut b = Trainer::<Micro, TableStore>::new(Micro::default());
        a.solve(2);
        b.solve(2);
        assert!(!a.profile().store().is_empty());
        assert_eq!(rows(a.profile().store()), rows(b.profile().store()));
    }

    #[test]
    fn constant_weighting_changes_accumulation_but_not_play() {
        let mut linear = Trainer::<Micro, TableStore>::new(Micro::default());
        let mut constant =
            Trainer::<Micro, TableStore>::new(Micro::default()).weighting(Weighting::Constant);
        linear.solve(2);
        constant.solve(2);
        // same seeds walk the same trees; regret matching is scale
        // invariant, so only the accumulated magnitudes may differ
        let linear = rows(linear.profile().store());
        let constant = rows(constant.profile().store());
        assert_eq!(
            linear.iter().map(|(info, _)| info).collect::<Vec<_>>(),
            constant.iter().map(|(info, _)| info).collect::<Vec<_>>(),
        );
        assert_ne!(linear, constant);
    }

    #[test]
    fn average_strategy_accrues_beside_the_walkers_regrets() {
        let mut trainer = Trainer::<Micro, TableStore>::new(Micro::default());
        trainer.batch();
        let store = trainer.profile().store();
        assert!(!store.is_empty());
        for (_, row) in store.scan() {
            let explored = row.iter().map(|(_, m)| m.counts).sum::<u32>();
            let mass = row.iter().map(|(_, m)| m.weight).sum::<Probability>();
            assert!(explored > 0, "rows exist only where the walker explored");
            assert!(mass > 0.0, "every explored row carries strategy mass");
        }
        assert!(store.scan().any(|(_, row)| row.iter().any(|(_, m)| m.regret != 0.0)));
    }

    #[test]
    fn pruned_actions_are_left_untouched() {
        let game = Micro::default();
        let ref info = Info::new(
            game.version(),
            Street::Pref,
            Bucket::from(0),
            Path::default(),
        );
        let menu = vec![
            Action::Fold,
            Action::Call,
            Action::Raise(Odds::new(1, 1)),
            Action::Shove,
        ];
        let mut store = TableStore::default();
        store.reserve(info, &menu);
        store.add_regret(info, &Action::Fold, -10_000.0);
        store.add_regret(info, &Action::Call, 100.0);
        store.add_regret(info, &Action::Raise(Odds::new(1, 1)), 100.0);
        store.add_regret(info, &Action::Shove, 100.0);
        let profile = Profile::reload(store, PRUNING_WARMUP, 2, game.fingerprint());
        assert!(profile.threshold() > -10_000.0);
        let mut trainer = Trainer::resume(game, profile);
        trainer.batch();
        let store = trainer.profile().store();
        assert_eq!(store.regret(info, &Action::Fold), -10_000.0);
        assert_ne!(store.regret(info, &Action::Call), 100.0);
    }

    #[test]
    fn unseen_rows_match_on_the_witness_bias() {
        let trainer = Trainer::<Micro, TableStore>::new(Micro::default());
        let game = Micro::default();
        let ref info = Info::new(
            game.version(),
            Street::Pref,
            Bucket::from(3),
            Path::default(),
        );
        let menu = vec![Action::Fold, Action::Call, Action::Shove];
        let policy = trainer.matched(info, &menu);
        assert!(policy.density(&Action::Fold) > policy.density(&Action::Call));
        assert!(policy.density(&Action::Call) > policy.density(&Action::Shove));
    }

    #[test]
    fn frozen_epochs_explore_without_moving_the_average() {
        let mut trainer = Trainer::<Micro, TableStore>::new(Micro::default());
        trainer.solve(4);
        let profile = Profile::reload(
            trainer.profile().store().clone(),
            FREEZE_HORIZON,
            2,
            Micro::default().fingerprint(),
        );
        let mut trainer = Trainer::resume(Micro::default(), profile);
        let before = rows(trainer.profile().store());
        trainer.batch();
        let after = rows(trainer.profile().store());
        let weights = |rows: &[(Info, Vec<(Action, Memory)>)]| {
            rows.iter()
                .flat_map(|(info, row)| row.iter().map(move |(a, m)| ((*info, *a), m.weight)))
                .collect::<std::collections::BTreeMap<_, _>>()
        };
        let frozen = weights(&after);
        for (key, weight) in weights(&before) {
            assert_eq!(frozen.get(&key), Some(&weight));
        }
        assert_ne!(before, after);
    }
}
