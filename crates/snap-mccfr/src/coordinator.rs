use crate::error::SolverError;
use crate::error::SolverResult;
use crate::policy::Policy;
use crate::profile::Profile;
use crate::resolver::Resolver;
use crate::store::RegretStore;
use crate::subgame::Restriction;
use rand::rngs::SmallRng;
use snap_core::*;
use snap_nlhe::Abstractor;
use snap_nlhe::Info;
use snap_nlhe::Range;
use snap_nlhe::Rules;
use snap_nlhe::Runout;
use snap_nlhe::Spot;
use snap_nlhe::Turn;
use std::sync::mpsc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;
use std::time::Instant;

/// Fans one live decision out over several sampled run-outs.
///
/// Each run-out gets its own resolver on its own thread, holding a
/// private scratch store copied from nothing but the shared read-only
/// blueprint. Per-action probabilities are averaged across every resolve
/// that converged before the shared deadline; stragglers are abandoned
/// at the join, and if nothing converged the blueprint strategy comes
/// back instead.
pub struct Coordinator<'a, G, S> {
    game: &'a G,
    blueprint: &'a Profile<S>,
    restriction: Restriction,
    least: usize,
    most: usize,
    kappa: Option<Energy>,
    samples: usize,
    fallbacks: u32,
}

impl<'a, G, S> Coordinator<'a, G, S>
where
    G: Rules + Abstractor + Sync,
    S: RegretStore + Sync,
{
    pub fn new(game: &'a G, blueprint: &'a Profile<S>) -> Self {
        Self {
            game,
            blueprint,
            restriction: Restriction::default(),
            least: SUBGAME_MIN_ITERATIONS,
            most: SUBGAME_MAX_ITERATIONS,
            kappa: None,
            samples: RUNOUT_SAMPLES,
            fallbacks: 0,
        }
    }

    /// How aggressively the per-run-out subgames trim raise families.
    pub fn restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = restriction;
        self
    }

    /// Iteration floor and ceiling for each per-run-out resolve.
    pub fn iterations(mut self, least: usize, most: usize) -> Self {
        self.least = least;
        self.most = most;
        self
    }

    /// Overrides the per-street KL weights with one fixed value.
    pub fn regularization(mut self, kappa: Energy) -> Self {
        self.kappa = Some(kappa);
        self
    }

    /// Number of run-outs to sample and resolve.
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }

    /// Decisions that came back as the bare blueprint because no
    /// resolve converged in time.
    pub fn fallbacks(&self) -> u32 {
        self.fallbacks
    }

    /// Resolves the decision at `root` across sampled run-outs within
    /// one shared wall-clock budget, averaging the converged strategies.
    pub fn advise(
        &mut self,
        root: Spot,
        ranges: &[Range],
        budget: Duration,
        rng: &mut SmallRng,
    ) -> SolverResult<Policy> {
        let deadline = Instant::now() + budget;
        let hero = match root.turn() {
            Turn::Choice(seat) => seat,
            _ => return Err(SolverError::NoDecision),
        };
        let runouts = (0..self.samples)
            .map(|_| self.game.runout(&root, rng))
            .collect::<Vec<_>>();
        let mut resolved = self.fan_out(root, ranges, runouts, deadline);
        resolved.sort_by_key(|(slot, _)| *slot);
        if resolved.is_empty() {
            self.fallbacks += 1;
            log::warn!("no run-out resolved in time, advising the blueprint");
            return Ok(self.shelter(&root, hero));
        }
        log::debug!("averaging {} of {} run-outs", resolved.len(), self.samples);
        Ok(Self::merge(resolved))
    }

    /// Spawns one worker per lane, round-robins the run-outs across
    /// them, and collects whatever converges before the deadline. The
    /// join itself stays bounded because every resolve watches the same
    /// deadline from the inside.
    fn fan_out(
        &self,
        root: Spot,
        ranges: &[Range],
        runouts: Vec<Runout>,
        deadline: Instant,
    ) -> Vec<(usize, Policy)> {
        let lanes = self.samples.min(num_cpus::get()).max(1);
        let game = self.game;
        let blueprint = self.blueprint;
        let restriction = self.restriction;
        let (least, most, kappa) = (self.least, self.most, self.kappa);
        let (tx, rx) = mpsc::channel();
        std::thread::scope(|scope| {
            for lane in 0..lanes {
                let tx = tx.clone();
                let assigned = runouts
                    .iter()
                    .enumerate()
                    .skip(lane)
                    .step_by(lanes)
                    .map(|(slot, runout)| (slot, runout.clone()))
                    .collect::<Vec<_>>();
                scope.spawn(move || {
                    let mut resolver = Resolver::new(game, blueprint)
                        .restriction(restriction)
                        .iterations(least, most);
                    if let Some(kappa) = kappa {
                        resolver = resolver.regularization(kappa);
                    }
                    for (slot, runout) in assigned {
                        let budget = deadline.saturating_duration_since(Instant::now());
                        if budget.is_zero() {
                            break;
                        }
                        match resolver.resolve(root, runout, ranges, budget) {
                            Ok(outcome) if !outcome.is_fallback() => {
                                let _ = tx.send((slot, outcome.policy().clone()));
                            }
                            Ok(_) | Err(_) => {}
                        }
                    }
                });
            }
            drop(tx);
            let mut collected = Vec::new();
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(remaining) {
                    Ok(result) => collected.push(result),
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            collected
        })
    }

    /// Per-action average over the converged strategies. Every resolve
    /// froze the same root menu, so supports line up slot for slot.
    fn merge(resolved: Vec<(usize, Policy)>) -> Policy {
        let menu = resolved[0].1.support();
        let mass = menu
            .iter()
            .map(|action| resolved.iter().map(|(_, p)| p.density(action)).sum())
            .collect::<Vec<Probability>>();
        Policy::matched(menu, mass)
    }

    /// The blueprint's strategy at the live decision, uniform when the
    /// infoset was never trained.
    fn shelter(&self, root: &Spot, hero: Position) -> Policy {
        let ref info = Info::new(
            self.game.version(),
            root.street(),
            self.game.bucket(root, hero),
            root.path(),
        );
        let stored = self.blueprint.advice(info);
        if stored.is_empty() {
            Policy::uniform(self.game.choices(root))
        } else {
            stored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;
    use rand::SeedableRng;
    use snap_nlhe::Action;
    use snap_nlhe::Card;
    use snap_nlhe::Hole;
    use snap_nlhe::Micro;

    fn live() -> Spot {
        Micro::default()
            .root()
            .with_hole(0, Hole::from(Card::from(0u8)))
            .with_next(0)
    }

    fn blueprint(game: &Micro, root: &Spot) -> Profile<TableStore> {
        let ref info = Info::new(
            game.version(),
            root.street(),
            game.bucket(root, 0),
            root.path(),
        );
        let menu = game.choices(root);
        let mut store = TableStore::default();
        store.reserve(info, &menu);
        store.add_weight(info, &menu[0], 1.0);
        store.add_weight(info, &menu[1], 4.0);
        store.add_weight(info, &menu[2], 4.8);
        store.add_weight(info, &menu[3], 0.2);
        Profile::new(store, 2, game.fingerprint())
    }

    #[test]
    fn averaged_advice_is_a_distribution_over_the_frozen_menu() {
        let game = Micro::default();
        let root = live();
        let blueprint = blueprint(&game, &root);
        let ref ranges = vec![game.range(&root), game.range(&root)];
        let ref mut rng = SmallRng::seed_from_u64(7);
        let mut coordinator = Coordinator::new(&game, &blueprint)
            .samples(3)
            .iterations(16, 32);
        let advice = coordinator
            .advise(root, ranges, Duration::from_secs(5), rng)
            .unwrap();
        assert_eq!(advice.support(), game.choices(&root));
        let total = advice.weights().iter().map(|(_, p)| p).sum::<Probability>();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(advice.density(&Action::Shove) > 0.0);
        assert_eq!(coordinator.fallbacks(), 0);
    }

    #[test]
    fn zero_budget_advises_the_blueprint() {
        let game = Micro::default();
        let root = live();
        let blueprint = blueprint(&game, &root);
        let ref info = Info::new(
            game.version(),
            root.street(),
            game.bucket(&root, 0),
            root.path(),
        );
        let ref ranges = vec![game.range(&root), game.range(&root)];
        let ref mut rng = SmallRng::seed_from_u64(8);
        let mut coordinator = Coordinator::new(&game, &blueprint).samples(2);
        let advice = coordinator
            .advise(root, ranges, Duration::ZERO, rng)
            .unwrap();
        let ref expected = blueprint.advice(info);
        assert_eq!(advice.weights(), expected.weights());
        assert_eq!(coordinator.fallbacks(), 1);
    }

    #[test]
    fn settled_spots_cannot_be_advised() {
        let game = Micro::default();
        let folded = live().apply(Action::Fold);
        let blueprint = blueprint(&game, &live());
        let ref ranges = vec![game.range(&live()), game.range(&live())];
        let ref mut rng = SmallRng::seed_from_u64(9);
        let mut coordinator = Coordinator::new(&game, &blueprint);
        let outcome = coordinator.advise(folded, ranges, Duration::from_millis(5), rng);
        assert!(matches!(outcome, Err(SolverError::NoDecision)));
    }
}
