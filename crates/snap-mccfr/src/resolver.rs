use crate::error::SolverError;
use crate::error::SolverResult;
use crate::leaf::LeafEvaluator;
use crate::policy::Policy;
use crate::profile::Profile;
use crate::store::RegretStore;
use crate::store::TableStore;
use crate::subgame::Branch;
use crate::subgame::Restriction;
use crate::subgame::Subgame;
use crate::subgame::SubgameBuilder;
use petgraph::graph::NodeIndex;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use snap_core::*;
use snap_nlhe::Abstractor;
use snap_nlhe::Action;
use snap_nlhe::Hole;
use snap_nlhe::Info;
use snap_nlhe::Path;
use snap_nlhe::Range;
use snap_nlhe::Rules;
use snap_nlhe::Runout;
use snap_nlhe::Spot;
use snap_nlhe::Turn;
use std::time::Duration;
use std::time::Instant;

/// Lifecycle of one resolve, in transition order. The two terminal
/// dispositions are [`Stage::Converged`] (the iteration floor was met,
/// the averaged strategy is returned) and [`Stage::TimeExpired`] (the
/// budget ran out first, the blueprint is returned instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    WarmStart,
    Iterate,
    Converged,
    TimeExpired,
    Finalize,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::WarmStart => write!(f, "warm start"),
            Self::Iterate => write!(f, "iterate"),
            Self::Converged => write!(f, "converged"),
            Self::TimeExpired => write!(f, "time expired"),
            Self::Finalize => write!(f, "finalize"),
        }
    }
}

/// The product of one resolve: a mixed strategy for the hero's decision,
/// how it was reached, and its estimated edge over just playing the
/// blueprint.
#[derive(Debug, Clone)]
pub struct Resolve {
    policy: Policy,
    disposition: Stage,
    iterations: usize,
    delta: Utility,
}

impl Resolve {
    pub fn policy(&self) -> &Policy {
        &self.policy
    }
    /// Terminal disposition, [`Stage::Converged`] or [`Stage::TimeExpired`].
    pub fn disposition(&self) -> Stage {
        self.disposition
    }
    pub fn iterations(&self) -> usize {
        self.iterations
    }
    /// Estimated chips gained at the root by the resolved mix over the
    /// blueprint mix. Zero on fallback.
    pub fn delta(&self) -> Utility {
        self.delta
    }
    /// True when the budget expired before the iteration floor and the
    /// blueprint strategy was returned untouched.
    pub fn is_fallback(&self) -> bool {
        matches!(self.disposition, Stage::TimeExpired)
    }
}

impl std::fmt::Display for Resolve {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} after {} iterations ({:+.3} chips vs blueprint)",
            self.disposition, self.iterations, self.delta
        )
    }
}

/// Re-solves one live decision against a depth-limited subgame.
///
/// The walk is the same external-sampling scheme the trainer uses, run
/// over a scratch [`TableStore`] that starts warm-seeded from the
/// blueprint and is rectified each iteration. Walker utilities carry a
/// KL penalty toward the blueprint, sized by street and position, so a
/// short search cannot wander into a wildly exploitable line. The
/// blueprint itself is only ever read; one blueprint serves any number
/// of concurrent resolvers.
pub struct Resolver<'a, G, S> {
    game: &'a G,
    blueprint: &'a Profile<S>,
    restriction: Restriction,
    street_start: bool,
    least: usize,
    most: usize,
    kappa: Option<Energy>,
    stage: Stage,
    fallbacks: u32,
}

impl<'a, G, S> Resolver<'a, G, S>
where
    G: Rules + Abstractor,
    S: RegretStore,
{
    pub fn new(game: &'a G, blueprint: &'a Profile<S>) -> Self {
        Self {
            game,
            blueprint,
            restriction: Restriction::default(),
            street_start: false,
            least: SUBGAME_MIN_ITERATIONS,
            most: SUBGAME_MAX_ITERATIONS,
            kappa: None,
            stage: Stage::Build,
            fallbacks: 0,
        }
    }

    /// How aggressively to trim raise families when building subgames.
    pub fn restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = restriction;
        self
    }

    /// Refuse roots that sit mid-street.
    pub fn from_street_start(mut self) -> Self {
        self.street_start = true;
        self
    }

    /// Iteration floor and ceiling for each resolve.
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

    /// Resolves that have fallen back to the blueprint since construction.
    pub fn fallbacks(&self) -> u32 {
        self.fallbacks
    }

    /// Last stage this resolver reached.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Resolves the hero's decision at `root` within the wall-clock
    /// budget, against `ranges` indexed by seat and the predetermined
    /// `runout`.
    ///
    /// On early budget expiry the blueprint strategy comes back
    /// verbatim; a half-converged average is never returned.
    pub fn resolve(
        &mut self,
        root: Spot,
        runout: Runout,
        ranges: &[Range],
        budget: Duration,
    ) -> SolverResult<Resolve> {
        let deadline = Instant::now() + budget;
        let hero = match root.turn() {
            Turn::Choice(seat) => seat,
            _ => return Err(SolverError::NoDecision),
        };
        self.transition(Stage::Build);
        let subgame = self.build(root, runout)?;
        self.transition(Stage::WarmStart);
        let ref mut search = Search::new(
            self.game,
            self.blueprint,
            &subgame,
            ranges,
            hero,
            self.kappa,
            deadline,
        );
        search.warm();
        self.transition(Stage::Iterate);
        let ref mut rng = SmallRng::seed_from_u64(subgame.digest());
        let mut iterations = 0;
        while iterations < self.most {
            if Instant::now() >= deadline {
                break;
            }
            search.iterate(iterations, rng);
            iterations += 1;
        }
        if iterations < self.least {
            self.transition(Stage::TimeExpired);
            self.fallbacks += 1;
            log::warn!(
                "resolve expired after {} of {} iterations, yielding the blueprint",
                iterations,
                self.least
            );
            self.transition(Stage::Finalize);
            return Ok(Resolve {
                policy: self.shelter(&root, hero),
                disposition: Stage::TimeExpired,
                iterations,
                delta: 0.0,
            });
        }
        self.transition(Stage::Converged);
        let policy = search.finalize();
        let delta = search.delta(&policy);
        self.transition(Stage::Finalize);
        log::debug!("resolved {} in {} iterations", subgame, iterations);
        Ok(Resolve {
            policy,
            disposition: Stage::Converged,
            iterations,
            delta,
        })
    }

    fn transition(&mut self, stage: Stage) {
        self.stage = stage;
        log::trace!("resolve stage {}", stage);
    }

    fn build(&self, root: Spot, runout: Runout) -> SolverResult<Subgame> {
        let builder = SubgameBuilder::new(self.game).restriction(self.restriction);
        let builder = if self.street_start {
            builder.from_street_start()
        } else {
            builder
        };
        builder.build(root, runout)
    }

    /// The blueprint's strategy at the live decision, over the full
    /// unrestricted menu. Uniform when the infoset was never trained.
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

/// One resolve's working state: the scratch regrets, the leaf cache, and
/// the running root-value tally behind the EV delta.
struct Search<'a, G, S> {
    game: &'a G,
    blueprint: &'a Profile<S>,
    subgame: &'a Subgame,
    ranges: &'a [Range],
    hero: Position,
    kappa: Option<Energy>,
    deadline: Instant,
    scratch: TableStore,
    leaves: LeafEvaluator<'a, G, S>,
    sums: Vec<Utility>,
    visits: u32,
}

impl<'a, G, S> Search<'a, G, S>
where
    G: Rules + Abstractor,
    S: RegretStore,
{
    fn new(
        game: &'a G,
        blueprint: &'a Profile<S>,
        subgame: &'a Subgame,
        ranges: &'a [Range],
        hero: Position,
        kappa: Option<Energy>,
        deadline: Instant,
    ) -> Self {
        let (_, branches) = Self::decision(subgame, subgame.root());
        Self {
            game,
            blueprint,
            subgame,
            ranges,
            hero,
            kappa,
            deadline,
            scratch: TableStore::default(),
            leaves: LeafEvaluator::new(game, blueprint),
            sums: vec![0.0; branches.len()],
            visits: 0,
        }
    }

    /// Seeds the root row with regret proportional to the blueprint's
    /// action probabilities, so the first iterations already play
    /// blueprint-shaped poker.
    fn warm(&mut self) {
        let root = self.subgame.root();
        let (seat, branches) = Self::decision(self.subgame, root);
        let menu = branches.iter().map(|(a, _)| *a).collect::<Vec<_>>();
        let spot = self.subgame.spot(root);
        let ref info = self.key(root, spot, seat);
        self.scratch.reserve(info, &menu);
        let ref reference = self.reference(spot, seat, &menu);
        for action in &menu {
            self.scratch
                .add_regret(info, action, SUBGAME_WARMTH * reference.density(action));
        }
    }

    /// One external-sampling iteration: deal opponent holes from their
    /// ranges, walk the subgame for this iteration's walker, rectify.
    fn iterate(&mut self, iteration: usize, rng: &mut SmallRng) {
        let players = self.subgame.spot(self.subgame.root()).players();
        let walker = iteration % players;
        if let Some(ref deal) = self.deal(rng) {
            self.descend(self.subgame.root(), walker, deal, rng);
            self.scratch.rectify();
        }
    }

    /// Holes for every seat this iteration: the hero keeps the live
    /// hole, opponents draw from their ranges behind the board, the
    /// hero's cards, and the whole predetermined run-out. `None` when a
    /// range has nothing left to deal.
    fn deal(&self, rng: &mut SmallRng) -> Option<Vec<Hole>> {
        let ref root = self.subgame.spot(self.subgame.root());
        let mut blocked = root.seen() | self.subgame.runout().mask();
        let mut deal = vec![Hole::UNKNOWN; root.players()];
        for seat in 0..root.players() {
            if seat == self.hero {
                deal[seat] = root.hole(seat);
            } else if root.is_alive(seat) {
                let hole = self.ranges.get(seat)?.sample(rng, blocked)?;
                blocked |= hole.mask();
                deal[seat] = hole;
            }
        }
        Some(deal)
    }

    fn descend(
        &mut self,
        node: NodeIndex,
        walker: Position,
        deal: &[Hole],
        rng: &mut SmallRng,
    ) -> Utility {
        match self.subgame.branch(node) {
            Branch::Terminal => {
                let ref spot = Self::overlay(self.subgame.spot(node), deal);
                self.game.payoff(spot, walker)
            }
            Branch::Frontier => {
                let ref spot = Self::overlay(self.subgame.spot(node), deal);
                let villain = (0..spot.players())
                    .find(|s| *s != walker && spot.is_alive(*s))
                    .expect("frontier spots stay contested");
                let leaves = &mut self.leaves;
                let range = &self.ranges[villain];
                leaves.evaluate(self.subgame, spot, walker, range, self.deadline, rng)
            }
            Branch::Reveal(child) => self.descend(child, walker, deal, rng),
            Branch::Decision(seat, branches) if seat == walker => {
                self.explore(node, seat, branches, deal, rng)
            }
            Branch::Decision(seat, branches) => {
                self.follow(node, seat, branches, walker, deal, rng)
            }
        }
    }

    /// Full-width expansion at the walker's decision, with the utility
    /// of each action shifted by the KL penalty before regrets update.
    /// The walker's current mix accrues into the average strategy.
    fn explore(
        &mut self,
        node: NodeIndex,
        seat: Position,
        branches: Vec<(Action, NodeIndex)>,
        deal: &[Hole],
        rng: &mut SmallRng,
    ) -> Utility {
        let ref spot = Self::overlay(self.subgame.spot(node), deal);
        let menu = branches.iter().map(|(a, _)| *a).collect::<Vec<_>>();
        let ref info = self.key(node, spot, seat);
        self.scratch.reserve(info, &menu);
        let current = self.scratch.policy(info);
        let utilities = branches
            .iter()
            .map(|(_, child)| self.descend(*child, seat, deal, rng))
            .collect::<Vec<_>>();
        let kappa = self.kappa(spot, seat);
        let ref reference = self.reference(spot, seat, &menu);
        let penalized = menu
            .iter()
            .zip(utilities.iter())
            .map(|(action, utility)| {
                let drift = current.density(action).max(KL_EPSILON)
                    / reference.density(action).max(KL_EPSILON);
                utility - kappa * drift.ln()
            })
            .collect::<Vec<_>>();
        let value = menu
            .iter()
            .zip(penalized.iter())
            .map(|(action, utility)| current.density(action) * utility)
            .sum::<Utility>();
        for (action, utility) in menu.iter().zip(penalized.iter()) {
            self.scratch.add_regret(info, action, utility - value);
            self.scratch.add_weight(info, action, current.density(action));
        }
        if node == self.subgame.root() {
            for (sum, utility) in self.sums.iter_mut().zip(utilities.iter()) {
                *sum += utility;
            }
            self.visits += 1;
        }
        value
    }

    /// Sampled play at everyone else's decisions. Nothing accumulates
    /// here; the average strategy grows at walker decisions only.
    fn follow(
        &mut self,
        node: NodeIndex,
        seat: Position,
        branches: Vec<(Action, NodeIndex)>,
        walker: Position,
        deal: &[Hole],
        rng: &mut SmallRng,
    ) -> Utility {
        let ref spot = Self::overlay(self.subgame.spot(node), deal);
        let menu = branches.iter().map(|(a, _)| *a).collect::<Vec<_>>();
        let ref info = self.key(node, spot, seat);
        self.scratch.reserve(info, &menu);
        let action = self.scratch.policy(info).sample(rng);
        let child = branches
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, child)| *child)
            .expect("sampled actions stay on the menu");
        self.descend(child, walker, deal, rng)
    }

    /// Average strategy at the root, with every sentinel action kept at
    /// [`SENTINEL_FLOOR`] or above. Sentinels short of the floor are
    /// pinned exactly there and only the rest of the menu scales into
    /// the leftover mass, so renormalizing cannot drag a floored
    /// sentinel back under.
    fn finalize(&self) -> Policy {
        let root = self.subgame.root();
        let (seat, branches) = Self::decision(self.subgame, root);
        let menu = branches.iter().map(|(a, _)| *a).collect::<Vec<_>>();
        let ref spot = self.subgame.spot(root);
        let ref info = self.key(root, spot, seat);
        let averaged = self.scratch.advice(info);
        let densities = menu
            .iter()
            .map(|a| averaged.density(a))
            .collect::<Vec<_>>();
        let mut pinned = vec![false; menu.len()];
        let scale = loop {
            let reserved = SENTINEL_FLOOR * pinned.iter().filter(|p| **p).count() as Probability;
            let free = densities
                .iter()
                .zip(pinned.iter())
                .filter(|(_, pinned)| !**pinned)
                .map(|(density, _)| *density)
                .sum::<Probability>();
            let scale = (1.0 - reserved) / free.max(Probability::MIN_POSITIVE);
            let short = (0..menu.len()).find(|&i| {
                !pinned[i]
                    && self.subgame.sentinels().contains(&menu[i])
                    && densities[i] * scale < SENTINEL_FLOOR
            });
            match short {
                Some(i) => pinned[i] = true,
                None => break scale,
            }
        };
        menu.into_iter()
            .zip(densities)
            .zip(pinned)
            .map(|((action, density), pinned)| match pinned {
                true => (action, SENTINEL_FLOOR),
                false => (action, density * scale),
            })
            .collect()
    }

    /// Chips the final mix gains over the blueprint mix at the root,
    /// under the action values observed while iterating.
    fn delta(&self, policy: &Policy) -> Utility {
        if self.visits == 0 {
            return 0.0;
        }
        let root = self.subgame.root();
        let (seat, branches) = Self::decision(self.subgame, root);
        let menu = branches.iter().map(|(a, _)| *a).collect::<Vec<_>>();
        let ref spot = self.subgame.spot(root);
        let ref reference = self.reference(spot, seat, &menu);
        menu.iter()
            .zip(self.sums.iter())
            .map(|(action, sum)| {
                let average = sum / self.visits as Utility;
                (policy.density(action) - reference.density(action)) * average
            })
            .sum()
    }

    /// Scratch rows key on the subgame node itself, so two nodes with
    /// the same street history but different pots never share regrets.
    /// The acting player's private holding still flows through the
    /// bucket.
    fn key(&self, node: NodeIndex, spot: &Spot, seat: Position) -> Info {
        Info::new(
            self.game.version(),
            spot.street(),
            self.game.bucket(spot, seat),
            Path::from(node.index() as u64),
        )
    }

    /// Blueprint policy renormalized over the frozen menu, uniform when
    /// the blueprint never trained this infoset.
    fn reference(&self, spot: &Spot, seat: Position, menu: &[Action]) -> Policy {
        let ref info = Info::new(
            self.game.version(),
            spot.street(),
            self.game.bucket(spot, seat),
            spot.path(),
        );
        let store = self.blueprint.store();
        let mass = menu.iter().map(|a| store.weight(info, a)).collect();
        Policy::matched(menu.to_vec(), mass)
    }

    /// KL weight at this decision: per-street schedule plus the
    /// out-of-position bonus, unless a fixed override is set.
    fn kappa(&self, spot: &Spot, seat: Position) -> Energy {
        match self.kappa {
            Some(kappa) => kappa,
            None => {
                let street = KL_STREET[u8::from(spot.street()) as usize];
                let closer = (0..spot.players()).filter(|s| spot.is_alive(*s)).next_back();
                match closer {
                    Some(last) if last == seat => street,
                    _ => street + KL_OOP_BONUS,
                }
            }
        }
    }

    fn overlay(spot: &Spot, deal: &[Hole]) -> Spot {
        deal.iter()
            .enumerate()
            .filter(|(_, hole)| hole.is_known())
            .fold(*spot, |acc, (seat, hole)| acc.with_hole(seat, *hole))
    }

    fn decision(subgame: &Subgame, node: NodeIndex) -> (Position, Vec<(Action, NodeIndex)>) {
        match subgame.branch(node) {
            Branch::Decision(seat, branches) => (seat, branches),
            _ => panic!("subgame roots carry decisions"),
        }
    }
}
