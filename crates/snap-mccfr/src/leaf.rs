use crate::policy::Policy;
use crate::profile::Profile;
use crate::store::RegretStore;
use crate::subgame::Subgame;
use rand::rngs::SmallRng;
use snap_core::*;
use snap_nlhe::Abstractor;
use snap_nlhe::Action;
use snap_nlhe::Bucket;
use snap_nlhe::Info;
use snap_nlhe::Range;
use snap_nlhe::Rules;
use snap_nlhe::Runout;
use snap_nlhe::Spot;
use snap_nlhe::Street;
use snap_nlhe::Turn;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Instant;

/// Cache key: hero bucket, quantized villain range, frozen action set and
/// run-out, leaf street.
type Key = (Bucket, u64, u64, Street);

/// Scores subgame frontier leaves under the blueprint.
///
/// A leaf is worth the blueprint's stored counterfactual value when one
/// exists for the hero at the revealed street, and otherwise the average
/// of deadline-bounded rollouts that resample the villain hole from the
/// supplied range and play every seat by blueprint advice to a true
/// terminal. Values are cached FIFO-bounded; eviction only ever costs a
/// recompute.
pub struct LeafEvaluator<'a, G, S> {
    game: &'a G,
    blueprint: &'a Profile<S>,
    cache: HashMap<Key, Utility>,
    queue: VecDeque<Key>,
}

impl<'a, G, S> LeafEvaluator<'a, G, S>
where
    G: Rules + Abstractor,
    S: RegretStore,
{
    pub fn new(game: &'a G, blueprint: &'a Profile<S>) -> Self {
        Self {
            game,
            blueprint,
            cache: HashMap::new(),
            queue: VecDeque::new(),
        }
    }

    /// Cached leaf values currently held.
    pub fn len(&self) -> usize {
        self.cache.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Hero's expected chips at a frontier leaf of the subgame.
    ///
    /// The spot is passed in rather than read off the subgame so callers
    /// can overlay sampled holes before scoring.
    pub fn evaluate(
        &mut self,
        subgame: &Subgame,
        spot: &Spot,
        hero: Position,
        range: &Range,
        deadline: Instant,
        rng: &mut SmallRng,
    ) -> Utility {
        let key = (
            self.game.bucket(spot, hero),
            range.signature(),
            subgame.digest(),
            spot.street(),
        );
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }
        let value = self.appraise(subgame, spot, hero, range, deadline, rng);
        self.remember(key, value);
        value
    }

    fn appraise(
        &self,
        subgame: &Subgame,
        spot: &Spot,
        hero: Position,
        range: &Range,
        deadline: Instant,
        rng: &mut SmallRng,
    ) -> Utility {
        let root = subgame.spot(subgame.root()).street();
        let taken = Self::consumed(root, spot.street());
        let fresh = self.game.reveal(spot, subgame.runout(), taken);
        let taken = taken + spot.street().next().n_revealed();
        if let Turn::Choice(seat) = fresh.turn() {
            if seat == hero {
                let ref info = Info::new(
                    self.game.version(),
                    fresh.street(),
                    self.game.bucket(&fresh, hero),
                    fresh.path(),
                );
                if let Some(value) = self.blueprint.frontier(info) {
                    return value;
                }
            }
        }
        self.rollout(&fresh, taken, hero, range, subgame.runout(), deadline, rng)
    }

    /// Average hero payoff over villain holes resampled from the range,
    /// stopping at the deadline. Zero if not a single sample lands in
    /// time; the resolver's own fallback covers that case.
    fn rollout(
        &self,
        fresh: &Spot,
        taken: usize,
        hero: Position,
        range: &Range,
        runout: &Runout,
        deadline: Instant,
        rng: &mut SmallRng,
    ) -> Utility {
        let villain = (0..fresh.players()).find(|s| *s != hero && fresh.is_alive(*s));
        let blocked = Self::blocked(fresh, villain, runout, taken);
        let mut total = 0.0;
        let mut samples = 0u32;
        for _ in 0..LEAF_ROLLOUTS {
            if Instant::now() >= deadline {
                break;
            }
            let ref start = match villain {
                Some(seat) => match range.sample(rng, blocked) {
                    Some(hole) => fresh.with_hole(seat, hole),
                    None => break,
                },
                None => *fresh,
            };
            total += self.playout(start, taken, hero, runout, rng);
            samples += 1;
        }
        if samples > 0 {
            total / samples as Utility
        } else {
            0.0
        }
    }

    /// Cards a resampled villain hole may not collide with: everything
    /// visible except the villain's own replaced hole, plus the future
    /// run-out.
    fn blocked(fresh: &Spot, villain: Option<Position>, runout: &Runout, taken: usize) -> u64 {
        let mut blocked = fresh.seen();
        if let Some(seat) = villain {
            blocked &= !fresh.hole(seat).mask();
        }
        let mut street = fresh.street();
        let mut ahead = taken;
        while street < Street::Rive {
            street = street.next();
            for card in runout.deal(ahead, street) {
                blocked |= card.mask();
            }
            ahead += street.n_revealed();
        }
        blocked
    }

    /// Plays one hand to a true terminal: predetermined reveals, every
    /// decision sampled from blueprint advice.
    fn playout(
        &self,
        spot: &Spot,
        taken: usize,
        hero: Position,
        runout: &Runout,
        rng: &mut SmallRng,
    ) -> Utility {
        let mut spot = *spot;
        let mut taken = taken;
        loop {
            match spot.turn() {
                Turn::Terminal => return self.game.payoff(&spot, hero),
                Turn::Chance => {
                    let consumed = spot.street().next().n_revealed();
                    spot = self.game.reveal(&spot, runout, taken);
                    taken += consumed;
                }
                Turn::Choice(seat) => {
                    let ref info = Info::new(
                        self.game.version(),
                        spot.street(),
                        self.game.bucket(&spot, seat),
                        spot.path(),
                    );
                    let menu = self.game.choices(&spot);
                    let action = self.advised(info, &menu).sample(rng);
                    spot = spot.apply(action);
                }
            }
        }
    }

    /// Blueprint average strategy over the game menu, uniform when the
    /// infoset was never trained.
    fn advised(&self, info: &Info, menu: &[Action]) -> Policy {
        let store = self.blueprint.store();
        let mass = menu.iter().map(|a| store.weight(info, a)).collect();
        Policy::matched(menu.to_vec(), mass)
    }

    /// Run-out cards consumed revealing streets after `root` up to and
    /// including `leaf`.
    fn consumed(root: Street, leaf: Street) -> usize {
        leaf.n_observed() - root.n_observed()
    }

    /// FIFO-bounded insert.
    fn remember(&mut self, key: Key, value: Utility) {
        if self.cache.len() >= LEAF_CACHE_LIMIT {
            if let Some(oldest) = self.queue.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        if self.cache.insert(key, value).is_none() {
            self.queue.push_back(key);
        }
    }
}
