//! A miniature hold'em variant for exercising the solver end to end.
//!
//! Two seats, a twelve card deck of three ranks, one card holes, and a
//! single pot sized raise per street keep full traversals cheap enough
//! for convergence tests. The bucket of a holding is its exact showdown
//! strength, so the abstraction is lossless and tests can reason about
//! equilibrium play without clustering noise.

use crate::abstraction::Abstractor;
use crate::abstraction::Bucket;
use crate::abstraction::ClusterGeometry;
use crate::abstraction::Fingerprint;
use crate::abstraction::Params;
use crate::action::Action;
use crate::card::Card;
use crate::card::Deck;
use crate::card::Hole;
use crate::card::Runout;
use crate::odds::Odds;
use crate::rules::Range;
use crate::rules::Rules;
use crate::spot::Spot;
use crate::turn::Turn;
use snap_core::*;
use rand::Rng;

/// The miniature game. Stateless apart from its abstraction digest.
#[derive(Debug, Clone)]
pub struct Micro {
    fingerprint: Fingerprint,
}

impl Micro {
    /// Cards in the cut down deck: ranks 0..3, four suits each.
    pub const DECK: u8 = 12;
    /// Starting stack for both seats.
    pub const STACK: Chips = 8;
    /// Heads up, the small blind acts first on every street.
    const FIRST: Position = 0;

    /// The abstraction build this game pretends to carry.
    pub fn params() -> Params {
        Params {
            buckets: [3, 15, 15, 15],
            players: 2,
            seed: 0x5eed,
        }
    }

    /// Exact showdown strength: board pairings dominate, rank breaks ties.
    fn strength(&self, spot: &Spot, seat: Position) -> u16 {
        let hole = spot.hole(seat);
        debug_assert!(hole.is_known());
        let rank = (hole.mask().trailing_zeros() / 4) as u16;
        let mut mask = spot.board().mask();
        let mut pairs = 0u16;
        while mask != 0 {
            if mask.trailing_zeros() / 4 == rank as u32 {
                pairs += 1;
            }
            mask &= mask - 1;
        }
        (pairs << 2) | rank
    }

    /// Uniform belief over every card a villain could still hold.
    pub fn range(&self, spot: &Spot) -> Range {
        let mut deck = Deck::new(Self::DECK);
        deck.exclude(spot.seen());
        let mut mask = u64::from(deck);
        let mut holes = Vec::new();
        while mask != 0 {
            holes.push(Hole::from(Card::from(mask.trailing_zeros() as u8)));
            mask &= mask - 1;
        }
        Range::uniform(holes)
    }
}

impl Default for Micro {
    fn default() -> Self {
        let geometry = ClusterGeometry::from(vec![0.0, 0.5, 1.0]);
        Self {
            fingerprint: Fingerprint::build(&Self::params(), &geometry),
        }
    }
}

impl Rules for Micro {
    fn root(&self) -> Spot {
        Spot::new(2, Self::STACK).post(0, 1).post(1, 2)
    }

    fn choices(&self, spot: &Spot) -> Vec<Action> {
        debug_assert!(spot.turn().is_choice());
        let seat = spot.turn().position();
        let owed = spot.to_call(seat);
        let stack = spot.stack(seat);
        let mut actions = Vec::new();
        if owed > 0 {
            actions.push(Action::Fold);
        }
        if owed == 0 {
            actions.push(Action::Check);
        }
        if owed > 0 && owed < stack {
            actions.push(Action::Call);
        }
        let pot = Odds::new(1, 1);
        if spot.path().aggression() < MAX_RAISE_REPEATS
            && owed + pot.chips(spot.pot() + owed) < stack
        {
            actions.push(Action::Raise(pot));
        }
        actions.push(Action::Shove);
        actions
    }

    fn chance<R: Rng>(&self, spot: &Spot, rng: &mut R) -> Spot {
        debug_assert!(spot.turn().is_chance());
        let mut deck = Deck::new(Self::DECK);
        deck.exclude(spot.seen());
        if spot.hole(0).is_known() {
            let n = spot.street().next().n_revealed();
            let cards = (0..n).map(|_| deck.draw(rng)).collect::<Vec<_>>();
            spot.reveal(&cards)
        } else {
            let mut next = *spot;
            for seat in 0..spot.players() {
                next = next.with_hole(seat, Hole::from(deck.draw(rng)));
            }
            next.with_next(Self::FIRST)
        }
    }

    fn runout<R: Rng>(&self, spot: &Spot, rng: &mut R) -> Runout {
        let mut deck = Deck::new(Self::DECK);
        deck.exclude(spot.seen());
        deck.runout(spot.street(), rng)
    }

    fn payoff(&self, spot: &Spot, seat: Position) -> Utility {
        debug_assert!(spot.turn().is_terminal());
        let contributed = (Self::STACK - spot.stack(seat)) as Utility;
        if !spot.is_alive(seat) {
            return -contributed;
        }
        let rivals = (0..spot.players())
            .filter(|&s| spot.is_alive(s))
            .collect::<Vec<_>>();
        if rivals.len() == 1 {
            return spot.pot() as Utility - contributed;
        }
        let best = rivals
            .iter()
            .map(|&s| self.strength(spot, s))
            .max()
            .expect("a showdown has contestants");
        let winners = rivals
            .iter()
            .filter(|&&s| self.strength(spot, s) == best)
            .count();
        if self.strength(spot, seat) == best {
            spot.pot() as Utility / winners as Utility - contributed
        } else {
            -contributed
        }
    }
}

impl Abstractor for Micro {
    fn bucket(&self, spot: &Spot, seat: Position) -> Bucket {
        Bucket::from(self.strength(spot, seat))
    }
    fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}
