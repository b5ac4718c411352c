use crate::action::Action;
use crate::card::Hole;
use crate::card::Runout;
use crate::odds::Odds;
use crate::spot::Spot;
use snap_core::*;
use rand::Rng;
use std::hash::Hash;
use std::hash::Hasher;

/// The game-rules contract the solver traverses against.
///
/// Implementations own legality, dealing, and terminal valuation; the
/// solver owns everything about regret and strategy. `payoff` must return
/// the equity-weighted pot share, positive for winnings and negative for
/// losses, from the given seat's perspective.
pub trait Rules {
    /// Root of a fresh hand, before any cards are dealt.
    fn root(&self) -> Spot;
    /// Legal abstract actions at a decision node.
    fn choices(&self, spot: &Spot) -> Vec<Action>;
    /// One sampled chance outcome: the hole deal or a street reveal.
    fn chance<R: Rng>(&self, spot: &Spot, rng: &mut R) -> Spot;
    /// A plausible continuation of the board: every card the remaining
    /// streets will reveal, drawn clear of anything already seen.
    fn runout<R: Rng>(&self, spot: &Spot, rng: &mut R) -> Runout;
    /// Equity-weighted terminal payoff for one seat.
    fn payoff(&self, spot: &Spot, seat: Position) -> Utility;
    /// Chance resolved against a predetermined run-out; `taken` counts the
    /// run-out cards consumed by earlier reveals.
    fn reveal(&self, spot: &Spot, runout: &Runout, taken: usize) -> Spot {
        spot.reveal(runout.deal(taken, spot.street().next()))
    }
}

/// A belief over one opponent's private holding.
///
/// Rollouts sample from this, skipping holes blocked by cards already
/// visible; the quantized [`Range::signature`] keys the leaf-value cache.
#[derive(Debug, Clone, Default)]
pub struct Range(Vec<(Hole, Probability)>);

impl Range {
    /// Uniform belief over the given candidate holes.
    pub fn uniform(holes: Vec<Hole>) -> Self {
        let p = 1.0 / holes.len().max(1) as Probability;
        Self(holes.into_iter().map(|h| (h, p)).collect())
    }
    /// Candidate holes with their weights.
    pub fn weights(&self) -> &[(Hole, Probability)] {
        &self.0
    }
    /// True when the range holds no candidates.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Samples a hole not blocked by the visible card mask.
    pub fn sample<R: Rng>(&self, rng: &mut R, blocked: u64) -> Option<Hole> {
        use rand::distr::Distribution;
        use rand::distr::weighted::WeightedIndex;
        let live = self
            .0
            .iter()
            .filter(|(h, _)| !h.blocks(blocked))
            .copied()
            .collect::<Vec<_>>();
        let index = WeightedIndex::new(live.iter().map(|(_, p)| p.max(POLICY_MIN))).ok()?;
        Some(live[index.sample(rng)].0)
    }
    /// Quantized digest: stable under sub-percent weight jitter, so leaf
    /// cache entries survive across iterations of the same resolve.
    pub fn signature(&self) -> u64 {
        let ref mut hasher = std::hash::DefaultHasher::new();
        for (hole, p) in &self.0 {
            hole.hash(hasher);
            ((p * 128.0).round() as u8).hash(hasher);
        }
        hasher.finish()
    }
}

/// Why a proposed action was refused.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("illegal action {action} (suggested: {suggestion:?})")]
    IllegalAction {
        action: Action,
        suggestion: Option<Action>,
    },
    #[error("bet of {amount} below legal minimum {minimum}")]
    InvalidBetAmount { amount: Chips, minimum: Chips },
}

/// Validates a proposed abstract action against the legal set.
///
/// Out-of-set actions are rejected with a suggested correction when one is
/// unambiguous: CHECK facing a bet suggests CALL, CALL facing no bet
/// suggests CHECK.
pub fn sanitize(spot: &Spot, choices: &[Action], proposed: Action) -> Result<Action, ActionError> {
    if choices.contains(&proposed) {
        return Ok(proposed);
    }
    let seat = spot.turn().position();
    let suggestion = match proposed {
        Action::Check if !spot.unraised(seat) && choices.contains(&Action::Call) => {
            Some(Action::Call)
        }
        Action::Call if spot.unraised(seat) && choices.contains(&Action::Check) => {
            Some(Action::Check)
        }
        _ => None,
    };
    Err(ActionError::IllegalAction {
        action: proposed,
        suggestion,
    })
}

/// Maps a concrete chip amount onto the abstract action set.
///
/// Amounts at or above the stack clamp to all-in with a warning; amounts
/// below the legal minimum raise are rejected; everything else snaps to
/// the nearest grid size.
pub fn translate(spot: &Spot, amount: Chips) -> Result<Action, ActionError> {
    let seat = spot.turn().position();
    let stack = spot.stack(seat);
    let owed = spot.to_call(seat);
    if amount >= stack {
        if amount > stack {
            log::warn!(
                "bet of {} exceeds stack of {}, clamping to all-in",
                amount,
                stack
            );
        }
        return Ok(Action::Shove);
    }
    let minimum = owed + owed.max(1);
    if amount < minimum {
        return Err(ActionError::InvalidBetAmount { amount, minimum });
    }
    Ok(Action::Raise(Odds::nearest(amount - owed, spot.pot() + owed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;

    fn facing_bet() -> Spot {
        Spot::new(2, 100)
            .post(0, 1)
            .post(1, 2)
            .with_next(0)
    }

    #[test]
    fn in_set_actions_pass_through() {
        let spot = facing_bet();
        let choices = vec![Action::Fold, Action::Call, Action::Shove];
        assert_eq!(sanitize(&spot, &choices, Action::Call), Ok(Action::Call));
    }

    #[test]
    fn check_facing_bet_suggests_call() {
        let spot = facing_bet();
        let choices = vec![Action::Fold, Action::Call, Action::Shove];
        assert_eq!(
            sanitize(&spot, &choices, Action::Check),
            Err(ActionError::IllegalAction {
                action: Action::Check,
                suggestion: Some(Action::Call),
            })
        );
    }

    #[test]
    fn call_unraised_suggests_check() {
        let spot = facing_bet().apply(Action::Call);
        let choices = vec![Action::Check, Action::Shove];
        assert_eq!(
            sanitize(&spot, &choices, Action::Call),
            Err(ActionError::IllegalAction {
                action: Action::Call,
                suggestion: Some(Action::Check),
            })
        );
    }

    #[test]
    fn oversized_bets_clamp_to_shove() {
        let spot = facing_bet();
        assert_eq!(translate(&spot, 500), Ok(Action::Shove));
    }

    #[test]
    fn undersized_bets_are_rejected() {
        let spot = facing_bet();
        // owed 1, so the minimum legal amount is 2
        assert_eq!(
            translate(&spot, 1),
            Err(ActionError::InvalidBetAmount {
                amount: 1,
                minimum: 2,
            })
        );
    }

    #[test]
    fn reasonable_bets_snap_to_grid() {
        let spot = facing_bet();
        // owed 1 into a pot of 3: raising 2 more is exactly half pot
        assert_eq!(
            translate(&spot, 3),
            Ok(Action::Raise(Odds::new(1, 2)))
        );
    }

    #[test]
    fn ranges_respect_blockers() {
        use rand::SeedableRng;
        let ref mut rng = rand::rngs::SmallRng::seed_from_u64(3);
        let blocked = Card::from(0).mask();
        let range = Range::uniform(vec![
            Hole::from(Card::from(0)),
            Hole::from(Card::from(1)),
        ]);
        for _ in 0..32 {
            let hole = range.sample(rng, blocked).expect("one hole is live");
            assert_eq!(hole, Hole::from(Card::from(1)));
        }
    }

    #[test]
    fn signatures_are_stable_under_jitter() {
        let a = Range(vec![(Hole::from(Card::from(5)), 0.5000)]);
        let b = Range(vec![(Hole::from(Card::from(5)), 0.5001)]);
        let c = Range(vec![(Hole::from(Card::from(5)), 0.9)]);
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature(), c.signature());
    }
}
