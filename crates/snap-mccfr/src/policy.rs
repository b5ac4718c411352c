use snap_core::*;
use snap_nlhe::Action;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

/// A probability distribution over the abstract actions of one infoset.
///
/// Always sums to one over its support. Built either by regret matching
/// (positive-part normalization) or by normalizing cumulative strategy
/// weights; when no mass is positive the distribution falls back to
/// uniform rather than dividing by zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Policy(Vec<(Action, Probability)>);

impl Policy {
    /// Uniform distribution over a menu.
    pub fn uniform(menu: Vec<Action>) -> Self {
        let p = 1.0 / menu.len().max(1) as Probability;
        Self(menu.into_iter().map(|a| (a, p)).collect())
    }
    /// Normalizes nonnegative mass over a menu, uniform when empty.
    ///
    /// Negative entries are clipped first, so this implements regret
    /// matching when handed raw cumulative regrets.
    pub fn matched(menu: Vec<Action>, mass: Vec<Probability>) -> Self {
        debug_assert!(menu.len() == mass.len());
        let total = mass.iter().map(|m| m.max(0.0)).sum::<Probability>();
        if total <= 0.0 {
            Self::uniform(menu)
        } else {
            Self(
                menu.into_iter()
                    .zip(mass)
                    .map(|(a, m)| (a, m.max(0.0) / total))
                    .collect(),
            )
        }
    }
    /// Probability of one action, zero when outside the support.
    pub fn density(&self, action: &Action) -> Probability {
        self.0
            .iter()
            .find(|(a, _)| a == action)
            .map(|(_, p)| *p)
            .unwrap_or_default()
    }
    /// The actions this distribution ranges over.
    pub fn support(&self) -> Vec<Action> {
        self.0.iter().map(|(a, _)| *a).collect()
    }
    /// Action-probability pairs in menu order.
    pub fn weights(&self) -> &[(Action, Probability)] {
        &self.0
    }
    /// True when there is nothing to choose from.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Draws one action from the distribution.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Action {
        let index = WeightedIndex::new(self.0.iter().map(|(_, p)| p.max(POLICY_MIN)))
            .expect("a policy has positive mass");
        self.0[index.sample(rng)].0
    }
    /// KL divergence from this distribution to a reference, with the
    /// reference floored at [`KL_EPSILON`] so near-zero blueprint mass
    /// cannot blow the penalty up.
    pub fn kl(&self, reference: &Policy) -> Entropy {
        self.0
            .iter()
            .filter(|(_, p)| *p > 0.0)
            .map(|(a, p)| p * (p / reference.density(a).max(KL_EPSILON)).ln())
            .sum()
    }
}

impl FromIterator<(Action, Probability)> for Policy {
    fn from_iter<I: IntoIterator<Item = (Action, Probability)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (action, p) in &self.0 {
            write!(f, "{}:{:.3} ", action, p)?;
        }
        Ok(())
    }
}
