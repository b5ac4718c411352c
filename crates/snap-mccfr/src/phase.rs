use snap_core::*;

/// Training schedule position, derived from the epoch counter.
///
/// Mirrors the blueprint schedule from the Pluribus lineage: discount
/// aggressively while regrets are still noisy, explore everything for a
/// while, then prune hopeless actions, and finally freeze the average
/// strategy so late exploration stops drifting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discount,
    Explore,
    Prune,
    Freeze,
}

impl From<usize> for Phase {
    fn from(epoch: usize) -> Self {
        match epoch {
            e if e < DISCOUNT_HORIZON => Self::Discount,
            e if e < PRUNING_WARMUP => Self::Explore,
            e if e < FREEZE_HORIZON => Self::Prune,
            _ => Self::Freeze,
        }
    }
}

impl Phase {
    /// The (regret, weight) factors to push after completing `epoch`.
    ///
    /// Weights always compound t/(t+1), which makes plain unit strategy
    /// additions equivalent to linear weighting once normalized. Regrets
    /// compound the same factor only during the discount phase; after
    /// that, rectification alone keeps them bounded.
    pub fn discounts(epoch: usize) -> (f64, f64) {
        let t = (epoch + 1) as f64;
        let linear = t / (t + 1.0);
        match Self::from(epoch) {
            Self::Discount => (linear, linear),
            _ => (1.0, linear),
        }
    }
    /// Regret level below which an action is skipped during traversal.
    ///
    /// Rises toward zero as training matures, so clearly losing actions
    /// are dropped more readily late in the run. Before the warm-up no
    /// action is ever pruned.
    pub fn threshold(epoch: usize) -> Utility {
        match Self::from(epoch) {
            Self::Prune | Self::Freeze => -PRUNE_SCALE / (epoch as Utility).sqrt(),
            _ => Utility::NEG_INFINITY,
        }
    }
    /// Whether cumulative strategy updates are suspended.
    pub fn freezes(&self) -> bool {
        matches!(self, Self::Freeze)
    }
}

/// How much of the run each epoch's updates end up carrying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Weighting {
    /// Epoch `s` carries weight `s + 1`, via the compounded t/(t+1)
    /// pushes of [`Phase::discounts`].
    #[default]
    Linear,
    /// Every epoch carries equal weight; no discount is ever pushed.
    Constant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_progress_in_order() {
        assert_eq!(Phase::from(0), Phase::Discount);
        assert_eq!(Phase::from(DISCOUNT_HORIZON), Phase::Explore);
        assert_eq!(Phase::from(PRUNING_WARMUP), Phase::Prune);
        assert_eq!(Phase::from(FREEZE_HORIZON), Phase::Freeze);
        assert!(Phase::from(FREEZE_HORIZON).freezes());
        assert!(!Phase::from(PRUNING_WARMUP).freezes());
    }

    #[test]
    fn thresholds_tighten_as_training_matures() {
        assert_eq!(Phase::threshold(0), Utility::NEG_INFINITY);
        assert_eq!(Phase::threshold(PRUNING_WARMUP - 1), Utility::NEG_INFINITY);
        let early = Phase::threshold(PRUNING_WARMUP);
        let late = Phase::threshold(PRUNING_WARMUP * 4);
        assert!(early < 0.0);
        assert!(late < 0.0);
        assert!(late > early);
    }

    #[test]
    fn compounded_weight_discounts_are_linear() {
        // mass added at epoch s and carried to epoch e should hold s/e of
        // the mass added at e itself
        let s = 16usize;
        let e = 64usize;
        let carried: f64 = (s..e).map(|t| Phase::discounts(t).1).product();
        let ratio = (s + 1) as f64 / (e + 1) as f64;
        assert!((carried - ratio).abs() < 1e-9);
    }
}
