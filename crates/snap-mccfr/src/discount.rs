//! Lazy discounting of accumulated regret and strategy mass.
//!
//! Discounting every row of a blueprint-sized store on every epoch would
//! dominate training cost. Instead the store keeps two cumulative scalar
//! multipliers and each row remembers the multiplier it last saw; the
//! pending factor is applied only when the row is next touched. The
//! multipliers run in f64 so the cumulative product stays exact over
//! millions of epochs while rows themselves stay f32.

/// The pair of live cumulative multipliers, one for regret and one for
/// strategy weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscountState {
    regret: f64,
    weight: f64,
}

impl Default for DiscountState {
    fn default() -> Self {
        Self {
            regret: 1.0,
            weight: 1.0,
        }
    }
}

impl DiscountState {
    /// Compounds one epoch's factors into the multipliers. O(1): no row is
    /// touched here.
    pub fn push(&mut self, regret: f64, weight: f64) {
        self.regret *= regret;
        self.weight *= weight;
    }
    /// Factors a row must still apply, given the multiplier it last saw.
    pub fn pending(&self, stamp: &Stamp) -> (f32, f32) {
        (
            (self.regret / stamp.regret) as f32,
            (self.weight / stamp.weight) as f32,
        )
    }
    /// Like [`DiscountState::pending`], but also brings the stamp current.
    /// A row's stored values must be scaled by the returned factors in the
    /// same breath, or they fall out of sync with the stamp.
    pub fn settle(&self, stamp: &mut Stamp) -> (f32, f32) {
        let factors = self.pending(stamp);
        stamp.regret = self.regret;
        stamp.weight = self.weight;
        factors
    }
}

/// The cumulative multiplier a row last settled against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp {
    regret: f64,
    weight: f64,
}

impl Default for Stamp {
    fn default() -> Self {
        Self {
            regret: 1.0,
            weight: 1.0,
        }
    }
}

impl From<&DiscountState> for Stamp {
    /// A fresh row is born current, so it never applies discounts that
    /// predate its creation.
    fn from(state: &DiscountState) -> Self {
        Self {
            regret: state.regret,
            weight: state.weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sequential_factors_match_their_product() {
        let factors = [0.5, 0.9, 0.99, 0.7, 0.999];
        let mut one_by_one = DiscountState::default();
        let mut stamp = Stamp::default();
        let mut value = 100.0f32;
        for f in factors {
            one_by_one.push(f, f);
            let (dr, _) = one_by_one.settle(&mut stamp);
            value *= dr;
        }
        let mut all_at_once = DiscountState::default();
        let mut fresh = Stamp::default();
        all_at_once.push(factors.iter().product(), 1.0);
        let (dr, _) = all_at_once.settle(&mut fresh);
        assert_relative_eq!(value, 100.0 * dr, epsilon = 1e-4);
    }

    #[test]
    fn settling_twice_is_idempotent() {
        let mut state = DiscountState::default();
        let mut stamp = Stamp::default();
        state.push(0.25, 0.75);
        let (dr, dw) = state.settle(&mut stamp);
        assert_relative_eq!(dr, 0.25);
        assert_relative_eq!(dw, 0.75);
        let (dr, dw) = state.settle(&mut stamp);
        assert_relative_eq!(dr, 1.0);
        assert_relative_eq!(dw, 1.0);
    }

    #[test]
    fn fresh_rows_skip_old_discounts() {
        let mut state = DiscountState::default();
        state.push(0.1, 0.1);
        let mut stamp = Stamp::from(&state);
        let (dr, dw) = state.settle(&mut stamp);
        assert_relative_eq!(dr, 1.0);
        assert_relative_eq!(dw, 1.0);
    }

}
