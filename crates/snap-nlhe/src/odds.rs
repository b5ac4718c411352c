use snap_core::*;

/// Pot-relative bet sizing as a reduced fraction.
///
/// `Odds::new(1, 2)` is a half-pot bet, `Odds::new(2, 1)` a 2x pot overbet.
/// Sizes are drawn from a fixed grid so that a raise fits in the 4-bit
/// [`Path`](crate::Path) encoding alongside the other action variants.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct Odds(Chips, Chips);

impl Odds {
    /// Creates new odds from numerator and denominator.
    pub const fn new(n: Chips, d: Chips) -> Self {
        Self(n, d)
    }
    /// Chip amount this size represents over a given pot.
    pub fn chips(&self, pot: Chips) -> Chips {
        ((pot as i32 * self.0 as i32) / self.1 as i32) as Chips
    }
    /// Position of this size in the grid, if it is a grid size.
    pub fn index(&self) -> Option<usize> {
        Self::GRID.iter().position(|o| o == self)
    }
    /// The grid size closest to an arbitrary chip fraction of the pot.
    pub fn nearest(bet: Chips, pot: Chips) -> Self {
        let p = bet as f32 / pot.max(1) as f32;
        Self::GRID
            .into_iter()
            .min_by(|a, b| {
                let da = (Probability::from(*a) - p).abs();
                let db = (Probability::from(*b) - p).abs();
                da.partial_cmp(&db).expect("grid odds are finite")
            })
            .expect("grid is nonempty")
    }
    /// Sizing grid: values 1..=8 in the 4-bit action encoding.
    pub const GRID: [Self; 8] = [
        Self(1, 4), // 0.25 pot
        Self(1, 3), // 0.33 pot
        Self(1, 2), // 0.50 pot
        Self(2, 3), // 0.66 pot
        Self(3, 4), // 0.75 pot
        Self(1, 1), // 1.00 pot
        Self(3, 2), // 1.50 pot
        Self(2, 1), // 2.00 pot
    ];
}

impl From<Odds> for Probability {
    fn from(odds: Odds) -> Self {
        odds.0 as Probability / odds.1 as Probability
    }
}

impl Arbitrary for Odds {
    fn random() -> Self {
        use rand::prelude::IndexedRandom;
        let ref mut rng = rand::rng();
        Self::GRID.choose(rng).copied().expect("grid is nonempty")
    }
}

impl std::fmt::Display for Odds {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_is_sorted_and_indexed() {
        for (i, odds) in Odds::GRID.iter().enumerate() {
            assert_eq!(odds.index(), Some(i));
        }
        let fractions = Odds::GRID.map(Probability::from);
        assert!(fractions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn nearest_snaps_to_grid() {
        assert_eq!(Odds::nearest(50, 100), Odds::new(1, 2));
        assert_eq!(Odds::nearest(95, 100), Odds::new(1, 1));
        assert_eq!(Odds::nearest(500, 100), Odds::new(2, 1));
    }

    #[test]
    fn chips_scale_with_pot() {
        assert_eq!(Odds::new(1, 2).chips(100), 50);
        assert_eq!(Odds::new(2, 1).chips(30), 60);
    }
}
