use snap_core::*;

/// One of the four betting rounds.
///
/// Streets order naturally (`Pref < Flop < Turn < Rive`), which the solver
/// leans on for depth limiting and per-street penalty schedules.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Street {
    Pref,
    Flop,
    Turn,
    Rive,
}

impl Street {
    /// All streets in play order.
    pub const fn all() -> [Self; 4] {
        [Self::Pref, Self::Flop, Self::Turn, Self::Rive]
    }
    /// The street that follows this one. River maps to itself.
    pub const fn next(&self) -> Self {
        match self {
            Self::Pref => Self::Flop,
            Self::Flop => Self::Turn,
            Self::Turn => Self::Rive,
            Self::Rive => Self::Rive,
        }
    }
    /// Board cards revealed when this street begins.
    pub const fn n_revealed(&self) -> usize {
        match self {
            Self::Pref => 0,
            Self::Flop => 3,
            Self::Turn => 1,
            Self::Rive => 1,
        }
    }
    /// Total board cards visible on this street.
    pub const fn n_observed(&self) -> usize {
        match self {
            Self::Pref => 0,
            Self::Flop => 3,
            Self::Turn => 4,
            Self::Rive => 5,
        }
    }
}

impl From<Street> for u8 {
    fn from(street: Street) -> Self {
        match street {
            Street::Pref => 0,
            Street::Flop => 1,
            Street::Turn => 2,
            Street::Rive => 3,
        }
    }
}
impl From<u8> for Street {
    fn from(n: u8) -> Self {
        match n {
            0 => Street::Pref,
            1 => Street::Flop,
            2 => Street::Turn,
            _ => Street::Rive,
        }
    }
}

impl Arbitrary for Street {
    fn random() -> Self {
        Self::from(rand::random_range(0..4u8))
    }
}

impl std::fmt::Display for Street {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Pref => write!(f, "preflop"),
            Self::Flop => write!(f, "flop"),
            Self::Turn => write!(f, "turn"),
            Self::Rive => write!(f, "river"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streets_order() {
        assert!(Street::Pref < Street::Flop);
        assert!(Street::Flop < Street::Turn);
        assert!(Street::Turn < Street::Rive);
    }

    #[test]
    fn river_is_absorbing() {
        assert_eq!(Street::Rive.next(), Street::Rive);
    }

    #[test]
    fn observed_accumulates_revealed() {
        let mut total = 0;
        for street in Street::all() {
            total += street.n_revealed();
            assert_eq!(street.n_observed(), total);
        }
    }
}
