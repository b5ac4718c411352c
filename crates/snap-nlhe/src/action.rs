use crate::odds::Odds;
use snap_core::*;

/// The closed union of abstract betting decisions.
///
/// Strategy tables are keyed by these variants, never by exact chip
/// amounts: a raise carries its pot-relative [`Odds`] from the sizing grid
/// and `Shove` covers every all-in regardless of size. Chance transitions
/// live outside this union; see [`Turn`](crate::Turn).
#[derive(Debug, Clone, Copy, Hash, Ord, PartialOrd, PartialEq, Eq)]
pub enum Action {
    Fold,
    Check,
    Call,
    Raise(Odds),
    Shove,
}

/// Bet-size families used for sentinel coverage.
///
/// Restricted action sets must keep at least one member of each family that
/// the unrestricted set contains, so an opponent cannot learn that entire
/// size regions are never played.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Family {
    /// Passive actions: fold, check, call.
    Passive,
    /// Bets at or under half pot.
    Small,
    /// Bets between half pot and pot.
    Medium,
    /// Bets over pot.
    Over,
    /// All-in.
    Jam,
}

impl Action {
    /// True if this is a raise of any size.
    pub const fn is_raise(&self) -> bool {
        matches!(self, Self::Raise(_))
    }
    /// True if this is an all-in.
    pub const fn is_shove(&self) -> bool {
        matches!(self, Self::Shove)
    }
    /// True if this is aggressive (raise or shove).
    pub const fn is_aggro(&self) -> bool {
        self.is_raise() || self.is_shove()
    }
    /// True if this action ends the hero's participation.
    pub const fn is_folded(&self) -> bool {
        matches!(self, Self::Fold)
    }
    /// The sizing family this action belongs to.
    pub fn family(&self) -> Family {
        match self {
            Self::Fold | Self::Check | Self::Call => Family::Passive,
            Self::Shove => Family::Jam,
            Self::Raise(odds) => {
                let p = Probability::from(*odds);
                if p <= 0.5 {
                    Family::Small
                } else if p <= 1.0 {
                    Family::Medium
                } else {
                    Family::Over
                }
            }
        }
    }
    /// Initial regret weight when an infoset is first witnessed.
    ///
    /// Ratios only: with the default grid this starts play fold-heavy and
    /// raise-light, which empirically speeds early convergence.
    pub fn bias(&self) -> Utility {
        match self {
            Self::Fold => BIAS_FOLDS,
            Self::Check | Self::Call => BIAS_OTHER,
            Self::Raise(_) | Self::Shove => BIAS_RAISE,
        }
    }
    /// 4-bit code for [`Path`](crate::Path) packing. Zero is reserved.
    pub fn code(&self) -> u8 {
        match self {
            Self::Raise(odds) => 1 + odds.index().expect("raises come from the grid") as u8,
            Self::Fold => 13,
            Self::Check => 14,
            Self::Call => 15,
            Self::Shove => 9,
        }
    }
    /// Inverse of [`Action::code`].
    pub fn decode(code: u8) -> Option<Self> {
        match code {
            13 => Some(Self::Fold),
            14 => Some(Self::Check),
            15 => Some(Self::Call),
            9 => Some(Self::Shove),
            c @ 1..=8 => Some(Self::Raise(Odds::GRID[c as usize - 1])),
            _ => None,
        }
    }
}

impl Arbitrary for Action {
    fn random() -> Self {
        match rand::random_range(0..5u8) {
            0 => Self::Fold,
            1 => Self::Check,
            2 => Self::Call,
            3 => Self::Shove,
            _ => Self::Raise(Odds::random()),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Fold => write!(f, "F"),
            Self::Check => write!(f, "X"),
            Self::Call => write!(f, "C"),
            Self::Shove => write!(f, "J"),
            Self::Raise(odds) => write!(f, "R{}", odds),
        }
    }
}
