use snap_core::*;

/// Whose turn it is to act in the game tree.
///
/// Distinguishes between player decision nodes, chance nodes (card deals),
/// and terminal nodes (hand complete).
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum Turn {
    Terminal,
    Chance,
    Choice(Position),
}

impl Turn {
    /// Extracts the seat index. Panics if not a Choice.
    pub fn position(&self) -> Position {
        match self {
            Self::Choice(p) => *p,
            _ => panic!("don't ask"),
        }
    }
    /// True if this is a player decision node.
    pub const fn is_choice(&self) -> bool {
        matches!(self, Self::Choice(_))
    }
    /// True if this is a card deal node.
    pub const fn is_chance(&self) -> bool {
        matches!(self, Self::Chance)
    }
    /// True if the hand is complete.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }
}

impl std::fmt::Display for Turn {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Choice(p) => write!(f, "P{}", p),
            Self::Terminal => write!(f, "-"),
            Self::Chance => write!(f, "?"),
        }
    }
}
