use crate::action::Action;
use snap_core::*;

/// One street's action history packed into 64 bits.
///
/// Up to [`MAX_STREET_PLIES`] actions at 4 bits each, least significant
/// first, with the nibble 0 reserved for empty. Paths reset at street
/// boundaries; an infoset key is (street, bucket, path), so cross-street
/// context flows through the bucket rather than the path.
#[derive(Debug, Default, Clone, Copy, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct Path(u64);

impl Path {
    /// Number of actions in this path.
    pub const fn length(&self) -> usize {
        (67 - self.0.leading_zeros() as usize) / 4
    }
    /// True when no actions have been taken this street.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
    /// Path extended by one action.
    pub fn push(&self, action: Action) -> Self {
        debug_assert!(self.length() < MAX_STREET_PLIES);
        Self(self.0 | (action.code() as u64) << (4 * self.length()))
    }
    /// Count of raises in this path (selects the sizing grid depth).
    pub fn aggression(&self) -> usize {
        self.into_iter().filter(|a| a.is_aggro()).count()
    }
}

impl FromIterator<Action> for Path {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), |p, a| p.push(a))
    }
}

impl IntoIterator for &Path {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;
    fn into_iter(self) -> Self::IntoIter {
        (0..self.length())
            .filter_map(|i| Action::decode((self.0 >> (4 * i) & 0xF) as u8))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl From<Path> for u64 {
    fn from(path: Path) -> Self {
        path.0
    }
}
impl From<u64> for Path {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Arbitrary for Path {
    fn random() -> Self {
        (0..rand::random_range(0..6usize))
            .map(|_| Action::random())
            .collect()
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for action in self.into_iter() {
            write!(f, "{}", action)?;
        }
        Ok(())
    }
}
