use crate::street::Street;
use snap_core::*;
use rand::Rng;

/// A playing card as a compact index into a sorted deck.
///
/// The solver never evaluates hands itself, so a card is nothing more than
/// an opaque `0..52` index with a single-bit `u64` representation for set
/// membership in [`Deck`], [`Board`], and [`Hole`] masks.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Card(u8);

impl Card {
    /// Single-bit mask for set membership.
    pub const fn mask(&self) -> u64 {
        1 << self.0
    }
}

impl From<u8> for Card {
    fn from(n: u8) -> Self {
        debug_assert!(n < 52);
        Self(n)
    }
}
impl From<Card> for u8 {
    fn from(card: Card) -> Self {
        card.0
    }
}

impl Arbitrary for Card {
    fn random() -> Self {
        Self(rand::random_range(0..52u8))
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{:02}", self.0)
    }
}

/// The set of cards not yet seen, as a bitmask.
///
/// Draws take an explicit rng so run-out sampling stays reproducible from
/// a seed; there is no global randomness here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deck(u64);

impl Deck {
    /// A fresh deck of `n` cards (52 for the full game).
    pub const fn new(n: u8) -> Self {
        Self(if n >= 64 { u64::MAX } else { (1 << n) - 1 })
    }
    /// Removes a set of known cards (board, holes) from the deck.
    pub fn exclude(&mut self, mask: u64) {
        self.0 &= !mask;
    }
    /// Number of cards remaining.
    pub const fn size(&self) -> usize {
        self.0.count_ones() as usize
    }
    /// Draws and removes a uniformly random card.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Card {
        debug_assert!(self.size() > 0);
        let i = rng.random_range(0..self.size());
        let mut deck = self.0;
        for _ in 0..i {
            deck &= deck - 1;
        }
        let card = Card::from(deck.trailing_zeros() as u8);
        self.0 &= !card.mask();
        card
    }
    /// Draws the full continuation of the board from `street` to the river.
    pub fn runout<R: Rng>(&mut self, street: Street, rng: &mut R) -> Runout {
        let mut cards = Vec::new();
        let mut at = street;
        while at != Street::Rive {
            at = at.next();
            for _ in 0..at.n_revealed() {
                cards.push(self.draw(rng));
            }
        }
        Runout::from(cards)
    }
}

impl From<Deck> for u64 {
    fn from(deck: Deck) -> Self {
        deck.0
    }
}
impl From<u64> for Deck {
    fn from(mask: u64) -> Self {
        Self(mask)
    }
}

/// Community cards revealed so far.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Board {
    mask: u64,
    n: u8,
}

impl Board {
    /// Bitmask of revealed cards.
    pub const fn mask(&self) -> u64 {
        self.mask
    }
    /// Number of cards revealed.
    pub const fn size(&self) -> usize {
        self.n as usize
    }
    /// Board with one more card revealed.
    pub fn reveal(&self, card: Card) -> Self {
        debug_assert!(self.mask & card.mask() == 0);
        Self {
            mask: self.mask | card.mask(),
            n: self.n + 1,
        }
    }
}

/// One player's private cards, or nothing when unknown.
///
/// A resolver sees only the hero's hole; opponents' holes stay
/// [`Hole::UNKNOWN`] until a rollout substitutes a sample from their range.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Hole(u64);

impl Hole {
    /// The unknown hole, carried for every seat we cannot see.
    pub const UNKNOWN: Self = Self(0);
    /// Bitmask of the hole cards.
    pub const fn mask(&self) -> u64 {
        self.0
    }
    /// Whether this hole is actually known.
    pub const fn is_known(&self) -> bool {
        self.0 != 0
    }
    /// Whether this hole shares a card with the given mask (blocker check).
    pub const fn blocks(&self, mask: u64) -> bool {
        self.0 & mask != 0
    }
}

impl From<Card> for Hole {
    fn from(card: Card) -> Self {
        Self(card.mask())
    }
}
impl From<(Card, Card)> for Hole {
    fn from((a, b): (Card, Card)) -> Self {
        debug_assert!(a != b);
        Self(a.mask() | b.mask())
    }
}
impl From<Hole> for u64 {
    fn from(hole: Hole) -> Self {
        hole.0
    }
}

/// A predetermined continuation of the board, in reveal order.
///
/// Subgame trees resolve chance against a fixed run-out, so every chance
/// node has exactly one child; the coordinator samples several run-outs
/// and averages the resolved strategies.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Default)]
pub struct Runout(Vec<Card>);

impl Runout {
    /// Cards revealed between the root board size and the target street.
    ///
    /// `already` is how many run-out cards prior streets consumed.
    pub fn deal(&self, already: usize, street: Street) -> &[Card] {
        let n = street.n_revealed();
        &self.0[already..already + n]
    }
    /// Bitmask of every predetermined card, revealed or not.
    pub fn mask(&self) -> u64 {
        self.0.iter().map(Card::mask).fold(0, |acc, m| acc | m)
    }
    /// Total cards available in this run-out.
    pub fn len(&self) -> usize {
        self.0.len()
    }
    /// True when no future cards are predetermined.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Card>> for Runout {
    fn from(cards: Vec<Card>) -> Self {
        Self(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn draws_are_distinct_and_removed() {
        let ref mut rng = SmallRng::seed_from_u64(7);
        let mut deck = Deck::new(52);
        let mut seen = 0u64;
        for _ in 0..52 {
            let card = deck.draw(rng);
            assert_eq!(seen & card.mask(), 0);
            seen |= card.mask();
        }
        assert_eq!(deck.size(), 0);
    }

    #[test]
    fn exclusion_respects_known_cards() {
        let ref mut rng = SmallRng::seed_from_u64(7);
        let hero = Hole::from((Card::from(0), Card::from(1)));
        let mut deck = Deck::new(52);
        deck.exclude(hero.mask());
        for _ in 0..50 {
            assert!(!hero.blocks(deck.draw(rng).mask()));
        }
    }

    #[test]
    fn runout_spans_remaining_streets() {
        let ref mut rng = SmallRng::seed_from_u64(7);
        let mut deck = Deck::new(52);
        assert_eq!(deck.runout(Street::Pref, rng).len(), 5);
        assert_eq!(deck.runout(Street::Flop, rng).len(), 2);
        assert_eq!(deck.runout(Street::Turn, rng).len(), 1);
        assert_eq!(deck.runout(Street::Rive, rng).len(), 0);
    }
}
