use crate::action::Action;
use crate::card::Board;
use crate::card::Card;
use crate::card::Hole;
use crate::path::Path;
use crate::street::Street;
use crate::turn::Turn;
use snap_core::*;

/// An immutable table state: one node of the game tree.
///
/// Carries the street, board, holes, chip accounting, the betting-round
/// bookkeeping needed to know whose turn it is, and this street's packed
/// action [`Path`]. Applying an action or revealing cards produces a new
/// `Spot`; nothing mutates in place.
///
/// The mechanical transitions here are chip arithmetic and turn order
/// only. Which actions are legal, how cards are dealt, and what a terminal
/// state pays are the province of the [`Rules`](crate::Rules)
/// implementation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spot {
    street: Street,
    board: Board,
    holes: [Hole; MAX_PLAYERS],
    stacks: [Chips; MAX_PLAYERS],
    bets: [Chips; MAX_PLAYERS],
    pot: Chips,
    alive: u8,
    acted: u8,
    players: u8,
    next: u8,
    depth: u8,
    path: Path,
    turn: Turn,
}

impl Spot {
    /// A fresh hand: all seats alive with equal stacks, awaiting the deal.
    pub fn new(players: usize, stack: Chips) -> Self {
        debug_assert!(players >= 2 && players <= MAX_PLAYERS);
        let mut stacks = [0; MAX_PLAYERS];
        stacks[..players].fill(stack);
        Self {
            street: Street::Pref,
            board: Board::default(),
            holes: [Hole::UNKNOWN; MAX_PLAYERS],
            stacks,
            bets: [0; MAX_PLAYERS],
            pot: 0,
            alive: (1u8 << players) - 1,
            acted: 0,
            players: players as u8,
            next: 0,
            depth: 0,
            path: Path::default(),
            turn: Turn::Chance,
        }
    }

    // accessors

    /// Current betting round.
    pub const fn street(&self) -> Street {
        self.street
    }
    /// Community cards revealed so far.
    pub const fn board(&self) -> Board {
        self.board
    }
    /// Total chips committed to the hand, all streets included.
    pub fn pot(&self) -> Chips {
        self.pot + self.bets.iter().sum::<Chips>()
    }
    /// One seat's private cards.
    pub fn hole(&self, seat: Position) -> Hole {
        self.holes[seat]
    }
    /// Chips a seat still has behind.
    pub fn stack(&self, seat: Position) -> Chips {
        self.stacks[seat]
    }
    /// Chips a seat has committed this street.
    pub fn bet(&self, seat: Position) -> Chips {
        self.bets[seat]
    }
    /// Chips a seat must add to continue.
    pub fn to_call(&self, seat: Position) -> Chips {
        self.bets.iter().copied().max().unwrap_or(0) - self.bets[seat]
    }
    /// True when a seat can check rather than call.
    pub fn unraised(&self, seat: Position) -> bool {
        self.to_call(seat) == 0
    }
    /// Whose move it is.
    pub const fn turn(&self) -> Turn {
        self.turn
    }
    /// This street's action history.
    pub const fn path(&self) -> Path {
        self.path
    }
    /// Actions taken this street.
    pub const fn ply(&self) -> usize {
        self.path.length()
    }
    /// True when no action has been taken this street.
    pub const fn fresh(&self) -> bool {
        self.path.is_empty()
    }
    /// Seats dealt into the hand.
    pub const fn players(&self) -> usize {
        self.players as usize
    }
    /// Seats still contesting the pot.
    pub const fn remaining(&self) -> usize {
        self.alive.count_ones() as usize
    }
    /// True if a seat has not folded.
    pub const fn is_alive(&self, seat: Position) -> bool {
        self.alive & (1 << seat) != 0
    }
    /// Actions plus reveals since the start of the hand.
    pub const fn depth(&self) -> usize {
        self.depth as usize
    }
    /// Bitmask of all known cards (board plus visible holes).
    pub fn seen(&self) -> u64 {
        self.holes
            .iter()
            .fold(self.board.mask(), |mask, hole| mask | hole.mask())
    }

    // setters used by Rules implementations during setup and rollout

    /// Same state with one seat's hole replaced.
    pub fn with_hole(&self, seat: Position, hole: Hole) -> Self {
        let mut next = *self;
        next.holes[seat] = hole;
        next
    }
    /// Same state with the betting opened at the given seat.
    pub fn with_next(&self, seat: Position) -> Self {
        let mut next = *self;
        next.next = seat as u8;
        next.turn = Turn::Choice(seat);
        next
    }
    /// Posts a blind: commits chips without consuming the seat's option.
    pub fn post(&self, seat: Position, amount: Chips) -> Self {
        let mut next = *self;
        let amount = amount.min(next.stacks[seat]);
        next.stacks[seat] -= amount;
        next.bets[seat] += amount;
        next
    }

    // transitions

    /// Applies one betting decision at the seat whose turn it is.
    pub fn apply(&self, action: Action) -> Self {
        debug_assert!(self.turn.is_choice());
        let seat = self.turn.position();
        let bit = 1u8 << seat;
        let mut next = *self;
        next.depth += 1;
        next.path = next.path.push(action);
        match action {
            Action::Fold => {
                next.alive &= !bit;
                next.acted |= bit;
            }
            Action::Check => {
                next.acted |= bit;
            }
            Action::Call => {
                let chips = next.to_call(seat).min(next.stacks[seat]);
                next.stacks[seat] -= chips;
                next.bets[seat] += chips;
                next.acted |= bit;
            }
            Action::Raise(odds) => {
                let owed = next.to_call(seat);
                let sized = odds.chips(next.pot() + owed);
                let chips = (owed + sized).min(next.stacks[seat]);
                next.stacks[seat] -= chips;
                next.bets[seat] += chips;
                next.acted = bit;
            }
            Action::Shove => {
                let chips = next.stacks[seat];
                next.stacks[seat] -= chips;
                next.bets[seat] += chips;
                next.acted = bit;
            }
        }
        next.settle()
    }

    /// Reveals the next street's cards and resets round bookkeeping.
    pub fn reveal(&self, cards: &[Card]) -> Self {
        debug_assert!(self.turn.is_chance());
        let mut next = *self;
        next.street = next.street.next();
        debug_assert!(cards.len() == next.street.n_revealed());
        for &card in cards {
            next.board = next.board.reveal(card);
        }
        next.pot += next.bets.iter().sum::<Chips>();
        next.bets = [0; MAX_PLAYERS];
        next.acted = 0;
        next.path = Path::default();
        next.depth += 1;
        next.turn = match next.first_actor() {
            Some(seat) => {
                next.next = seat as u8;
                Turn::Choice(seat)
            }
            None if next.street == Street::Rive => Turn::Terminal,
            None => Turn::Chance,
        };
        next
    }

    /// First alive seat with chips behind, in ring order from seat zero.
    fn first_actor(&self) -> Option<Position> {
        (0..self.players())
            .filter(|&s| self.is_alive(s))
            .filter(|&s| self.stacks[s] > 0)
            .filter(|_| self.contested())
            .next()
    }

    /// More than one seat can still put chips in.
    fn contested(&self) -> bool {
        (0..self.players())
            .filter(|&s| self.is_alive(s))
            .filter(|&s| self.stacks[s] > 0)
            .count()
            > 1
            && self.remaining() > 1
    }

    /// Decides whose turn follows the action just applied.
    fn settle(mut self) -> Self {
        if self.remaining() == 1 {
            self.turn = Turn::Terminal;
            return self;
        }
        if self.closed() {
            self.turn = match self.street {
                Street::Rive => Turn::Terminal,
                _ => Turn::Chance,
            };
            return self;
        }
        let seat = self
            .successor()
            .expect("an open round always has an actor");
        self.next = seat as u8;
        self.turn = Turn::Choice(seat);
        self
    }

    /// A round is closed when every alive seat has either matched the
    /// high bet after acting, or is all in.
    fn closed(&self) -> bool {
        let high = self.bets.iter().copied().max().unwrap_or(0);
        (0..self.players())
            .filter(|&s| self.is_alive(s))
            .all(|s| self.stacks[s] == 0 || (self.acted & (1 << s) != 0 && self.bets[s] == high))
    }

    /// Next alive seat with chips behind, after the seat that just acted.
    fn successor(&self) -> Option<Position> {
        (1..=self.players())
            .map(|i| (self.next as usize + i) % self.players())
            .filter(|&s| self.is_alive(s))
            .filter(|&s| self.stacks[s] > 0)
            .next()
    }
}

impl std::fmt::Display for Spot {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} pot {} {} [{}]",
            self.street,
            self.pot(),
            self.turn,
            self.path
        )
    }
}
