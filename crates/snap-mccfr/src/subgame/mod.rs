//! Subgame construction for depth-limited re-solving.
//!
//! A subgame freezes three things at build time: the action menu at every
//! decision (with sentinel coverage of every bet-size family), the card
//! run-out behind every chance node, and the street horizon past which
//! play goes passive and bottoms out in frontier leaves.

mod builder;
mod tree;

pub use builder::Restriction;
pub use builder::SubgameBuilder;
pub use tree::Branch;
pub use tree::Subgame;
