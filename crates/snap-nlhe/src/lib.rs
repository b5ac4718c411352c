//! No-Limit Hold'em game model and abstraction contracts for snapcall.
//!
//! This crate defines the abstract game vocabulary the solver operates on:
//! streets, cards, the closed action union with pot-relative sizing, packed
//! action histories, immutable table states, and infoset keys. The two
//! externally supplied capabilities, hand bucketing and game rules, are
//! expressed as the [`Abstractor`] and [`Rules`] traits; [`Micro`] is a
//! small deterministic implementation of both used by tests and benches.

pub mod abstraction;
pub mod action;
pub mod card;
pub mod info;
pub mod micro;
pub mod odds;
pub mod path;
pub mod rules;
pub mod spot;
pub mod street;
pub mod turn;

pub use abstraction::Abstractor;
pub use abstraction::Bucket;
pub use abstraction::ClusterGeometry;
pub use abstraction::Fingerprint;
pub use abstraction::Params;
pub use action::Action;
pub use action::Family;
pub use card::Board;
pub use card::Card;
pub use card::Deck;
pub use card::Hole;
pub use card::Runout;
pub use info::Info;
pub use micro::Micro;
pub use odds::Odds;
pub use path::Path;
pub use rules::ActionError;
pub use rules::Range;
pub use rules::Rules;
pub use rules::sanitize;
pub use rules::translate;
pub use spot::Spot;
pub use street::Street;
pub use turn::Turn;
