//! MCCFR blueprint training and depth-limited re-solving for snapcall.
//!
//! The [`Trainer`] runs external-sampling MCCFR against a [`RegretStore`]
//! to produce a blueprint [`Profile`], which [`save`]/[`load`] checkpoint
//! to disk under an abstraction [`Fingerprint`](snap_nlhe::Fingerprint)
//! guardrail. At the table, a [`Resolver`] rebuilds a bounded
//! [`Subgame`] around the live spot, warm-starts a scratch store from the
//! blueprint, and re-solves under a KL leash and a hard time budget, with
//! [`LeafEvaluator`] scoring the depth frontier and [`Coordinator`]
//! averaging resolves across sampled board run-outs.

pub mod coordinator;
pub mod discount;
pub mod error;
pub mod leaf;
pub mod memory;
pub mod phase;
pub mod policy;
pub mod profile;
pub mod resolver;
pub mod save;
pub mod store;
pub mod subgame;
pub mod trainer;

pub use coordinator::Coordinator;
pub use discount::DiscountState;
pub use discount::Stamp;
pub use error::SolverError;
pub use error::SolverResult;
pub use leaf::LeafEvaluator;
pub use memory::Memory;
pub use phase::Phase;
pub use phase::Weighting;
pub use policy::Policy;
pub use profile::Profile;
pub use resolver::Resolve;
pub use resolver::Resolver;
pub use resolver::Stage;
pub use save::load;
pub use save::load_policy;
pub use save::save;
pub use store::DenseStore;
pub use store::RegretStore;
pub use store::TableStore;
pub use subgame::Branch;
pub use subgame::Restriction;
pub use subgame::Subgame;
pub use subgame::SubgameBuilder;
pub use trainer::Trainer;
