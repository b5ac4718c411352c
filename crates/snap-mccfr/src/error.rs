use snap_nlhe::Fingerprint;
use snap_nlhe::Street;
use thiserror::Error;

/// Everything that can go wrong between training, persistence, and resolving.
///
/// Budget expiry during a resolve is deliberately absent: the resolver
/// recovers locally by falling back to the blueprint and counting the event,
/// so callers never see it as an error.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("policy was trained against abstraction {found}, expected {expected}")]
    AbstractionMismatch {
        expected: Fingerprint,
        found: Fingerprint,
    },

    #[error("checkpoint {stem} is missing its {missing} sibling")]
    IncompleteCheckpoint { stem: String, missing: &'static str },

    #[error("no checkpoint found under {0}")]
    NoCheckpoint(String),

    #[error("checkpoint row carries unknown action code {code}")]
    UnknownAction { code: u64 },

    #[error("subgame must begin at a street boundary, but {street} already has {taken} actions")]
    StreetBoundary { street: Street, taken: usize },

    #[error("nothing to resolve: no seat is due to act at the requested spot")]
    NoDecision,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
