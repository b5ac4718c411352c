use snap_core::*;

/// Accumulated training state for one (infoset, action) pair.
///
/// Regret and weight are stored relative to a row [`Stamp`](crate::Stamp);
/// callers outside the store always see settled values. The expected value
/// and visit count never discount, so a frontier lookup can recover the
/// all-time infoset CFV as `Σ evalue / Σ counts`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Memory {
    /// Cumulative counterfactual regret.
    pub regret: Utility,
    /// Cumulative strategy weight.
    pub weight: Probability,
    /// Accumulated node expected value, denormalized per action.
    pub evalue: Utility,
    /// Times this pair was visited during training.
    pub counts: u32,
}
