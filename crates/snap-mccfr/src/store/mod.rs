//! Regret and strategy accumulation, in two interchangeable backends.
//!
//! [`TableStore`] accumulates in unbounded `f32` and is the reference
//! implementation; [`DenseStore`] holds the same state in bounded
//! fixed-point slots for blueprint-scale memory footprints. Both settle
//! the lazy [`DiscountState`](crate::DiscountState) multipliers on every
//! touch, so callers always observe fully discounted values.

mod codec;
mod dense;
mod table;

pub use codec::*;
pub use dense::*;
pub use table::*;

use crate::memory::Memory;
use crate::policy::Policy;
use snap_core::*;
use snap_nlhe::Action;
use snap_nlhe::Info;

/// The accumulation contract shared by training and resolving.
///
/// Rows are created lazily by [`RegretStore::reserve`] and never deleted;
/// a row's action menu is fixed at creation. Reads of absent rows return
/// zeros, which regret matching turns into the uniform strategy.
pub trait RegretStore: Send {
    /// Number of infosets with at least one recorded touch.
    fn len(&self) -> usize;
    /// True when nothing has been recorded yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// True when the infoset has a row.
    fn contains(&self, info: &Info) -> bool;
    /// The fixed action menu of a row, empty when absent.
    fn menu(&self, info: &Info) -> Vec<Action>;
    /// Creates a row with the given menu if the infoset has none.
    fn reserve(&mut self, info: &Info, menu: &[Action]);

    /// Settled cumulative regret for one action.
    fn regret(&self, info: &Info, action: &Action) -> Utility;
    /// Settled cumulative strategy weight for one action.
    fn weight(&self, info: &Info, action: &Action) -> Probability;
    /// Accumulated node expected value, where the backend tracks one.
    /// Never discounted: paired with [`RegretStore::counts`] it recovers
    /// an all-time average.
    fn evalue(&self, info: &Info, action: &Action) -> Option<Utility> {
        let _ = (info, action);
        None
    }
    /// Visit count for one action.
    fn counts(&self, info: &Info, action: &Action) -> u32 {
        let _ = (info, action);
        0
    }

    /// Accumulates regret, clamped to the configured floor and ceiling.
    fn add_regret(&mut self, info: &Info, action: &Action, delta: Utility);
    /// Accumulates strategy weight.
    fn add_weight(&mut self, info: &Info, action: &Action, delta: Probability);
    /// Accumulates node expected value. Backends without frontier
    /// support ignore this.
    fn add_evalue(&mut self, info: &Info, action: &Action, delta: Utility) {
        let _ = (info, action, delta);
    }
    /// Bumps the visit counter.
    fn add_counts(&mut self, info: &Info, action: &Action, n: u32) {
        let _ = (info, action, n);
    }

    /// Compounds one pair of discount factors into the lazy multipliers.
    /// O(1): rows settle on their next touch.
    fn discount(&mut self, regret: f64, weight: f64);
    /// CFR+ rectification: settles every row, then clamps negative
    /// regrets to zero.
    fn rectify(&mut self);
    /// True when every action of the row sits below the pruning
    /// threshold, in which case the traversal must keep them all.
    fn should_prune(&self, info: &Info, threshold: Utility) -> bool {
        let menu = self.menu(info);
        !menu.is_empty() && menu.iter().all(|a| self.regret(info, a) < threshold)
    }
    /// Merges a batch of per-worker deltas produced against the same
    /// blueprint. The only synchronization point in training.
    fn absorb(&mut self, delta: TableStore);
    /// Streams settled rows in key order for checkpointing.
    fn scan<'a>(&'a self) -> Box<dyn Iterator<Item = (Info, Vec<(Action, Memory)>)> + 'a>;

    /// Current strategy by regret matching, uniform for unseen rows.
    fn policy(&self, info: &Info) -> Policy {
        let menu = self.menu(info);
        let mass = menu.iter().map(|a| self.regret(info, a)).collect();
        Policy::matched(menu, mass)
    }
    /// Average strategy from cumulative weights, uniform for unseen rows.
    fn advice(&self, info: &Info) -> Policy {
        let menu = self.menu(info);
        let mass = menu.iter().map(|a| self.weight(info, a)).collect();
        Policy::matched(menu, mass)
    }
    /// Counterfactual value of the infoset for its acting seat: the
    /// visit-averaged node expected value, when the backend tracks it.
    fn frontier(&self, info: &Info) -> Option<Utility> {
        let menu = self.menu(info);
        let visits = menu.iter().map(|a| self.counts(info, a)).sum::<u32>();
        let value = menu
            .iter()
            .map(|a| self.evalue(info, a))
            .try_fold(0.0, |acc, v| v.map(|v| acc + v))?;
        if visits > 0 {
            Some(value / visits as Utility)
        } else {
            None
        }
    }
}
