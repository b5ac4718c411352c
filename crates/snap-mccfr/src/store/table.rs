use super::RegretStore;
use crate::discount::DiscountState;
use crate::discount::Stamp;
use crate::memory::Memory;
use snap_core::*;
use snap_nlhe::Action;
use snap_nlhe::Info;
use std::collections::BTreeMap;

/// Reference backend: unbounded `f32` accumulation in a sorted map.
///
/// Also serves as the merge currency between training workers; each worker
/// accumulates a private `TableStore` delta which the shared store then
/// [`absorb`](RegretStore::absorb)s.
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    rows: BTreeMap<Info, Slab>,
    discounts: DiscountState,
}

#[derive(Debug, Clone)]
struct Slab {
    menu: Vec<Action>,
    cells: Vec<Memory>,
    stamp: Stamp,
}

impl Slab {
    fn new(menu: &[Action], stamp: Stamp) -> Self {
        Self {
            menu: menu.to_vec(),
            cells: vec![Memory::default(); menu.len()],
            stamp,
        }
    }
    fn slot(&self, action: &Action) -> Option<usize> {
        self.menu.iter().position(|a| a == action)
    }
    /// Materializes pending discounts into the cells. Expected values and
    /// visit counts are all-time averages and never discount.
    fn settle(&mut self, state: &DiscountState) {
        let (dr, dw) = state.settle(&mut self.stamp);
        if dr != 1.0 || dw != 1.0 {
            for ref mut cell in &mut self.cells {
                cell.regret *= dr;
                cell.weight *= dw;
            }
        }
    }
    /// Settled value of one cell, without touching the stamp.
    fn view(&self, slot: usize, state: &DiscountState) -> Memory {
        let (dr, dw) = state.pending(&self.stamp);
        let cell = self.cells[slot];
        Memory {
            regret: cell.regret * dr,
            weight: cell.weight * dw,
            evalue: cell.evalue,
            counts: cell.counts,
        }
    }
}

impl TableStore {
    fn cell(&self, info: &Info, action: &Action) -> Option<Memory> {
        let slab = self.rows.get(info)?;
        let slot = slab.slot(action)?;
        Some(slab.view(slot, &self.discounts))
    }
    fn touch(&mut self, info: &Info, action: &Action) -> Option<&mut Memory> {
        let ref discounts = self.discounts;
        let slab = self
            .rows
            .get_mut(info)
            .expect("row reserved before update");
        slab.settle(discounts);
        let slot = slab.slot(action)?;
        Some(&mut slab.cells[slot])
    }
}

impl RegretStore for TableStore {
    fn len(&self) -> usize {
        self.rows.len()
    }
    fn contains(&self, info: &Info) -> bool {
        self.rows.contains_key(info)
    }
    fn menu(&self, info: &Info) -> Vec<Action> {
        self.rows
            .get(info)
            .map(|slab| slab.menu.clone())
            .unwrap_or_default()
    }
    fn reserve(&mut self, info: &Info, menu: &[Action]) {
        let stamp = Stamp::from(&self.discounts);
        self.rows
            .entry(*info)
            .or_insert_with(|| Slab::new(menu, stamp));
    }
    fn regret(&self, info: &Info, action: &Action) -> Utility {
        self.cell(info, action).map(|m| m.regret).unwrap_or_default()
    }
    fn weight(&self, info: &Info, action: &Action) -> Probability {
        self.cell(info, action).map(|m| m.weight).unwrap_or_default()
    }
    fn evalue(&self, info: &Info, action: &Action) -> Option<Utility> {
        self.cell(info, action).map(|m| m.evalue)
    }
    fn counts(&self, info: &Info, action: &Action) -> u32 {
        self.cell(info, action).map(|m| m.counts).unwrap_or_default()
    }
    fn add_regret(&mut self, info: &Info, action: &Action, delta: Utility) {
        if let Some(cell) = self.touch(info, action) {
            cell.regret = (cell.regret + delta).clamp(REGRET_MIN, REGRET_MAX);
        }
    }
    fn add_weight(&mut self, info: &Info, action: &Action, delta: Probability) {
        if let Some(cell) = self.touch(info, action) {
            cell.weight += delta;
        }
    }
    fn add_evalue(&mut self, info: &Info, action: &Action, delta: Utility) {
        if let Some(cell) = self.touch(info, action) {
            cell.evalue += delta;
        }
    }
    fn add_counts(&mut self, info: &Info, action: &Action, n: u32) {
        if let Some(cell) = self.touch(info, action) {
            cell.counts += n;
        }
    }
    fn discount(&mut self, regret: f64, weight: f64) {
        self.discounts.push(regret, weight);
    }
    fn rectify(&mut self) {
        let ref discounts = self.discounts;
        for slab in self.rows.values_mut() {
            slab.settle(discounts);
            for ref mut cell in &mut slab.cells {
                cell.regret = cell.regret.max(0.0);
            }
        }
    }
    fn absorb(&mut self, delta: TableStore) {
        for (ref info, row) in delta.scan() {
            let menu = row.iter().map(|(a, _)| *a).collect::<Vec<_>>();
            self.reserve(info, &menu);
            for (ref action, memory) in row {
                self.add_regret(info, action, memory.regret);
                self.add_weight(info, action, memory.weight);
                self.add_evalue(info, action, memory.evalue);
                self.add_counts(info, action, memory.counts);
            }
        }
    }
    fn scan<'a>(&'a self) -> Box<dyn Iterator<Item = (Info, Vec<(Action, Memory)>)> + 'a> {
        Box::new(self.rows.iter().map(|(info, slab)| {
            let row = slab
                .menu
                .iter()
                .enumerate()
                .map(|(slot, action)| (*action, slab.view(slot, &self.discounts)))
                .collect();
            (*info, row)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use snap_core::Arbitrary;
    use snap_nlhe::Odds;

    fn menu() -> Vec<Action> {
        vec![Action::Fold, Action::Call, Action::Raise(Odds::new(1, 2))]
    }

    #[test]
    fn unseen_infosets_advise_uniform() {
        let mut store = TableStore::default();
        let info = Info::random();
        assert!(store.advice(&info).is_empty());
        store.reserve(&info, &menu());
        for action in menu() {
            assert_relative_eq!(store.advice(&info).density(&action), 1.0 / 3.0);
        }
    }

    #[test]
    fn average_strategy_sums_to_one_for_any_menu_size() {
        for n in 1..=5usize {
            let mut store = TableStore::default();
            let info = Info::random();
            let menu = (0..n)
                .map(|i| Action::decode(1 + i as u8).unwrap())
                .collect::<Vec<_>>();
            store.reserve(&info, &menu);
            for (i, ref action) in menu.iter().copied().enumerate() {
                store.add_weight(&info, action, i as Probability);
            }
            let total = menu
                .iter()
                .map(|a| store.advice(&info).density(a))
                .sum::<Probability>();
            assert_relative_eq!(total, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn discounts_apply_lazily_on_touch() {
        let mut store = TableStore::default();
        let ref info = Info::random();
        let ref action = Action::Call;
        store.reserve(info, &menu());
        store.add_regret(info, action, 8.0);
        store.discount(0.5, 1.0);
        assert_relative_eq!(store.regret(info, action), 4.0);
        store.discount(0.5, 1.0);
        store.add_regret(info, action, 1.0);
        assert_relative_eq!(store.regret(info, action), 3.0);
    }

    #[test]
    fn rectification_clears_negatives_after_pending_discount() {
        let mut store = TableStore::default();
        let ref info = Info::random();
        store.reserve(info, &menu());
        store.add_regret(info, &Action::Fold, -6.0);
        store.add_regret(info, &Action::Call, 2.0);
        store.add_weight(info, &Action::Call, 1.0);
        store.discount(0.5, 1.0);
        store.rectify();
        assert_relative_eq!(store.regret(info, &Action::Fold), 0.0);
        assert_relative_eq!(store.regret(info, &Action::Call), 1.0);
        assert_relative_eq!(store.weight(info, &Action::Call), 1.0);
    }

    #[test]
    fn pruning_requires_every_action_below_threshold() {
        let mut store = TableStore::default();
        let ref info = Info::random();
        store.reserve(info, &menu());
        store.add_regret(info, &Action::Fold, -10.0);
        store.add_regret(info, &Action::Call, 1.0);
        assert!(!store.should_prune(info, -5.0));
        store.add_regret(info, &Action::Call, -10.0);
        store.add_regret(info, &Action::Raise(Odds::new(1, 2)), -8.0);
        assert!(store.should_prune(info, -5.0));
    }

    #[test]
    fn regrets_clamp_at_the_floor() {
        let mut store = TableStore::default();
        let ref info = Info::random();
        store.reserve(info, &menu());
        store.add_regret(info, &Action::Fold, REGRET_MIN * 2.0);
        assert_relative_eq!(store.regret(info, &Action::Fold), REGRET_MIN);
    }

    #[test]
    fn absorbing_deltas_matches_direct_accumulation() {
        let ref info = Info::random();
        let mut direct = TableStore::default();
        direct.reserve(info, &menu());
        let mut merged = TableStore::default();
        for delta in [1.5f32, -0.5, 3.0] {
            direct.add_regret(info, &Action::Call, delta);
            direct.add_weight(info, &Action::Call, delta.abs());
            let mut part = TableStore::default();
            part.reserve(info, &menu());
            part.add_regret(info, &Action::Call, delta);
            part.add_weight(info, &Action::Call, delta.abs());
            merged.absorb(part);
        }
        assert_relative_eq!(
            merged.regret(info, &Action::Call),
            direct.regret(info, &Action::Call)
        );
        assert_relative_eq!(
            merged.weight(info, &Action::Call),
            direct.weight(info, &Action::Call)
        );
    }

    #[test]
    fn frontier_averages_node_values_over_visits() {
        let mut store = TableStore::default();
        let ref info = Info::random();
        store.reserve(info, &menu());
        assert_eq!(store.frontier(info), None);
        for value in [2.0, 4.0] {
            for ref action in [Action::Fold, Action::Call] {
                store.add_evalue(info, action, value);
                store.add_counts(info, action, 1);
            }
        }
        assert_eq!(store.frontier(info), Some(3.0));
        store.discount(0.5, 0.5);
        assert_eq!(store.frontier(info), Some(3.0));
    }

    #[test]
    fn scans_stream_in_key_order() {
        let mut store = TableStore::default();
        let mut keys = (0..16).map(|_| Info::random()).collect::<Vec<_>>();
        for ref info in keys.iter().copied() {
            store.reserve(info, &menu());
            store.add_counts(info, &Action::Fold, 1);
        }
        keys.sort();
        keys.dedup();
        let scanned = store.scan().map(|(info, _)| info).collect::<Vec<_>>();
        assert_eq!(scanned, keys);
    }
}
