use super::RegretStore;
use super::TableStore;
use super::codec;
use crate::discount::DiscountState;
use crate::discount::Stamp;
use crate::memory::Memory;
use snap_core::*;
use snap_nlhe::Action;
use snap_nlhe::Info;
use std::collections::BTreeMap;

/// Blueprint-scale backend: regrets in `i16`, weights in `u16`, behind a
/// per-row `f32` scale. Four bytes per action instead of sixteen.
///
/// Every mutation decodes the row, applies the update in `f32`, and
/// re-encodes with stochastic rounding, so repeated small updates are
/// preserved in expectation. Discount settling multiplies the row scale
/// instead of the cells and is therefore exact. Expected values and visit
/// counts are not tracked by this backend.
#[derive(Debug, Clone, Default)]
pub struct DenseStore {
    rows: BTreeMap<Info, DenseRow>,
    discounts: DiscountState,
    churn: u32,
}

#[derive(Debug, Clone)]
struct DenseRow {
    menu: Vec<Action>,
    regrets: Vec<i16>,
    weights: Vec<u16>,
    regret_scale: f32,
    weight_scale: f32,
    stamp: Stamp,
}

impl DenseRow {
    fn new(menu: &[Action], stamp: Stamp) -> Self {
        Self {
            menu: menu.to_vec(),
            regrets: vec![0; menu.len()],
            weights: vec![0; menu.len()],
            regret_scale: 0.0,
            weight_scale: 0.0,
            stamp,
        }
    }
    fn slot(&self, action: &Action) -> Option<usize> {
        self.menu.iter().position(|a| a == action)
    }
    fn regrets(&self) -> Vec<f32> {
        codec::decode_signed(&self.regrets, self.regret_scale)
    }
    fn weights(&self) -> Vec<f32> {
        codec::decode_unsigned(&self.weights, self.weight_scale)
    }
    /// Folds pending discounts into the row by rescaling its decoders.
    /// Scaling a row is scaling its scale, so no re-encoding happens and
    /// no rounding error accrues.
    fn settle(&mut self, state: &DiscountState) {
        let (dr, dw) = state.settle(&mut self.stamp);
        self.regret_scale *= dr;
        self.weight_scale *= dw;
    }
}

impl DenseStore {
    /// Advances the rounding seed so consecutive re-encodings of the same
    /// row draw fresh randomness.
    fn churn(&mut self) -> u32 {
        self.churn = self.churn.wrapping_mul(0x9E3779B9).wrapping_add(1);
        self.churn
    }
}

impl RegretStore for DenseStore {
    fn len(&self) -> usize {
        self.rows.len()
    }
    fn contains(&self, info: &Info) -> bool {
        self.rows.contains_key(info)
    }
    fn menu(&self, info: &Info) -> Vec<Action> {
        self.rows
            .get(info)
            .map(|row| row.menu.clone())
            .unwrap_or_default()
    }
    fn reserve(&mut self, info: &Info, menu: &[Action]) {
        let stamp = Stamp::from(&self.discounts);
        self.rows
            .entry(*info)
            .or_insert_with(|| DenseRow::new(menu, stamp));
    }
    fn regret(&self, info: &Info, action: &Action) -> Utility {
        self.rows
            .get(info)
            .and_then(|row| {
                let slot = row.slot(action)?;
                let (dr, _) = self.discounts.pending(&row.stamp);
                Some(row.regrets()[slot] * dr)
            })
            .unwrap_or_default()
    }
    fn weight(&self, info: &Info, action: &Action) -> Probability {
        self.rows
            .get(info)
            .and_then(|row| {
                let slot = row.slot(action)?;
                let (_, dw) = self.discounts.pending(&row.stamp);
                Some(row.weights()[slot] * dw)
            })
            .unwrap_or_default()
    }
    fn add_regret(&mut self, info: &Info, action: &Action, delta: Utility) {
        let seed = self.churn();
        let ref discounts = self.discounts;
        let row = self
            .rows
            .get_mut(info)
            .expect("row reserved before update");
        row.settle(discounts);
        if let Some(slot) = row.slot(action) {
            let mut values = row.regrets();
            values[slot] = (values[slot] + delta).clamp(REGRET_MIN, REGRET_MAX);
            row.regret_scale = codec::encode_signed(&mut row.regrets, &values, seed);
        }
    }
    fn add_weight(&mut self, info: &Info, action: &Action, delta: Probability) {
        let seed = self.churn();
        let ref discounts = self.discounts;
        let row = self
            .rows
            .get_mut(info)
            .expect("row reserved before update");
        row.settle(discounts);
        if let Some(slot) = row.slot(action) {
            let mut values = row.weights();
            values[slot] = (values[slot] + delta).max(0.0);
            row.weight_scale = codec::encode_unsigned(&mut row.weights, &values, seed);
        }
    }
    fn discount(&mut self, regret: f64, weight: f64) {
        self.discounts.push(regret, weight);
    }
    fn rectify(&mut self) {
        let base = self.churn();
        let ref discounts = self.discounts;
        for (i, row) in self.rows.values_mut().enumerate() {
            row.settle(discounts);
            let mut values = row.regrets();
            if values.iter().any(|v| *v < 0.0) {
                for v in &mut values {
                    *v = v.max(0.0);
                }
                row.regret_scale = codec::encode_signed(&mut row.regrets, &values, base ^ i as u32);
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
            }
        }
    }
    fn scan<'a>(&'a self) -> Box<dyn Iterator<Item = (Info, Vec<(Action, Memory)>)> + 'a> {
        Box::new(self.rows.iter().map(|(info, row)| {
            let (dr, dw) = self.discounts.pending(&row.stamp);
            let regrets = row.regrets();
            let weights = row.weights();
            let cells = row
                .menu
                .iter()
                .enumerate()
                .map(|(slot, action)| {
                    (
                        *action,
                        Memory {
                            regret: regrets[slot] * dr,
                            weight: weights[slot] * dw,
                            evalue: 0.0,
                            counts: 0,
                        },
                    )
                })
                .collect();
            (*info, cells)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use snap_core::Arbitrary;
    use snap_nlhe::Odds;

    fn menu() -> Vec<Action> {
        vec![Action::Fold, Action::Call, Action::Raise(Odds::new(1, 2))]
    }

    #[test]
    fn backends_agree_on_identical_update_sequences() {
        let ref info = Info::random();
        let menu = menu();
        let mut table = TableStore::default();
        let mut dense = DenseStore::default();
        table.reserve(info, &menu);
        dense.reserve(info, &menu);
        let mut rng = SmallRng::seed_from_u64(0xD15C);
        for epoch in 0..256usize {
            for ref action in menu.iter().copied() {
                let delta = rng.random_range(-16.0..16.0);
                table.add_regret(info, action, delta);
                dense.add_regret(info, action, delta);
                table.add_weight(info, action, delta.abs());
                dense.add_weight(info, action, delta.abs());
            }
            if epoch % 32 == 31 {
                let t = epoch as f64;
                table.discount(t / (t + 1.0), t / (t + 1.0));
                dense.discount(t / (t + 1.0), t / (t + 1.0));
            }
            if epoch % 64 == 63 {
                table.rectify();
                dense.rectify();
            }
        }
        for ref action in menu.iter().copied() {
            let drift = (table.regret(info, action) - dense.regret(info, action)).abs();
            assert!(drift < 1.0, "regret drifted by {drift}");
            let drift = (table.weight(info, action) - dense.weight(info, action)).abs();
            assert!(drift < table.weight(info, action) * 0.01 + 1.0);
            let gap = (table.advice(info).density(action) - dense.advice(info).density(action)).abs();
            assert!(gap < 0.01, "average strategy drifted by {gap}");
        }
    }

    #[test]
    fn quantization_error_stays_within_one_row_step() {
        let mut dense = DenseStore::default();
        let ref info = Info::random();
        dense.reserve(info, &menu());
        dense.add_regret(info, &Action::Fold, -123.456);
        dense.add_weight(info, &Action::Call, 0.875);
        assert!((dense.regret(info, &Action::Fold) + 123.456).abs() <= 123.456 / i16::MAX as f32);
        assert!((dense.weight(info, &Action::Call) - 0.875).abs() <= 0.875 / u16::MAX as f32);
    }

    #[test]
    fn floors_hold_under_heavy_negative_updates() {
        let mut dense = DenseStore::default();
        let ref info = Info::random();
        dense.reserve(info, &menu());
        for _ in 0..4 {
            dense.add_regret(info, &Action::Fold, REGRET_MIN);
        }
        let step = REGRET_MIN.abs() / i16::MAX as f32;
        assert!(dense.regret(info, &Action::Fold) >= REGRET_MIN - step);
        assert!(dense.regret(info, &Action::Fold) <= REGRET_MIN + step);
    }

    #[test]
    fn discounts_rescale_reads_exactly() {
        let mut dense = DenseStore::default();
        let ref info = Info::random();
        dense.reserve(info, &menu());
        dense.add_regret(info, &Action::Call, 100.0);
        dense.add_weight(info, &Action::Call, 8.0);
        let regret = dense.regret(info, &Action::Call);
        let weight = dense.weight(info, &Action::Call);
        dense.discount(0.25, 0.5);
        assert_relative_eq!(dense.regret(info, &Action::Call), regret * 0.25);
        assert_relative_eq!(dense.weight(info, &Action::Call), weight * 0.5);
    }

    #[test]
    fn frontier_values_are_not_tracked() {
        let mut dense = DenseStore::default();
        let ref info = Info::random();
        dense.reserve(info, &menu());
        dense.add_evalue(info, &Action::Call, 5.0);
        dense.add_weight(info, &Action::Call, 1.0);
        assert_eq!(dense.evalue(info, &Action::Call), None);
        assert_eq!(dense.frontier(info), None);
        assert_eq!(dense.counts(info, &Action::Call), 0);
    }

    #[test]
    fn scans_match_point_reads() {
        let mut dense = DenseStore::default();
        let ref info = Info::random();
        dense.reserve(info, &menu());
        dense.add_regret(info, &Action::Call, 42.0);
        dense.add_weight(info, &Action::Call, 3.0);
        dense.discount(0.5, 0.5);
        let (_, row) = dense.scan().next().unwrap();
        for (ref action, memory) in row {
            assert_relative_eq!(memory.regret, dense.regret(info, action));
            assert_relative_eq!(memory.weight, dense.weight(info, action));
        }
    }
}
