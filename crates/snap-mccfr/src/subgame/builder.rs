use super::tree::Subgame;
use crate::error::SolverError;
use crate::error::SolverResult;
use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use snap_core::*;
use snap_nlhe::Action;
use snap_nlhe::Family;
use snap_nlhe::Rules;
use snap_nlhe::Runout;
use snap_nlhe::Spot;
use snap_nlhe::Turn;
use std::collections::HashMap;

/// How hard the frozen action abstraction squeezes the raise menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Restriction {
    /// One raise per size family: the smallest tree that still covers
    /// every family.
    Tight,
    /// Two raises per family.
    #[default]
    Balanced,
    /// The full blueprint grid.
    Loose,
}

impl Restriction {
    /// Raises kept per size family.
    fn quota(&self) -> usize {
        match self {
            Self::Tight => 1,
            Self::Balanced => 2,
            Self::Loose => usize::MAX,
        }
    }
}

/// Builds [`Subgame`]s from a live table state.
///
/// The grown tree spans the root street at the configured restriction,
/// one closing street of passive play, and frontier leaves at the next
/// reveal. Restriction never drops an entire size family: whatever the
/// game's menu contains, at least one raise of each family survives.
pub struct SubgameBuilder<'a, G> {
    game: &'a G,
    restriction: Restriction,
    street_start: bool,
}

impl<'a, G: Rules> SubgameBuilder<'a, G> {
    pub fn new(game: &'a G) -> Self {
        Self {
            game,
            restriction: Restriction::default(),
            street_start: false,
        }
    }
    pub fn restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = restriction;
        self
    }
    /// Refuse roots that sit mid-street. Re-solving from a partially bet
    /// round leaks the in-round history into the opponent ranges and
    /// biases the root EV, so callers that rebuild ranges per street
    /// must opt in to this check.
    pub fn from_street_start(mut self) -> Self {
        self.street_start = true;
        self
    }

    pub fn build(&self, root: Spot, runout: Runout) -> SolverResult<Subgame> {
        if self.street_start && !root.fresh() {
            return Err(SolverError::StreetBoundary {
                street: root.street(),
                taken: root.ply(),
            });
        }
        let sentinels = self.sentinels(&root);
        let mut graph = DiGraph::new();
        let index = self.grow(&mut graph, root, &runout, 0, 0, 0);
        Ok(Subgame::assemble(graph, index, runout, sentinels))
    }

    /// Depth-first tree growth. `crossings` counts streets revealed since
    /// the root, `taken` the run-out cards those reveals consumed.
    fn grow(
        &self,
        graph: &mut DiGraph<Spot, Option<Action>>,
        spot: Spot,
        runout: &Runout,
        crossings: usize,
        taken: usize,
        depth: usize,
    ) -> NodeIndex {
        let node = graph.add_node(spot);
        match spot.turn() {
            Turn::Terminal => {}
            Turn::Chance => {
                if crossings < SUBGAME_STREETS {
                    let consumed = spot.street().next().n_revealed();
                    let child = self.game.reveal(&spot, runout, taken);
                    let target =
                        self.grow(graph, child, runout, crossings + 1, taken + consumed, depth + 1);
                    graph.add_edge(node, target, None);
                }
            }
            Turn::Choice(_) => {
                for action in self.menu(&spot, crossings, depth) {
                    let child = spot.apply(action);
                    let target = self.grow(graph, child, runout, crossings, taken, depth + 1);
                    graph.add_edge(node, target, Some(action));
                }
            }
        }
        node
    }

    /// The frozen menu at one decision: restricted on the root street,
    /// passive once the tree is past its street horizon or too deep.
    fn menu(&self, spot: &Spot, crossings: usize, depth: usize) -> Vec<Action> {
        let base = self.game.choices(spot);
        if crossings >= SUBGAME_STREETS || depth >= MAX_DEPTH_SUBGAME {
            Self::passive(base)
        } else {
            Self::restrict(base, self.restriction)
        }
    }

    /// Fold, check, or call only. The jam survives as the continue action
    /// when calling is off the menu, so depth limiting never forces a
    /// fold.
    fn passive(base: Vec<Action>) -> Vec<Action> {
        let kept = base
            .iter()
            .copied()
            .filter(|a| !a.is_aggro())
            .collect::<Vec<_>>();
        if kept.iter().any(|a| !a.is_folded()) {
            kept
        } else {
            base.into_iter()
                .filter(|a| a.is_folded() || a.is_shove())
                .collect()
        }
    }

    /// Keeps passives and the jam, and the first `quota` raises of each
    /// size family in menu order.
    fn restrict(base: Vec<Action>, restriction: Restriction) -> Vec<Action> {
        let quota = restriction.quota();
        let mut counts: HashMap<Family, usize> = HashMap::new();
        let mut kept = Vec::new();
        for action in base {
            match action.family() {
                Family::Passive | Family::Jam => kept.push(action),
                family => {
                    let seen = counts.entry(family).or_insert(0);
                    if *seen < quota {
                        kept.push(action);
                        *seen += 1;
                    }
                }
            }
        }
        kept
    }

    /// One representative per non-passive family legal at the root.
    fn sentinels(&self, root: &Spot) -> Vec<Action> {
        let mut families = Vec::new();
        let mut sentinels = Vec::new();
        if root.turn().is_choice() {
            for action in self.menu(root, 0, 0) {
                let family = action.family();
                if family != Family::Passive && !families.contains(&family) {
                    families.push(family);
                    sentinels.push(action);
                }
            }
        }
        sentinels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subgame::Branch;
    use snap_nlhe::Card;
    use snap_nlhe::Hole;
    use snap_nlhe::Micro;
    use snap_nlhe::Odds;
    use snap_nlhe::Street;

    /// Preflop spot with both holes dealt, seat 0 to act.
    fn dealt() -> Spot {
        Micro::default()
            .root()
            .with_hole(0, Hole::from(Card::from(0u8)))
            .with_hole(1, Hole::from(Card::from(4u8)))
            .with_next(0)
    }

    fn runout() -> Runout {
        Runout::from(vec![
            Card::from(8u8),
            Card::from(9u8),
            Card::from(10u8),
            Card::from(5u8),
            Card::from(6u8),
        ])
    }

    fn nodes(subgame: &Subgame) -> impl Iterator<Item = NodeIndex> + '_ {
        (0..subgame.len()).map(NodeIndex::new)
    }

    #[test]
    fn mid_street_roots_are_rejected_when_opted_in() {
        let game = Micro::default();
        let mid = dealt().apply(Action::Call);
        let err = SubgameBuilder::new(&game)
            .from_street_start()
            .build(mid, runout())
            .unwrap_err();
        assert!(matches!(
            err,
            SolverError::StreetBoundary {
                street: Street::Pref,
                taken: 1,
            }
        ));
        assert!(SubgameBuilder::new(&game)
            .from_street_start()
            .build(dealt(), runout())
            .is_ok());
    }

    #[test]
    fn mid_street_roots_are_fine_by_default() {
        let game = Micro::default();
        let mid = dealt().apply(Action::Call);
        assert!(SubgameBuilder::new(&game).build(mid, runout()).is_ok());
    }

    #[test]
    fn chance_collapses_to_the_predetermined_runout() {
        let game = Micro::default();
        let subgame = SubgameBuilder::new(&game).build(dealt(), runout()).unwrap();
        let mut reveals = 0;
        for node in nodes(&subgame) {
            if let Branch::Reveal(child) = subgame.branch(node) {
                reveals += 1;
                let board = subgame.spot(child).board().mask();
                for card in [8u8, 9, 10] {
                    assert!(board & Card::from(card).mask() != 0);
                }
            }
        }
        assert!(reveals > 0);
    }

    #[test]
    fn the_tree_bottoms_out_in_frontier_leaves() {
        let game = Micro::default();
        let subgame = SubgameBuilder::new(&game).build(dealt(), runout()).unwrap();
        let frontiers = nodes(&subgame)
            .filter(|n| matches!(subgame.branch(*n), Branch::Frontier))
            .collect::<Vec<_>>();
        assert!(!frontiers.is_empty());
        for node in frontiers {
            assert_eq!(subgame.spot(node).street(), Street::Flop);
        }
    }

    #[test]
    fn streets_past_the_horizon_go_passive() {
        let game = Micro::default();
        let subgame = SubgameBuilder::new(&game).build(dealt(), runout()).unwrap();
        for node in nodes(&subgame) {
            if let Branch::Decision(_, menu) = subgame.branch(node) {
                if subgame.spot(node).street() != Street::Pref {
                    assert!(menu.iter().all(|(a, _)| !a.is_aggro()));
                }
            }
        }
    }

    #[test]
    fn sentinels_cover_every_family_in_every_mode() {
        let game = Micro::default();
        for restriction in [Restriction::Tight, Restriction::Balanced, Restriction::Loose] {
            let subgame = SubgameBuilder::new(&game)
                .restriction(restriction)
                .build(dealt(), runout())
                .unwrap();
            let covered = subgame
                .sentinels()
                .iter()
                .map(Action::family)
                .collect::<Vec<_>>();
            for action in game.choices(&dealt()) {
                if action.family() != Family::Passive {
                    assert!(covered.contains(&action.family()));
                }
            }
        }
    }

    #[test]
    fn restriction_trims_raises_without_dropping_families() {
        let full = vec![
            Action::Fold,
            Action::Call,
            Action::Raise(Odds::new(1, 4)),
            Action::Raise(Odds::new(1, 3)),
            Action::Raise(Odds::new(1, 2)),
            Action::Raise(Odds::new(2, 3)),
            Action::Raise(Odds::new(1, 1)),
            Action::Raise(Odds::new(3, 2)),
            Action::Raise(Odds::new(2, 1)),
            Action::Shove,
        ];
        let tight = SubgameBuilder::<Micro>::restrict(full.clone(), Restriction::Tight);
        assert_eq!(
            tight,
            vec![
                Action::Fold,
                Action::Call,
                Action::Raise(Odds::new(1, 4)),
                Action::Raise(Odds::new(2, 3)),
                Action::Raise(Odds::new(3, 2)),
                Action::Shove,
            ]
        );
        let balanced = SubgameBuilder::<Micro>::restrict(full.clone(), Restriction::Balanced);
        assert_eq!(balanced.iter().filter(|a| a.is_raise()).count(), 6);
        let loose = SubgameBuilder::<Micro>::restrict(full.clone(), Restriction::Loose);
        assert_eq!(loose, full);
        for restricted in [tight, balanced, loose] {
            for family in [Family::Small, Family::Medium, Family::Over] {
                assert!(restricted.iter().any(|a| a.family() == family));
            }
        }
    }
}
