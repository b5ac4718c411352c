use petgraph::graph::DiGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use snap_core::*;
use snap_nlhe::Action;
use snap_nlhe::Runout;
use snap_nlhe::Spot;
use snap_nlhe::Turn;

/// A fully built resolve target: every public state reachable from one
/// root under a frozen action menu and one predetermined run-out.
///
/// Future cards are fixed at build time, so chance nodes inside the
/// horizon collapse to a single child and chance nodes beyond it become
/// frontier leaves for the leaf evaluator. Uncertainty over run-outs
/// lives in [`Coordinator`](crate::Coordinator) fan-out, never inside
/// one tree.
#[derive(Debug)]
pub struct Subgame {
    graph: DiGraph<Spot, Option<Action>>,
    root: NodeIndex,
    runout: Runout,
    sentinels: Vec<Action>,
    digest: u64,
}

/// What the resolver finds at a node.
#[derive(Debug)]
pub enum Branch {
    /// The hand ends inside the subgame.
    Terminal,
    /// The tree is cut here; value comes from the leaf evaluator.
    Frontier,
    /// The predetermined next cards go down.
    Reveal(NodeIndex),
    /// A seat chooses among the frozen actions.
    Decision(Position, Vec<(Action, NodeIndex)>),
}

impl Subgame {
    pub(crate) fn assemble(
        graph: DiGraph<Spot, Option<Action>>,
        root: NodeIndex,
        runout: Runout,
        sentinels: Vec<Action>,
    ) -> Self {
        use std::hash::Hash;
        use std::hash::Hasher;
        let ref mut hasher = std::hash::DefaultHasher::new();
        graph.node_count().hash(hasher);
        for weight in graph.edge_weights() {
            weight.map(|a| a.code()).unwrap_or(0).hash(hasher);
        }
        runout.hash(hasher);
        let digest = hasher.finish();
        Self {
            graph,
            root,
            runout,
            sentinels,
            digest,
        }
    }

    /// Stable identifier of this frozen action set and run-out; keys the
    /// leaf-value cache.
    pub fn digest(&self) -> u64 {
        self.digest
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }
    pub fn spot(&self, node: NodeIndex) -> &Spot {
        &self.graph[node]
    }
    pub fn runout(&self) -> &Runout {
        &self.runout
    }
    /// One representative per bet-size family legal at the root. The
    /// finalized root strategy floors these so no family reads as dead.
    pub fn sentinels(&self) -> &[Action] {
        &self.sentinels
    }
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Classifies a node for traversal. Edges come back in the order the
    /// builder froze them.
    pub fn branch(&self, node: NodeIndex) -> Branch {
        let mut edges = self
            .graph
            .edges(node)
            .map(|e| (*e.weight(), e.target()))
            .collect::<Vec<_>>();
        edges.reverse();
        match self.graph[node].turn() {
            Turn::Terminal => Branch::Terminal,
            Turn::Chance => match edges.first() {
                Some((_, target)) => Branch::Reveal(*target),
                None => Branch::Frontier,
            },
            Turn::Choice(seat) => Branch::Decision(
                seat,
                edges
                    .into_iter()
                    .map(|(action, target)| {
                        (action.expect("decision edges carry actions"), target)
                    })
                    .collect(),
            ),
        }
    }
}

impl std::fmt::Display for Subgame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} nodes from {} (pot {})",
            self.len(),
            self.graph[self.root].street(),
            self.graph[self.root].pot(),
        )
    }
}
