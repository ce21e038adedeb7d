//! Single-pair Dijkstra over a [`Graph`] using the indexed [`PriorityQueue`].
//!
//! All mutable search state lives in a [`SearchContext`] created per query, so
//! any number of searches may run over the same graph at once.

use serde::Serialize;

use crate::graph::Graph;
use crate::queue::{PriorityQueue, INFINITY};

/// Link to the node and edge a label was last improved through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Predecessor {
    pub node: usize,
    pub edge: usize,
}

/// Snapshot of the search state kept for one dense node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DijkstraLabel {
    /// Tentative distance in meters, `None` while unreached.
    pub distance: Option<u64>,
    pub predecessor: Option<Predecessor>,
    /// Heap slot, 0 when the node is not queued.
    pub heap_slot: usize,
}

/// Result of a finished search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Reached { distance: u64 },
    Unreachable,
}

/// Per-query labels and heap.
#[derive(Debug, Clone)]
pub struct SearchContext {
    destination: usize,
    queue: PriorityQueue,
    predecessors: Vec<Option<Predecessor>>,
    outcome: SearchOutcome,
    settled: usize,
}

impl SearchContext {
    fn new(node_count: usize, destination: usize) -> Self {
        Self {
            destination,
            queue: PriorityQueue::new(node_count),
            predecessors: vec![None; node_count + 1],
            outcome: SearchOutcome::Unreachable,
            settled: 0,
        }
    }

    pub fn destination(&self) -> usize {
        self.destination
    }

    pub fn outcome(&self) -> SearchOutcome {
        self.outcome
    }

    /// Number of nodes extracted from the heap before the search stopped.
    pub fn settled(&self) -> usize {
        self.settled
    }

    pub fn distance(&self, node: usize) -> Option<u64> {
        match self.queue.key(node) {
            INFINITY => None,
            key => Some(key),
        }
    }

    pub fn predecessor(&self, node: usize) -> Option<Predecessor> {
        self.predecessors.get(node).copied().flatten()
    }

    pub fn label(&self, node: usize) -> DijkstraLabel {
        DijkstraLabel {
            distance: self.distance(node),
            predecessor: self.predecessor(node),
            heap_slot: self.queue.position(node),
        }
    }
}

/// Shortest-path solver bound to one graph.
#[derive(Debug, Clone, Copy)]
pub struct DijkstraEngine<'g> {
    graph: &'g Graph,
}

impl<'g> DijkstraEngine<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// Search from `source` until `destination` is extracted or the heap runs dry.
    ///
    /// Indices outside `1..=node_count` produce an unreachable result.
    pub fn search(&self, source: usize, destination: usize) -> SearchContext {
        let node_count = self.graph.node_count();
        let mut ctx = SearchContext::new(node_count, destination);
        let in_range = |node: usize| (1..=node_count).contains(&node);
        if !in_range(source) || !in_range(destination) {
            return ctx;
        }

        ctx.queue.insert(source, 0);

        while let Some(u) = ctx.queue.extract_min() {
            ctx.settled += 1;
            let base = ctx.queue.key(u);
            if u == destination {
                ctx.outcome = SearchOutcome::Reached { distance: base };
                break;
            }

            for arc in self.graph.neighbours(u) {
                let v = arc.target;
                if !ctx.queue.contains(v) && ctx.queue.key(v) == INFINITY {
                    ctx.queue.insert(v, INFINITY);
                }
                let candidate = base.saturating_add(u64::from(arc.weight));
                if candidate < ctx.queue.key(v) {
                    ctx.predecessors[v] = Some(Predecessor {
                        node: u,
                        edge: arc.edge,
                    });
                    ctx.queue.adjust_key(v, candidate);
                }
            }
        }

        tracing::trace!(
            source,
            destination,
            settled = ctx.settled,
            outcome = ?ctx.outcome,
            "dijkstra search finished"
        );
        ctx
    }
}
