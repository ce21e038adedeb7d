//! Dense-index adjacency container used by the shortest-path search.
//!
//! Arcs live in one flat vector; each node keeps the index of its most recent
//! outgoing arc and every arc links to the previous one added for the same
//! tail. Iterating a node's neighbours therefore walks exactly its own arcs.

/// Outgoing connection stored for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
    /// Dense index of the head node.
    pub target: usize,
    /// Length in meters.
    pub weight: u32,
    /// Index of the subgraph edge this arc was created from.
    pub edge: usize,
    next: Option<usize>,
}

/// Adjacency lists for nodes `1..=node_count`; index 0 is never used.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    head: Vec<Option<usize>>,
    arcs: Vec<Arc>,
}

impl Graph {
    /// Allocate empty neighbour lists for `node_count` dense nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            head: vec![None; node_count + 1],
            arcs: Vec::new(),
        }
    }

    /// Same as [`Graph::new`] but reserves room for `edge_count` undirected edges.
    pub fn with_edge_capacity(node_count: usize, edge_count: usize) -> Self {
        Self {
            head: vec![None; node_count + 1],
            arcs: Vec::with_capacity(edge_count.saturating_mul(2)),
        }
    }

    pub fn node_count(&self) -> usize {
        self.head.len() - 1
    }

    /// Number of stored arcs; an undirected edge counts twice.
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }

    /// Add `u -> v`, and `v -> u` as well unless `directed`.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: u32, edge: usize, directed: bool) {
        self.push_arc(u, v, weight, edge);
        if !directed {
            self.push_arc(v, u, weight, edge);
        }
    }

    fn push_arc(&mut self, from: usize, target: usize, weight: u32, edge: usize) {
        debug_assert!(from != 0 && target != 0, "dense index 0 is reserved");
        let index = self.arcs.len();
        self.arcs.push(Arc {
            target,
            weight,
            edge,
            next: self.head[from],
        });
        self.head[from] = Some(index);
    }

    /// Outgoing arcs of `node`, most recently added first.
    pub fn neighbours(&self, node: usize) -> Neighbours<'_> {
        Neighbours {
            arcs: &self.arcs,
            cursor: self.head.get(node).copied().flatten(),
        }
    }
}

/// Iterator over the arcs leaving one node.
#[derive(Debug, Clone)]
pub struct Neighbours<'a> {
    arcs: &'a [Arc],
    cursor: Option<usize>,
}

impl<'a> Iterator for Neighbours<'a> {
    type Item = &'a Arc;

    fn next(&mut self) -> Option<Self::Item> {
        let arc = &self.arcs[self.cursor?];
        self.cursor = arc.next;
        Some(arc)
    }
}
