//! Query-scoped projection of the persisted edge table.
//!
//! A [`Subgraph`] holds the edges of every way overlapping the query
//! rectangle that permit the requested modes, with their endpoint nodes
//! renumbered to the contiguous range `1..=N`. Dense indices are assigned in
//! ascending node-id order so the same inputs always produce the same
//! numbering.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{NodeId, WayId};
use crate::error::{Error, Result};
use crate::geo::{BoundingBox, Coordinate};
use crate::graph::Graph;
use crate::permit::PermitMask;

/// Default cap on the number of nodes a single query may materialise.
pub const DEFAULT_MAX_SUBGRAPH_NODES: usize = 5_000_000;

/// Rectangle-overlap oracle over way envelopes.
///
/// Implementations may return ways whose envelope does not actually overlap
/// `bbox`, but must never omit one that does.
pub trait EnvelopeIndex {
    fn ways_overlapping(&self, bbox: &BoundingBox) -> Result<Vec<WayId>>;
}

/// Persisted edge together with its endpoint coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StoredEdge {
    pub edge_id: i64,
    pub way_id: WayId,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    pub distance: u32,
    pub permit: PermitMask,
    pub start: Coordinate,
    pub end: Coordinate,
}

/// Access to persisted edges by owning way.
pub trait EdgeSource {
    fn edges_of_ways(&self, way_ids: &[WayId]) -> Result<Vec<StoredEdge>>;
}

/// Node of a subgraph with its original identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubgraphNode {
    pub node_id: NodeId,
    pub position: Coordinate,
}

/// Edge of a subgraph annotated with dense endpoint indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubgraphEdge {
    pub edge_id: i64,
    pub way_id: WayId,
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    pub start: usize,
    pub end: usize,
    pub distance: u32,
    pub permit: PermitMask,
    /// Only traversable from `start` to `end` under the query mask.
    pub directed: bool,
}

#[derive(Debug, Clone)]
pub struct Subgraph {
    nodes: Vec<SubgraphNode>,
    index: HashMap<NodeId, usize>,
    edges: Vec<SubgraphEdge>,
}

impl Subgraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[SubgraphEdge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> Option<&SubgraphEdge> {
        self.edges.get(index)
    }

    /// Node stored at `dense` (1-based).
    pub fn node(&self, dense: usize) -> Option<&SubgraphNode> {
        dense.checked_sub(1).and_then(|slot| self.nodes.get(slot))
    }

    pub fn dense_index(&self, node_id: NodeId) -> Option<usize> {
        self.index.get(&node_id).copied()
    }

    /// Dense index of the node closest to `target` in plain lon/lat space.
    ///
    /// Ties resolve to the lowest index.
    pub fn nearest_node(&self, target: &Coordinate) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (slot, node) in self.nodes.iter().enumerate() {
            let distance = node.position.planar_distance_sq(target);
            let closer = match best {
                Some((_, current)) => distance < current,
                None => true,
            };
            if closer {
                best = Some((slot + 1, distance));
            }
        }
        best.map(|(dense, _)| dense)
    }

    /// Adjacency lists for the search; arc edge references index [`Subgraph::edges`].
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::with_edge_capacity(self.node_count(), self.edges.len());
        for (index, edge) in self.edges.iter().enumerate() {
            graph.add_edge(edge.start, edge.end, edge.distance, index, edge.directed);
        }
        graph
    }
}

/// Builds [`Subgraph`]s from an envelope index and an edge source.
#[derive(Debug, Clone, Copy)]
pub struct SubgraphExtractor {
    max_nodes: usize,
}

impl Default for SubgraphExtractor {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_SUBGRAPH_NODES,
        }
    }
}

impl SubgraphExtractor {
    pub fn new(max_nodes: usize) -> Self {
        Self { max_nodes }
    }

    /// Select edges of ways overlapping `bbox` whose permit contains `mask`.
    pub fn extract<S>(&self, source: &S, bbox: &BoundingBox, mask: PermitMask) -> Result<Subgraph>
    where
        S: EnvelopeIndex + EdgeSource + ?Sized,
    {
        let way_ids = source.ways_overlapping(bbox)?;
        let stored = source.edges_of_ways(&way_ids)?;
        let selected: Vec<StoredEdge> = stored
            .into_iter()
            .filter(|edge| edge.permit.contains(mask))
            .collect();

        if selected.is_empty() {
            return Err(Error::EmptySubgraph { mask: mask.bits() });
        }

        let mut positions: HashMap<NodeId, Coordinate> = HashMap::new();
        for edge in &selected {
            positions.entry(edge.start_node_id).or_insert(edge.start);
            positions.entry(edge.end_node_id).or_insert(edge.end);
        }
        if positions.len() > self.max_nodes {
            return Err(Error::ResourceExhaustion {
                nodes: positions.len(),
                limit: self.max_nodes,
            });
        }

        let mut nodes: Vec<SubgraphNode> = Vec::new();
        nodes
            .try_reserve_exact(positions.len())
            .map_err(|_| Error::ResourceExhaustion {
                nodes: positions.len(),
                limit: self.max_nodes,
            })?;
        nodes.extend(
            positions
                .into_iter()
                .map(|(node_id, position)| SubgraphNode { node_id, position }),
        );
        nodes.sort_unstable_by_key(|node| node.node_id);

        let index: HashMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(slot, node)| (node.node_id, slot + 1))
            .collect();

        let mut edges = Vec::with_capacity(selected.len());
        for edge in selected {
            let (Some(&start), Some(&end)) = (
                index.get(&edge.start_node_id),
                index.get(&edge.end_node_id),
            ) else {
                continue;
            };
            edges.push(SubgraphEdge {
                edge_id: edge.edge_id,
                way_id: edge.way_id,
                start_node_id: edge.start_node_id,
                end_node_id: edge.end_node_id,
                start,
                end,
                distance: edge.distance,
                permit: edge.permit,
                directed: edge.permit.is_directed_for(mask),
            });
        }

        tracing::debug!(
            ways = way_ids.len(),
            nodes = nodes.len(),
            edges = edges.len(),
            mask = mask.bits(),
            "extracted subgraph"
        );

        Ok(Subgraph {
            nodes,
            index,
            edges,
        })
    }
}
