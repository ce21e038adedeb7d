//! Turns a finished search into an ordered coordinate path.

use crate::db::{NodeId, WayId};
use crate::dijkstra::SearchContext;
use crate::error::{Error, Result};
use crate::geo::PathPoint;
use crate::subgraph::{Subgraph, SubgraphEdge};

/// Ordered polyline lookup along a way's stored node sequence.
pub trait WayGeometry {
    /// Points from `from` to `to` inclusive, following the way's node order.
    ///
    /// Returns an empty vector when `from` does not precede `to` in that order.
    fn segment(&self, way_id: WayId, from: NodeId, to: NodeId) -> Result<Vec<PathPoint>>;
}

/// Source-to-destination path with the subgraph edges it traverses.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedPath {
    pub points: Vec<PathPoint>,
    /// Indices into [`Subgraph::edges`], in travel order.
    pub edges: Vec<usize>,
}

pub struct PathReconstructor<'a, G: ?Sized> {
    geometry: &'a G,
}

impl<'a, G> PathReconstructor<'a, G>
where
    G: WayGeometry + ?Sized,
{
    pub fn new(geometry: &'a G) -> Self {
        Self { geometry }
    }

    /// Follow predecessor links back from the search destination.
    ///
    /// The caller is expected to have checked that the destination was reached;
    /// otherwise only the destination point is returned.
    pub fn reconstruct(
        &self,
        subgraph: &Subgraph,
        ctx: &SearchContext,
    ) -> Result<ReconstructedPath> {
        let mut points: Vec<PathPoint> = Vec::new();
        let mut edges = Vec::new();
        let mut current = ctx.destination();

        while let Some(link) = ctx.predecessor(current) {
            let edge = subgraph.edge(link.edge).ok_or(Error::GraphNotBuilt)?;
            let here = subgraph
                .node(current)
                .map(|node| node.node_id)
                .ok_or(Error::GraphNotBuilt)?;

            let mut segment = self.edge_polyline(edge)?;
            if segment.first().map(|p| p.node_id) != Some(here) {
                segment.reverse();
            }
            for point in segment {
                if points.last().map(|last| last.node_id) == Some(point.node_id) {
                    continue;
                }
                points.push(point);
            }

            edges.push(link.edge);
            current = link.node;
        }

        if points.is_empty() {
            if let Some(node) = subgraph.node(current) {
                points.push(PathPoint {
                    lon: node.position.lon,
                    lat: node.position.lat,
                    node_id: node.node_id,
                });
            }
        }

        points.reverse();
        edges.reverse();
        Ok(ReconstructedPath { points, edges })
    }

    /// Polyline of `edge` oriented from its start node to its end node.
    fn edge_polyline(&self, edge: &SubgraphEdge) -> Result<Vec<PathPoint>> {
        let forward = self
            .geometry
            .segment(edge.way_id, edge.start_node_id, edge.end_node_id)?;
        if !forward.is_empty() {
            return Ok(forward);
        }

        let mut reverse = self
            .geometry
            .segment(edge.way_id, edge.end_node_id, edge.start_node_id)?;
        if reverse.is_empty() {
            return Err(Error::MissingGeometry {
                way_id: edge.way_id,
                start_node_id: edge.start_node_id,
                end_node_id: edge.end_node_id,
            });
        }
        reverse.reverse();
        Ok(reverse)
    }
}
