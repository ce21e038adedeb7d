use serde::Serialize;

use crate::db::NodeId;
use crate::dijkstra::{DijkstraEngine, SearchOutcome};
use crate::error::{Error, Result};
use crate::geo::{BoundingBox, Coordinate, PathPoint};
use crate::permit::PermitMask;
use crate::reconstruct::{PathReconstructor, WayGeometry};
use crate::subgraph::{EdgeSource, EnvelopeIndex, SubgraphExtractor, DEFAULT_MAX_SUBGRAPH_NODES};

/// Default growth factor applied to the start/destination rectangle.
pub const DEFAULT_BBOX_ENLARGE: f64 = 2.0;

/// Route query between two free-form coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub destination: Coordinate,
    /// Modes the route must permit on every edge.
    pub mask: PermitMask,
}

impl RouteRequest {
    pub fn new(start: Coordinate, destination: Coordinate, mask: PermitMask) -> Self {
        Self {
            start,
            destination,
            mask,
        }
    }
}

/// Tuning knobs for a route query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteOptions {
    /// Multiplier on the half-extent of the start/destination square.
    pub bbox_enlarge: f64,
    /// Largest subgraph (in nodes) a query may build.
    pub max_subgraph_nodes: usize,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            bbox_enlarge: DEFAULT_BBOX_ENLARGE,
            max_subgraph_nodes: DEFAULT_MAX_SUBGRAPH_NODES,
        }
    }
}

/// Shortest route found for a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub mask: PermitMask,
    /// Total length in meters, the sum of the stored edge lengths.
    pub distance_m: u64,
    pub start_node_id: NodeId,
    pub destination_node_id: NodeId,
    pub edge_count: usize,
    pub bbox: BoundingBox,
    pub points: Vec<PathPoint>,
}

/// Result of a route query that ran to completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Found(RoutePlan),
    /// The snapped nodes lie in different components of the subgraph.
    Unreachable {
        start_node_id: NodeId,
        destination_node_id: NodeId,
    },
}

impl RouteOutcome {
    pub fn plan(&self) -> Option<&RoutePlan> {
        match self {
            RouteOutcome::Found(plan) => Some(plan),
            RouteOutcome::Unreachable { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.plan().is_some()
    }
}

/// Snap both endpoints to the query subgraph and compute the shortest route.
///
/// All search state is local to this call.
pub fn find_route<S>(
    source: &S,
    request: &RouteRequest,
    options: &RouteOptions,
) -> Result<RouteOutcome>
where
    S: EnvelopeIndex + EdgeSource + WayGeometry + ?Sized,
{
    let bbox =
        BoundingBox::around_points(request.start, request.destination, options.bbox_enlarge)?;
    let extractor = SubgraphExtractor::new(options.max_subgraph_nodes);
    let subgraph = extractor.extract(source, &bbox, request.mask)?;

    let empty = || Error::EmptySubgraph {
        mask: request.mask.bits(),
    };
    let start = subgraph.nearest_node(&request.start).ok_or_else(empty)?;
    let destination = subgraph
        .nearest_node(&request.destination)
        .ok_or_else(empty)?;
    let node_id = |dense: usize| subgraph.node(dense).map(|node| node.node_id);
    let start_node_id = node_id(start).ok_or_else(empty)?;
    let destination_node_id = node_id(destination).ok_or_else(empty)?;

    let graph = subgraph.to_graph();
    let ctx = DijkstraEngine::new(&graph).search(start, destination);

    let distance_m = match ctx.outcome() {
        SearchOutcome::Reached { distance } => distance,
        SearchOutcome::Unreachable => {
            tracing::debug!(
                start_node_id,
                destination_node_id,
                settled = ctx.settled(),
                "destination unreachable"
            );
            return Ok(RouteOutcome::Unreachable {
                start_node_id,
                destination_node_id,
            });
        }
    };

    let path = PathReconstructor::new(source).reconstruct(&subgraph, &ctx)?;
    tracing::debug!(
        start_node_id,
        destination_node_id,
        distance_m,
        points = path.points.len(),
        "route found"
    );

    Ok(RouteOutcome::Found(RoutePlan {
        mask: request.mask,
        distance_m,
        start_node_id,
        destination_node_id,
        edge_count: path.edges.len(),
        bbox,
        points: path.points,
    }))
}
