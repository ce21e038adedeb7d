//! Waygraph library entry points.
//!
//! This crate turns tagged ways and nodes stored in SQLite into a weighted
//! road graph, classifies each edge's transport-mode permissions from its
//! way's tags, and answers shortest-path queries over a bounded, mode-filtered
//! subgraph. The CLI should only depend on the items exported here instead of
//! reimplementing behavior.
//!

#![deny(warnings)]

pub mod builder;
pub mod dataset;
pub mod db;
pub mod dijkstra;
pub mod error;
pub mod geo;
pub mod graph;
pub mod output;
pub mod permit;
pub mod queue;
pub mod reconstruct;
pub mod routing;
pub mod subgraph;

pub use builder::{build_edges, GraphBuilder, NewEdge, WayNodeRow};
pub use dataset::{default_database_path, resolve_database_path};
pub use db::{
    build_graph, classify_permits, install_default_permit_rules, BuildReport, ClassifyReport,
    MapStore, NodeId, WayId,
};
pub use dijkstra::{DijkstraEngine, DijkstraLabel, Predecessor, SearchContext, SearchOutcome};
pub use error::{Error, Result};
pub use geo::{great_circle_distance, BoundingBox, Coordinate, PathPoint};
pub use graph::Graph;
pub use output::{render_route, RouteRenderMode};
pub use permit::{default_permit_rules, PermitClassifier, PermitMask, PermitRule, TransportMode};
pub use queue::PriorityQueue;
pub use reconstruct::{PathReconstructor, ReconstructedPath, WayGeometry};
pub use routing::{find_route, RouteOptions, RouteOutcome, RoutePlan, RouteRequest};
pub use subgraph::{EdgeSource, EnvelopeIndex, StoredEdge, Subgraph, SubgraphExtractor};
