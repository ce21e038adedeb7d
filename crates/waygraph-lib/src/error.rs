use std::path::PathBuf;

use thiserror::Error;

use crate::db::{NodeId, WayId};

/// Convenient result alias for the waygraph library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Database could not be located at the resolved path.
    #[error("map database not found at {path}")]
    DatabaseNotFound { path: PathBuf },

    /// No suitable project directories could be resolved for this platform.
    #[error("failed to resolve project directories for the map database")]
    ProjectDirsUnavailable,

    /// Raised when the database lacks the tables written by the map importer.
    #[error("unsupported map schema; expected nodes/way_nodes/way_tags tables")]
    UnsupportedSchema,

    /// Raised when a routing query runs before `build_graph` populated the edges.
    #[error("graph_edges table is missing; build the graph first")]
    GraphNotBuilt,

    /// Raised when the way/node stream violates its ordering precondition or
    /// references a node without coordinates.
    #[error("malformed way stream at way {way_id}, node {node_id}: {reason}")]
    MalformedInput {
        way_id: WayId,
        node_id: NodeId,
        reason: String,
    },

    /// Raised when an edge on the shortest path has no stored polyline in
    /// either direction.
    #[error("no geometry for edge {start_node_id} -> {end_node_id} on way {way_id}")]
    MissingGeometry {
        way_id: WayId,
        start_node_id: NodeId,
        end_node_id: NodeId,
    },

    /// Raised when the query rectangle selects a subgraph larger than allowed.
    #[error("subgraph with {nodes} nodes exceeds the limit of {limit} nodes")]
    ResourceExhaustion { nodes: usize, limit: usize },

    /// Raised when no edge survives the rectangle and mode filters.
    #[error("no routable edges inside the query rectangle for mode mask {mask}")]
    EmptySubgraph { mask: u8 },

    /// Raised when a rectangle has min > max on either axis or non-finite bounds.
    #[error("invalid bounding box: {reason}")]
    InvalidBoundingBox { reason: String },

    /// Raised when a transport mode string cannot be turned into a permit mask.
    #[error("invalid transport mode '{input}'; expected foot, bike, car or a mask in 1..=255")]
    InvalidPermitMask { input: String },

    /// Wrapper for SQLite errors.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Wrapper for CSV writer errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(way_id: WayId, node_id: NodeId, reason: impl Into<String>) -> Self {
        Error::MalformedInput {
            way_id,
            node_id,
            reason: reason.into(),
        }
    }
}
