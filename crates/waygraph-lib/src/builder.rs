//! Conversion of an ordered way/node stream into weighted edges.
//!
//! Rows arrive sorted by `(way_id, node_order)`. Each way is cut into edges at
//! its crossing nodes, i.e. nodes shared with another routable way. The
//! accumulator keeps at most one open edge at a time, so the scan is a single
//! forward pass with constant memory.

use serde::Serialize;

use crate::db::{NodeId, WayId};
use crate::error::{Error, Result};
use crate::geo::{great_circle_distance, round_meters};

/// One member node of a routable way, in stream order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayNodeRow {
    pub way_id: WayId,
    pub node_id: NodeId,
    /// Position of the node inside its way; must increase within a way.
    pub node_order: i64,
    /// True iff the node is a member of more than one routable way.
    pub is_crossing: bool,
    pub lon: f64,
    pub lat: f64,
}

/// Edge produced by the scan, before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewEdge {
    pub start_node_id: NodeId,
    pub end_node_id: NodeId,
    /// Length in whole meters.
    pub distance: u32,
    pub way_id: WayId,
}

#[derive(Debug, Clone, Copy)]
struct Previous {
    way_id: WayId,
    node_id: NodeId,
    node_order: i64,
    lon: f64,
    lat: f64,
}

#[derive(Debug, Clone, Copy)]
struct OpenEdge {
    start_node_id: NodeId,
    distance: f64,
    segments: usize,
}

impl OpenEdge {
    fn starting_at(start_node_id: NodeId) -> Self {
        Self {
            start_node_id,
            distance: 0.0,
            segments: 0,
        }
    }
}

/// Streaming edge builder.
///
/// Feed rows with [`GraphBuilder::push`] and collect the final edge with
/// [`GraphBuilder::finish`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    previous: Option<Previous>,
    open: Option<OpenEdge>,
    rows: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows consumed so far.
    pub fn rows_seen(&self) -> usize {
        self.rows
    }

    /// Consume one row; returns the edge closed by it, if any.
    pub fn push(&mut self, row: WayNodeRow) -> Result<Option<NewEdge>> {
        if !row.lon.is_finite() || !row.lat.is_finite() {
            return Err(Error::malformed(
                row.way_id,
                row.node_id,
                "node coordinate is not finite",
            ));
        }

        let mut closed = None;
        let same_way = match self.previous {
            Some(prev) if prev.way_id == row.way_id => {
                if row.node_order <= prev.node_order {
                    return Err(Error::malformed(
                        row.way_id,
                        row.node_id,
                        format!(
                            "node_order {} does not follow {}",
                            row.node_order, prev.node_order
                        ),
                    ));
                }
                Some(prev)
            }
            Some(prev) => {
                if row.way_id < prev.way_id {
                    return Err(Error::malformed(
                        row.way_id,
                        row.node_id,
                        format!("way {} appears after way {}", row.way_id, prev.way_id),
                    ));
                }
                closed = self.close(prev);
                None
            }
            None => None,
        };

        match same_way {
            Some(prev) => {
                let step = great_circle_distance(prev.lon, prev.lat, row.lon, row.lat);
                if let Some(open) = self.open.as_mut() {
                    open.distance += step;
                    open.segments += 1;
                }

                if row.is_crossing {
                    closed = self.close_at(row.node_id, row.way_id);
                    self.open = Some(OpenEdge::starting_at(row.node_id));
                }
            }
            None => self.open = Some(OpenEdge::starting_at(row.node_id)),
        }

        self.previous = Some(Previous {
            way_id: row.way_id,
            node_id: row.node_id,
            node_order: row.node_order,
            lon: row.lon,
            lat: row.lat,
        });
        self.rows += 1;
        Ok(closed)
    }

    /// Flush the edge still open after the last row.
    pub fn finish(mut self) -> Option<NewEdge> {
        let prev = self.previous?;
        self.close(prev)
    }

    fn close(&mut self, prev: Previous) -> Option<NewEdge> {
        self.close_at(prev.node_id, prev.way_id)
    }

    fn close_at(&mut self, end_node_id: NodeId, way_id: WayId) -> Option<NewEdge> {
        let open = self.open.take()?;
        if open.segments == 0 {
            return None;
        }
        Some(NewEdge {
            start_node_id: open.start_node_id,
            end_node_id,
            distance: round_meters(open.distance),
            way_id,
        })
    }
}

/// Run the builder over a complete, sorted row sequence.
pub fn build_edges(rows: impl IntoIterator<Item = WayNodeRow>) -> Result<Vec<NewEdge>> {
    let mut builder = GraphBuilder::new();
    let mut edges = Vec::new();
    for row in rows {
        if let Some(edge) = builder.push(row)? {
            edges.push(edge);
        }
    }
    edges.extend(builder.finish());
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(way_id: WayId, node_id: NodeId, order: i64, crossing: bool, lon: f64) -> WayNodeRow {
        WayNodeRow {
            way_id,
            node_id,
            node_order: order,
            is_crossing: crossing,
            lon,
            lat: 50.0,
        }
    }

    #[test]
    fn way_without_crossings_yields_one_edge() {
        let edges = build_edges([
            row(1, 10, 0, false, 7.000),
            row(1, 11, 1, false, 7.001),
            row(1, 12, 2, false, 7.002),
        ])
        .unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].start_node_id, 10);
        assert_eq!(edges[0].end_node_id, 12);
        let expected = great_circle_distance(7.0, 50.0, 7.001, 50.0)
            + great_circle_distance(7.001, 50.0, 7.002, 50.0);
        assert_eq!(edges[0].distance, round_meters(expected));
    }

    #[test]
    fn crossing_node_splits_way() {
        let edges = build_edges([
            row(1, 1, 0, false, 7.000),
            row(1, 2, 1, false, 7.001),
            row(1, 3, 2, true, 7.002),
            row(1, 4, 3, false, 7.003),
            row(1, 5, 4, false, 7.004),
        ])
        .unwrap();
        let spans: Vec<_> = edges
            .iter()
            .map(|e| (e.start_node_id, e.end_node_id))
            .collect();
        assert_eq!(spans, vec![(1, 3), (3, 5)]);
    }

    #[test]
    fn leading_crossing_node_does_not_emit_empty_edge() {
        let edges = build_edges([
            row(1, 1, 0, true, 7.000),
            row(1, 2, 1, false, 7.001),
            row(1, 3, 2, true, 7.002),
            row(2, 3, 0, true, 7.002),
            row(2, 9, 1, false, 7.003),
        ])
        .unwrap();
        let spans: Vec<_> = edges
            .iter()
            .map(|e| (e.way_id, e.start_node_id, e.end_node_id))
            .collect();
        assert_eq!(spans, vec![(1, 1, 3), (2, 3, 9)]);
    }

    #[test]
    fn no_distance_leaks_across_way_boundary() {
        let edges = build_edges([
            row(1, 1, 0, false, 7.0),
            row(1, 2, 1, false, 7.0),
            row(2, 3, 0, false, 9.0),
            row(2, 4, 1, false, 9.0),
        ])
        .unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e.distance == 0));
    }

    #[test]
    fn single_node_way_is_skipped() {
        let edges = build_edges([row(1, 1, 0, false, 7.0), row(2, 2, 0, false, 7.1)]).unwrap();
        assert!(edges.is_empty());
    }

    #[test]
    fn unsorted_ways_are_rejected() {
        let err = build_edges([
            row(2, 1, 0, false, 7.0),
            row(2, 2, 1, false, 7.1),
            row(1, 3, 0, false, 7.2),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MalformedInput { way_id: 1, .. }));
    }

    #[test]
    fn unsorted_node_order_is_rejected() {
        let err = build_edges([row(1, 1, 3, false, 7.0), row(1, 2, 1, false, 7.1)]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { node_id: 2, .. }));
    }
}
