//! Common test utilities and fixture helpers.
//!
//! Builds small map databases in a temporary directory so integration tests
//! exercise the real SQLite tables.

use std::f64::consts::PI;
use std::path::PathBuf;

use tempfile::TempDir;
use waygraph_lib::geo::EARTH_RADIUS_M;
use waygraph_lib::{
    build_graph, classify_permits, install_default_permit_rules, Coordinate, MapStore, NodeId,
    WayId,
};

/// Length of one degree along the equator, in meters.
pub fn meters_per_degree() -> f64 {
    EARTH_RADIUS_M * PI / 180.0
}

/// Degrees spanning `meters` along the equator.
pub fn degrees(meters: f64) -> f64 {
    meters / meters_per_degree()
}

/// Map database backed by a file in a temporary directory.
pub struct MapFixture {
    _temp_dir: TempDir,
    pub path: PathBuf,
    pub store: MapStore,
}

#[allow(dead_code)]
impl MapFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("map.db");
        let store = MapStore::create(&path).expect("create map database");
        Self {
            _temp_dir: temp_dir,
            path,
            store,
        }
    }

    pub fn node(&mut self, node_id: NodeId, lon: f64, lat: f64) -> &mut Self {
        self.store
            .insert_node(node_id, lon, lat)
            .expect("insert node");
        self
    }

    pub fn way(&mut self, way_id: WayId, nodes: &[NodeId], tags: &[(&str, &str)]) -> &mut Self {
        self.store
            .insert_way(way_id, nodes, tags)
            .expect("insert way");
        self
    }

    /// Road tagged `highway=residential` (foot, bike and car).
    pub fn road(&mut self, way_id: WayId, nodes: &[NodeId]) -> &mut Self {
        self.way(way_id, nodes, &[("highway", "residential")])
    }

    /// Build the graph and classify permits with the built-in rules.
    pub fn build(&mut self) -> &mut Self {
        build_graph(&mut self.store).expect("build graph");
        install_default_permit_rules(&mut self.store).expect("install rules");
        classify_permits(&mut self.store).expect("classify permits");
        self
    }

    /// Open an additional connection to the same database file.
    pub fn reopen(&self) -> MapStore {
        MapStore::open(&self.path).expect("reopen map database")
    }
}

/// Square A(1)-B(2)-C(3)-D(4) with 100 m sides near the equator plus a
/// car-only diagonal A-C (way 5).
#[allow(dead_code)]
pub fn square_with_diagonal() -> (MapFixture, [Coordinate; 4]) {
    let side = degrees(100.0);
    let corners = [
        Coordinate::new(0.0, 0.0),
        Coordinate::new(side, 0.0),
        Coordinate::new(side, side),
        Coordinate::new(0.0, side),
    ];
    let mut fixture = MapFixture::new();
    for (index, corner) in corners.iter().enumerate() {
        fixture.node(index as NodeId + 1, corner.lon, corner.lat);
    }
    fixture
        .road(1, &[1, 2])
        .road(2, &[2, 3])
        .road(3, &[3, 4])
        .road(4, &[4, 1])
        .way(5, &[1, 3], &[("highway", "motorway")])
        .build();
    (fixture, corners)
}
