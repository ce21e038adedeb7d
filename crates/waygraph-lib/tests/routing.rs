mod common;

use std::collections::HashMap;

use common::{degrees, square_with_diagonal, MapFixture};
use waygraph_lib::{
    find_route, BoundingBox, Coordinate, EnvelopeIndex, Error, MapStore, PermitMask, RouteOptions,
    RouteOutcome, RouteRequest, SubgraphExtractor,
};

fn route(store: &MapStore, from: Coordinate, to: Coordinate, mask: PermitMask) -> RouteOutcome {
    let request = RouteRequest::new(from, to, mask);
    find_route(store, &request, &RouteOptions::default()).expect("route query succeeds")
}

#[test]
fn excluded_diagonal_forces_the_long_way_round() {
    let (fixture, [a, _, c, _]) = square_with_diagonal();
    let outcome = route(&fixture.store, a, c, PermitMask::FOOT);
    let plan = outcome.plan().expect("route exists");

    assert_eq!(plan.distance_m, 200);
    assert_eq!(plan.edge_count, 2);
    assert_eq!(plan.start_node_id, 1);
    assert_eq!(plan.destination_node_id, 3);
    let ids: Vec<_> = plan.points.iter().map(|p| p.node_id).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids.first(), Some(&1));
    assert_eq!(ids.last(), Some(&3));
}

#[test]
fn car_uses_the_diagonal() {
    let (fixture, [a, _, c, _]) = square_with_diagonal();
    let plan = route(&fixture.store, a, c, PermitMask::CAR);
    let plan = plan.plan().expect("route exists");
    assert_eq!(plan.distance_m, 141);
    let ids: Vec<_> = plan.points.iter().map(|p| p.node_id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn endpoints_snap_to_nearest_nodes() {
    let (fixture, [a, _, c, _]) = square_with_diagonal();
    let jitter = degrees(10.0);
    let from = Coordinate::new(a.lon - jitter, a.lat + jitter);
    let to = Coordinate::new(c.lon + jitter, c.lat - jitter);
    let plan = route(&fixture.store, from, to, PermitMask::BIKE);
    let plan = plan.plan().expect("route exists");
    assert_eq!((plan.start_node_id, plan.destination_node_id), (1, 3));
    assert_eq!(plan.distance_m, 200);
}

#[test]
fn same_start_and_destination_is_a_single_point() {
    let (fixture, [a, ..]) = square_with_diagonal();
    let outcome = route(&fixture.store, a, a, PermitMask::FOOT);
    let plan = outcome.plan().expect("trivial route");
    assert_eq!(plan.distance_m, 0);
    assert_eq!(plan.edge_count, 0);
    assert_eq!(plan.points.len(), 1);
    assert_eq!(plan.points[0].node_id, 1);
}

#[test]
fn disconnected_components_are_unreachable() {
    let d = degrees(100.0);
    let mut fixture = MapFixture::new();
    fixture
        .node(1, 0.0, 0.0)
        .node(2, d, 0.0)
        .node(3, 3.0 * d, 0.0)
        .node(4, 4.0 * d, 0.0)
        .road(1, &[1, 2])
        .road(2, &[3, 4])
        .build();

    let outcome = route(
        &fixture.store,
        Coordinate::new(0.0, 0.0),
        Coordinate::new(4.0 * d, 0.0),
        PermitMask::FOOT,
    );
    assert_eq!(
        outcome,
        RouteOutcome::Unreachable {
            start_node_id: 1,
            destination_node_id: 4
        }
    );
}

#[test]
fn loop_on_a_repeated_node_stays_out_of_the_geometry() {
    // Way 1 runs 1-2-3-4-2-5; node 2 closes a loop and splits the way.
    let d = degrees(100.0);
    let mut fixture = MapFixture::new();
    fixture
        .node(1, 0.0, 0.0)
        .node(2, d, 0.0)
        .node(3, d, d)
        .node(4, 2.0 * d, d)
        .node(5, 2.0 * d, 0.0)
        .road(1, &[1, 2, 3, 4, 2, 5])
        .build();

    let outcome = route(
        &fixture.store,
        Coordinate::new(0.0, 0.0),
        Coordinate::new(2.0 * d, 0.0),
        PermitMask::FOOT,
    );
    let plan = outcome.plan().expect("route exists");
    assert_eq!(plan.distance_m, 200);
    let ids: Vec<_> = plan.points.iter().map(|p| p.node_id).collect();
    assert_eq!(ids, vec![1, 2, 5]);
}

fn oneway_fixture(
    with_detour: bool,
    bicycle_contraflow: bool,
) -> (MapFixture, Coordinate, Coordinate) {
    let d = degrees(100.0);
    let p = Coordinate::new(0.0, 0.0);
    let q = Coordinate::new(d, 0.0);
    let mut fixture = MapFixture::new();
    fixture.node(1, p.lon, p.lat).node(2, q.lon, q.lat);
    let mut tags = vec![("highway", "primary"), ("oneway", "yes")];
    if bicycle_contraflow {
        tags.push(("oneway:bicycle", "no"));
    }
    fixture.way(10, &[1, 2], &tags);
    if with_detour {
        fixture
            .node(3, d / 2.0, d)
            .road(11, &[2, 3])
            .road(12, &[3, 1]);
    }
    fixture.build();
    (fixture, p, q)
}

#[test]
fn oneway_is_traversable_forward_only() {
    let (fixture, p, q) = oneway_fixture(false, false);
    let forward = route(&fixture.store, p, q, PermitMask::CAR);
    assert_eq!(forward.plan().map(|plan| plan.distance_m), Some(100));

    let backward = route(&fixture.store, q, p, PermitMask::CAR);
    assert!(!backward.is_found());
}

#[test]
fn reverse_direction_is_routed_around() {
    let (fixture, p, q) = oneway_fixture(true, false);
    let edges = fixture.store.edges().unwrap();
    let detour: u64 = edges
        .iter()
        .filter(|e| e.way_id == 11 || e.way_id == 12)
        .map(|e| u64::from(e.distance))
        .sum();

    let backward = route(&fixture.store, q, p, PermitMask::CAR);
    let plan = backward.plan().expect("detour exists");
    assert_eq!(plan.distance_m, detour);
    let ids: Vec<_> = plan.points.iter().map(|p| p.node_id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
}

#[test]
fn bicycle_contraflow_only_frees_bikes() {
    let (fixture, p, q) = oneway_fixture(false, true);
    let bike = route(&fixture.store, q, p, PermitMask::BIKE);
    assert_eq!(bike.plan().map(|plan| plan.distance_m), Some(100));
    let car = route(&fixture.store, q, p, PermitMask::CAR);
    assert!(!car.is_found());
}

#[test]
fn oversized_subgraph_is_rejected() {
    let (fixture, [a, _, c, _]) = square_with_diagonal();
    let options = RouteOptions {
        max_subgraph_nodes: 2,
        ..RouteOptions::default()
    };
    let err = find_route(
        &fixture.store,
        &RouteRequest::new(a, c, PermitMask::FOOT),
        &options,
    )
    .unwrap_err();
    assert!(matches!(err, Error::ResourceExhaustion { nodes: 4, limit: 2 }));
}

#[test]
fn empty_rectangle_is_reported() {
    let (fixture, ..) = square_with_diagonal();
    let err = find_route(
        &fixture.store,
        &RouteRequest::new(
            Coordinate::new(40.0, 40.0),
            Coordinate::new(40.01, 40.01),
            PermitMask::FOOT,
        ),
        &RouteOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::EmptySubgraph { mask: 1 }));
}

#[test]
fn querying_before_build_fails() {
    let mut store = MapStore::open_in_memory().unwrap();
    store.insert_node(1, 0.0, 0.0).unwrap();
    store.insert_node(2, 0.001, 0.0).unwrap();
    store
        .insert_way(1, &[1, 2], &[("highway", "residential")])
        .unwrap();
    let err = find_route(
        &store,
        &RouteRequest::new(
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.001, 0.0),
            PermitMask::FOOT,
        ),
        &RouteOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::GraphNotBuilt));
}

#[test]
fn subgraph_only_contains_ways_overlapping_the_rectangle() {
    let mut fixture = MapFixture::new();
    let mut envelopes = HashMap::new();
    for row in 0..6i64 {
        let lat = row as f64 * 0.01;
        let (a, b) = (row * 2 + 1, row * 2 + 2);
        fixture
            .node(a, 0.0, lat)
            .node(b, 0.005, lat)
            .road(row + 1, &[a, b]);
        let envelope = BoundingBox::enclosing([
            &Coordinate::new(0.0, lat),
            &Coordinate::new(0.005, lat),
        ])
        .unwrap();
        envelopes.insert(row + 1, envelope);
    }
    fixture.build();

    let bbox = BoundingBox::new(-0.001, 0.015, 0.002, 0.035).unwrap();
    let mut overlapping = fixture.store.ways_overlapping(&bbox).unwrap();
    overlapping.sort_unstable();
    assert_eq!(overlapping, vec![3, 4]);

    let sub = SubgraphExtractor::default()
        .extract(&fixture.store, &bbox, PermitMask::FOOT)
        .unwrap();
    assert!(!sub.edges().is_empty());
    for edge in sub.edges() {
        assert!(envelopes[&edge.way_id].intersects(&bbox));
    }
    for (way_id, envelope) in &envelopes {
        if envelope.intersects(&bbox) {
            assert!(sub.edges().iter().any(|e| e.way_id == *way_id));
        }
    }
}

#[test]
fn concurrent_queries_do_not_interfere() {
    let (fixture, [a, b, c, d]) = square_with_diagonal();
    let queries = [
        (a, c, PermitMask::FOOT, 200),
        (a, c, PermitMask::CAR, 141),
        (b, d, PermitMask::FOOT, 200),
        (a, b, PermitMask::BIKE, 100),
    ];

    std::thread::scope(|scope| {
        for (from, to, mask, expected) in queries {
            let path = fixture.path.clone();
            scope.spawn(move || {
                let store = MapStore::open(&path).expect("open store");
                for _ in 0..10 {
                    let outcome = route(&store, from, to, mask);
                    assert_eq!(outcome.plan().map(|p| p.distance_m), Some(expected));
                }
            });
        }
    });
}
