use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};
use waygraph_lib::geo::EARTH_RADIUS_M;
use waygraph_lib::MapStore;

/// Side of the fixture square in degrees (100 m along the equator).
fn side() -> f64 {
    100.0 / (EARTH_RADIUS_M * PI / 180.0)
}

/// Square of residential roads with a motorway diagonal from node 1 to node 3.
fn square_database() -> (TempDir, PathBuf) {
    let temp_dir = tempdir().expect("create temp dir");
    let path = temp_dir.path().join("map.db");
    let mut store = MapStore::create(&path).expect("create database");
    let s = side();
    for (node, lon, lat) in [(1, 0.0, 0.0), (2, s, 0.0), (3, s, s), (4, 0.0, s)] {
        store.insert_node(node, lon, lat).expect("insert node");
    }
    let residential = [("highway", "residential")];
    for (way, nodes) in [(1, [1, 2]), (2, [2, 3]), (3, [3, 4]), (4, [4, 1])] {
        store
            .insert_way(way, &nodes, &residential)
            .expect("insert way");
    }
    store
        .insert_way(5, &[1, 3], &[("highway", "motorway")])
        .expect("insert diagonal");
    (temp_dir, path)
}

fn cli(db: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("waygraph");
    cmd.env("RUST_LOG", "error").arg("--db").arg(db);
    cmd
}

fn prepared_database() -> (TempDir, PathBuf) {
    let (temp_dir, path) = square_database();
    cli(&path).arg("build").assert().success();
    cli(&path)
        .args(["permits", "--install-defaults"])
        .assert()
        .success();
    (temp_dir, path)
}

fn corner(x: f64, y: f64) -> String {
    format!("{},{}", x * side(), y * side())
}

#[test]
fn build_reports_edge_count() {
    let (_temp, path) = square_database();
    cli(&path)
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Built 5 edges from 5 routable ways",
        ));
}

#[test]
fn permits_reports_classified_ways() {
    let (_temp, path) = square_database();
    cli(&path).arg("build").assert().success();
    cli(&path)
        .args(["permits", "--install-defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Classified 5 ways (5 edges)"));
}

#[test]
fn foot_route_avoids_motorway() {
    let (_temp, path) = prepared_database();
    cli(&path)
        .args(["route", "--mode", "foot"])
        .args(["--from", &corner(0.0, 0.0), "--to", &corner(1.0, 1.0)])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Route: 1 -> 3 (200 m, 2 edges, mask 1)",
        ));
}

#[test]
fn car_route_as_json() {
    let (_temp, path) = prepared_database();
    let output = cli(&path)
        .args(["--format", "json", "route", "--mode", "car"])
        .args(["--from", &corner(0.0, 0.0), "--to", &corner(1.0, 1.0)])
        .output()
        .expect("run waygraph");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["status"], "found");
    assert_eq!(value["distance_m"], 141);
    assert_eq!(value["mask"], 4);
    assert_eq!(value["points"].as_array().map(Vec::len), Some(2));
}

#[test]
fn csv_route_lists_points() {
    let (_temp, path) = prepared_database();
    cli(&path)
        .args(["--format", "csv", "route"])
        .args(["--from", &corner(0.0, 0.0), "--to", &corner(1.0, 0.0)])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("lon,lat,node_id\n0.0,0.0,1\n"));
}

#[test]
fn database_path_from_environment() {
    let (_temp, path) = square_database();
    cargo_bin_cmd!("waygraph")
        .env("RUST_LOG", "error")
        .env("WAYGRAPH_DATABASE", &path)
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 5 edges"));
}

#[test]
fn route_before_build_fails() {
    let (_temp, path) = square_database();
    cli(&path)
        .args(["route", "--from", "0,0", "--to", &corner(1.0, 1.0)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("build the graph first"));
}

#[test]
fn missing_database_is_reported() {
    let temp_dir = tempdir().expect("create temp dir");
    cli(&temp_dir.path().join("absent.db"))
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open map database"));
}

#[test]
fn unknown_mode_is_rejected() {
    let (_temp, path) = prepared_database();
    cli(&path)
        .args(["route", "--mode", "boat", "--from", "0,0", "--to", "1,1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid transport mode"));
}

#[test]
fn malformed_coordinate_is_rejected() {
    let (_temp, path) = prepared_database();
    cli(&path)
        .args(["route", "--from", "0;0", "--to", "1,1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected LON,LAT"));
}
