//! Route command handler for computing paths between two coordinates.

use std::path::Path;

use anyhow::{Context, Result};

use waygraph_lib::{find_route, Coordinate, MapStore, PermitMask, RouteOptions, RouteRequest};

use crate::output::{format_route, OutputFormat};

/// Arguments for the route command.
#[derive(Debug, Clone, Copy)]
pub struct RouteCommandArgs {
    pub from: Coordinate,
    pub to: Coordinate,
    pub mode: PermitMask,
    pub options: RouteOptions,
}

/// Parse a `LON,LAT` pair.
pub fn parse_coordinate(input: &str) -> std::result::Result<Coordinate, String> {
    let (lon, lat) = input
        .split_once(',')
        .ok_or_else(|| format!("expected LON,LAT but got '{input}'"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("coordinate '{input}' is outside WGS84 bounds"));
    }
    Ok(Coordinate::new(lon, lat))
}

/// Handle the route subcommand.
pub fn handle_route_command(
    db_path: &Path,
    args: &RouteCommandArgs,
    format: OutputFormat,
) -> Result<()> {
    let store = MapStore::open(db_path)
        .with_context(|| format!("failed to open map database {}", db_path.display()))?;
    let request = RouteRequest::new(args.from, args.to, args.mode);
    let outcome = find_route(&store, &request, &args.options).with_context(|| {
        format!(
            "route query from {},{} to {},{} failed",
            args.from.lon, args.from.lat, args.to.lon, args.to.lat
        )
    })?;
    print!("{}", format_route(&outcome, format)?);
    Ok(())
}
