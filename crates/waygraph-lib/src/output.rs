use std::fmt::Write;
use std::io;

use csv::WriterBuilder;

use crate::db::{BuildReport, ClassifyReport};
use crate::error::Result;
use crate::routing::{RouteOutcome, RoutePlan};

/// Presentation style for turning a [`RouteOutcome`] into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRenderMode {
    /// Summary line followed by one numbered line per path point.
    PlainText,
    /// `lon,lat,node_id` rows with a header, for spreadsheets and GIS imports.
    Csv,
}

/// Render a route outcome using the requested textual mode.
pub fn render_route(outcome: &RouteOutcome, mode: RouteRenderMode) -> Result<String> {
    match (outcome, mode) {
        (RouteOutcome::Found(plan), RouteRenderMode::PlainText) => Ok(render_plain(plan)),
        (RouteOutcome::Found(plan), RouteRenderMode::Csv) => render_csv(plan),
        (
            RouteOutcome::Unreachable {
                start_node_id,
                destination_node_id,
            },
            _,
        ) => Ok(format!(
            "No route: node {destination_node_id} is unreachable from node {start_node_id}\n"
        )),
    }
}

fn render_plain(plan: &RoutePlan) -> String {
    let mut buffer = String::new();
    let _ = writeln!(
        buffer,
        "Route: {} -> {} ({} m, {} edges, mask {})",
        plan.start_node_id,
        plan.destination_node_id,
        plan.distance_m,
        plan.edge_count,
        plan.mask.bits()
    );
    for (index, point) in plan.points.iter().enumerate() {
        let _ = writeln!(
            buffer,
            "{:>4}: {:.7}, {:.7} ({})",
            index, point.lon, point.lat, point.node_id
        );
    }
    buffer
}

/// One row per path point; the header comes from the `PathPoint` field names.
fn render_csv(plan: &RoutePlan) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    for point in &plan.points {
        writer.serialize(point)?;
    }
    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    let text = String::from_utf8(bytes)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    Ok(text)
}

pub fn render_build_report(report: &BuildReport) -> String {
    format!(
        "Built {} edges from {} routable ways ({} crossing nodes, {} way nodes scanned)\n",
        report.edges, report.routable_ways, report.crossing_nodes, report.rows_scanned
    )
}

pub fn render_classify_report(report: &ClassifyReport) -> String {
    format!(
        "Classified {} ways ({} edges) with {} rules; {} ways fell back to the default mask\n",
        report.ways, report.edges_updated, report.rules, report.defaulted_ways
    )
}
