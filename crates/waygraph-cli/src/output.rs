//! Output formatting for command results.

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use waygraph_lib::output::{render_build_report, render_classify_report};
use waygraph_lib::{render_route, BuildReport, ClassifyReport, RouteOutcome, RouteRenderMode};

/// Output formats accepted by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Comma-separated path points (route only; other commands print text).
    Csv,
    /// Pretty-printed JSON document.
    Json,
}

pub fn format_route(outcome: &RouteOutcome, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_route(outcome, RouteRenderMode::PlainText)?),
        OutputFormat::Csv => Ok(render_route(outcome, RouteRenderMode::Csv)?),
        OutputFormat::Json => to_json(outcome),
    }
}

pub fn format_build_report(report: &BuildReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text | OutputFormat::Csv => Ok(render_build_report(report)),
    }
}

pub fn format_classify_report(report: &ClassifyReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text | OutputFormat::Csv => Ok(render_classify_report(report)),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut rendered = serde_json::to_string_pretty(value)?;
    rendered.push('\n');
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_report_uses_field_names() {
        let report = BuildReport {
            routable_ways: 2,
            crossing_nodes: 1,
            rows_scanned: 6,
            edges: 3,
        };
        let json = format_build_report(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["edges"], 3);
        assert_eq!(value["crossing_nodes"], 1);
    }

    #[test]
    fn unreachable_route_serialises_status() {
        let outcome = RouteOutcome::Unreachable {
            start_node_id: 1,
            destination_node_id: 2,
        };
        let json = format_route(&outcome, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "unreachable");
        assert_eq!(value["destination_node_id"], 2);
    }
}
