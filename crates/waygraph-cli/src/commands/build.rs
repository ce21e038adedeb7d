//! Build command handler: turns stored ways into the routing graph.

use std::path::Path;

use anyhow::{Context, Result};

use waygraph_lib::{build_graph, MapStore};

use crate::output::{format_build_report, OutputFormat};

/// Handle the build subcommand.
///
/// Rebuilds `graph_edges` and the way envelope index, then prints the report.
pub fn handle_build_command(db_path: &Path, format: OutputFormat) -> Result<()> {
    let mut store = MapStore::open(db_path)
        .with_context(|| format!("failed to open map database {}", db_path.display()))?;
    let report = build_graph(&mut store).context("graph build failed")?;
    print!("{}", format_build_report(&report, format)?);
    Ok(())
}
