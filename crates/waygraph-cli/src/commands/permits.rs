//! Permits command handler: classifies edge permissions from way tags.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use waygraph_lib::{classify_permits, install_default_permit_rules, MapStore};

use crate::output::{format_classify_report, OutputFormat};

/// Arguments for the permits command.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitsCommandArgs {
    /// Install the built-in rule table first when `graph_permit` is empty.
    pub install_defaults: bool,
}

/// Handle the permits subcommand.
pub fn handle_permits_command(
    db_path: &Path,
    args: PermitsCommandArgs,
    format: OutputFormat,
) -> Result<()> {
    let mut store = MapStore::open(db_path)
        .with_context(|| format!("failed to open map database {}", db_path.display()))?;

    if args.install_defaults {
        let inserted = install_default_permit_rules(&mut store)
            .context("failed to install default permit rules")?;
        info!(inserted, "default permit rules checked");
    }

    let report = classify_permits(&mut store).context("permit classification failed")?;
    print!("{}", format_classify_report(&report, format)?);
    Ok(())
}
