use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use waygraph_cli::commands::build::handle_build_command;
use waygraph_cli::commands::permits::{handle_permits_command, PermitsCommandArgs};
use waygraph_cli::commands::route::{handle_route_command, parse_coordinate, RouteCommandArgs};
use waygraph_cli::output::OutputFormat;
use waygraph_lib::routing::DEFAULT_BBOX_ENLARGE;
use waygraph_lib::subgraph::DEFAULT_MAX_SUBGRAPH_NODES;
use waygraph_lib::{resolve_database_path, Coordinate, PermitMask, RouteOptions};

#[derive(Parser, Debug)]
#[command(author, version, about = "Road graph builder and shortest-path router")]
struct Cli {
    /// Map database file (defaults to $WAYGRAPH_DATABASE, then the platform data directory).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the routing graph from the stored ways.
    Build,
    /// Recompute edge permit masks from way tags.
    Permits {
        /// Install the built-in rule table when none is present.
        #[arg(long)]
        install_defaults: bool,
    },
    /// Compute the shortest route between two coordinates.
    Route {
        /// Start coordinate as LON,LAT.
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        from: Coordinate,
        /// Destination coordinate as LON,LAT.
        #[arg(long, value_parser = parse_coordinate, allow_hyphen_values = true)]
        to: Coordinate,
        /// Transport mode: foot, bike, car, or a raw permit mask.
        #[arg(long, default_value = "foot")]
        mode: PermitMask,
        /// Growth factor for the search rectangle around both points.
        #[arg(long, default_value_t = DEFAULT_BBOX_ENLARGE)]
        enlarge: f64,
        /// Refuse queries whose subgraph exceeds this many nodes.
        #[arg(long, default_value_t = DEFAULT_MAX_SUBGRAPH_NODES)]
        max_nodes: usize,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let db_path = resolve_database_path(cli.db.as_deref())
        .context("failed to resolve the map database")?;

    match cli.command {
        Command::Build => handle_build_command(&db_path, cli.format),
        Command::Permits { install_defaults } => {
            let args = PermitsCommandArgs { install_defaults };
            handle_permits_command(&db_path, args, cli.format)
        }
        Command::Route {
            from,
            to,
            mode,
            enlarge,
            max_nodes,
        } => {
            let args = RouteCommandArgs {
                from,
                to,
                mode,
                options: RouteOptions {
                    bbox_enlarge: enlarge,
                    max_subgraph_nodes: max_nodes,
                },
            };
            handle_route_command(&db_path, &args, cli.format)
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
