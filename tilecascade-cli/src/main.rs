//! TileCascade CLI - Command-line interface
//!
//! Drives the tilecascade engine against a tile server or a synthetic
//! source and reports what it would draw.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{fetch, simulate};
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "tilecascade")]
#[command(version = tilecascade::VERSION)]
#[command(about = "Multi-resolution map tile engine", long_about = None)]
struct Cli {
    /// INI configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for log files (overrides [logging] directory)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted pan/zoom path against a synthetic tile source
    Simulate {
        /// Starting latitude in decimal degrees
        #[arg(long, default_value = "48.8566", allow_hyphen_values = true)]
        lat: f64,

        /// Starting longitude in decimal degrees
        #[arg(long, default_value = "2.3522", allow_hyphen_values = true)]
        lon: f64,

        /// Starting zoom level
        #[arg(long, default_value = "10")]
        zoom: u8,

        /// Number of steps in the path
        #[arg(long, default_value = "12")]
        steps: u32,

        /// Viewport width in pixels
        #[arg(long, default_value = "1024")]
        width: u32,

        /// Viewport height in pixels
        #[arg(long, default_value = "768")]
        height: u32,

        /// Simulated fetch latency in milliseconds
        #[arg(long, default_value = "80")]
        latency_ms: u64,

        /// Fail every Nth source call (0 = never)
        #[arg(long, default_value = "0")]
        fail_every: u64,

        /// Time to stay at each step in milliseconds
        #[arg(long, default_value = "200")]
        dwell_ms: u64,
    },

    /// Load every tile of a view from a tile server
    Fetch {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Zoom level
        #[arg(long, default_value = "12")]
        zoom: u8,

        /// Viewport width in pixels
        #[arg(long, default_value = "1024")]
        width: u32,

        /// Viewport height in pixels
        #[arg(long, default_value = "768")]
        height: u32,

        /// URL template with {z}, {x}, {y} or {quadkey} (overrides [source] url_template)
        #[arg(long)]
        url: Option<String>,

        /// Give up waiting after this many seconds
        #[arg(long, default_value = "30")]
        deadline_secs: u64,

        /// Save loaded tiles to this directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let runner = CliRunner::new(cli.config.as_deref(), cli.log_dir)?;

    match cli.command {
        Commands::Simulate {
            lat,
            lon,
            zoom,
            steps,
            width,
            height,
            latency_ms,
            fail_every,
            dwell_ms,
        } => {
            simulate::run(
                simulate::SimulateArgs {
                    lat,
                    lon,
                    start_zoom: zoom,
                    steps,
                    width,
                    height,
                    latency_ms,
                    fail_every,
                    dwell_ms,
                },
                &runner,
            )
            .await
        }
        Commands::Fetch {
            lat,
            lon,
            zoom,
            width,
            height,
            url,
            deadline_secs,
            output_dir,
        } => {
            fetch::run(
                fetch::FetchArgs {
                    lat,
                    lon,
                    zoom,
                    width,
                    height,
                    url,
                    deadline_secs,
                    output_dir,
                },
                &runner,
            )
            .await
        }
    }
}
