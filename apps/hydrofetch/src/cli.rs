//! Command line interface definition

use clap::{Parser, Subcommand};
use hydrofetch_types::ColorChoice;
use std::path::PathBuf;

/// hydrofetch - Fetch HydroShare resources by DOI or URL
#[derive(Parser)]
#[command(name = "hydrofetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch HydroShare resources by DOI or URL")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the hydrofetch logs directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for scratch space during extraction
    #[arg(long, global = true, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Check whether an identifier names a fetchable resource
    Detect {
        /// DOI (10.4211/hs.<id>, doi:..., https://doi.org/...) or resource URL
        identifier: String,

        /// Reference (version) of the resource
        #[arg(long = "ref", value_name = "REF")]
        reference: Option<String>,
    },

    /// Download a resource and place its content files in a directory
    #[command(alias = "get")]
    Fetch {
        /// DOI or resource URL
        identifier: String,

        /// Directory receiving the resource content
        output_dir: PathBuf,

        /// Reference (version) of the resource
        #[arg(long = "ref", value_name = "REF")]
        reference: Option<String>,

        /// Seconds between bag readiness polls
        #[arg(long, value_name = "SECS")]
        poll_interval: Option<u64>,

        /// Give up after waiting this many seconds for the bag
        #[arg(long, value_name = "SECS")]
        max_wait: Option<u64>,
    },

    /// List the hosting services resources can be fetched from
    Hosts,
}
