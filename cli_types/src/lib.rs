use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            _ => Err(anyhow!(
                "Invalid output format: {}. Valid values are 'csv' or 'tsv'",
                s
            )),
        }
    }
}

#[derive(Parser)]
#[command(version, name = "coz-process")]
pub struct Cli {
    /// Increase verbosity level (can be specified multiple times.) The first level sets level
    /// "info", second sets level "debug", and third sets level "trace" for the logger.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct CliInputs {
    /// Causal profile log(s) to read. Runs from all files are merged.
    #[arg(short, long = "input", default_value = "profile.coz")]
    pub inputs: Vec<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process causal profile logs into a table of program speedups
    ///
    /// Every run that reached its clean termination marker is merged. Progress
    /// points without a baseline measurement, or with too few distinct
    /// speedups, are dropped before estimation.
    ///
    /// Defaults for most options can be set in `.cozprocessconfig`:
    ///
    /// - `[process].min_speedups = 2`
    /// - `[process].error_bounds = true`
    /// - `[process].abbreviate_locations = false`
    /// - `[output].format = "tsv"`
    Process {
        #[command(flatten)]
        inputs: CliInputs,

        /// Output file, or '-' for stdout
        #[arg(short, long, default_value = "profile.csv")]
        output: PathBuf,

        /// Delimiter of the output table
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Minimum number of distinct speedups (including the baseline) a progress
        /// point needs to be kept
        #[arg(long, value_parser=clap::value_parser!(u16).range(1..))]
        min_speedups: Option<u16>,

        /// Add legacy count-based error bound columns
        #[arg(long)]
        error_bounds: bool,

        /// Print full location paths instead of the trailing file component
        #[arg(long)]
        full_locations: bool,

        /// Only export selection targets matching any of these regular expressions
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Additionally write the per-location sample fractions to this file
        #[arg(long)]
        hotspots: Option<PathBuf>,
    },

    /// Print a summary of the runs and the sampled hotspots in causal profile logs
    Summary {
        #[command(flatten)]
        inputs: CliInputs,
    },
}
