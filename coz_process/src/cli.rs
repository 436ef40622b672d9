use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::Level;

use crate::config::load_settings;
use crate::process_cmd::{handle_process, ProcessRequest};
use crate::summary::handle_summary;
use coz_process_cli_types::{Cli, Commands};

pub fn handle_calls() -> Result<()> {
    let cli = Cli::parse();
    let logger_level = match cli.verbose {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(logger_level.as_str())).init();

    match cli.command {
        Commands::Process {
            inputs,
            output,
            format,
            min_speedups,
            error_bounds,
            full_locations,
            filters,
            hotspots,
        } => {
            let settings = load_settings();
            let request = ProcessRequest::new(
                &settings,
                inputs.inputs,
                output,
                format,
                min_speedups,
                error_bounds,
                full_locations,
                filters,
                hotspots,
            );
            handle_process(&request, &settings)
        }
        Commands::Summary { inputs } => handle_summary(&inputs.inputs),
    }
}
