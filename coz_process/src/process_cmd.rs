use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{info, warn};

use coz_process_cli_types::OutputFormat;

use crate::config::ProcessSettings;
use crate::estimate::{estimate, EstimateOptions};
use crate::export::{to_table, write_hotspots, write_output, ExportOptions};
use crate::filter::{compile_filters, filter_selections};
use crate::process::process_files;
use crate::prune::prune;
use crate::summary::hotspots;

/// A `process` invocation with configuration defaults already applied.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub min_speedups: u16,
    pub error_bounds: bool,
    pub abbreviate_locations: bool,
    pub filters: Vec<String>,
    pub hotspots: Option<PathBuf>,
    pub hotspot_threshold: f64,
}

impl ProcessRequest {
    /// Command-line values win over configured ones.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: &ProcessSettings,
        inputs: Vec<PathBuf>,
        output: PathBuf,
        format: Option<OutputFormat>,
        min_speedups: Option<u16>,
        error_bounds: bool,
        full_locations: bool,
        filters: Vec<String>,
        hotspots: Option<PathBuf>,
    ) -> Self {
        ProcessRequest {
            inputs,
            output,
            format: format.unwrap_or(settings.format),
            min_speedups: min_speedups.unwrap_or(settings.min_speedups),
            error_bounds: error_bounds || settings.error_bounds,
            abbreviate_locations: !full_locations && settings.abbreviate_locations,
            filters,
            hotspots,
            hotspot_threshold: settings.hotspot_threshold,
        }
    }
}

pub fn handle_process(request: &ProcessRequest, settings: &ProcessSettings) -> Result<()> {
    let filters = compile_filters(&request.filters)?;
    if request.hotspots.as_deref() == Some(request.output.as_path())
        && request.output != Path::new("-")
    {
        bail!(
            "Hotspots and estimates cannot both be written to {}",
            request.output.display()
        );
    }
    let dialect = settings.dialect();

    let (mut profile, reports) = process_files(&request.inputs, &dialect);

    let failed = reports.iter().filter(|r| !r.is_complete()).count();
    if failed == reports.len() && !reports.is_empty() {
        warn!("No input could be read completely");
    }
    if profile.run_count() == 0 {
        warn!("No complete run found in {} input(s)", reports.len());
    }

    if let Some(path) = &request.hotspots {
        let hot = hotspots(&profile, request.hotspot_threshold);
        let mut bytes = Vec::new();
        write_hotspots(&mut bytes, &hot, request.abbreviate_locations)
            .context("Failed to render hotspots")?;
        write_output(path, &bytes)?;
    }

    let removed = filter_selections(&mut profile, &filters);
    if removed > 0 {
        info!("Filtered out {} selection target(s)", removed);
    }

    prune(&mut profile, usize::from(request.min_speedups));

    let estimates = estimate(
        &profile,
        EstimateOptions {
            error_bounds: request.error_bounds,
        },
    );
    info!("{} speedup estimate(s)", estimates.len());

    let options = ExportOptions {
        format: request.format,
        abbreviate_locations: request.abbreviate_locations,
        error_bounds: request.error_bounds,
    };

    write_output(&request.output, to_table(&estimates, &options).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_override_settings() {
        let settings = ProcessSettings {
            min_speedups: 3,
            error_bounds: true,
            format: OutputFormat::Tsv,
            ..ProcessSettings::default()
        };

        let from_settings = ProcessRequest::new(
            &settings,
            vec![],
            PathBuf::from("-"),
            None,
            None,
            false,
            false,
            vec![],
            None,
        );
        assert_eq!(from_settings.min_speedups, 3);
        assert!(from_settings.error_bounds);
        assert!(from_settings.abbreviate_locations);
        assert_eq!(from_settings.format, OutputFormat::Tsv);

        let from_cli = ProcessRequest::new(
            &settings,
            vec![],
            PathBuf::from("-"),
            Some(OutputFormat::Csv),
            Some(1),
            false,
            true,
            vec![],
            None,
        );
        assert_eq!(from_cli.min_speedups, 1);
        assert!(!from_cli.abbreviate_locations);
        assert_eq!(from_cli.format, OutputFormat::Csv);
    }

    #[test]
    fn invalid_filter_is_an_error() {
        let request = ProcessRequest::new(
            &ProcessSettings::default(),
            vec![],
            PathBuf::from("-"),
            None,
            None,
            false,
            false,
            vec!["[unclosed".to_string()],
            None,
        );
        assert!(handle_process(&request, &ProcessSettings::default()).is_err());
    }
}
