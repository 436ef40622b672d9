//! Tabular rendering of speedup estimates and hotspots
//!
//! Identifiers are written as they are. A location or progress point
//! containing the delimiter will shift the columns of its row.

use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use anyhow::{Context, Result};

use coz_process_cli_types::OutputFormat;

use crate::estimate::Estimate;
use crate::summary::Hotspot;

const COLUMNS: [&str; 8] = [
    "location",
    "speedup",
    "progress_point",
    "baseline_period",
    "period",
    "progress_speedup",
    "phase_corrected",
    "samples",
];

const BOUND_COLUMNS: [&str; 2] = ["err_min", "err_max"];

#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub format: OutputFormat,
    pub abbreviate_locations: bool,
    pub error_bounds: bool,
}

fn delimiter(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Csv => ",",
        OutputFormat::Tsv => "\t",
    }
}

/// Trailing path component of a `path/file.c:line` location.
pub fn shorten_location(location: &str) -> &str {
    location.rsplit('/').next().unwrap_or(location)
}

/// Whole numbers always carry one decimal place
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

pub fn header(options: &ExportOptions) -> String {
    let mut columns = COLUMNS.to_vec();
    if options.error_bounds {
        columns.extend(BOUND_COLUMNS);
    }
    columns.join(delimiter(options.format))
}

fn to_row(estimate: &Estimate, options: &ExportOptions) -> String {
    let location = if options.abbreviate_locations {
        shorten_location(&estimate.selection)
    } else {
        estimate.selection.as_str()
    };

    let mut fields = vec![
        location.to_string(),
        format_float(estimate.speedup.as_f64()),
        estimate.progress_point.clone(),
        format_float(estimate.baseline_period),
        format_float(estimate.period),
        estimate
            .progress_speedup
            .map(format_float)
            .unwrap_or_default(),
        estimate.phase_corrected.to_string(),
        estimate.samples.to_string(),
    ];

    if options.error_bounds {
        match estimate.bounds {
            Some(bounds) => {
                fields.push(format_float(bounds.min_ratio));
                fields.push(format_float(bounds.max_ratio));
            }
            None => fields.extend([String::new(), String::new()]),
        }
    }

    fields.join(delimiter(options.format))
}

/// Header plus one row per estimate, newline terminated.
pub fn to_table(estimates: &[Estimate], options: &ExportOptions) -> String {
    let mut lines = Vec::with_capacity(estimates.len() + 1);
    lines.push(header(options));
    lines.extend(estimates.iter().map(|e| to_row(e, options)));

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// `location<TAB>fraction` rows, in the given order.
pub fn write_hotspots<W: Write>(
    out: &mut W,
    hotspots: &[Hotspot],
    abbreviate_locations: bool,
) -> io::Result<()> {
    for hotspot in hotspots {
        let location = if abbreviate_locations {
            shorten_location(&hotspot.location)
        } else {
            hotspot.location.as_str()
        };
        writeln!(out, "{}\t{}", location, hotspot.fraction)?;
    }
    Ok(())
}

/// Write `bytes` to `output`, or to stdout if `output` is `-`.
pub fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    if output == Path::new("-") {
        match io::stdout().write_all(bytes) {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            res => res,
        }
        .context("Failed to write to stdout")?;
    } else {
        File::create(output)
            .and_then(|mut f| f.write_all(bytes))
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }
    Ok(())
}
