use std::cmp::Ordering;
use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;
use readable::num::*;

use crate::config::load_settings;
use crate::export::write_hotspots;
use crate::process::process_files;
use crate::profile::Profile;
use crate::stats::{aggregate_durations, Stats};

/// A location and its share of all samples taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Hotspot {
    pub location: String,
    pub fraction: f64,
}

/// Locations holding more than `threshold` of all samples, most sampled first.
pub fn hotspots(profile: &Profile, threshold: f64) -> Vec<Hotspot> {
    if profile.total_samples() == 0 {
        return Vec::new();
    }
    let total = profile.total_samples() as f64;

    profile
        .sample_counts()
        .iter()
        .map(|(location, count)| Hotspot {
            location: location.clone(),
            fraction: *count as f64 / total,
        })
        .filter(|h| h.fraction > threshold)
        // Stable, so equal fractions stay in location order.
        .sorted_by(|a, b| {
            b.fraction
                .partial_cmp(&a.fraction)
                .unwrap_or(Ordering::Equal)
        })
        .collect()
}

#[derive(Debug)]
pub struct RunSummary {
    pub runs: u64,
    pub total_runtime: u64,
    pub total_samples: u64,
    pub durations: Stats,
    pub selections: usize,
    pub progress_points: usize,
}

impl RunSummary {
    pub fn from_profile(profile: &Profile) -> Self {
        RunSummary {
            runs: profile.run_count(),
            total_runtime: profile.total_runtime(),
            total_samples: profile.total_samples(),
            durations: aggregate_durations(profile.run_times().iter().map(|t| *t as f64)),
            selections: profile.measurements().len(),
            progress_points: profile.group_count(),
        }
    }
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "runs: {} runtime: {} samples: {}",
            Unsigned::from(self.runs),
            Unsigned::from(self.total_runtime),
            Unsigned::from(self.total_samples),
        )?;
        writeln!(f, "run duration: {}", self.durations)?;
        write!(
            f,
            "selection targets: {} progress points: {}",
            Unsigned::from(self.selections),
            Unsigned::from(self.progress_points),
        )
    }
}

pub fn handle_summary(inputs: &[PathBuf]) -> Result<()> {
    let settings = load_settings();
    let (profile, _) = process_files(inputs, &settings.dialect());

    let hot = hotspots(&profile, settings.hotspot_threshold);

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", RunSummary::from_profile(&profile)).context("Failed to write summary")?;
    if !hot.is_empty() {
        writeln!(out, "hotspots:").context("Failed to write summary")?;
        write_hotspots(&mut out, &hot, settings.abbreviate_locations)
            .context("Failed to write summary")?;
    }
    Ok(())
}
