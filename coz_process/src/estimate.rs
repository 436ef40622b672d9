//! Program speedup estimates from pruned profiles
//!
//! For every progress point, the period (time per unit of progress) under
//! each induced speedup is compared to the baseline period. The relative
//! change is then phase corrected: it is scaled by how much of the total run
//! time the selection target actually accounts for.

use itertools::Itertools;
use log::debug;

use crate::experiment::{Measurement, Speedup};
use crate::profile::Profile;

/// Legacy count-based bounds on the ratio of a period to its baseline period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorBounds {
    pub min_ratio: f64,
    pub max_ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub selection: String,
    pub progress_point: String,
    pub speedup: Speedup,
    pub baseline_period: f64,
    pub period: f64,
    /// Relative change of the progress period, `None` if the baseline period is zero
    pub progress_speedup: Option<f64>,
    pub phase_corrected: bool,
    pub samples: u64,
    pub bounds: Option<ErrorBounds>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateOptions {
    pub error_bounds: bool,
}

/// `1 - period / baseline_period`, the fraction by which progress sped up.
pub fn progress_speedup(baseline_period: f64, period: f64) -> Option<f64> {
    if baseline_period == 0.0 {
        None
    } else {
        Some(1.0 - period / baseline_period)
    }
}

/// Scale a local speedup by the share of the total run time spent in the selection.
///
/// `duration / samples` converts the experiment's sample count into time;
/// `location_samples / total_runtime` is the selection's global sample rate.
pub fn phase_correct(
    speedup: f64,
    duration: u64,
    samples: u64,
    location_samples: u64,
    total_runtime: u64,
) -> f64 {
    let mut corrected = speedup;
    corrected *= duration as f64;
    corrected /= samples as f64;
    corrected *= location_samples as f64;
    corrected /= total_runtime as f64;
    corrected
}

/// Shortest and longest period compatible with a one-sigma count error of `sqrt(delta)`.
///
/// A single observation gives no usable error estimate, so its bounds collapse
/// onto the period itself.
pub fn period_bounds(duration: u64, delta: u64) -> Option<(f64, f64)> {
    if delta == 0 {
        return None;
    }
    let delta = delta as f64;
    let err = if delta == 1.0 { 0.0 } else { delta.sqrt() };
    let duration = duration as f64;
    Some((duration / (delta + err), duration / (delta - err)))
}

fn error_bounds(baseline: &Measurement, m: &Measurement) -> Option<ErrorBounds> {
    let (min_baseline, max_baseline) = period_bounds(baseline.duration(), baseline.delta)?;
    let (min_period, max_period) = period_bounds(m.duration(), m.delta)?;
    if min_baseline == 0.0 {
        return None;
    }
    Some(ErrorBounds {
        min_ratio: min_period / max_baseline,
        max_ratio: max_period / min_baseline,
    })
}

/// Estimate the program speedup of every non-baseline measurement in `profile`.
///
/// Estimates are grouped by selection target and ordered by ascending induced
/// speedup within each target. Groups without a usable baseline and
/// measurements without progress produce no estimate.
pub fn estimate(profile: &Profile, options: EstimateOptions) -> Vec<Estimate> {
    let mut result = Vec::new();

    for (selection, progress_points) in profile.measurements() {
        let mut estimates = Vec::new();

        for (progress_point, speedups) in progress_points {
            let Some(baseline) = speedups.get(&Speedup::ZERO) else {
                debug!("No baseline for {} at {}", progress_point, selection);
                continue;
            };
            let Some(baseline_period) = baseline.period() else {
                debug!("No progress in baseline of {} at {}", progress_point, selection);
                continue;
            };

            for (speedup, m) in speedups.iter().filter(|(s, _)| !s.is_zero()) {
                let Some(period) = m.period() else {
                    continue;
                };

                let mut progress = progress_speedup(baseline_period, period);
                let mut phase_corrected = false;

                if m.samples() > 0 && profile.total_runtime() > 0 {
                    match profile.sample_count(selection) {
                        Some(location_samples) => {
                            progress = progress.map(|s| {
                                phase_correct(
                                    s,
                                    m.duration(),
                                    m.samples(),
                                    location_samples,
                                    profile.total_runtime(),
                                )
                            });
                            phase_corrected = progress.is_some();
                        }
                        None => debug!("No sample count for {}, not phase correcting", selection),
                    }
                }

                estimates.push(Estimate {
                    selection: selection.clone(),
                    progress_point: progress_point.clone(),
                    speedup: *speedup,
                    baseline_period,
                    period,
                    progress_speedup: progress,
                    phase_corrected,
                    samples: m.samples(),
                    bounds: if options.error_bounds {
                        error_bounds(baseline, m)
                    } else {
                        None
                    },
                });
            }
        }

        result.extend(estimates.into_iter().sorted_by_key(|e| e.speedup));
    }

    result
}
