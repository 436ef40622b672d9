use log::{debug, info};

use crate::profile::Profile;

/// What [`prune`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Speedup entries without any observed progress
    pub zero_delta_entries: usize,
    /// Progress points dropped for lacking a baseline measurement
    pub no_baseline_groups: usize,
    /// Progress points dropped for having too few distinct speedups
    pub insufficient_speedup_groups: usize,
    /// Selection targets left without any progress point
    pub dropped_selections: usize,
}

/// Remove measurements that cannot yield a speedup estimate.
///
/// For every (selection target, progress point) group, entries without
/// progress are removed first. The group is then dropped if no baseline
/// (speedup 0) entry remains, or if fewer than `min_speedups` entries remain.
/// Selection targets without groups are removed as well. Nothing is ever
/// modified, only removed.
pub fn prune(profile: &mut Profile, min_speedups: usize) -> PruneReport {
    let mut report = PruneReport::default();

    profile.measurements_mut().retain(|selection, progress_points| {
        progress_points.retain(|progress_point, speedups| {
            let before = speedups.len();
            speedups.retain(|_, m| m.delta > 0);
            report.zero_delta_entries += before - speedups.len();

            if !speedups.keys().any(|s| s.is_zero()) {
                debug!("Dropping {} at {}: no baseline", progress_point, selection);
                report.no_baseline_groups += 1;
                false
            } else if speedups.len() < min_speedups {
                debug!(
                    "Dropping {} at {}: {} distinct speedup(s), need {}",
                    progress_point,
                    selection,
                    speedups.len(),
                    min_speedups
                );
                report.insufficient_speedup_groups += 1;
                false
            } else {
                true
            }
        });

        if progress_points.is_empty() {
            report.dropped_selections += 1;
            false
        } else {
            true
        }
    });

    info!(
        "Pruned {} empty measurement(s), {} progress point(s) without baseline, {} with too few speedups, {} selection target(s) in total",
        report.zero_delta_entries,
        report.no_baseline_groups,
        report.insufficient_speedup_groups,
        report.dropped_selections
    );

    report
}
