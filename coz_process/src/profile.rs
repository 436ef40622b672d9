//! Mergeable accumulation of causal profile measurements
//!
//! A [`Profile`] maps selection target → progress point → speedup →
//! [`Measurement`]. A key path exists only while it holds a measurement, so
//! empty inner maps are never left behind.

use std::collections::btree_map::Entry::{Occupied, Vacant};
use std::collections::BTreeMap;
use std::ops::AddAssign;

use log::warn;

use crate::experiment::{Measurement, Speedup};

/// Measurements of one progress point for one selection target, by speedup.
pub type SpeedupMap = BTreeMap<Speedup, Measurement>;

/// All progress points measured for one selection target.
pub type ProgressPoints = BTreeMap<String, SpeedupMap>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    measurements: BTreeMap<String, ProgressPoints>,
    sample_counts: BTreeMap<String, u64>,
    total_runtime: u64,
    total_samples: u64,
    run_count: u64,
    // Kept sorted so that merge order does not show.
    run_times: Vec<u64>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the profile holds no measurements. Run totals are not considered.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Insert `m`, or merge it into the measurement already stored at its key.
    ///
    /// Returns false if the stored measurement has the same progress point name
    /// but a different counter kind or implementation; `m` is then dropped.
    pub fn add_measurement(&mut self, m: Measurement) -> bool {
        let speedups = self
            .measurements
            .entry(m.selection().to_string())
            .or_default()
            .entry(m.counter.clone())
            .or_default();

        match speedups.entry(m.speedup()) {
            Vacant(e) => {
                e.insert(m);
                true
            }
            Occupied(mut e) => {
                if e.get().is_mergeable_with(&m) {
                    e.get_mut().merge(&m);
                    true
                } else {
                    warn!(
                        "Progress point '{}' reported as {}/{} and {}/{}, dropping the latter",
                        m.counter,
                        e.get().kind,
                        e.get().implementation,
                        m.kind,
                        m.implementation
                    );
                    false
                }
            }
        }
    }

    /// Add `count` samples to `location`.
    pub fn add_samples(&mut self, location: &str, count: u64) {
        let total = self.sample_counts.entry(location.to_string()).or_insert(0);
        *total = total.saturating_add(count);
    }

    /// Replace the sample count of `location` with `count`.
    pub fn set_samples(&mut self, location: &str, count: u64) {
        self.sample_counts.insert(location.to_string(), count);
    }

    /// Account for one complete run that lasted `elapsed` time units and took
    /// `samples` samples overall.
    pub fn record_run(&mut self, elapsed: u64, samples: u64) {
        self.total_runtime = self.total_runtime.saturating_add(elapsed);
        self.total_samples = self.total_samples.saturating_add(samples);
        self.run_count = self.run_count.saturating_add(1);
        let pos = self.run_times.partition_point(|t| *t <= elapsed);
        self.run_times.insert(pos, elapsed);
    }

    /// Add every measurement, sample count and run total of `other` to `self`.
    pub fn merge(&mut self, other: Profile) {
        for (_, progress_points) in other.measurements {
            for (_, speedups) in progress_points {
                for (_, m) in speedups {
                    self.add_measurement(m);
                }
            }
        }

        for (location, count) in other.sample_counts {
            self.add_samples(&location, count);
        }

        // Totals saturate rather than wrap.
        self.total_runtime = self.total_runtime.saturating_add(other.total_runtime);
        self.total_samples = self.total_samples.saturating_add(other.total_samples);
        self.run_count = self.run_count.saturating_add(other.run_count);
        self.run_times.extend(other.run_times);
        self.run_times.sort_unstable();
    }

    pub fn measurements(&self) -> &BTreeMap<String, ProgressPoints> {
        &self.measurements
    }

    pub(crate) fn measurements_mut(&mut self) -> &mut BTreeMap<String, ProgressPoints> {
        &mut self.measurements
    }

    /// Measurements of `counter` while `selection` was sped up.
    pub fn get(&self, selection: &str, counter: &str) -> Option<&SpeedupMap> {
        self.measurements.get(selection)?.get(counter)
    }

    pub fn sample_counts(&self) -> &BTreeMap<String, u64> {
        &self.sample_counts
    }

    pub fn sample_count(&self, location: &str) -> Option<u64> {
        self.sample_counts.get(location).copied()
    }

    pub fn total_runtime(&self) -> u64 {
        self.total_runtime
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    /// Elapsed time of each merged run, ascending.
    pub fn run_times(&self) -> &[u64] {
        &self.run_times
    }

    /// Number of (selection target, progress point) groups.
    pub fn group_count(&self) -> usize {
        self.measurements.values().map(|p| p.len()).sum()
    }
}

impl AddAssign for Profile {
    fn add_assign(&mut self, other: Profile) {
        self.merge(other);
    }
}

/// Combine two profiles into a new one.
pub fn merge(mut a: Profile, b: Profile) -> Profile {
    a += b;
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::measurement;

    fn speedup(num: u64, den: u64) -> Speedup {
        Speedup::from_ratio(num, den).unwrap()
    }

    fn profile_a() -> Profile {
        let mut p = Profile::new();
        p.add_measurement(measurement("a.c:1", "ops", Speedup::ZERO, 1000, 100, 3));
        p.add_measurement(measurement("a.c:1", "ops", speedup(1, 5), 800, 90, 2));
        p.add_samples("a.c:1", 40);
        p.record_run(5000, 200);
        p
    }

    fn profile_b() -> Profile {
        let mut p = Profile::new();
        p.add_measurement(measurement("a.c:1", "ops", Speedup::ZERO, 500, 60, 1));
        p.add_measurement(measurement("b.c:7", "ops", speedup(1, 2), 700, 10, 9));
        p.add_samples("a.c:1", 10);
        p.add_samples("b.c:7", 25);
        p.record_run(3000, 120);
        p
    }

    fn profile_c() -> Profile {
        let mut p = Profile::new();
        p.add_measurement(measurement("b.c:7", "ops", speedup(1, 2), 300, 5, 1));
        p.add_measurement(measurement("b.c:7", "requests", Speedup::ZERO, 900, 30, 0));
        p.add_samples("c.c:3", 4);
        p.record_run(4000, 80);
        p
    }

    #[test]
    fn add_measurement_merges_at_key() {
        let mut p = Profile::new();
        assert!(p.add_measurement(measurement("a.c:1", "ops", Speedup::ZERO, 1000, 100, 3)));
        assert!(p.add_measurement(measurement("a.c:1", "ops", Speedup::ZERO, 500, 50, 2)));
        let speedups = p.get("a.c:1", "ops").unwrap();
        assert_eq!(speedups.len(), 1);
        let m = &speedups[&Speedup::ZERO];
        assert_eq!(m.delta, 150);
        assert_eq!(m.duration(), 1500);
        assert_eq!(m.samples(), 5);
    }

    #[test]
    fn add_measurement_rejects_conflicting_kind() {
        let mut p = Profile::new();
        p.add_measurement(measurement("a.c:1", "ops", Speedup::ZERO, 1000, 100, 3));
        let mut other = measurement("a.c:1", "ops", Speedup::ZERO, 500, 50, 2);
        other.kind = "latency".to_string();
        assert!(!p.add_measurement(other));
        assert_eq!(p.get("a.c:1", "ops").unwrap()[&Speedup::ZERO].delta, 100);
    }

    #[test]
    fn merge_with_empty_is_noop() {
        let a = profile_a();
        assert_eq!(merge(a.clone(), Profile::new()), a);
        assert_eq!(merge(Profile::new(), a.clone()), a);
    }

    #[test]
    fn merge_is_commutative() {
        assert_eq!(
            merge(profile_a(), profile_b()),
            merge(profile_b(), profile_a())
        );
    }

    #[test]
    fn merge_is_associative() {
        let left = merge(merge(profile_a(), profile_b()), profile_c());
        let right = merge(profile_a(), merge(profile_b(), profile_c()));
        assert_eq!(left, right);
    }

    #[test]
    fn merge_sums_everything() {
        let p = merge(profile_a(), profile_b());
        let baseline = &p.get("a.c:1", "ops").unwrap()[&Speedup::ZERO];
        assert_eq!(baseline.delta, 160);
        assert_eq!(baseline.duration(), 1500);
        assert_eq!(baseline.samples(), 4);
        assert_eq!(p.sample_count("a.c:1"), Some(50));
        assert_eq!(p.sample_count("b.c:7"), Some(25));
        assert_eq!(p.total_runtime(), 8000);
        assert_eq!(p.total_samples(), 320);
        assert_eq!(p.run_count(), 2);
        assert_eq!(p.run_times(), &[3000, 5000]);
        assert_eq!(p.group_count(), 2);
    }

    #[test]
    fn merge_saturates_huge_totals() {
        let mut a = Profile::new();
        a.add_measurement(measurement("a.c:1", "ops", Speedup::ZERO, 10, u64::MAX - 1, 0));
        a.add_samples("a.c:1", u64::MAX);
        a.record_run(u64::MAX, 1);
        let mut b = a.clone();
        b.record_run(7, u64::MAX);

        let p = merge(a, b);
        assert_eq!(p.get("a.c:1", "ops").unwrap()[&Speedup::ZERO].delta, u64::MAX);
        assert_eq!(p.sample_count("a.c:1"), Some(u64::MAX));
        assert_eq!(p.total_runtime(), u64::MAX);
        assert_eq!(p.total_samples(), u64::MAX);
        assert_eq!(p.run_count(), 3);
    }

    #[test]
    fn set_samples_overwrites() {
        let mut p = Profile::new();
        p.add_samples("a.c:1", 5);
        p.set_samples("a.c:1", 3);
        assert_eq!(p.sample_count("a.c:1"), Some(3));
    }
}
