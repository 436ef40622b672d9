use std::path::PathBuf;

use coz_process::dialect::Dialect;
use coz_process::error::LogError;
use coz_process::estimate::{estimate, EstimateOptions};
use coz_process::experiment::Speedup;
use coz_process::process::process_files;
use coz_process::profile::merge;
use coz_process::prune::prune;

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_experiment_log_is_phase_corrected() {
    let (mut profile, reports) = process_files(&[data("experiments.coz")], &Dialect::default());
    assert!(reports[0].is_complete());
    assert_eq!(profile.run_count(), 1);
    assert_eq!(profile.total_runtime(), 10000);
    assert_eq!(profile.total_samples(), 1000);

    prune(&mut profile, 1);
    let estimates = estimate(&profile, EstimateOptions::default());

    assert_eq!(estimates.len(), 1);
    let e = &estimates[0];
    assert_eq!(e.selection, "src/app/main.c:12");
    assert_eq!(e.speedup, Speedup::from_ratio(1, 5).unwrap());
    assert_close(e.baseline_period, 10.0);
    assert_close(e.period, 8.0);
    assert_close(e.progress_speedup.unwrap(), 0.16);
}

#[test]
fn test_snapshot_log_commits_at_runtime_checkpoint() {
    let (mut profile, _) = process_files(&[data("snapshots.coz")], &Dialect::default());
    assert_eq!(profile.run_count(), 1);
    assert_eq!(profile.total_runtime(), 4000);

    prune(&mut profile, 2);
    let estimates = estimate(&profile, EstimateOptions::default());

    assert_eq!(estimates.len(), 1);
    assert_eq!(estimates[0].progress_point, "work.c:90");
    assert_close(estimates[0].progress_speedup.unwrap(), 0.45);
}

#[test]
fn test_truncated_log_yields_empty_profile() {
    let (profile, reports) = process_files(&[data("truncated.coz")], &Dialect::default());
    assert!(reports[0].is_complete());
    assert_eq!(reports[0].stream.runs.discarded, 1);
    assert!(profile.is_empty());
    assert_eq!(profile.run_count(), 0);
}

#[test]
fn test_corrupt_file_keeps_earlier_runs_and_other_files() {
    let (profile, reports) = process_files(
        &[data("corrupt.coz"), data("experiments.coz")],
        &Dialect::default(),
    );

    assert!(matches!(
        reports[0].stream.error,
        Some(LogError::MalformedLine { line: 13, .. })
    ));
    assert!(reports[1].is_complete());
    assert_eq!(profile.run_count(), 2);

    let baseline = &profile.get("src/app/main.c:12", "ops").unwrap()[&Speedup::ZERO];
    assert_eq!(baseline.delta, 200);
}

#[test]
fn test_merge_order_does_not_matter() {
    let dialect = Dialect::default();
    let (a, _) = process_files(&[data("experiments.coz")], &dialect);
    let (b, _) = process_files(&[data("snapshots.coz")], &dialect);
    let (c, _) = process_files(&[data("corrupt.coz")], &dialect);

    assert_eq!(merge(a.clone(), b.clone()), merge(b.clone(), a.clone()));
    assert_eq!(
        merge(merge(a.clone(), b.clone()), c.clone()),
        merge(a, merge(b, c))
    );

    let (all, _) = process_files(
        &[
            data("snapshots.coz"),
            data("corrupt.coz"),
            data("experiments.coz"),
        ],
        &dialect,
    );
    let (reversed, _) = process_files(
        &[
            data("experiments.coz"),
            data("corrupt.coz"),
            data("snapshots.coz"),
        ],
        &dialect,
    );
    assert_eq!(all, reversed);
}
