//! File-level processing: one run state machine per log, merged into one profile
//!
//! A structural error stops the scan of its file. Runs committed before the
//! error are kept, and the remaining files are still processed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::decoder::LogLines;
use crate::dialect::Dialect;
use crate::error::LogError;
use crate::profile::Profile;
use crate::run_state::{RunStateMachine, RunTally};

/// Outcome of scanning one log stream.
#[derive(Debug, Default)]
pub struct StreamReport {
    pub lines_read: usize,
    pub runs: RunTally,
    /// The error that ended the scan early, if any
    pub error: Option<LogError>,
}

/// Scan `reader` to its end, or to its first structural error.
pub fn process_reader<R: BufRead>(reader: R, dialect: &Dialect) -> (Profile, StreamReport) {
    let mut lines = LogLines::new(reader);
    let mut machine = RunStateMachine::new(dialect);
    let mut error = None;

    while let Some(next) = lines.next() {
        let line_number = lines.lines_read();
        let result = next.and_then(|line| machine.feed(&line).map_err(|e| e.at_line(line_number)));
        if let Err(e) = result {
            error = Some(e);
            break;
        }
    }

    let (profile, runs) = machine.finish();
    let report = StreamReport {
        lines_read: lines.lines_read(),
        runs,
        error,
    };
    (profile, report)
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub stream: StreamReport,
}

impl FileReport {
    pub fn is_complete(&self) -> bool {
        self.stream.error.is_none()
    }
}

pub fn process_file(path: &Path, dialect: &Dialect) -> Result<(Profile, StreamReport), LogError> {
    let file = File::open(path)?;
    Ok(process_reader(BufReader::new(file), dialect))
}

/// Process every file in `paths` and merge their runs.
///
/// Failures are logged and recorded in the returned reports; they never
/// prevent the remaining files from being processed.
pub fn process_files(paths: &[PathBuf], dialect: &Dialect) -> (Profile, Vec<FileReport>) {
    let mut merged = Profile::new();
    let mut reports = Vec::with_capacity(paths.len());

    for path in paths {
        let stream = match process_file(path, dialect) {
            Ok((profile, stream)) => {
                merged += profile;
                stream
            }
            Err(e) => StreamReport {
                error: Some(e),
                ..StreamReport::default()
            },
        };

        match &stream.error {
            Some(e) => warn!(
                "{}: {}; keeping {} complete run(s) read before",
                path.display(),
                e,
                stream.runs.committed
            ),
            None => info!(
                "{}: {} line(s), {} run(s) committed, {} discarded",
                path.display(),
                stream.lines_read,
                stream.runs.committed,
                stream.runs.discarded
            ),
        }

        reports.push(FileReport {
            path: path.clone(),
            stream,
        });
    }

    (merged, reports)
}
