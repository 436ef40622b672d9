//! Reconstruction of experiments from the lines of one profile log
//!
//! A log holds any number of executions ("runs"), each opened by a startup
//! record. Within a run, phases are opened and closed, counters are read at
//! both ends of every phase, and sample counts are reported. The
//! [`RunStateMachine`] turns that stream into [`Measurement`]s and commits
//! every run that terminated cleanly into a [`Profile`].
//!
//! A run is committed when the next run starts or the input ends, so that
//! sample counts logged after the termination record still count. Runs that
//! never terminated are discarded, unless the runtime reported its own
//! elapsed time (a `runtime` checkpoint); those keep what was flushed by the
//! last sample report.

use std::collections::HashMap;
use std::mem;

use log::{debug, info};

use crate::decoder::LogLine;
use crate::dialect::{Dialect, Transition};
use crate::error::LogError;
use crate::experiment::{Experiment, Measurement, Speedup};
use crate::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseKind {
    Baseline,
    Experiment,
}

#[derive(Debug)]
enum Phase {
    /// No experiment context
    Idle,
    /// Between start and end marker, collecting start-of-phase counter values
    Open {
        kind: PhaseKind,
        selection: String,
        start_time: u64,
        start_samples: Option<u64>,
        start_delays: Option<u64>,
        counters: HashMap<String, u64>,
    },
    /// After the end marker, turning counter values into deltas
    Reading {
        kind: PhaseKind,
        experiment: Experiment,
        also_baseline: bool,
        counters: HashMap<String, u64>,
    },
    /// A closed experiment reported by the runtime, awaiting progress deltas
    Reported(Experiment),
}

#[derive(Debug, Clone, Copy)]
struct Termination {
    time: u64,
    samples: Option<u64>,
}

/// Scratch state of the run currently being read.
#[derive(Debug)]
struct Run {
    start_time: u64,
    sample_period: Option<u64>,
    phase: Phase,
    /// Measurements that have not seen a sample report yet
    buffered: Profile,
    /// Measurements and sample counts of this run that survived a flush
    profile: Profile,
    /// Measurements of plain baseline phases, not yet tied to a selection target
    baselines: Vec<Measurement>,
    /// Elapsed time as reported by the runtime itself
    runtime: Option<u64>,
    termination: Option<Termination>,
}

impl Run {
    fn new(start_time: u64, sample_period: Option<u64>) -> Self {
        Run {
            start_time,
            sample_period,
            phase: Phase::Idle,
            buffered: Profile::new(),
            profile: Profile::new(),
            baselines: Vec::new(),
            runtime: None,
            termination: None,
        }
    }

    fn apply(&mut self, transition: Transition, line: &LogLine) -> Result<(), LogError> {
        self.end_readings(transition);

        match transition {
            // Run boundaries are handled by the state machine.
            Transition::Startup => {}
            Transition::Shutdown => self.shutdown(line)?,
            Transition::Info => {
                if let Some(period) = line.parse_opt_field("sample-period")? {
                    self.sample_period = Some(period);
                }
            }
            Transition::OpenBaseline => self.open_phase(PhaseKind::Baseline, line)?,
            Transition::OpenExperiment => self.open_phase(PhaseKind::Experiment, line)?,
            Transition::CloseBaseline | Transition::CloseExperiment => self.close_phase(line)?,
            Transition::Counter => self.counter(line)?,
            Transition::Samples => self.samples(line)?,
            Transition::Experiment => self.experiment(line)?,
            Transition::ProgressDelta => self.progress_delta(line)?,
            Transition::Runtime => self.runtime = Some(line.parse_field("time")?),
        }
        Ok(())
    }

    /// Counter readings after an end marker stop at the first other record.
    fn end_readings(&mut self, transition: Transition) {
        let reading_continues = match self.phase {
            Phase::Reading { .. } => transition == Transition::Counter,
            Phase::Reported(_) => transition == Transition::ProgressDelta,
            Phase::Idle | Phase::Open { .. } => true,
        };
        if !reading_continues {
            self.phase = Phase::Idle;
        }
    }

    fn open_phase(&mut self, kind: PhaseKind, line: &LogLine) -> Result<(), LogError> {
        let start_time = line.parse_field("time")?;
        let selection = match kind {
            PhaseKind::Baseline => String::new(),
            PhaseKind::Experiment => selection_field(line)?.to_string(),
        };
        let start_samples = line.parse_opt_field("selected-line-samples")?;
        let start_delays = line.parse_opt_field("global-delays")?;

        if matches!(self.phase, Phase::Open { .. }) {
            debug!("'{}' while a phase is open, discarding the open phase", line.command);
        }

        self.phase = Phase::Open {
            kind,
            selection,
            start_time,
            start_samples,
            start_delays,
            counters: HashMap::new(),
        };
        Ok(())
    }

    fn close_phase(&mut self, line: &LogLine) -> Result<(), LogError> {
        let Phase::Open {
            kind,
            selection,
            start_time,
            start_samples,
            start_delays,
            counters,
        } = mem::replace(&mut self.phase, Phase::Idle)
        else {
            debug!("Ignoring '{}' without an open phase", line.command);
            return Ok(());
        };

        let end_time: u64 = line.parse_field("time")?;
        let duration = end_time.saturating_sub(start_time);

        let experiment = match kind {
            PhaseKind::Baseline => Experiment {
                selection,
                speedup: Speedup::ZERO,
                duration,
                applied_delay: 0,
                samples: 0,
            },
            PhaseKind::Experiment => {
                let delay_size: u64 = line.parse_opt_field("delay-size")?.unwrap_or(0);
                let delays = match (
                    line.parse_opt_field::<u64>("delays")?,
                    line.parse_opt_field::<u64>("global-delays")?,
                    start_delays,
                ) {
                    (Some(delays), _, _) => delays,
                    (None, Some(end), Some(start)) => end.saturating_sub(start),
                    _ => 0,
                };
                let samples = match (
                    line.parse_opt_field::<u64>("selected-line-samples")?,
                    start_samples,
                ) {
                    (Some(end), Some(start)) => end.saturating_sub(start),
                    _ => 0,
                };

                let speedup = if delay_size == 0 {
                    Speedup::ZERO
                } else {
                    match self
                        .sample_period
                        .and_then(|period| Speedup::from_ratio(delay_size, period))
                    {
                        Some(speedup) => speedup,
                        None => {
                            debug!(
                                "Discarding phase of {} closed without a known sample period",
                                selection
                            );
                            return Ok(());
                        }
                    }
                };

                let applied_delay = delays.saturating_mul(delay_size);
                Experiment {
                    selection,
                    speedup,
                    duration: duration.saturating_sub(applied_delay),
                    applied_delay,
                    samples,
                }
            }
        };

        // No delay was inserted, so the phase also measured the unmodified program.
        let also_baseline = !experiment.speedup.is_zero() && experiment.applied_delay == 0;

        self.phase = Phase::Reading {
            kind,
            experiment,
            also_baseline,
            counters,
        };
        Ok(())
    }

    fn counter(&mut self, line: &LogLine) -> Result<(), LogError> {
        let name = line.str_field("name")?;
        let value: u64 = line.parse_field("value")?;
        let counter_kind = line.get("kind").unwrap_or("");
        let implementation = line.get("impl").unwrap_or("");

        match &mut self.phase {
            Phase::Open { counters, .. } => {
                counters.entry(name.to_string()).or_insert(value);
            }
            Phase::Reading {
                kind,
                experiment,
                also_baseline,
                counters,
            } => {
                let Some(start) = counters.remove(name) else {
                    debug!("Ignoring counter {} without a start value", name);
                    return Ok(());
                };
                if value < start {
                    debug!(
                        "Ignoring counter {} going backwards from {} to {}",
                        name, start, value
                    );
                    return Ok(());
                }

                let m = Measurement::new(
                    experiment.clone(),
                    name,
                    counter_kind,
                    implementation,
                    value - start,
                );
                if *also_baseline {
                    let mut baseline = m.clone();
                    baseline.experiment.speedup = Speedup::ZERO;
                    self.buffered.add_measurement(baseline);
                }
                match kind {
                    PhaseKind::Baseline => self.baselines.push(m),
                    PhaseKind::Experiment => {
                        self.buffered.add_measurement(m);
                    }
                }
            }
            Phase::Idle | Phase::Reported(_) => {
                debug!("Ignoring counter {} outside of a phase", name);
            }
        }
        Ok(())
    }

    fn experiment(&mut self, line: &LogLine) -> Result<(), LogError> {
        self.phase = Phase::Reported(Experiment {
            selection: line.str_field("selected")?.to_string(),
            speedup: line.parse_field("speedup")?,
            duration: line.parse_field("duration")?,
            applied_delay: 0,
            samples: line.parse_opt_field("selected-samples")?.unwrap_or(0),
        });
        Ok(())
    }

    fn progress_delta(&mut self, line: &LogLine) -> Result<(), LogError> {
        let name = line.str_field("name")?;
        let delta: u64 = line.parse_field("delta")?;
        let kind = line.get("type").unwrap_or("throughput");

        match &self.phase {
            Phase::Reported(experiment) => {
                let m = Measurement::new(experiment.clone(), name, kind, "", delta);
                self.buffered.add_measurement(m);
            }
            _ => debug!("Ignoring progress point {} without an experiment", name),
        }
        Ok(())
    }

    fn samples(&mut self, line: &LogLine) -> Result<(), LogError> {
        let location = match line.get("location").or_else(|| line.get("line")) {
            Some(location) => location,
            None => line.str_field("location")?,
        };
        let count: u64 = line.parse_field("count")?;

        self.flush();
        // Runtimes that report their elapsed time report cumulative sample counts.
        if self.runtime.is_some() {
            self.profile.set_samples(location, count);
        } else {
            self.profile.add_samples(location, count);
        }
        self.phase = Phase::Idle;
        Ok(())
    }

    fn shutdown(&mut self, line: &LogLine) -> Result<(), LogError> {
        let time = line.parse_field("time")?;
        let samples = line.parse_opt_field("samples")?;

        if self.termination.is_some() {
            debug!("Ignoring repeated '{}' record", line.command);
            return Ok(());
        }
        self.termination = Some(Termination { time, samples });
        self.flush();
        self.phase = Phase::Idle;
        Ok(())
    }

    fn flush(&mut self) {
        if !self.buffered.is_empty() {
            self.profile += mem::take(&mut self.buffered);
        }
    }

    /// Tie every plain baseline measurement to each selection target of this run
    /// that measured the same counter.
    fn attach_baselines(&mut self) {
        for baseline in mem::take(&mut self.baselines) {
            let targets: Vec<String> = self
                .profile
                .measurements()
                .iter()
                .filter(|(_, points)| points.contains_key(&baseline.counter))
                .map(|(selection, _)| selection.clone())
                .collect();

            if targets.is_empty() {
                debug!(
                    "Dropping baseline of {}: no experiment measured it",
                    baseline.counter
                );
            }

            for selection in targets {
                let mut m = baseline.clone();
                m.experiment.selection = selection;
                self.profile.add_measurement(m);
            }
        }
    }

    /// The run's contribution, or `None` if the run cannot be trusted.
    fn into_profile(mut self) -> Option<Profile> {
        let elapsed = match (self.runtime, self.termination) {
            (Some(runtime), _) => runtime,
            (None, Some(termination)) => termination.time.saturating_sub(self.start_time),
            (None, None) => return None,
        };

        if self.termination.is_none() && !self.buffered.is_empty() {
            debug!(
                "Dropping {} progress point(s) logged after the last sample report",
                self.buffered.group_count()
            );
        }

        self.attach_baselines();

        let samples = self
            .termination
            .and_then(|t| t.samples)
            .unwrap_or_else(|| self.profile.sample_counts().values().sum());
        self.profile.record_run(elapsed, samples);
        Some(self.profile)
    }
}

fn selection_field(line: &LogLine) -> Result<&str, LogError> {
    match line.get("line").or_else(|| line.get("block")) {
        Some(selection) => Ok(selection),
        None => line.str_field("line"),
    }
}

/// Counts of runs seen in one stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub committed: usize,
    pub discarded: usize,
}

/// Consumes the decoded lines of one log and accumulates its complete runs.
///
/// One instance is used per log stream; nothing is shared between streams.
pub struct RunStateMachine<'d> {
    dialect: &'d Dialect,
    committed: Profile,
    run: Option<Run>,
    tally: RunTally,
}

impl<'d> RunStateMachine<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        RunStateMachine {
            dialect,
            committed: Profile::new(),
            run: None,
            tally: RunTally::default(),
        }
    }

    /// Advance the state machine by one line.
    ///
    /// Errors are raised only for records whose required fields are missing or
    /// not numeric. Out-of-order records are ignored.
    pub fn feed(&mut self, line: &LogLine) -> Result<(), LogError> {
        let Some(transition) = self.dialect.transition(&line.command) else {
            debug!("Ignoring unknown profiler line '{}'", line.command);
            return Ok(());
        };

        if transition == Transition::Startup {
            return self.startup(line);
        }

        match self.run.as_mut() {
            Some(run) => run.apply(transition, line),
            None => {
                debug!("Ignoring '{}' before the first startup record", line.command);
                Ok(())
            }
        }
    }

    fn startup(&mut self, line: &LogLine) -> Result<(), LogError> {
        let time = line.parse_field("time")?;
        let sample_period = line.parse_opt_field("sample-period")?;
        self.end_run();
        self.run = Some(Run::new(time, sample_period));
        Ok(())
    }

    fn end_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        let start_time = run.start_time;
        match run.into_profile() {
            Some(profile) => {
                self.committed += profile;
                self.tally.committed += 1;
            }
            None => {
                info!(
                    "Discarding incomplete run started at {}: no termination record",
                    start_time
                );
                self.tally.discarded += 1;
            }
        }
    }

    /// End the stream: commit or discard the run in progress and return
    /// everything committed.
    pub fn finish(mut self) -> (Profile, RunTally) {
        self.end_run();
        (self.committed, self.tally)
    }
}
