//! Command labels understood by the run state machine
//!
//! Different profiling runtimes label the same event differently
//! (`start-experiment`, `start-round` and `start-speedup` all open a speedup
//! phase). A [`Dialect`] maps every recognized label to the semantic
//! [`Transition`] it triggers, so one state machine handles all of them.

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::anyhow;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// A new execution starts
    Startup,
    /// The current execution terminated cleanly
    Shutdown,
    /// Runtime metadata (e.g. the sampling period)
    Info,
    /// A phase without induced speedup starts
    OpenBaseline,
    /// A phase with a selection target starts
    OpenExperiment,
    CloseBaseline,
    CloseExperiment,
    /// A progress counter reading
    Counter,
    /// Sample count of one location; flushes buffered measurements
    Samples,
    /// An already closed experiment
    Experiment,
    /// Progress made at one progress point during the last experiment
    ProgressDelta,
    /// Elapsed time of the current execution so far
    Runtime,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Startup => "startup",
            Transition::Shutdown => "shutdown",
            Transition::Info => "info",
            Transition::OpenBaseline => "open-baseline",
            Transition::OpenExperiment => "open-experiment",
            Transition::CloseBaseline => "close-baseline",
            Transition::CloseExperiment => "close-experiment",
            Transition::Counter => "counter",
            Transition::Samples => "samples",
            Transition::Experiment => "experiment",
            Transition::ProgressDelta => "progress-delta",
            Transition::Runtime => "runtime",
        }
    }

    const ALL: [Transition; 12] = [
        Transition::Startup,
        Transition::Shutdown,
        Transition::Info,
        Transition::OpenBaseline,
        Transition::OpenExperiment,
        Transition::CloseBaseline,
        Transition::CloseExperiment,
        Transition::Counter,
        Transition::Samples,
        Transition::Experiment,
        Transition::ProgressDelta,
        Transition::Runtime,
    ];
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Transition::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| anyhow!("Invalid transition: {}", s))
    }
}

const SHARED_LABELS: [(&str, Transition); 4] = [
    ("startup", Transition::Startup),
    ("shutdown", Transition::Shutdown),
    ("samples", Transition::Samples),
    ("info", Transition::Info),
];

const PHASE_LABELS: [(&str, Transition); 9] = [
    ("start-baseline", Transition::OpenBaseline),
    ("end-baseline", Transition::CloseBaseline),
    ("start-experiment", Transition::OpenExperiment),
    ("end-experiment", Transition::CloseExperiment),
    ("start-round", Transition::OpenExperiment),
    ("end-round", Transition::CloseExperiment),
    ("start-speedup", Transition::OpenExperiment),
    ("end-speedup", Transition::CloseExperiment),
    ("counter", Transition::Counter),
];

const SNAPSHOT_LABELS: [(&str, Transition); 4] = [
    ("experiment", Transition::Experiment),
    ("progress-point", Transition::ProgressDelta),
    ("throughput-point", Transition::ProgressDelta),
    ("runtime", Transition::Runtime),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    labels: HashMap<String, Transition>,
}

impl Dialect {
    /// A dialect that recognizes no labels at all.
    pub fn empty() -> Self {
        Dialect {
            labels: HashMap::new(),
        }
    }

    /// Labels of runtimes that log phase boundaries and raw counter values.
    pub fn phases() -> Self {
        Self::empty().with_labels(&SHARED_LABELS).with_labels(&PHASE_LABELS)
    }

    /// Labels of runtimes that log closed experiments and progress deltas.
    pub fn snapshots() -> Self {
        Self::empty()
            .with_labels(&SHARED_LABELS)
            .with_labels(&SNAPSHOT_LABELS)
    }

    fn with_labels(mut self, labels: &[(&str, Transition)]) -> Self {
        for (label, transition) in labels {
            self.add_label(label, *transition);
        }
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: &str, transition: Transition) -> Self {
        self.add_label(label, transition);
        self
    }

    /// Map `label` to `transition`, replacing any previous mapping of `label`.
    pub fn add_label(&mut self, label: &str, transition: Transition) {
        self.labels.insert(label.to_string(), transition);
    }

    /// Add `label = "transition"` pairs, skipping pairs with an unknown transition.
    pub fn add_aliases<I, L, T>(&mut self, aliases: I)
    where
        I: IntoIterator<Item = (L, T)>,
        L: AsRef<str>,
        T: AsRef<str>,
    {
        for (label, transition) in aliases {
            match transition.as_ref().parse::<Transition>() {
                Ok(t) => self.add_label(label.as_ref(), t),
                Err(e) => warn!("Ignoring alias '{}': {}", label.as_ref(), e),
            }
        }
    }

    pub fn transition(&self, command: &str) -> Option<Transition> {
        self.labels.get(command).copied()
    }
}

/// Every label family known from the supported runtimes.
impl Default for Dialect {
    fn default() -> Self {
        Self::empty()
            .with_labels(&SHARED_LABELS)
            .with_labels(&PHASE_LABELS)
            .with_labels(&SNAPSHOT_LABELS)
    }
}
