use std::fmt::Display;

use average::{self, concatenate, Estimate, Max, Mean, Min, Variance};

use readable::num::*;

concatenate!(
    AggStats,
    [Mean, mean],
    [Variance, sample_variance],
    [Min, min],
    [Max, max]
);

pub fn aggregate_durations(durations: impl Iterator<Item = f64>) -> Stats {
    let s: AggStats = durations.collect();
    let len = s.mean.len() as usize;
    Stats {
        mean: s.mean(),
        stddev: s.sample_variance().sqrt(),
        min: if len == 0 { 0.0 } else { s.min() },
        max: if len == 0 { 0.0 } else { s.max() },
        len,
    }
}

#[derive(Debug)]
pub struct Stats {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub len: usize,
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "μ: {} σ: {} min: {} max: {} n: {}",
            Float::from(self.mean),
            Float::from(self.stddev),
            Float::from(self.min),
            Float::from(self.max),
            Unsigned::from(self.len),
        )
    }
}
