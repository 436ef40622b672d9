use std::cmp::Ordering;
use std::fmt::Display;
use std::str::FromStr;

/// Induced virtual speedup of a selection target, stored as an exact fraction.
///
/// Keeping the fraction exact makes it usable as a map key: the same delay
/// size over the same sampling period always lands on the same entry, no
/// matter which run or file it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Speedup {
    num: u64,
    den: u64,
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Speedup {
    pub const ZERO: Speedup = Speedup { num: 0, den: 1 };

    /// `num / den` in lowest terms, or `None` for a zero denominator.
    pub fn from_ratio(num: u64, den: u64) -> Option<Speedup> {
        if den == 0 {
            return None;
        }
        if num == 0 {
            return Some(Speedup::ZERO);
        }
        let divisor = gcd(num, den);
        Some(Speedup {
            num: num / divisor,
            den: den / divisor,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl Default for Speedup {
    fn default() -> Self {
        Speedup::ZERO
    }
}

impl Ord for Speedup {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u128::from(self.num) * u128::from(other.den);
        let rhs = u128::from(other.num) * u128::from(self.den);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Speedup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Speedup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_f64())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid speedup fraction '{0}'")]
pub struct ParseSpeedupError(String);

/// Parses non-negative decimal fractions such as `0`, `0.25` or `1.00` exactly.
impl FromStr for Speedup {
    type Err = ParseSpeedupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSpeedupError(s.to_string());
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(err());
        }

        // Trailing zeros add precision the fraction does not need.
        let frac_part = frac_part.trim_end_matches('0');
        let den = 10u64.checked_pow(frac_part.len() as u32).ok_or_else(err)?;
        let int_value = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<u64>().map_err(|_| err())?
        };
        let frac_value = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse::<u64>().map_err(|_| err())?
        };
        let num = int_value
            .checked_mul(den)
            .and_then(|n| n.checked_add(frac_value))
            .ok_or_else(err)?;

        Speedup::from_ratio(num, den).ok_or_else(err)
    }
}

/// Parameters of one closed measurement phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Experiment {
    /// Code location that was virtually sped up
    pub selection: String,
    pub speedup: Speedup,
    /// Effective duration, with the applied delay already subtracted
    pub duration: u64,
    pub applied_delay: u64,
    /// Samples taken in the selection target during the phase
    pub samples: u64,
}

/// Progress observed at one counter during one experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub experiment: Experiment,
    pub counter: String,
    pub kind: String,
    pub implementation: String,
    pub delta: u64,
}

impl Measurement {
    pub fn new(
        experiment: Experiment,
        counter: &str,
        kind: &str,
        implementation: &str,
        delta: u64,
    ) -> Self {
        Measurement {
            experiment,
            counter: counter.to_string(),
            kind: kind.to_string(),
            implementation: implementation.to_string(),
            delta,
        }
    }

    pub fn selection(&self) -> &str {
        &self.experiment.selection
    }

    pub fn speedup(&self) -> Speedup {
        self.experiment.speedup
    }

    pub fn duration(&self) -> u64 {
        self.experiment.duration
    }

    pub fn samples(&self) -> u64 {
        self.experiment.samples
    }

    /// Elapsed time per unit of progress. `None` when no progress was made.
    pub fn period(&self) -> Option<f64> {
        if self.delta == 0 {
            None
        } else {
            Some(self.experiment.duration as f64 / self.delta as f64)
        }
    }

    /// Whether `other` describes the same counter under the same experiment parameters.
    pub fn is_mergeable_with(&self, other: &Measurement) -> bool {
        self.experiment.selection == other.experiment.selection
            && self.experiment.speedup == other.experiment.speedup
            && self.counter == other.counter
            && self.kind == other.kind
            && self.implementation == other.implementation
    }

    /// Add the observations of `other` to `self`.
    ///
    /// # Panics
    /// Panics if the two measurements are not mergeable; callers route by key first.
    pub fn merge(&mut self, other: &Measurement) {
        assert!(
            self.is_mergeable_with(other),
            "Merging measurements of different keys: {:?} vs {:?}",
            self,
            other
        );
        self.delta = self.delta.saturating_add(other.delta);
        let ours = &mut self.experiment;
        ours.duration = ours.duration.saturating_add(other.experiment.duration);
        ours.applied_delay = ours
            .applied_delay
            .saturating_add(other.experiment.applied_delay);
        ours.samples = ours.samples.saturating_add(other.experiment.samples);
    }
}

#[cfg(test)]
pub(crate) fn measurement(
    selection: &str,
    counter: &str,
    speedup: Speedup,
    duration: u64,
    delta: u64,
    samples: u64,
) -> Measurement {
    Measurement::new(
        Experiment {
            selection: selection.to_string(),
            speedup,
            duration,
            applied_delay: 0,
            samples,
        },
        counter,
        "progress",
        "source",
        delta,
    )
}
