//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Declarative sampling distributions."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use rand::distributions::{Distribution as _, WeightedError, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{ModelError, ModelResult};

/// One outcome of a [`Distribution::WeightedDiscrete`] draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedOutcome {
    pub value: f64,
    pub weight: f64,
}

impl WeightedOutcome {
    pub const fn new(value: f64, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Probability descriptor used by the device profiles.
///
/// Thresholds and weights are data so they can be validated, overridden from
/// configuration and tested in isolation from the samplers that use them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// `1.0` with probability `p`, otherwise `0.0`.
    Bernoulli { p: f64 },
    /// Continuous uniform draw in `[low, high]`.
    UniformRange { low: f64, high: f64 },
    /// Integer uniform draw in `[low, high]`.
    UniformInt { low: i64, high: i64 },
    /// Draw one of `outcomes` proportionally to its weight.
    WeightedDiscrete { outcomes: Vec<WeightedOutcome> },
}

impl Distribution {
    pub const fn bernoulli(p: f64) -> Self {
        Distribution::Bernoulli { p }
    }

    pub const fn uniform(low: f64, high: f64) -> Self {
        Distribution::UniformRange { low, high }
    }

    pub const fn uniform_int(low: i64, high: i64) -> Self {
        Distribution::UniformInt { low, high }
    }

    pub fn weighted(outcomes: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Distribution::WeightedDiscrete {
            outcomes: outcomes
                .into_iter()
                .map(|(value, weight)| WeightedOutcome::new(value, weight))
                .collect(),
        }
    }

    /// Zero with probability `clean`, otherwise an integer uniformly in `[low, high]`.
    ///
    /// Models counters that are mostly clean with an occasional handful of hits.
    pub fn mostly_zero(clean: f64, low: i64, high: i64) -> Self {
        let span = (high - low + 1).max(1);
        let share = (1.0 - clean) / span as f64;
        let burst = (low..=high).map(|value| (value as f64, share));
        Distribution::weighted(std::iter::once((0.0, clean)).chain(burst))
    }

    /// Check parameters, naming the descriptor in any error.
    pub fn validate(&self, name: &str) -> ModelResult<()> {
        match self {
            Distribution::Bernoulli { p } => {
                if !(0.0..=1.0).contains(p) {
                    return Err(ModelError::InvalidProbability {
                        name: name.to_owned(),
                        value: *p,
                    });
                }
            }
            Distribution::UniformRange { low, high } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(ModelError::InvalidRange {
                        name: name.to_owned(),
                        low: *low,
                        high: *high,
                    });
                }
            }
            Distribution::UniformInt { low, high } => {
                if low > high {
                    return Err(ModelError::InvalidRange {
                        name: name.to_owned(),
                        low: *low as f64,
                        high: *high as f64,
                    });
                }
            }
            Distribution::WeightedDiscrete { outcomes } => {
                let invalid = |reason: String| ModelError::InvalidWeights {
                    name: name.to_owned(),
                    reason,
                };
                if let Some(o) = outcomes.iter().find(|o| !o.value.is_finite()) {
                    return Err(invalid(format!("outcome value {} is not finite", o.value)));
                }
                weighted_index(outcomes).map_err(|err| invalid(err.to_string()))?;
            }
        }
        Ok(())
    }

    /// Draw one value. Parameters are assumed validated.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Distribution::Bernoulli { p } => {
                if rng.gen_bool(p.clamp(0.0, 1.0)) {
                    1.0
                } else {
                    0.0
                }
            }
            Distribution::UniformRange { low, high } => {
                if low >= high {
                    *low
                } else {
                    rng.gen_range(*low..=*high)
                }
            }
            Distribution::UniformInt { low, high } => {
                if low >= high {
                    *low as f64
                } else {
                    rng.gen_range(*low..=*high) as f64
                }
            }
            Distribution::WeightedDiscrete { outcomes } => match weighted_index(outcomes) {
                Ok(index) => outcomes[index.sample(rng)].value,
                Err(_) => 0.0,
            },
        }
    }

    /// Draw and interpret the result as a flag (non-zero is `true`).
    pub fn sample_bool<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.sample(rng) != 0.0
    }

    /// Draw and round to the nearest integer.
    pub fn sample_i64<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        self.sample(rng).round() as i64
    }

    /// Smallest and largest value the descriptor can produce.
    pub fn support(&self) -> (f64, f64) {
        match self {
            Distribution::Bernoulli { p } => {
                let low = if *p >= 1.0 { 1.0 } else { 0.0 };
                let high = if *p <= 0.0 { 0.0 } else { 1.0 };
                (low, high)
            }
            Distribution::UniformRange { low, high } => (*low, *high),
            Distribution::UniformInt { low, high } => (*low as f64, *high as f64),
            Distribution::WeightedDiscrete { outcomes } => outcomes
                .iter()
                .filter(|o| o.weight > 0.0)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
                    (lo.min(o.value), hi.max(o.value))
                }),
        }
    }
}

// WeightedIndex panics on an infinite total, so non-finite weights are refused first.
fn weighted_index(outcomes: &[WeightedOutcome]) -> Result<WeightedIndex<f64>, WeightedError> {
    if outcomes.iter().any(|o| !o.weight.is_finite()) {
        return Err(WeightedError::InvalidWeight);
    }
    WeightedIndex::new(outcomes.iter().map(|o| o.weight))
}
