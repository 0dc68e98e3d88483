//! Wind models.
//!
//! Every model is a pure function of elapsed race time: asking for the wind
//! at the same millisecond twice gives the same answer, so nothing about the
//! wind is stored between ticks.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::core::units::normalize_degrees;

/// Wind at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Direction the wind blows from, degrees.
    pub direction: f64,
    /// Speed, knots.
    pub speed: f64,
}

impl Default for Wind {
    fn default() -> Self {
        Self {
            direction: 225.0,
            speed: 12.0,
        }
    }
}

/// Period of the shifting model's oscillation, ms.
pub const OSCILLATION_PERIOD_MS: u64 = 60_000;
/// Amplitude of the shifting model's oscillation, degrees.
pub const OSCILLATION_AMPLITUDE: f64 = 5.0;
/// Persistent shift added per oscillation period, degrees.
pub const SHIFT_PER_PERIOD: f64 = 7.0;
/// Largest persistent shift before it turns back, degrees.
pub const MAX_SHIFT: f64 = 180.0;
/// Speed variation of the shifting model, knots.
pub const SPEED_AMPLITUDE: f64 = 5.0;

/// How the wind evolves over the race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum WindModel {
    /// Fixed direction and speed.
    Constant {
        /// Wind for the whole race.
        wind: Wind,
    },
    /// Oscillates about a baseline, optionally with a slow persistent shift.
    Shifting {
        /// Baseline wind.
        baseline: Wind,
        /// Add the persistent shift on top of the oscillation.
        persistent: bool,
        /// Shift clockwise (veer) rather than anticlockwise (back).
        veer: bool,
    },
    /// Seeded random walk, linearly interpolated between buckets.
    Random {
        /// Baseline wind.
        baseline: Wind,
        /// Largest direction deviation from the baseline, degrees.
        direction_range: f64,
        /// Largest speed deviation from the baseline, knots.
        speed_range: f64,
        /// Length of one random bucket, ms.
        bucket_ms: u64,
        /// Seed for the bucket values.
        seed: u64,
    },
}

impl Default for WindModel {
    fn default() -> Self {
        WindModel::Shifting {
            baseline: Wind::default(),
            persistent: false,
            veer: true,
        }
    }
}

impl WindModel {
    /// Wind after `elapsed_ms` of race time.
    pub fn at(&self, elapsed_ms: u64) -> Wind {
        match self {
            WindModel::Constant { wind } => Wind {
                direction: normalize_degrees(wind.direction),
                speed: wind.speed,
            },
            WindModel::Shifting {
                baseline,
                persistent,
                veer,
            } => shifting(baseline, *persistent, *veer, elapsed_ms),
            WindModel::Random {
                baseline,
                direction_range,
                speed_range,
                bucket_ms,
                seed,
            } => random(baseline, *direction_range, *speed_range, *bucket_ms, *seed, elapsed_ms),
        }
    }

    /// Wind at the start of the race.
    pub fn initial(&self) -> Wind {
        self.at(0)
    }
}

fn shifting(baseline: &Wind, persistent: bool, veer: bool, elapsed_ms: u64) -> Wind {
    let phase = (elapsed_ms % OSCILLATION_PERIOD_MS) as f64 / OSCILLATION_PERIOD_MS as f64;
    let oscillation = OSCILLATION_AMPLITUDE * (phase * std::f64::consts::TAU).sin();

    let shift = if persistent {
        let periods = (elapsed_ms / OSCILLATION_PERIOD_MS) as f64;
        let travel = (SHIFT_PER_PERIOD * periods) % (2.0 * MAX_SHIFT);
        let folded = if travel > MAX_SHIFT {
            2.0 * MAX_SHIFT - travel
        } else {
            travel
        };
        if veer {
            folded
        } else {
            -folded
        }
    } else {
        0.0
    };

    let offset = shift + oscillation;
    Wind {
        direction: normalize_degrees(baseline.direction + offset),
        speed: (baseline.speed + SPEED_AMPLITUDE * offset.to_radians().sin()).max(0.0),
    }
}

fn random(
    baseline: &Wind,
    direction_range: f64,
    speed_range: f64,
    bucket_ms: u64,
    seed: u64,
    elapsed_ms: u64,
) -> Wind {
    let bucket_ms = bucket_ms.max(1);
    let bucket = elapsed_ms / bucket_ms;
    let fraction = (elapsed_ms % bucket_ms) as f64 / bucket_ms as f64;

    let sample = |key: u64| {
        let mut rng = DeterministicRng::for_key(seed, key);
        let direction = rng.next_f64_range(-direction_range, direction_range);
        let speed = rng.next_f64_range(-speed_range, speed_range);
        (direction, speed)
    };
    let (d0, s0) = sample(bucket);
    let (d1, s1) = sample(bucket + 1);

    Wind {
        direction: normalize_degrees(baseline.direction + d0 + (d1 - d0) * fraction),
        speed: (baseline.speed + s0 + (s1 - s0) * fraction).max(0.0),
    }
}

// =============================================================================
// TESTS
// =============================================================================
