//! Ring-averaged Touschek loss rate from sampled optics and acceptance profiles.
//!
//! The integration domain is the span of the acceptance profile. Optics are
//! interpolated onto it with edge-hold clamping, so optics samples outside the
//! span are never evaluated.

use super::errors::LossRateError;
use super::touschek::{OpticsPoint, TouschekBeam, touschek_point};
use super::touschek_table::{DTouschekLookup, default_table};
use crate::common::config::RingSamplingConfig;
use crate::common::rigidity::beam_rigidity;
use crate::numerics::{
    OutOfRange, bounded_step_grid, interpolate_linear, trapezoid, unique_with_first_index,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Optics functions sampled at longitudinal positions `s` [m]; `s` may repeat.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RingOptics {
    pub s: Vec<f64>,
    pub betax: Vec<f64>,
    pub alphax: Vec<f64>,
    pub etax: Vec<f64>,
    pub etapx: Vec<f64>,
    pub betay: Vec<f64>,
    pub etay: Vec<f64>,
}

/// Momentum acceptance along the ring. `negative` holds the (negative) lower bound.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptanceProfile {
    pub s: Vec<f64>,
    pub positive: Vec<f64>,
    pub negative: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingTouschekResult {
    /// Pointwise loss rate [1/s] at each `position`.
    pub rate: Vec<f64>,
    /// Length-weighted mean of `rate` over the acceptance span [1/s].
    pub average_rate: f64,
    /// Bunch volume [m³] at each `position`.
    pub volume: Vec<f64>,
    pub position: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RingError {
    #[error("{profile} column '{column}' has {actual} samples, expected {expected}")]
    LengthMismatch {
        profile: &'static str,
        column: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error("{profile} profile needs at least 2 distinct positions, got {actual}")]
    InsufficientSamples { profile: &'static str, actual: usize },
    #[error("{profile} position must be finite at index {index}, got {value}")]
    NonFinitePosition {
        profile: &'static str,
        index: usize,
        value: f64,
    },
    #[error(
        "acceptance positions must not decrease, index {index} has {current} after {previous}"
    )]
    DecreasingPosition {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("acceptance profile spans zero length at s={position}")]
    ZeroSpan { position: f64 },
    #[error("ring sampling step must be finite and > 0, got {value}")]
    InvalidStep { value: f64 },
    #[error(transparent)]
    LossRate(#[from] LossRateError),
}

/// Ring-averaged Touschek rate using the process-wide D-Touschek table.
pub fn touschek_inverse_lifetime(
    beam: &TouschekBeam,
    acceptance: &AcceptanceProfile,
    optics: &RingOptics,
    sampling: &RingSamplingConfig,
) -> Result<RingTouschekResult, RingError> {
    let table = default_table().map_err(LossRateError::from)?;
    touschek_inverse_lifetime_with_table(beam, acceptance, optics, sampling, table)
}

pub fn touschek_inverse_lifetime_with_table(
    beam: &TouschekBeam,
    acceptance: &AcceptanceProfile,
    optics: &RingOptics,
    sampling: &RingSamplingConfig,
    table: &impl DTouschekLookup,
) -> Result<RingTouschekResult, RingError> {
    validate_acceptance(acceptance)?;
    validate_optics(optics)?;
    if !(sampling.step.is_finite() && sampling.step > 0.0) {
        return Err(RingError::InvalidStep {
            value: sampling.step,
        });
    }

    let gamma = beam_rigidity(beam.energy)
        .map_err(LossRateError::from)?
        .gamma;

    let start = acceptance.s[0];
    let end = acceptance.s[acceptance.s.len() - 1];
    let position = bounded_step_grid(start, end, sampling.step)
        .ok_or(RingError::ZeroSpan { position: start })?;

    let mut floored = 0usize;
    let mut floor = |value: f64| {
        if value == 0.0 {
            floored += 1;
            sampling.acceptance_floor
        } else {
            value
        }
    };
    let acc_p: Vec<f64> = position
        .iter()
        .map(|&s| floor(clamped(s, &acceptance.s, &acceptance.positive)))
        .collect();
    let acc_n: Vec<f64> = position
        .iter()
        .map(|&s| floor(-clamped(s, &acceptance.s, &acceptance.negative)))
        .collect();
    if floored > 0 {
        warn!(
            floored,
            floor = sampling.acceptance_floor,
            "replaced zero momentum acceptances with the floor value"
        );
    }

    let resampled = ResampledOptics::new(optics, &position);
    let mut rate = Vec::with_capacity(position.len());
    let mut volume = Vec::with_capacity(position.len());
    for index in 0..position.len() {
        let point = touschek_point(
            beam,
            gamma,
            resampled.point(index),
            acc_p[index],
            acc_n[index],
            table,
        );
        rate.push(point.rate);
        volume.push(point.volume);
    }

    let span = end - start;
    let average_rate = trapezoid(&rate, &position).unwrap_or(f64::NAN) / span;
    debug!(
        points = position.len(),
        span, average_rate, "integrated Touschek rate along the ring"
    );

    Ok(RingTouschekResult {
        rate,
        average_rate,
        volume,
        position,
    })
}

struct ResampledOptics {
    betax: Vec<f64>,
    alphax: Vec<f64>,
    etax: Vec<f64>,
    etapx: Vec<f64>,
    betay: Vec<f64>,
    etay: Vec<f64>,
}

impl ResampledOptics {
    fn new(optics: &RingOptics, position: &[f64]) -> Self {
        let (s_unique, first_index) = unique_with_first_index(&optics.s);
        let resample = |column: &[f64]| -> Vec<f64> {
            let values: Vec<f64> = first_index.iter().map(|&index| column[index]).collect();
            position
                .iter()
                .map(|&s| clamped(s, &s_unique, &values))
                .collect()
        };

        Self {
            betax: resample(&optics.betax),
            alphax: resample(&optics.alphax),
            etax: resample(&optics.etax),
            etapx: resample(&optics.etapx),
            betay: resample(&optics.betay),
            etay: resample(&optics.etay),
        }
    }

    fn point(&self, index: usize) -> OpticsPoint {
        OpticsPoint {
            betax: self.betax[index],
            betay: self.betay[index],
            etax: self.etax[index],
            etay: self.etay[index],
            alphax: self.alphax[index],
            etapx: self.etapx[index],
        }
    }
}

// Grids are validated before resampling, so `interpolate_linear` always has a value.
fn clamped(x: f64, x_grid: &[f64], y_grid: &[f64]) -> f64 {
    interpolate_linear(x, x_grid, y_grid, OutOfRange::Clamp).unwrap_or(f64::NAN)
}

fn validate_acceptance(acceptance: &AcceptanceProfile) -> Result<(), RingError> {
    let expected = acceptance.s.len();
    check_column("acceptance", "positive", acceptance.positive.len(), expected)?;
    check_column("acceptance", "negative", acceptance.negative.len(), expected)?;
    check_positions("acceptance", &acceptance.s)?;
    if expected < 2 {
        return Err(RingError::InsufficientSamples {
            profile: "acceptance",
            actual: expected,
        });
    }

    if let Some(index) = acceptance.s.windows(2).position(|pair| pair[1] < pair[0]) {
        return Err(RingError::DecreasingPosition {
            index: index + 1,
            previous: acceptance.s[index],
            current: acceptance.s[index + 1],
        });
    }
    if acceptance.s[expected - 1] == acceptance.s[0] {
        return Err(RingError::ZeroSpan {
            position: acceptance.s[0],
        });
    }

    Ok(())
}

fn validate_optics(optics: &RingOptics) -> Result<(), RingError> {
    let expected = optics.s.len();
    for (column, values) in [
        ("betax", &optics.betax),
        ("alphax", &optics.alphax),
        ("etax", &optics.etax),
        ("etapx", &optics.etapx),
        ("betay", &optics.betay),
        ("etay", &optics.etay),
    ] {
        check_column("optics", column, values.len(), expected)?;
    }
    check_positions("optics", &optics.s)?;

    let distinct = unique_with_first_index(&optics.s).0.len();
    if distinct < 2 {
        return Err(RingError::InsufficientSamples {
            profile: "optics",
            actual: distinct,
        });
    }

    Ok(())
}

fn check_column(
    profile: &'static str,
    column: &'static str,
    actual: usize,
    expected: usize,
) -> Result<(), RingError> {
    if actual == expected {
        Ok(())
    } else {
        Err(RingError::LengthMismatch {
            profile,
            column,
            actual,
            expected,
        })
    }
}

fn check_positions(profile: &'static str, s: &[f64]) -> Result<(), RingError> {
    match s.iter().copied().enumerate().find(|(_, value)| !value.is_finite()) {
        Some((index, value)) => Err(RingError::NonFinitePosition {
            profile,
            index,
            value,
        }),
        None => Ok(()),
    }
}
