use super::ring::RingError;
use super::touschek_table::{DTableError, DTableIoError};
use crate::common::config::ConfigError;
use crate::common::rigidity::RigidityError;
use crate::domain::LifetimeError;
use crate::numerics::BroadcastError;
use crate::numerics::special::QuadratureError;

/// Failure of one of the pointwise loss-rate calculators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LossRateError {
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
    #[error(transparent)]
    Rigidity(#[from] RigidityError),
    #[error(transparent)]
    Table(#[from] DTableError),
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },
}

impl LossRateError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// `Err` unless `value` is finite and strictly positive.
pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), LossRateError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LossRateError::invalid(
            field,
            format!("must be finite and > 0, got {value}"),
        ))
    }
}

pub(crate) fn require_positive_samples(
    field: &'static str,
    values: impl IntoIterator<Item = f64>,
) -> Result<(), LossRateError> {
    for (index, value) in values.into_iter().enumerate() {
        if !(value.is_finite() && value > 0.0) {
            return Err(LossRateError::invalid(
                field,
                format!("must be finite and > 0, got {value} at index {index}"),
            ));
        }
    }
    Ok(())
}

impl From<BroadcastError> for LifetimeError {
    fn from(error: BroadcastError) -> Self {
        Self::input("INPUT.SHAPE", error.to_string())
    }
}

impl From<RigidityError> for LifetimeError {
    fn from(error: RigidityError) -> Self {
        Self::input("INPUT.ENERGY", error.to_string())
    }
}

impl From<QuadratureError> for LifetimeError {
    fn from(error: QuadratureError) -> Self {
        Self::computation("RUN.QUADRATURE", error.to_string())
    }
}

impl From<DTableError> for LifetimeError {
    fn from(error: DTableError) -> Self {
        match error {
            DTableError::Quadrature { .. } => {
                Self::computation("RUN.QUADRATURE", error.to_string())
            }
            _ => Self::input("INPUT.TABLE", error.to_string()),
        }
    }
}

impl From<DTableIoError> for LifetimeError {
    fn from(error: DTableIoError) -> Self {
        match error {
            DTableIoError::Read { .. } | DTableIoError::Write { .. } => {
                Self::io("IO.TABLE", error.to_string())
            }
            DTableIoError::Parse { .. } | DTableIoError::Invalid { .. } => {
                Self::input("INPUT.TABLE", error.to_string())
            }
            DTableIoError::Serialize(_) => Self::internal("RUN.SERIALIZE", error.to_string()),
        }
    }
}

impl From<LossRateError> for LifetimeError {
    fn from(error: LossRateError) -> Self {
        match error {
            LossRateError::Broadcast(error) => error.into(),
            LossRateError::Rigidity(error) => error.into(),
            LossRateError::Table(error) => error.into(),
            LossRateError::InvalidInput { .. } => {
                Self::input("INPUT.PHYSICS", error.to_string())
            }
        }
    }
}

impl From<RingError> for LifetimeError {
    fn from(error: RingError) -> Self {
        match error {
            RingError::LossRate(error) => error.into(),
            _ => Self::input("INPUT.RING", error.to_string()),
        }
    }
}

impl From<ConfigError> for LifetimeError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Read { .. } => Self::io("IO.CONFIG", error.to_string()),
            ConfigError::Parse { .. } => Self::input("INPUT.CONFIG", error.to_string()),
        }
    }
}
