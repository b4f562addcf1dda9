//! Tunable numerical parameters of the lifetime engine.
//!
//! Every field has a default, so a config file only lists what it overrides.
//! Keys are snake_case like the parameter deck:
//!
//! ```json
//! { "table": { "points": 2000, "exponent_min": -4.0 }, "ring": { "acceptance_floor": 1e-5 } }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TABLE_EXPONENT_MIN: f64 = -5.0;
pub const DEFAULT_TABLE_EXPONENT_MAX: f64 = 3.0;
pub const DEFAULT_TABLE_POINTS: usize = 5_000;
pub const DEFAULT_MAX_SUBDIVISIONS: usize = 1_000;
pub const DEFAULT_RING_STEP: f64 = 0.1;
pub const DEFAULT_ACCEPTANCE_FLOOR: f64 = 1.0e-4;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuadratureConfig {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_subdivisions: usize,
}

impl Default for QuadratureConfig {
    fn default() -> Self {
        Self {
            abs_tol: 1.0e-14,
            rel_tol: 1.0e-12,
            max_subdivisions: DEFAULT_MAX_SUBDIVISIONS,
        }
    }
}

/// Log-spaced grid `ksi = 10^linspace(exponent_min, exponent_max, points)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DTouschekTableConfig {
    pub exponent_min: f64,
    pub exponent_max: f64,
    pub points: usize,
    pub quadrature: QuadratureConfig,
}

impl Default for DTouschekTableConfig {
    fn default() -> Self {
        Self {
            exponent_min: DEFAULT_TABLE_EXPONENT_MIN,
            exponent_max: DEFAULT_TABLE_EXPONENT_MAX,
            points: DEFAULT_TABLE_POINTS,
            quadrature: QuadratureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RingSamplingConfig {
    /// Upper bound on the longitudinal spacing of the integration grid [m].
    pub step: f64,
    /// Replacement for interpolated acceptances that are exactly zero.
    pub acceptance_floor: f64,
}

impl Default for RingSamplingConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_RING_STEP,
            acceptance_floor: DEFAULT_ACCEPTANCE_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub table: DTouschekTableConfig,
    pub ring: RingSamplingConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read engine config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse engine config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub fn load_engine_config(config_path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}
