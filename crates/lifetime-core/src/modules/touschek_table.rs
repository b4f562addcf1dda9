//! Touschek `D(ξ)` function and its interpolation table.
//!
//! ```text
//! D(ξ) = sqrt(ξ) * ( -3/2 exp(-ξ) + 1/2 (3ξ - ξ ln ξ + 2) I1(ξ) + 1/2 ξ I2(ξ) )
//! I1(ξ) = ∫_ξ^∞ exp(-x)/x dx,   I2(ξ) = ∫_ξ^∞ exp(-x) ln(x)/x dx
//! ```
//!
//! With `x = ξ + u` and `w = u/ξ` the `ξ ln ξ` terms cancel exactly, and an
//! integration by parts absorbs the constant, leaving a single integral whose
//! integrand has no large opposing terms:
//!
//! ```text
//! D(ξ) = sqrt(ξ) exp(-ξ) ∫_0^∞ exp(-u) ( u/(ξ+u)² - (w - ln(1+w)) / (2(1+w)) ) du
//! ```
//!
//! The bracket decays like `1/(2ξ²)`, so it is integrated multiplied by
//! `(1+ξ)²` to keep the absolute tolerance meaningful at large `ξ`.

use crate::common::config::{DTouschekTableConfig, QuadratureConfig};
use crate::numerics::special::{QuadratureError, SemiInfiniteQuadrature, integrate_semi_infinite};
use crate::numerics::{OutOfRange, interpolate_linear, log_grid};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, info};

static DEFAULT_TABLE: OnceLock<Result<DTouschekTable, DTableError>> = OnceLock::new();

/// Source of `D(ξ)` values for the Touschek calculators.
pub trait DTouschekLookup {
    fn d_value(&self, ksi: f64) -> f64;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DTableError {
    #[error("D-Touschek argument must be finite and > 0, got {value}")]
    InvalidKsi { value: f64 },
    #[error("invalid D-Touschek table config: {reason}")]
    InvalidConfig { reason: String },
    #[error("D-Touschek table needs at least 2 points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("D-Touschek table column length mismatch: ksi={ksi}, d={d}")]
    LengthMismatch { ksi: usize, d: usize },
    #[error("D-Touschek table column '{column}' is not finite at index {index}: {value}")]
    NonFiniteValue {
        column: &'static str,
        index: usize,
        value: f64,
    },
    #[error(
        "D-Touschek table ksi must be strictly increasing and > 0, index {index} has {current} after {previous}"
    )]
    NonIncreasingKsi {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("D-Touschek quadrature failed at ksi={ksi}: {source}")]
    Quadrature {
        ksi: f64,
        #[source]
        source: QuadratureError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DTableIoError {
    #[error("failed to read D-Touschek table '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write D-Touschek table '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse D-Touschek table '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize D-Touschek table: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("D-Touschek table '{}' is invalid: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: DTableError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableColumns {
    ksi: Vec<f64>,
    d: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct TableColumnsRef<'a> {
    ksi: &'a [f64],
    d: &'a [f64],
}

/// Sampled `D(ξ)` on a strictly increasing `ξ` grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DTouschekTable {
    ksi: Vec<f64>,
    d: Vec<f64>,
}

impl DTouschekTable {
    pub fn build(config: &DTouschekTableConfig) -> Result<Self, DTableError> {
        validate_config(config)?;

        let started = Instant::now();
        let ksi = log_grid(config.exponent_min, config.exponent_max, config.points).ok_or_else(
            || DTableError::InvalidConfig {
                reason: format!("cannot build a {}-point grid", config.points),
            },
        )?;
        let quadrature = quadrature_settings(&config.quadrature);

        let d = ksi
            .iter()
            .map(|&value| d_touschek(value, &quadrature))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            points = config.points,
            exponent_min = config.exponent_min,
            exponent_max = config.exponent_max,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built D-Touschek table"
        );

        Self::from_columns(ksi, d)
    }

    pub fn from_columns(ksi: Vec<f64>, d: Vec<f64>) -> Result<Self, DTableError> {
        if ksi.len() != d.len() {
            return Err(DTableError::LengthMismatch {
                ksi: ksi.len(),
                d: d.len(),
            });
        }
        if ksi.len() < 2 {
            return Err(DTableError::InsufficientPoints { actual: ksi.len() });
        }

        for (column, values) in [("ksi", &ksi), ("d", &d)] {
            if let Some((index, value)) = values
                .iter()
                .copied()
                .enumerate()
                .find(|(_, value)| !value.is_finite())
            {
                return Err(DTableError::NonFiniteValue {
                    column,
                    index,
                    value,
                });
            }
        }

        if ksi[0] <= 0.0 {
            return Err(DTableError::NonIncreasingKsi {
                index: 0,
                previous: 0.0,
                current: ksi[0],
            });
        }
        if let Some(index) = ksi.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(DTableError::NonIncreasingKsi {
                index: index + 1,
                previous: ksi[index],
                current: ksi[index + 1],
            });
        }

        Ok(Self { ksi, d })
    }

    pub fn ksi(&self) -> &[f64] {
        &self.ksi
    }

    pub fn d(&self) -> &[f64] {
        &self.d
    }

    pub fn len(&self) -> usize {
        self.ksi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ksi.is_empty()
    }

    /// Inclusive `(min, max)` of the sampled `ξ` range.
    pub fn ksi_range(&self) -> (f64, f64) {
        (self.ksi[0], self.ksi[self.ksi.len() - 1])
    }

    /// Linear interpolation of `D`; `0.0` outside the sampled range.
    pub fn lookup(&self, ksi: f64) -> f64 {
        interpolate_linear(ksi, &self.ksi, &self.d, OutOfRange::Fill(0.0)).unwrap_or(0.0)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), DTableIoError> {
        let path = path.as_ref();
        let rendered = serde_json::to_string(&TableColumnsRef {
            ksi: &self.ksi,
            d: &self.d,
        })
        .map_err(DTableIoError::Serialize)?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DTableIoError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, rendered).map_err(|source| DTableIoError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), points = self.len(), "wrote D-Touschek table");
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DTableIoError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| DTableIoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let columns: TableColumns =
            serde_json::from_str(&source).map_err(|source| DTableIoError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let table = Self::from_columns(columns.ksi, columns.d).map_err(|source| {
            DTableIoError::Invalid {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!(path = %path.display(), points = table.len(), "loaded D-Touschek table");
        Ok(table)
    }
}

impl DTouschekLookup for DTouschekTable {
    fn d_value(&self, ksi: f64) -> f64 {
        self.lookup(ksi)
    }
}

impl<T: DTouschekLookup + ?Sized> DTouschekLookup for &T {
    fn d_value(&self, ksi: f64) -> f64 {
        (**self).d_value(ksi)
    }
}

/// Process-wide table built with [`DTouschekTableConfig::default`] on first use.
pub fn default_table() -> Result<&'static DTouschekTable, DTableError> {
    DEFAULT_TABLE
        .get_or_init(|| DTouschekTable::build(&DTouschekTableConfig::default()))
        .as_ref()
        .map_err(Clone::clone)
}

/// `D(ξ)` by direct quadrature, for `ξ > 0`.
pub fn d_touschek(ksi: f64, quadrature: &SemiInfiniteQuadrature) -> Result<f64, DTableError> {
    if !ksi.is_finite() || ksi <= 0.0 {
        return Err(DTableError::InvalidKsi { value: ksi });
    }

    let scale = (1.0 + ksi) * (1.0 + ksi);
    let integrand = |u: f64| {
        let x = ksi + u;
        let w = u / ksi;
        (-u).exp() * scale * (u / (x * x) - log1p_excess(w) / (2.0 * (1.0 + w)))
    };
    let scaled_bracket = integrate_semi_infinite(integrand, 0.0, quadrature)
        .map_err(|source| DTableError::Quadrature { ksi, source })?
        .value;

    Ok(ksi.sqrt() * (-ksi).exp() * scaled_bracket / scale)
}

/// `w - ln(1 + w)` without cancellation for small `w`.
fn log1p_excess(w: f64) -> f64 {
    if w < 1.0e-2 {
        // w²/2 - w³/3 + ... - w⁹/9, Horner form
        let tail = 1.0 / 6.0 - w * (1.0 / 7.0 - w * (0.125 - w / 9.0));
        w * w * (0.5 - w * (1.0 / 3.0 - w * (0.25 - w * (0.2 - w * tail))))
    } else {
        w - w.ln_1p()
    }
}

pub fn quadrature_settings(config: &QuadratureConfig) -> SemiInfiniteQuadrature {
    SemiInfiniteQuadrature::new(config.abs_tol, config.rel_tol, config.max_subdivisions)
}

fn validate_config(config: &DTouschekTableConfig) -> Result<(), DTableError> {
    if !config.exponent_min.is_finite() || !config.exponent_max.is_finite() {
        return Err(DTableError::InvalidConfig {
            reason: format!(
                "exponents must be finite, got [{}, {}]",
                config.exponent_min, config.exponent_max
            ),
        });
    }
    if config.exponent_min >= config.exponent_max {
        return Err(DTableError::InvalidConfig {
            reason: format!(
                "exponent_min {} must be below exponent_max {}",
                config.exponent_min, config.exponent_max
            ),
        });
    }
    if config.points < 2 {
        return Err(DTableError::InsufficientPoints {
            actual: config.points,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        DTableError, DTableIoError, DTouschekLookup, DTouschekTable, d_touschek, default_table,
        log1p_excess, quadrature_settings,
    };
    use crate::common::config::{DTouschekTableConfig, QuadratureConfig};
    use std::fs;
    use tempfile::TempDir;

    fn small_config() -> DTouschekTableConfig {
        DTouschekTableConfig {
            exponent_min: -4.0,
            exponent_max: 2.0,
            points: 241,
            ..DTouschekTableConfig::default()
        }
    }

    #[test]
    fn d_touschek_matches_high_precision_reference() {
        let quadrature = quadrature_settings(&QuadratureConfig::default());
        let cases = [
            (1.0e-4, 0.071_365_740_701_875_729),
            (1.0e-2, 0.265_804_721_119_694_56),
            (0.5, 0.112_696_274_323_640_8),
            (1.0, 0.045_562_272_839_972_291),
            (2.0, 0.009_707_096_508_632_819_8),
            (10.0, 5.548_992_400_011_776_4e-7),
        ];

        for (ksi, expected) in cases {
            let actual = d_touschek(ksi, &quadrature).expect("D value");
            let relative = (actual - expected).abs() / expected;
            assert!(
                relative <= 1.0e-10,
                "ksi={ksi} expected={expected:.15e} actual={actual:.15e}"
            );
        }
    }

    #[test]
    fn d_touschek_keeps_full_precision_in_the_far_tail() {
        let quadrature = quadrature_settings(&QuadratureConfig::default());
        let cases = [
            (30.0, 2.590_804_137_033_004_6e-16),
            (100.0, 1.806_028_995_421_490_9e-47),
            (400.0, 1.188_077_748_289_516_9e-178),
        ];

        for (ksi, expected) in cases {
            let actual = d_touschek(ksi, &quadrature).expect("D value");
            let relative = (actual - expected).abs() / expected;
            assert!(
                relative <= 1.0e-12,
                "ksi={ksi} expected={expected:.15e} actual={actual:.15e}"
            );
        }
    }

    #[test]
    fn log1p_excess_is_continuous_across_series_switch() {
        for w in [1.0e-8_f64, 1.0e-4, 9.999e-3, 1.0e-2, 0.5, 40.0] {
            let expected = w - w.ln_1p();
            let actual = log1p_excess(w);
            if w >= 1.0e-3 {
                assert!(((actual - expected) / expected).abs() < 1.0e-12, "w={w}");
            }
            assert!(actual > 0.0);
        }
        assert!((log1p_excess(1.0e-8) / 5.0e-17 - 1.0).abs() < 1.0e-7);
    }

    #[test]
    fn d_touschek_rejects_non_positive_arguments() {
        let quadrature = quadrature_settings(&QuadratureConfig::default());
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let error = d_touschek(value, &quadrature).expect_err("invalid ksi");
            assert!(matches!(error, DTableError::InvalidKsi { .. }));
        }
    }

    #[test]
    fn built_table_is_non_negative_and_decays() {
        let table = DTouschekTable::build(&small_config()).expect("table");
        assert_eq!(table.len(), 241);
        assert!(table.d().iter().all(|value| *value >= 0.0));

        let tail: Vec<f64> = table
            .ksi()
            .iter()
            .zip(table.d())
            .filter(|(ksi, _)| **ksi >= 0.1)
            .map(|(_, d)| *d)
            .collect();
        assert!(tail.windows(2).all(|pair| pair[1] <= pair[0]));
        assert!(*table.d().last().expect("non-empty") < 1.0e-40);
    }

    #[test]
    fn lookup_returns_zero_outside_sampled_range() {
        let table = DTouschekTable::build(&small_config()).expect("table");
        let (min, max) = table.ksi_range();

        assert_eq!(table.lookup(min * 0.999), 0.0);
        assert_eq!(table.lookup(max * 1.001), 0.0);
        assert_eq!(table.lookup(f64::NAN), 0.0);
        assert_eq!(table.lookup(min), table.d()[0]);
        assert!(table.lookup(1.0) > 0.0);
    }

    #[test]
    fn lookup_agrees_with_direct_quadrature_between_nodes() {
        let table = DTouschekTable::build(&small_config()).expect("table");
        let quadrature = quadrature_settings(&QuadratureConfig::default());

        for ksi in [3.0e-4, 0.02, 0.3, 1.7] {
            let exact = d_touschek(ksi, &quadrature).expect("D value");
            let interpolated = table.d_value(ksi);
            assert!(
                (interpolated - exact).abs() / exact <= 5.0e-3,
                "ksi={ksi} exact={exact:e} interpolated={interpolated:e}"
            );
        }
    }

    #[test]
    fn default_table_is_shared_and_covers_operating_range() {
        let first = default_table().expect("default table");
        let second = default_table().expect("default table");
        assert!(std::ptr::eq(first, second));

        let (min, max) = first.ksi_range();
        assert!((min - 1.0e-5).abs() < 1.0e-18);
        assert!((max - 1.0e3).abs() < 1.0e-9);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let reversed = DTouschekTableConfig {
            exponent_min: 2.0,
            exponent_max: -2.0,
            ..DTouschekTableConfig::default()
        };
        assert!(matches!(
            DTouschekTable::build(&reversed),
            Err(DTableError::InvalidConfig { .. })
        ));

        let single = DTouschekTableConfig {
            points: 1,
            ..DTouschekTableConfig::default()
        };
        assert_eq!(
            DTouschekTable::build(&single),
            Err(DTableError::InsufficientPoints { actual: 1 })
        );
    }

    #[test]
    fn from_columns_validates_shape_and_ordering() {
        assert_eq!(
            DTouschekTable::from_columns(vec![1.0, 2.0], vec![0.5]),
            Err(DTableError::LengthMismatch { ksi: 2, d: 1 })
        );
        assert_eq!(
            DTouschekTable::from_columns(vec![1.0, 1.0], vec![0.5, 0.4]),
            Err(DTableError::NonIncreasingKsi {
                index: 1,
                previous: 1.0,
                current: 1.0,
            })
        );
        assert!(matches!(
            DTouschekTable::from_columns(vec![1.0, 2.0], vec![0.5, f64::NAN]),
            Err(DTableError::NonFiniteValue { column: "d", index: 1, .. })
        ));
    }

    #[test]
    fn json_artifact_round_trips_through_disk() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("tables/d_touschek.json");
        let table = DTouschekTable::build(&DTouschekTableConfig {
            points: 16,
            ..small_config()
        })
        .expect("table");

        table.save_json(&path).expect("table should be written");
        let loaded = DTouschekTable::load_json(&path).expect("table should load");
        assert_eq!(loaded, table);
    }

    #[test]
    fn loading_rejects_unsorted_or_malformed_tables() {
        let temp = TempDir::new().expect("tempdir should be created");
        let unsorted = temp.path().join("unsorted.json");
        fs::write(&unsorted, r#"{ "ksi": [2.0, 1.0], "d": [0.1, 0.2] }"#)
            .expect("fixture should be written");
        assert!(matches!(
            DTouschekTable::load_json(&unsorted),
            Err(DTableIoError::Invalid { .. })
        ));

        let malformed = temp.path().join("malformed.json");
        fs::write(&malformed, r#"{ "ksi": [1.0, 2.0] }"#).expect("fixture should be written");
        assert!(matches!(
            DTouschekTable::load_json(&malformed),
            Err(DTableIoError::Parse { .. })
        ));
    }
}
