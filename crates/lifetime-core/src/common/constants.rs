//! Physical constants shared by the loss-rate calculators.
//!
//! CODATA 2010 values. The electron radius and the Boltzmann constant are the
//! ones the Touschek and gas-scattering fixtures were produced with, so they
//! are kept even where later adjustments exist.

use std::f64::consts::PI;

/// Speed of light in vacuum [m/s].
pub const LIGHT_SPEED: f64 = 299_792_458.0;
/// Elementary charge [C].
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_565e-19;
/// Electron mass [kg].
pub const ELECTRON_MASS: f64 = 9.109_382_91e-31;
/// Electron rest energy [eV].
pub const ELECTRON_REST_ENERGY_EV: f64 = 0.510_998_928e6;
/// Classical electron radius [m].
pub const ELECTRON_RADIUS: f64 = 2.817_940_326_7e-15;
/// Boltzmann constant [J/K].
pub const BOLTZMANN_CONSTANT: f64 = 1.380_648_8e-23;
/// Vacuum permeability [T.m/A].
pub const VACUUM_PERMEABILITY: f64 = 4.0 * PI * 1.0e-7;
/// Vacuum permittivity [F/m].
pub const VACUUM_PERMITTIVITY: f64 =
    1.0 / (VACUUM_PERMEABILITY * LIGHT_SPEED * LIGHT_SPEED);

pub const JOULE_PER_EV: f64 = ELEMENTARY_CHARGE;
pub const PASCAL_PER_MBAR: f64 = 100.0;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
