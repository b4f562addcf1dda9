//! Residual-gas scattering loss rates.
//!
//! Pressures are in mbar; the formulas work in Pa via [`PASCAL_PER_MBAR`].

use super::errors::{LossRateError, require_positive, require_positive_samples};
use crate::common::constants::{
    BOLTZMANN_CONSTANT, ELECTRON_RADIUS, ELEMENTARY_CHARGE, JOULE_PER_EV, LIGHT_SPEED,
    PASCAL_PER_MBAR, VACUUM_PERMITTIVITY,
};
use crate::common::rigidity::beam_rigidity;
use crate::numerics::{Sampled, broadcast_len};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const DEFAULT_GAS_Z: f64 = 7.0;
pub const DEFAULT_GAS_TEMPERATURE: f64 = 300.0;

/// `c e⁴ / (4π² ε0² k_B)`.
pub const ELASTIC_FACTOR: f64 = LIGHT_SPEED
    * ELEMENTARY_CHARGE
    * ELEMENTARY_CHARGE
    * ELEMENTARY_CHARGE
    * ELEMENTARY_CHARGE
    / (4.0 * PI * PI * VACUUM_PERMITTIVITY * VACUUM_PERMITTIVITY * BOLTZMANN_CONSTANT);

/// `32 c r_e² / (411 k_B)`.
pub const INELASTIC_FACTOR: f64 =
    32.0 * LIGHT_SPEED * ELECTRON_RADIUS * ELECTRON_RADIUS / (411.0 * BOLTZMANN_CONSTANT);

/// Effective residual-gas composition.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResidualGas {
    /// Effective atomic number.
    pub z: f64,
    /// Gas temperature [K].
    pub temperature: f64,
}

impl Default for ResidualGas {
    fn default() -> Self {
        Self {
            z: DEFAULT_GAS_Z,
            temperature: DEFAULT_GAS_TEMPERATURE,
        }
    }
}

impl ResidualGas {
    pub fn validate(&self) -> Result<(), LossRateError> {
        require_positive("z", self.z)?;
        require_positive("temperature", self.temperature)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ElasticInput {
    /// Beam energy [eV].
    pub energy: f64,
    /// `[acc_x, acc_y]` [m.rad].
    pub transverse_acceptances: [f64; 2],
    pub pressure: Sampled,
    pub betax: Sampled,
    pub betay: Sampled,
    #[serde(default)]
    pub gas: ResidualGas,
}

impl ElasticInput {
    pub fn new(
        energy: f64,
        transverse_acceptances: [f64; 2],
        pressure: Sampled,
        betax: Sampled,
        betay: Sampled,
    ) -> Self {
        Self {
            energy,
            transverse_acceptances,
            pressure,
            betax,
            betay,
            gas: ResidualGas::default(),
        }
    }

    pub fn with_gas(mut self, gas: ResidualGas) -> Self {
        self.gas = gas;
        self
    }

    pub fn validate(&self) -> Result<(), LossRateError> {
        self.gas.validate()?;
        let [acc_x, acc_y] = self.transverse_acceptances;
        require_positive("transverse_acceptances[0]", acc_x)?;
        require_positive("transverse_acceptances[1]", acc_y)?;
        broadcast_len(&self.fields())?;
        require_non_negative_pressure(&self.pressure)?;
        require_positive_samples("betax", self.betax.values())?;
        require_positive_samples("betay", self.betay.values())
    }

    fn fields(&self) -> [(&'static str, &Sampled); 3] {
        [
            ("pressure", &self.pressure),
            ("betax", &self.betax),
            ("betay", &self.betay),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InelasticInput {
    /// Relative energy acceptance.
    pub energy_acceptance: Sampled,
    pub pressure: Sampled,
    #[serde(default)]
    pub gas: ResidualGas,
}

impl InelasticInput {
    pub fn new(energy_acceptance: Sampled, pressure: Sampled) -> Self {
        Self {
            energy_acceptance,
            pressure,
            gas: ResidualGas::default(),
        }
    }

    pub fn with_gas(mut self, gas: ResidualGas) -> Self {
        self.gas = gas;
        self
    }

    pub fn validate(&self) -> Result<(), LossRateError> {
        self.gas.validate()?;
        broadcast_len(&self.fields())?;
        require_non_negative_pressure(&self.pressure)?;
        require_positive_samples("energy_acceptance", self.energy_acceptance.values())
    }

    fn fields(&self) -> [(&'static str, &Sampled); 2] {
        [
            ("energy_acceptance", &self.energy_acceptance),
            ("pressure", &self.pressure),
        ]
    }
}

fn require_non_negative_pressure(pressure: &Sampled) -> Result<(), LossRateError> {
    match pressure
        .values()
        .enumerate()
        .find(|(_, value)| !(value.is_finite() && *value >= 0.0))
    {
        Some((index, value)) => Err(LossRateError::invalid(
            "pressure",
            format!("must be finite and >= 0, got {value} at index {index}"),
        )),
        None => Ok(()),
    }
}

/// Elastic (Coulomb) scattering loss rate [1/s] past the transverse acceptances.
pub fn calc_elastic_loss_rate(input: &ElasticInput) -> Result<Sampled, LossRateError> {
    let len = broadcast_len(&input.fields())?;
    let beta = beam_rigidity(input.energy)?.beta;
    let energy_joule = input.energy * JOULE_PER_EV;
    let [acc_x, acc_y] = input.transverse_acceptances;
    let z = input.gas.z;
    let prefactor = ELASTIC_FACTOR * z * z
        / (beta * energy_joule * energy_joule * input.gas.temperature);

    Ok(Sampled::from_fn(len, |index| {
        let betax = input.betax.at(index);
        let betay = input.betay.at(index);
        let pressure = input.pressure.at(index) * PASCAL_PER_MBAR;

        let theta_x = (acc_x / betax).sqrt();
        let theta_y = (acc_y / betay).sqrt();
        let angle = 2.0 * (theta_y / theta_x).atan();
        let f_x = (angle + angle.sin()) * pressure * betax / acc_x;
        let f_y = (PI - angle + angle.sin()) * pressure * betay / acc_y;

        prefactor * (f_x + f_y)
    }))
}

/// Bremsstrahlung loss rate [1/s] past the energy acceptance.
pub fn calc_inelastic_loss_rate(input: &InelasticInput) -> Result<Sampled, LossRateError> {
    let len = broadcast_len(&input.fields())?;
    let z = input.gas.z;
    let screening = (183.0 / z.cbrt()).ln();
    let prefactor = z * z * INELASTIC_FACTOR * screening / input.gas.temperature;

    Ok(Sampled::from_fn(len, |index| {
        let acceptance = input.energy_acceptance.at(index);
        let pressure = input.pressure.at(index) * PASCAL_PER_MBAR;
        prefactor * (acceptance - acceptance.ln() - 5.0 / 8.0) * pressure
    }))
}
