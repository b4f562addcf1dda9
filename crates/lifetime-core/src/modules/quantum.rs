//! Quantum-excitation loss rates.
//!
//! Every plane uses the same elementary rate `2 ξ exp(-ξ) / τ`, where `ξ` is
//! the acceptance measured in units of twice the equilibrium beam moment.

use super::errors::{LossRateError, require_positive, require_positive_samples};
use crate::numerics::{Sampled, broadcast_len};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransverseQuantumInput {
    /// `[acc_x, acc_y]` [m.rad].
    pub transverse_acceptances: [Sampled; 2],
    pub coupling: f64,
    pub natural_emittance: f64,
    /// `[τx, τy]` [s].
    pub damping_times: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LongitudinalQuantumInput {
    pub energy_acceptance: Sampled,
    pub energy_spread: f64,
    /// `τs` [s].
    pub damping_time: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuantumInput {
    pub transverse_acceptances: [Sampled; 2],
    pub energy_acceptance: Sampled,
    pub coupling: f64,
    pub natural_emittance: f64,
    pub energy_spread: f64,
    /// `[τx, τy, τs]` [s].
    pub damping_times: [f64; 3],
}

impl QuantumInput {
    pub fn transverse(&self) -> TransverseQuantumInput {
        let [tau_x, tau_y, _] = self.damping_times;
        TransverseQuantumInput {
            transverse_acceptances: self.transverse_acceptances.clone(),
            coupling: self.coupling,
            natural_emittance: self.natural_emittance,
            damping_times: [tau_x, tau_y],
        }
    }

    pub fn longitudinal(&self) -> LongitudinalQuantumInput {
        LongitudinalQuantumInput {
            energy_acceptance: self.energy_acceptance.clone(),
            energy_spread: self.energy_spread,
            damping_time: self.damping_times[2],
        }
    }

    pub fn validate(&self) -> Result<(), LossRateError> {
        self.transverse().validate()?;
        self.longitudinal().validate()
    }
}

impl TransverseQuantumInput {
    pub fn validate(&self) -> Result<(), LossRateError> {
        let [acc_x, acc_y] = &self.transverse_acceptances;
        broadcast_len(&[("acc_x", acc_x), ("acc_y", acc_y)])?;
        require_positive_samples("transverse_acceptances[0]", acc_x.values())?;
        require_positive_samples("transverse_acceptances[1]", acc_y.values())?;
        require_positive("coupling", self.coupling)?;
        require_positive("natural_emittance", self.natural_emittance)?;
        require_positive("damping_times[0]", self.damping_times[0])?;
        require_positive("damping_times[1]", self.damping_times[1])
    }
}

impl LongitudinalQuantumInput {
    pub fn validate(&self) -> Result<(), LossRateError> {
        require_positive_samples("energy_acceptance", self.energy_acceptance.values())?;
        require_positive("energy_spread", self.energy_spread)?;
        require_positive("damping_time", self.damping_time)
    }
}

/// Horizontal, vertical and longitudinal rates [1/s].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantumLossRates {
    pub horizontal: Sampled,
    pub vertical: Sampled,
    pub longitudinal: Sampled,
}

pub fn quantum_loss_rate(ksi: f64, damping_time: f64) -> f64 {
    2.0 * ksi * (-ksi).exp() / damping_time
}

/// `(rate_x, rate_y)`; the two acceptances are sampled independently.
pub fn calc_quantum_loss_rates_transverse(
    input: &TransverseQuantumInput,
) -> Result<(Sampled, Sampled), LossRateError> {
    let [acc_x, acc_y] = &input.transverse_acceptances;
    let [tau_x, tau_y] = input.damping_times;
    let coupling = input.coupling;
    let emittance = input.natural_emittance;

    let rate_x = acc_x.map(|acc| {
        let ksi = (1.0 + coupling) * acc / (2.0 * emittance);
        quantum_loss_rate(ksi, tau_x)
    });
    let rate_y = acc_y.map(|acc| {
        let ksi = (1.0 + coupling) * acc / (2.0 * coupling * emittance);
        quantum_loss_rate(ksi, tau_y)
    });

    Ok((rate_x, rate_y))
}

pub fn calc_quantum_loss_rate_longitudinal(
    input: &LongitudinalQuantumInput,
) -> Result<Sampled, LossRateError> {
    let spread = input.energy_spread;
    let tau_s = input.damping_time;

    Ok(input.energy_acceptance.map(|acc| {
        let ksi = (acc / spread).powi(2) / 2.0;
        quantum_loss_rate(ksi, tau_s)
    }))
}

pub fn calc_quantum_loss_rates(input: &QuantumInput) -> Result<QuantumLossRates, LossRateError> {
    let (horizontal, vertical) = calc_quantum_loss_rates_transverse(&input.transverse())?;
    let longitudinal = calc_quantum_loss_rate_longitudinal(&input.longitudinal())?;

    Ok(QuantumLossRates {
        horizontal,
        vertical,
        longitudinal,
    })
}
