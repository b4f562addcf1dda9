//! Relativistic kinematics of the stored electron beam.

use super::constants::{ELECTRON_REST_ENERGY_EV, LIGHT_SPEED};

/// Kinematic factors for an electron of total energy `energy` [eV].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamRigidity {
    /// Momentum [eV/c].
    pub momentum: f64,
    /// Magnetic rigidity [T.m].
    pub brho: f64,
    pub beta: f64,
    pub gamma: f64,
    /// Electron rest energy [eV].
    pub rest_energy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RigidityError {
    #[error("beam energy must be finite, got {energy}")]
    NonFiniteEnergy { energy: f64 },
    #[error("beam energy {energy} eV is below the electron rest energy {rest_energy} eV")]
    BelowRestEnergy { energy: f64, rest_energy: f64 },
}

pub fn beam_rigidity(energy: f64) -> Result<BeamRigidity, RigidityError> {
    if !energy.is_finite() {
        return Err(RigidityError::NonFiniteEnergy { energy });
    }
    if energy < ELECTRON_REST_ENERGY_EV {
        return Err(RigidityError::BelowRestEnergy {
            energy,
            rest_energy: ELECTRON_REST_ENERGY_EV,
        });
    }

    let gamma = energy / ELECTRON_REST_ENERGY_EV;
    let beta = (((gamma - 1.0) / gamma) * ((gamma + 1.0) / gamma)).sqrt();
    let momentum = beta * energy;

    Ok(BeamRigidity {
        momentum,
        brho: momentum / LIGHT_SPEED,
        beta,
        gamma,
        rest_energy: ELECTRON_REST_ENERGY_EV,
    })
}
