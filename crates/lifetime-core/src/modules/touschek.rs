//! Touschek (intra-bunch scattering) loss rate.

use super::errors::{LossRateError, require_positive, require_positive_samples};
use super::touschek_table::{DTouschekLookup, default_table};
use crate::common::constants::{ELECTRON_RADIUS, LIGHT_SPEED};
use crate::common::rigidity::beam_rigidity;
use crate::numerics::{Sampled, broadcast_len};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// `r_e² c / (8π)` [m³/s].
pub const TOUSCHEK_FACTOR: f64 = ELECTRON_RADIUS * ELECTRON_RADIUS * LIGHT_SPEED / (8.0 * PI);

/// Bunch parameters that do not vary around the ring.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TouschekBeam {
    /// Total beam energy [eV].
    pub energy: f64,
    pub energy_spread: f64,
    /// Natural emittance [m.rad].
    pub natural_emittance: f64,
    /// Particles per bunch.
    pub n: f64,
    /// RMS bunch length [m].
    pub bunch_length: f64,
    /// `emity = κ emitx`, with `emitx + emity` equal to the natural emittance.
    pub coupling: f64,
}

impl TouschekBeam {
    pub fn horizontal_emittance(&self) -> f64 {
        self.natural_emittance / (1.0 + self.coupling)
    }

    pub fn vertical_emittance(&self) -> f64 {
        self.natural_emittance * self.coupling / (1.0 + self.coupling)
    }

    pub fn validate(&self) -> Result<(), LossRateError> {
        require_positive("energy_spread", self.energy_spread)?;
        require_positive("natural_emittance", self.natural_emittance)?;
        require_positive("n", self.n)?;
        require_positive("bunch_length", self.bunch_length)?;
        require_positive("coupling", self.coupling)
    }
}

/// Optics functions at the evaluation points.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TouschekOptics {
    pub betax: Sampled,
    pub betay: Sampled,
    pub etax: Sampled,
    pub etay: Sampled,
    pub alphax: Sampled,
    pub etapx: Sampled,
}

impl TouschekOptics {
    fn fields(&self) -> [(&'static str, &Sampled); 6] {
        [
            ("betax", &self.betax),
            ("betay", &self.betay),
            ("etax", &self.etax),
            ("etay", &self.etay),
            ("alphax", &self.alphax),
            ("etapx", &self.etapx),
        ]
    }

    pub(crate) fn point(&self, index: usize) -> OpticsPoint {
        OpticsPoint {
            betax: self.betax.at(index),
            betay: self.betay.at(index),
            etax: self.etax.at(index),
            etay: self.etay.at(index),
            alphax: self.alphax.at(index),
            etapx: self.etapx.at(index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OpticsPoint {
    pub betax: f64,
    pub betay: f64,
    pub etax: f64,
    pub etay: f64,
    pub alphax: f64,
    pub etapx: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TouschekInput {
    pub beam: TouschekBeam,
    /// `[acc_min, acc_max]`, with `acc_min < 0 < acc_max`.
    pub energy_acceptance_interval: [f64; 2],
    pub optics: TouschekOptics,
}

impl TouschekInput {
    pub fn new(
        beam: TouschekBeam,
        energy_acceptance_interval: [f64; 2],
        optics: TouschekOptics,
    ) -> Self {
        Self {
            beam,
            energy_acceptance_interval,
            optics,
        }
    }

    /// Physical sanity checks. The calculators never call this themselves.
    pub fn validate(&self) -> Result<(), LossRateError> {
        self.beam.validate()?;

        let [acc_min, acc_max] = self.energy_acceptance_interval;
        if !(acc_min.is_finite() && acc_max.is_finite() && acc_min < 0.0 && acc_max > 0.0) {
            return Err(LossRateError::invalid(
                "energy_acceptance_interval",
                format!("must straddle zero, got [{acc_min}, {acc_max}]"),
            ));
        }

        broadcast_len(&self.optics.fields())?;
        require_positive_samples("betax", self.optics.betax.values())?;
        require_positive_samples("betay", self.optics.betay.values())
    }
}

/// Rate and bunch volume at one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TouschekPoint {
    pub rate: f64,
    pub volume: f64,
}

/// Pointwise Touschek rate for positive/negative acceptances `acc_p`, `acc_n` (both > 0).
pub(crate) fn touschek_point(
    beam: &TouschekBeam,
    gamma: f64,
    optics: OpticsPoint,
    acc_p: f64,
    acc_n: f64,
    table: &impl DTouschekLookup,
) -> TouschekPoint {
    let spread_sq = beam.energy_spread * beam.energy_spread;
    let emitx = beam.horizontal_emittance();
    let emity = beam.vertical_emittance();

    let sizex = (optics.betax * emitx + optics.etax * optics.etax * spread_sq).sqrt();
    let sizey = (optics.betay * emity + optics.etay * optics.etay * spread_sq).sqrt();
    let volume = beam.bunch_length * sizex * sizey;

    let sx2 = emitx * optics.betax;
    let f = optics.betax * optics.etapx + optics.alphax * optics.etax;
    let a1 = 1.0 / (4.0 * spread_sq) + (optics.etax * optics.etax + f * f) / (4.0 * sx2);
    let b1 = optics.betax * f / (2.0 * sx2);
    let c1 = optics.betax * optics.betax / (4.0 * sx2) - b1 * b1 / (4.0 * a1);
    let c1_sqrt = c1.sqrt();

    let side_rate = |acc: f64| {
        let ksi = (2.0 * c1_sqrt * acc / gamma).powi(2);
        TOUSCHEK_FACTOR * beam.n * table.d_value(ksi)
            / (gamma * gamma * acc.powi(3) * volume)
    };

    TouschekPoint {
        rate: 0.5 * (side_rate(acc_p) + side_rate(acc_n)),
        volume,
    }
}

/// Touschek loss rate [1/s] using the process-wide D-Touschek table.
pub fn calc_touschek_loss_rate(input: &TouschekInput) -> Result<Sampled, LossRateError> {
    let table = default_table()?;
    calc_touschek_loss_rate_with_table(input, table)
}

pub fn calc_touschek_loss_rate_with_table(
    input: &TouschekInput,
    table: &impl DTouschekLookup,
) -> Result<Sampled, LossRateError> {
    let len = broadcast_len(&input.optics.fields())?;
    let gamma = beam_rigidity(input.beam.energy)?.gamma;
    let [acc_min, acc_max] = input.energy_acceptance_interval;

    Ok(Sampled::from_fn(len, |index| {
        touschek_point(
            &input.beam,
            gamma,
            input.optics.point(index),
            acc_max,
            -acc_min,
            table,
        )
        .rate
    }))
}

#[cfg(test)]
mod tests {
    use super::{
        TouschekBeam, TouschekInput, TouschekOptics, calc_touschek_loss_rate,
        calc_touschek_loss_rate_with_table,
    };
    use crate::modules::errors::LossRateError;
    use crate::modules::touschek_table::DTouschekLookup;
    use crate::numerics::{BroadcastError, Sampled};

    const REFERENCE_RATE: f64 = 2.302_788_533_844_299e-6;

    struct ConstantD(f64);

    impl DTouschekLookup for ConstantD {
        fn d_value(&self, _ksi: f64) -> f64 {
            self.0
        }
    }

    fn reference_beam() -> TouschekBeam {
        TouschekBeam {
            energy: 3.0e9,
            energy_spread: 7.6e-4,
            natural_emittance: 2.7e-10,
            n: 6.2e9,
            bunch_length: 2.4e-3,
            coupling: 0.01,
        }
    }

    fn reference_optics() -> TouschekOptics {
        TouschekOptics {
            betax: Sampled::Scalar(6.5),
            betay: Sampled::Scalar(10.4),
            etax: Sampled::Scalar(0.028),
            etay: Sampled::Scalar(0.001),
            alphax: Sampled::Scalar(0.22),
            etapx: Sampled::Scalar(-6.5e-5),
        }
    }

    fn reference_input() -> TouschekInput {
        TouschekInput::new(reference_beam(), [-0.052, 0.052], reference_optics())
    }

    #[test]
    fn reference_scenario_matches_within_table_resolution() {
        let rate = calc_touschek_loss_rate(&reference_input()).expect("rate");
        let rate = rate.as_scalar().expect("scalar optics give a scalar rate");
        let relative = (rate - REFERENCE_RATE).abs() / REFERENCE_RATE;
        assert!(relative < 1.0e-4, "rate={rate:e} relative={relative:e}");
    }

    #[test]
    fn array_optics_match_pointwise_scalar_calls() {
        let betax = [6.5, 2.1, 14.0];
        let etax = [0.028, 0.0, 0.11];
        let mut input = reference_input();
        input.optics.betax = betax.into();
        input.optics.etax = etax.into();

        let Sampled::Array(rates) = calc_touschek_loss_rate(&input).expect("rates") else {
            panic!("array optics should give an array of rates");
        };
        assert_eq!(rates.len(), 3);

        for (index, rate) in rates.iter().enumerate() {
            let mut scalar = reference_input();
            scalar.optics.betax = Sampled::Scalar(betax[index]);
            scalar.optics.etax = Sampled::Scalar(etax[index]);
            let expected = calc_touschek_loss_rate(&scalar)
                .expect("rate")
                .as_scalar()
                .expect("scalar");
            assert!((rate - expected).abs() <= 1.0e-15 * expected.abs());
        }
    }

    #[test]
    fn both_acceptance_sides_are_averaged() {
        let table = ConstantD(0.1);
        let symmetric = calc_touschek_loss_rate_with_table(&reference_input(), &table)
            .expect("rate")
            .as_scalar()
            .expect("scalar");

        let mut wide = reference_input();
        wide.energy_acceptance_interval = [-0.104, 0.052];
        let asymmetric = calc_touschek_loss_rate_with_table(&wide, &table)
            .expect("rate")
            .as_scalar()
            .expect("scalar");

        // With constant D the rate scales as 1/acc³ on each side.
        let expected = 0.5 * symmetric * (1.0 + 0.125);
        assert!((asymmetric - expected).abs() <= 1.0e-14 * expected);
    }

    #[test]
    fn out_of_table_range_gives_zero_rate() {
        let mut input = reference_input();
        input.energy_acceptance_interval = [-50.0, 50.0];
        let rate = calc_touschek_loss_rate(&input).expect("rate");
        assert_eq!(rate, Sampled::Scalar(0.0));
    }

    #[test]
    fn mismatched_optics_lengths_are_rejected() {
        let mut input = reference_input();
        input.optics.betax = Sampled::Array(vec![1.0, 2.0]);
        input.optics.betay = Sampled::Array(vec![1.0, 2.0, 3.0]);

        let error = calc_touschek_loss_rate_with_table(&input, &ConstantD(0.1))
            .expect_err("shape mismatch");
        assert_eq!(
            error,
            LossRateError::Broadcast(BroadcastError::ShapeMismatch {
                field: "betay",
                actual: 3,
                reference: "betax",
                expected: 2,
            })
        );
    }

    #[test]
    fn validation_is_opt_in() {
        let mut input = reference_input();
        input.beam.coupling = 0.0;
        input.energy_acceptance_interval = [0.01, 0.052];

        assert!(calc_touschek_loss_rate_with_table(&input, &ConstantD(0.1)).is_ok());
        assert!(matches!(
            input.validate(),
            Err(LossRateError::InvalidInput {
                field: "coupling",
                ..
            })
        ));

        input.beam.coupling = 0.01;
        assert!(matches!(
            input.validate(),
            Err(LossRateError::InvalidInput {
                field: "energy_acceptance_interval",
                ..
            })
        ));
        assert!(reference_input().validate().is_ok());
    }

    #[test]
    fn deck_section_mixes_scalar_and_array_optics() {
        let input: TouschekInput = serde_json::from_str(
            r#"{
                "beam": {
                    "energy": 3.0e9, "energy_spread": 7.6e-4, "natural_emittance": 2.7e-10,
                    "n": 6.2e9, "bunch_length": 2.4e-3, "coupling": 0.01
                },
                "energy_acceptance_interval": [-0.052, 0.052],
                "optics": { "betax": [6.5, 7.0], "betay": 10.4, "etax": 0.028 }
            }"#,
        )
        .expect("deck section should parse");

        assert_eq!(input.beam, reference_beam());
        assert_eq!(input.optics.betax, Sampled::Array(vec![6.5, 7.0]));
        assert_eq!(input.optics.betay, Sampled::Scalar(10.4));
        assert_eq!(input.optics.alphax, Sampled::Scalar(0.0));
    }

    #[test]
    fn unknown_optics_keys_are_rejected() {
        let parsed = serde_json::from_str::<TouschekOptics>(r#"{ "betax": 1.0, "beta_x": 2.0 }"#);
        assert!(parsed.is_err());
    }
}
