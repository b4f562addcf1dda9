use lifetime_core::common::config::RingSamplingConfig;
use lifetime_core::modules::{
    AcceptanceProfile, ElasticInput, InelasticInput, QuantumInput, RingOptics, TouschekBeam,
    TouschekInput, calc_elastic_loss_rate, calc_inelastic_loss_rate, calc_quantum_loss_rates,
    calc_touschek_loss_rate, touschek_inverse_lifetime,
};
use lifetime_core::numerics::{Sampled, relative_difference, within_tolerance};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const RELATIVE_FLOOR: f64 = 1.0e-300;

fn workspace_root() -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LossRateFixtures {
    touschek_cases: Vec<LossRateCase<TouschekInput, Sampled>>,
    elastic_cases: Vec<LossRateCase<ElasticInput, Sampled>>,
    inelastic_cases: Vec<LossRateCase<InelasticInput, Sampled>>,
    quantum_cases: Vec<LossRateCase<QuantumInput, [f64; 3]>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LossRateCase<I, E> {
    id: String,
    input: I,
    expected: E,
    abs_tol: f64,
    rel_tol: f64,
}

#[test]
fn touschek_fixtures_match_reference_outputs() {
    for case in load_fixtures().touschek_cases {
        let actual = calc_touschek_loss_rate(&case.input)
            .unwrap_or_else(|error| panic!("{} should evaluate: {}", case.id, error));
        assert_sampled_close(&case.id, &case.expected, &actual, case.abs_tol, case.rel_tol);
    }
}

#[test]
fn elastic_fixtures_match_reference_outputs() {
    for case in load_fixtures().elastic_cases {
        let actual = calc_elastic_loss_rate(&case.input)
            .unwrap_or_else(|error| panic!("{} should evaluate: {}", case.id, error));
        assert_sampled_close(&case.id, &case.expected, &actual, case.abs_tol, case.rel_tol);
    }
}

#[test]
fn inelastic_fixtures_match_reference_outputs() {
    for case in load_fixtures().inelastic_cases {
        let actual = calc_inelastic_loss_rate(&case.input)
            .unwrap_or_else(|error| panic!("{} should evaluate: {}", case.id, error));
        assert_sampled_close(&case.id, &case.expected, &actual, case.abs_tol, case.rel_tol);
    }
}

#[test]
fn quantum_fixtures_match_reference_outputs() {
    for case in load_fixtures().quantum_cases {
        let rates = calc_quantum_loss_rates(&case.input)
            .unwrap_or_else(|error| panic!("{} should evaluate: {}", case.id, error));
        let actual = [&rates.horizontal, &rates.vertical, &rates.longitudinal];

        let planes = ["x", "y", "s"];
        for ((plane, expected), actual) in planes.iter().zip(case.expected).zip(actual) {
            assert_sampled_close(
                &format!("{}[{}]", case.id, plane),
                &Sampled::Scalar(expected),
                actual,
                case.abs_tol,
                case.rel_tol,
            );
        }
    }
}

#[test]
fn ring_average_lies_between_pointwise_extremes() {
    let optics = RingOptics {
        s: vec![0.0, 1.5, 1.5, 4.0, 7.2, 10.0],
        betax: vec![12.0, 4.0, 4.5, 1.2, 8.0, 12.0],
        alphax: vec![0.0, 1.8, 1.8, -0.4, -1.2, 0.0],
        etax: vec![0.0, 0.05, 0.05, 0.12, 0.03, 0.0],
        etapx: vec![0.0, 0.02, 0.02, 0.0, -0.02, 0.0],
        betay: vec![3.0, 9.0, 9.0, 16.0, 5.0, 3.0],
        etay: vec![0.0; 6],
    };
    let acceptance = AcceptanceProfile {
        s: vec![0.0, 2.0, 6.0, 10.0],
        positive: vec![0.04, 0.035, 0.0, 0.04],
        negative: vec![-0.045, -0.03, -0.025, -0.045],
    };
    let beam = TouschekBeam {
        energy: 3.0e9,
        energy_spread: 8.5e-4,
        natural_emittance: 2.5e-10,
        n: 1.6e9,
        bunch_length: 2.5e-3,
        coupling: 0.01,
    };

    let result = touschek_inverse_lifetime(
        &beam,
        &acceptance,
        &optics,
        &RingSamplingConfig::default(),
    )
    .expect("ring evaluation should succeed");

    assert_eq!(result.position.len(), 101);
    assert_eq!(result.position[0], 0.0);
    assert_eq!(result.position[100], 10.0);
    assert!(result.rate.iter().all(|rate| rate.is_finite() && *rate >= 0.0));
    assert!(result.volume.iter().all(|volume| *volume > 0.0));

    let min = result.rate.iter().copied().fold(f64::INFINITY, f64::min);
    let max = result.rate.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(result.average_rate >= min && result.average_rate <= max);
    assert!(result.average_rate > 0.0);
}

fn load_fixtures() -> LossRateFixtures {
    let fixture_path = workspace_root().join("tasks/loss-rate-fixtures.json");
    let source = fs::read_to_string(&fixture_path).unwrap_or_else(|error| {
        panic!(
            "fixture file {} should be readable: {}",
            fixture_path.display(),
            error
        )
    });

    serde_json::from_str(&source).unwrap_or_else(|error| {
        panic!(
            "fixture file {} should parse as JSON: {}",
            fixture_path.display(),
            error
        )
    })
}

fn assert_sampled_close(
    label: &str,
    expected: &Sampled,
    actual: &Sampled,
    abs_tol: f64,
    rel_tol: f64,
) {
    assert_eq!(
        expected.array_len(),
        actual.array_len(),
        "{} expected shape {:?}, got {:?}",
        label,
        expected,
        actual
    );

    for (index, (expected, actual)) in expected.values().zip(actual.values()).enumerate() {
        assert_scalar_close(&format!("{label}[{index}]"), expected, actual, abs_tol, rel_tol);
    }
}

fn assert_scalar_close(label: &str, expected: f64, actual: f64, abs_tol: f64, rel_tol: f64) {
    let abs_diff = (actual - expected).abs();
    let rel_diff = relative_difference(expected, actual, RELATIVE_FLOOR);

    assert!(
        within_tolerance(expected, actual, abs_tol, rel_tol, RELATIVE_FLOOR),
        "{} expected={:.15e} actual={:.15e} abs_diff={:.15e} rel_diff={:.15e} abs_tol={:.15e} rel_tol={:.15e}",
        label,
        expected,
        actual,
        abs_diff,
        rel_diff,
        abs_tol,
        rel_tol
    );
}
