use super::{CliError, compute_error};
use anyhow::Context;
use lifetime_core::common::config::{EngineConfig, RingSamplingConfig, load_engine_config};
use lifetime_core::domain::LifetimeError;
use lifetime_core::modules::{
    AcceptanceProfile, ElasticInput, InelasticInput, LifetimeSummary, QuantumInput,
    QuantumLossRates, RingOptics, RingTouschekResult, TouschekBeam, TouschekInput,
};
use lifetime_core::numerics::Sampled;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Parameter deck evaluated by `beam-lifetime rates`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RateDeck {
    pub(super) touschek: Option<TouschekInput>,
    pub(super) elastic: Option<ElasticInput>,
    pub(super) inelastic: Option<InelasticInput>,
    pub(super) quantum: Option<QuantumInput>,
    pub(super) ring: Option<RingDeck>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct RingDeck {
    pub(super) beam: TouschekBeam,
    pub(super) acceptance: AcceptanceProfile,
    pub(super) optics: RingOptics,
    /// Overrides the engine config's ring sampling when present.
    pub(super) sampling: Option<RingSamplingConfig>,
}

impl RateDeck {
    pub(super) fn is_empty(&self) -> bool {
        self.touschek.is_none()
            && self.elastic.is_none()
            && self.inelastic.is_none()
            && self.quantum.is_none()
            && self.ring.is_none()
    }

    pub(super) fn needs_touschek_table(&self) -> bool {
        self.touschek.is_some() || self.ring.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(super) struct RatesReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) touschek: Option<Sampled>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) elastic: Option<Sampled>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) inelastic: Option<Sampled>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) quantum: Option<QuantumLossRates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) ring: Option<RingTouschekResult>,
    pub(super) summary: LifetimeSummary,
}

pub(super) fn load_deck(path: &Path) -> Result<RateDeck, CliError> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read parameter deck '{}'", path.display()))?;
    serde_json::from_str::<RateDeck>(&content).map_err(|error| {
        compute_error(LifetimeError::input(
            "INPUT.DECK",
            format!("failed to parse parameter deck '{}': {}", path.display(), error),
        ))
    })
}

pub(super) fn load_optional_engine_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    match path {
        Some(path) => load_engine_config(path).map_err(compute_error),
        None => Ok(EngineConfig::default()),
    }
}

pub(super) fn write_json_report(path: &Path, report: &RatesReport) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory '{}'", parent.display()))?;
    }
    let rendered = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(path, rendered)
        .with_context(|| format!("failed to write report '{}'", path.display()))?;
    Ok(())
}

/// Scalar loss channels that enter the lifetime summary.
///
/// Array-valued results describe several machine states and are reported but
/// not summed. The ring average replaces the single-point Touschek rate.
pub(super) fn summary_channels(report: &RatesReport) -> Vec<(String, f64)> {
    let mut channels = Vec::new();

    match (&report.ring, &report.touschek) {
        (Some(ring), _) => {
            channels.push(("touschek (ring average)".to_string(), ring.average_rate));
        }
        (None, Some(touschek)) => push_scalar(&mut channels, "touschek", touschek),
        (None, None) => {}
    }
    if let Some(elastic) = &report.elastic {
        push_scalar(&mut channels, "elastic gas", elastic);
    }
    if let Some(inelastic) = &report.inelastic {
        push_scalar(&mut channels, "inelastic gas", inelastic);
    }
    if let Some(quantum) = &report.quantum {
        push_scalar(&mut channels, "quantum x", &quantum.horizontal);
        push_scalar(&mut channels, "quantum y", &quantum.vertical);
        push_scalar(&mut channels, "quantum s", &quantum.longitudinal);
    }

    channels
}

fn push_scalar(channels: &mut Vec<(String, f64)>, label: &str, value: &Sampled) {
    if let Some(rate) = value.as_scalar() {
        channels.push((label.to_string(), rate));
    }
}

pub(super) fn render_human_summary(report: &RatesReport) -> String {
    let mut rendered = String::new();

    if let Some(touschek) = &report.touschek {
        render_rate(&mut rendered, "Touschek", touschek);
    }
    if let Some(elastic) = &report.elastic {
        render_rate(&mut rendered, "Elastic gas", elastic);
    }
    if let Some(inelastic) = &report.inelastic {
        render_rate(&mut rendered, "Inelastic gas", inelastic);
    }
    if let Some(quantum) = &report.quantum {
        render_rate(&mut rendered, "Quantum x", &quantum.horizontal);
        render_rate(&mut rendered, "Quantum y", &quantum.vertical);
        render_rate(&mut rendered, "Quantum s", &quantum.longitudinal);
    }
    if let Some(ring) = &report.ring {
        let _ = writeln!(
            rendered,
            "Ring Touschek: {:.6e} 1/s averaged over {} points [{} m, {} m]",
            ring.average_rate,
            ring.position.len(),
            ring.position.first().copied().unwrap_or(f64::NAN),
            ring.position.last().copied().unwrap_or(f64::NAN),
        );
    }

    let summary = &report.summary;
    let _ = writeln!(rendered, "Total loss rate: {:.6e} 1/s", summary.total_rate);
    if summary.lifetime_hours.is_finite() {
        let _ = writeln!(rendered, "Lifetime: {:.4} h", summary.lifetime_hours);
    } else {
        let _ = writeln!(rendered, "Lifetime: infinite");
    }

    rendered
}

fn render_rate(rendered: &mut String, label: &str, value: &Sampled) {
    let _ = match value {
        Sampled::Scalar(rate) => writeln!(rendered, "{label}: {rate:.6e} 1/s"),
        Sampled::Array(rates) => {
            let formatted: Vec<String> = rates.iter().map(|rate| format!("{rate:.6e}")).collect();
            writeln!(rendered, "{label}: [{}] 1/s", formatted.join(", "))
        }
    };
}
