use super::helpers::*;
use super::{CliError, compute_error};
use lifetime_core::common::config::DTouschekTableConfig;
use lifetime_core::domain::LifetimeError;
use lifetime_core::modules::{
    DTouschekTable, calc_elastic_loss_rate, calc_inelastic_loss_rate, calc_quantum_loss_rates,
    calc_touschek_loss_rate_with_table, default_table, summarize_loss_rates,
    touschek_inverse_lifetime_with_table,
};
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::info;

#[derive(clap::Args)]
pub(super) struct TableArgs {
    /// Output path of the JSON table
    #[arg(long)]
    output: PathBuf,

    /// Engine config whose `table` section sets the grid and quadrature
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct RatesArgs {
    /// JSON parameter deck
    #[arg(long)]
    deck: PathBuf,

    /// Precomputed D-Touschek table (JSON); built on demand when omitted
    #[arg(long)]
    table: Option<PathBuf>,

    /// Engine config for table construction and ring sampling
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Reject physically invalid inputs before evaluating
    #[arg(long)]
    strict: bool,
}

pub(super) fn run_table_command(args: TableArgs) -> Result<i32, CliError> {
    let config = load_optional_engine_config(args.config.as_deref())?;
    let table = DTouschekTable::build(&config.table).map_err(compute_error)?;
    table.save_json(&args.output).map_err(compute_error)?;

    let (ksi_min, ksi_max) = table.ksi_range();
    println!(
        "Wrote D-Touschek table with {} points over ksi [{:e}, {:e}] to {}",
        table.len(),
        ksi_min,
        ksi_max,
        args.output.display()
    );
    Ok(0)
}

pub(super) fn run_rates_command(args: RatesArgs) -> Result<i32, CliError> {
    let deck = load_deck(&args.deck)?;
    if deck.is_empty() {
        return Err(compute_error(LifetimeError::input(
            "INPUT.DECK",
            format!(
                "parameter deck '{}' has no sections; expected any of touschek, elastic, inelastic, quantum, ring",
                args.deck.display()
            ),
        )));
    }
    let config = load_optional_engine_config(args.config.as_deref())?;

    if args.strict {
        validate_deck(&deck)?;
    }

    let table = if deck.needs_touschek_table() {
        Some(resolve_table(&args, &config.table)?)
    } else {
        None
    };

    let mut report = RatesReport {
        touschek: None,
        elastic: None,
        inelastic: None,
        quantum: None,
        ring: None,
        summary: summarize_loss_rates::<&str>(&[]),
    };

    if let (Some(input), Some(table)) = (&deck.touschek, &table) {
        let rate = calc_touschek_loss_rate_with_table(input, &**table).map_err(compute_error)?;
        report.touschek = Some(rate);
    }
    if let Some(input) = &deck.elastic {
        report.elastic = Some(calc_elastic_loss_rate(input).map_err(compute_error)?);
    }
    if let Some(input) = &deck.inelastic {
        report.inelastic = Some(calc_inelastic_loss_rate(input).map_err(compute_error)?);
    }
    if let Some(input) = &deck.quantum {
        report.quantum = Some(calc_quantum_loss_rates(input).map_err(compute_error)?);
    }
    if let (Some(ring), Some(table)) = (&deck.ring, &table) {
        let sampling = ring.sampling.unwrap_or(config.ring);
        let result = touschek_inverse_lifetime_with_table(
            &ring.beam,
            &ring.acceptance,
            &ring.optics,
            &sampling,
            &**table,
        )
        .map_err(compute_error)?;
        report.ring = Some(result);
    }

    report.summary = summarize_loss_rates(&summary_channels(&report));
    print!("{}", render_human_summary(&report));

    if let Some(path) = &args.report {
        write_json_report(path, &report)?;
        println!("JSON report: {}", path.display());
    }

    Ok(0)
}

fn resolve_table(
    args: &RatesArgs,
    config: &DTouschekTableConfig,
) -> Result<Cow<'static, DTouschekTable>, CliError> {
    if let Some(path) = &args.table {
        return Ok(Cow::Owned(
            DTouschekTable::load_json(path).map_err(compute_error)?,
        ));
    }
    if args.config.is_some() && *config != DTouschekTableConfig::default() {
        info!(points = config.points, "building D-Touschek table from engine config");
        return Ok(Cow::Owned(
            DTouschekTable::build(config).map_err(compute_error)?,
        ));
    }

    Ok(Cow::Borrowed(default_table().map_err(compute_error)?))
}

fn validate_deck(deck: &RateDeck) -> Result<(), CliError> {
    if let Some(input) = &deck.touschek {
        input.validate().map_err(compute_error)?;
    }
    if let Some(input) = &deck.elastic {
        input.validate().map_err(compute_error)?;
    }
    if let Some(input) = &deck.inelastic {
        input.validate().map_err(compute_error)?;
    }
    if let Some(input) = &deck.quantum {
        input.validate().map_err(compute_error)?;
    }
    if let Some(ring) = &deck.ring {
        ring.beam.validate().map_err(compute_error)?;
    }
    Ok(())
}
