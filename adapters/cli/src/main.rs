#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a settlement scenario and prints the
//! resulting state.

mod scenario;

use std::{fmt::Write as _, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use settlement_system_builder::Session;
use settlement_world::query;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scripted settlement builder", long_about = None)]
struct Cli {
    /// Scenario TOML file; the bundled village is played when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Extra ticks to run after the scripted steps.
    #[arg(long, default_value_t = 0)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 250)]
    dt_ms: u64,
    /// Log command and task activity at debug level.
    #[arg(long)]
    verbose: bool,
}

/// Entry point for the settlement command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (scenario, base) = match &cli.scenario {
        Some(path) => (Scenario::load(path)?, path.parent().map(PathBuf::from)),
        None => (
            Scenario::from_toml_str(scenario::BUILT_IN).context("bundled scenario is invalid")?,
            None,
        ),
    };
    let config = scenario.world_config(base.as_deref())?;
    info!(
        columns = config.columns,
        rows = config.rows,
        steps = scenario.steps.len(),
        "starting scenario"
    );

    let dt = Duration::from_millis(cli.dt_ms);
    let mut session = Session::new(config);
    scenario::play(&mut session, &scenario.steps, dt)?;
    for _ in 0..cli.ticks {
        session.tick(dt);
    }

    print!("{}", report(&session));
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(session: &Session) -> String {
    let world = session.world();
    let mut out = String::new();

    let _ = writeln!(out, "buildings:");
    for building in query::buildings(world) {
        let _ = writeln!(
            out,
            "  building#{} {} {}{}",
            building.id().get(),
            building.kind(),
            building.region(),
            if building.is_constructed() {
                ""
            } else {
                " (under construction)"
            }
        );
    }

    let _ = writeln!(out, "vehicles:");
    let selected = query::selected_vehicle(world);
    for vehicle in query::vehicles(world) {
        let position = vehicle.position();
        let _ = writeln!(
            out,
            "  vehicle#{} {} at {} ({:.2}, {:.2}){}",
            vehicle.id().get(),
            vehicle.kind(),
            vehicle.cell(),
            position.x,
            position.y,
            if selected == Some(vehicle.id()) {
                " [selected]"
            } else {
                ""
            }
        );
    }

    let _ = writeln!(out, "resources: {}", query::balances(world));

    let _ = writeln!(out, "history:");
    for line in session.history().listing() {
        let _ = writeln!(out, "{line}");
    }

    let _ = writeln!(out, "tasks:");
    for line in session.scheduler().listing() {
        let _ = writeln!(out, "  {line}");
    }
    out
}
