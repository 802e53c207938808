//! Aggregator CLI - Scenario simulator for the multi-lender vault
//!
//! Loads a TOML scenario, deploys the vault through the factory with its
//! lenders, debt manager and optional liquidity gateway, replays the step list
//! and prints the resulting state.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use lender_model::RateModel;

mod config;
mod report;
mod simulate;

use config::Scenario;
use simulate::Simulation;

#[derive(Parser)]
#[command(name = "aggregator")]
#[command(about = "Aggregator CLI - Simulate multi-lender vault scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose output (debug logs unless RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario and print the final vault state
    Simulate {
        /// Scenario file (TOML)
        scenario: String,

        /// Abort on the first rejected step
        #[arg(long)]
        strict: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse and validate a scenario without running it
    Check {
        /// Scenario file (TOML)
        scenario: String,
    },

    /// Print a rate model's borrow and supply APR across utilization
    Rates {
        #[arg(long, default_value = "0")]
        base: u64,

        #[arg(long, default_value = "400")]
        slope1: u64,

        #[arg(long, default_value = "7500")]
        slope2: u64,

        /// Kink utilization (basis points)
        #[arg(long, default_value = "8000")]
        optimal: u64,

        /// Reserve factor (basis points)
        #[arg(long, default_value = "0")]
        reserve: u64,

        /// Utilization step (basis points)
        #[arg(long, default_value = "1000")]
        step: u64,
    },
}

fn init_logger(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Simulate { scenario, strict, json } => {
            let scenario = Scenario::load(&scenario)?;
            let mut sim = Simulation::deploy(&scenario)?;
            sim.run(&scenario.steps, strict)?;

            let summary = report::Summary::collect(&sim);
            if json {
                report::print_json(&summary)?;
            } else {
                report::print_steps(&summary.steps);
                report::print_summary(&summary);
            }
        }
        Commands::Check { scenario } => {
            let parsed = Scenario::load(&scenario)?;
            println!("{} {}", "✓".green(), scenario.bright_cyan());
            println!(
                "  {} {} lenders, {} steps{}",
                "Scenario:".bright_cyan(),
                parsed.lenders.len(),
                parsed.steps.len(),
                if parsed.gateway.is_some() { ", gateway" } else { "" }
            );
        }
        Commands::Rates { base, slope1, slope2, optimal, reserve, step } => {
            let model = RateModel::new(base, slope1, slope2, optimal, reserve)
                .context("Invalid rate model")?;
            report::print_rate_curve(&model, step);
        }
    }

    Ok(())
}
