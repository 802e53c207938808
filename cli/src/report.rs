//! Human and JSON rendering of a finished simulation

use anyhow::{Context, Result};
use colored::Colorize;
use lender_model::RateModel;
use serde::Serialize;

use crate::simulate::{holder_positions, Simulation, StepOutcome};

#[derive(Debug, Serialize)]
pub struct VaultSummary {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub asset: String,
    pub total_assets: u128,
    pub total_idle: u128,
    pub total_debt: u128,
    pub total_supply: u128,
    pub minimum_total_idle: u128,
    pub is_shutdown: bool,
}

#[derive(Debug, Serialize)]
pub struct LenderSummary {
    pub name: String,
    pub entry: aggregator::LenderEntry,
    /// Assets the adapter currently holds for the vault
    pub live_assets: u128,
    pub apr_bps: u64,
}

#[derive(Debug, Serialize)]
pub struct HolderSummary {
    pub name: String,
    pub shares: u128,
    pub assets: u128,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub vault: VaultSummary,
    pub lenders: Vec<LenderSummary>,
    pub holders: Vec<HolderSummary>,
    pub steps: Vec<StepOutcome>,
}

impl Summary {
    pub fn collect(sim: &Simulation) -> Self {
        let vault = &sim.vault;
        let lenders = vault
            .lenders()
            .iter()
            .map(|entry| LenderSummary {
                name: sim.lender_name(entry.lender),
                entry: *entry,
                live_assets: sim.live_assets(entry.lender),
                apr_bps: sim.apr(entry.lender),
            })
            .collect();
        let holders = holder_positions(sim)
            .into_iter()
            .map(|(name, (shares, assets))| HolderSummary { name, shares, assets })
            .collect();

        Self {
            vault: VaultSummary {
                id: vault.id.to_string(),
                name: vault.name().to_string(),
                symbol: vault.symbol().to_string(),
                asset: vault.asset().to_string(),
                total_assets: vault.total_assets(),
                total_idle: vault.total_idle(),
                total_debt: vault.total_debt(),
                total_supply: vault.total_supply(),
                minimum_total_idle: vault.minimum_total_idle(),
                is_shutdown: vault.is_shutdown(),
            },
            lenders,
            holders,
            steps: sim.outcomes.clone(),
        }
    }
}

pub fn print_json(summary: &Summary) -> Result<()> {
    let out = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    println!("{}", out);
    Ok(())
}

pub fn print_steps(steps: &[StepOutcome]) {
    println!("{}", "=== Steps ===".bright_green().bold());
    for step in steps {
        let marker = if step.ok { "✓".green() } else { "✗".red() };
        let detail = if step.ok {
            step.detail.normal()
        } else {
            step.detail.yellow()
        };
        println!("  {} {:>3} {:<14} {}", marker, step.index, step.action.bright_cyan(), detail);
    }
}

pub fn print_summary(summary: &Summary) {
    let v = &summary.vault;
    println!("\n{}", "=== Vault ===".bright_green().bold());
    println!("  {} {} ({}) over {}", "Vault:".bright_cyan(), v.name, v.symbol, v.asset);
    println!("  {} {}", "Id:".bright_cyan(), v.id);
    println!("  {} {}", "Total assets:".bright_cyan(), v.total_assets);
    println!(
        "  {} {} (floor {})",
        "Idle:".bright_cyan(),
        v.total_idle,
        v.minimum_total_idle
    );
    println!("  {} {}", "Debt:".bright_cyan(), v.total_debt);
    println!("  {} {}", "Share supply:".bright_cyan(), v.total_supply);
    if v.is_shutdown {
        println!("  {}", "SHUT DOWN".red().bold());
    }

    println!("\n{}", "Lenders:".bright_yellow());
    if summary.lenders.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for l in &summary.lenders {
        let cap = if l.entry.max_debt == 0 {
            "uncapped".to_string()
        } else {
            l.entry.max_debt.to_string()
        };
        let drift = if l.live_assets == l.entry.current_debt {
            String::new()
        } else {
            format!(" (live {}, unreported)", l.live_assets)
        };
        println!(
            "  {} {:<12} debt {:>10} / {:<10} apr {:>5} bps{}",
            "├─".dimmed(),
            l.name,
            l.entry.current_debt,
            cap,
            l.apr_bps,
            drift.dimmed()
        );
    }

    println!("\n{}", "Holders:".bright_yellow());
    for h in &summary.holders {
        println!("  {} {:<12} {:>12} shares  ≈ {}", "├─".dimmed(), h.name, h.shares, h.assets);
    }
}

/// Borrow and supply APR across the utilization range
pub fn print_rate_curve(model: &RateModel, step_bps: u64) {
    println!("{}", "=== Rate Curve ===".bright_green().bold());
    println!(
        "  {} base {} / slope1 {} / slope2 {} / kink {} / reserve {}",
        "Model:".bright_cyan(),
        model.base_rate_bps,
        model.slope1_bps,
        model.slope2_bps,
        model.optimal_utilization_bps,
        model.reserve_factor_bps
    );
    println!("\n  {:>8} {:>10} {:>10}", "util", "borrow", "supply");

    let step = step_bps.max(1);
    let mut util = 0u64;
    while util <= 10_000 {
        let borrow = model.borrow_rate_bps(util);
        let supply = model.supply_rate_bps(util as u128, 10_000);
        let row = format!("  {:>7}% {:>9}bp {:>9}bp", util / 100, borrow, supply);
        if util == model.optimal_utilization_bps {
            println!("{}", row.bright_yellow());
        } else {
            println!("{}", row);
        }
        util += step;
    }
}
