//! Scenario files: vault parameters, lenders, optional gateway and the step list

use anyhow::{bail, Context, Result};
use lender_model::RateModel;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub vault: VaultSection,
    #[serde(default)]
    pub lenders: Vec<LenderConfig>,
    pub gateway: Option<GatewaySection>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VaultSection {
    pub asset: String,
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    #[serde(default)]
    pub admin_fee_bps: u64,
    #[serde(default)]
    pub protocol_fee_bps: u64,
    #[serde(default)]
    pub minimum_total_idle: u64,
}

fn default_decimals() -> u8 {
    18
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LenderKind {
    Market,
    Fixed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LenderConfig {
    pub name: String,
    pub kind: LenderKind,
    /// 0 = uncapped
    #[serde(default)]
    pub max_debt: u64,

    // market lenders
    pub rate: Option<RateModel>,
    /// Supply provided by other depositors
    #[serde(default)]
    pub supply: u64,
    /// Outstanding borrows from other users
    #[serde(default)]
    pub borrowed: u64,
    #[serde(default)]
    pub supply_cap: u64,

    // fixed lenders
    #[serde(default)]
    pub apr_bps: u64,
    #[serde(default)]
    pub deposit_limit: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    pub utilization_limit_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PositionConfig {
    pub lender: String,
    pub debt: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Deposit { user: String, amount: u64 },
    Withdraw { user: String, amount: u64 },
    Redeem { user: String, shares: u64 },
    Allocate { positions: Vec<PositionConfig> },
    UpdateDebt { lender: String, target: u64 },
    /// Let interest run; every lender when `lender` is omitted
    Accrue { lender: Option<String>, days: u64 },
    Report { lender: String },
    Borrow { lender: String, amount: u64 },
    SetMaxDebt { lender: String, max_debt: u64 },
    RemoveLender {
        lender: String,
        #[serde(default)]
        force: bool,
    },
    Shutdown,
}

impl Step {
    /// Short name for tables and logs
    pub fn label(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::Redeem { .. } => "redeem",
            Step::Allocate { .. } => "allocate",
            Step::UpdateDebt { .. } => "update_debt",
            Step::Accrue { .. } => "accrue",
            Step::Report { .. } => "report",
            Step::Borrow { .. } => "borrow",
            Step::SetMaxDebt { .. } => "set_max_debt",
            Step::RemoveLender { .. } => "remove_lender",
            Step::Shutdown => "shutdown",
        }
    }

    fn lender_refs(&self) -> Vec<&str> {
        match self {
            Step::Allocate { positions } => positions.iter().map(|p| p.lender.as_str()).collect(),
            Step::UpdateDebt { lender, .. }
            | Step::Report { lender }
            | Step::Borrow { lender, .. }
            | Step::SetMaxDebt { lender, .. }
            | Step::RemoveLender { lender, .. } => vec![lender.as_str()],
            Step::Accrue { lender, .. } => lender.iter().map(|l| l.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

impl Scenario {
    /// Load and validate a scenario file; `~` and env vars in the path are expanded
    pub fn load(path: &str) -> Result<Self> {
        let path = expand_path(path)?;
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Invalid scenario: {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(data).context("Failed to parse scenario TOML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.vault.asset.is_empty() || self.vault.asset.len() > 8 {
            bail!("Asset ticker must be 1..=8 characters, got {:?}", self.vault.asset);
        }

        let mut names = BTreeSet::new();
        for lender in &self.lenders {
            if !names.insert(lender.name.as_str()) {
                bail!("Duplicate lender name: {}", lender.name);
            }
            if lender.kind == LenderKind::Market && lender.borrowed > lender.supply {
                bail!("Lender {}: borrowed exceeds supply", lender.name);
            }
            if let Some(rate) = &lender.rate {
                RateModel::new(
                    rate.base_rate_bps,
                    rate.slope1_bps,
                    rate.slope2_bps,
                    rate.optimal_utilization_bps,
                    rate.reserve_factor_bps,
                )
                .with_context(|| format!("Lender {}: invalid rate model", lender.name))?;
            }
        }

        for (i, step) in self.steps.iter().enumerate() {
            for lender in step.lender_refs() {
                if !names.contains(lender) {
                    bail!("Step {} ({}): unknown lender {}", i + 1, step.label(), lender);
                }
            }
            if matches!(step, Step::Borrow { .. }) && self.gateway.is_none() {
                bail!("Step {} (borrow): scenario has no [gateway] section", i + 1);
            }
        }
        Ok(())
    }
}

fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path).with_context(|| format!("Cannot expand path: {}", path))?;
    Ok(Path::new(expanded.as_ref()).to_path_buf())
}
