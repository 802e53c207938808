//! Scenario replay against an in-memory vault deployment

use adapter_core::{AccountId, AssetId, LenderAdapter, LenderId};
use aggregator::{
    AllocationPosition, DataProvider, DebtManager, LenderPool, LenderSpec, LiquidityGateway, Vault,
    VaultConfig, VaultFactory,
};
use anyhow::{anyhow, bail, Context, Result};
use lender_model::{FixedRateLender, MarketLender, RateModel};
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::config::{LenderConfig, LenderKind, Scenario, Step};

const SECONDS_PER_DAY: u64 = 86_400;

/// Identity for a human-readable name: its bytes, zero padded
pub fn account(name: &str) -> AccountId {
    let mut raw = [0u8; 32];
    let bytes = name.as_bytes();
    let len = bytes.len().min(32);
    raw[..len].copy_from_slice(&bytes[..len]);
    AccountId(raw)
}

/// Result of one replayed step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    pub ok: bool,
    pub detail: String,
}

pub struct Simulation {
    pub vault: Vault,
    pub manager: DebtManager,
    pub pool: LenderPool,
    pub provider: DataProvider,
    pub gateway: Option<LiquidityGateway>,
    /// Lender names in registration order
    pub lenders: Vec<(String, LenderId)>,
    pub users: BTreeSet<String>,
    pub outcomes: Vec<StepOutcome>,
    admin: AccountId,
}

impl Simulation {
    /// Deploy the scenario's vault through the factory and wire manager and gateway
    pub fn deploy(scenario: &Scenario) -> Result<Self> {
        let admin = account("admin");
        let manager_id = account("manager");
        let asset = AssetId::from_symbol(&scenario.vault.asset);

        let mut pool = LenderPool::new();
        let mut specs = Vec::with_capacity(scenario.lenders.len());
        for lender in &scenario.lenders {
            let template = insert_template(&mut pool, lender, asset)?;
            specs.push(LenderSpec {
                template,
                name: lender.name.clone(),
                max_debt: lender.max_debt as u128,
            });
        }

        let mut config = VaultConfig::new(
            &scenario.vault.asset,
            &scenario.vault.name,
            &scenario.vault.symbol,
            scenario.vault.decimals,
            admin,
        );
        config.admin_fee_bps = scenario.vault.admin_fee_bps;
        config.protocol_fee_bps = scenario.vault.protocol_fee_bps;
        config.minimum_total_idle = scenario.vault.minimum_total_idle as u128;
        config.treasury = account("treasury");

        let mut provider = DataProvider::new();
        let mut factory = VaultFactory::new(account("factory"));
        let mut vault = factory
            .create(&config, &specs, &mut pool, &mut provider)
            .map_err(|e| anyhow!("Vault deployment failed: {}", e))?;

        vault
            .set_manager(admin, manager_id)
            .map_err(|e| anyhow!("Cannot set manager: {}", e))?;
        let mut manager = DebtManager::new(manager_id, vault.id);
        let lenders: Vec<(String, LenderId)> = scenario
            .lenders
            .iter()
            .map(|l| l.name.clone())
            .zip(vault.get_lenders())
            .collect();
        for (name, id) in &lenders {
            manager
                .add_lender(admin, &vault, *id)
                .map_err(|e| anyhow!("Cannot whitelist {}: {}", name, e))?;
        }

        let gateway = match &scenario.gateway {
            Some(section) => {
                let id = account("gateway");
                manager
                    .set_whitelisted_gateway(admin, &vault, id, true)
                    .map_err(|e| anyhow!("Cannot whitelist gateway: {}", e))?;
                let gateway = LiquidityGateway::new(id, admin, section.utilization_limit_bps)
                    .map_err(|e| anyhow!("Invalid gateway: {}", e))?;
                Some(gateway)
            }
            None => None,
        };

        info!("deployed vault {} with {} lenders", vault.id, lenders.len());
        Ok(Self {
            vault,
            manager,
            pool,
            provider,
            gateway,
            lenders,
            users: BTreeSet::new(),
            outcomes: Vec::new(),
            admin,
        })
    }

    /// Replay every step. A rejected step is recorded and the replay goes on,
    /// unless `strict` is set.
    pub fn run(&mut self, steps: &[Step], strict: bool) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            let result = self.apply(step);
            let outcome = match result {
                Ok(detail) => StepOutcome {
                    index,
                    action: step.label(),
                    ok: true,
                    detail,
                },
                Err(err) => {
                    if strict {
                        return Err(err.context(format!("Step {} ({}) failed", index, step.label())));
                    }
                    StepOutcome {
                        index,
                        action: step.label(),
                        ok: false,
                        detail: err.to_string(),
                    }
                }
            };
            debug!("step {}: {:?}", index, outcome);
            self.outcomes.push(outcome);
        }
        Ok(())
    }

    fn lender(&self, name: &str) -> Result<LenderId> {
        self.lenders
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
            .ok_or_else(|| anyhow!("Unknown lender: {}", name))
    }

    pub fn lender_name(&self, id: LenderId) -> String {
        self.lenders
            .iter()
            .find(|(_, l)| *l == id)
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| id.to_string())
    }

    fn apply(&mut self, step: &Step) -> Result<String> {
        let admin = self.admin;
        match step {
            Step::Deposit { user, amount } => {
                let who = account(user);
                self.users.insert(user.clone());
                let shares = self.vault.deposit(who, *amount as u128, who)?;
                Ok(format!("{} deposited {} for {} shares", user, amount, shares))
            }
            Step::Withdraw { user, amount } => {
                let who = account(user);
                let shares = self.vault.withdraw(who, *amount as u128, who, who)?;
                Ok(format!("{} withdrew {} burning {} shares", user, amount, shares))
            }
            Step::Redeem { user, shares } => {
                let who = account(user);
                let assets = self.vault.redeem(who, *shares as u128, who, who)?;
                Ok(format!("{} redeemed {} shares for {}", user, shares, assets))
            }
            Step::Allocate { positions } => {
                let batch = positions
                    .iter()
                    .map(|p| Ok(AllocationPosition::new(self.lender(&p.lender)?, p.debt as u128)))
                    .collect::<Result<Vec<_>>>()?;
                let moved = self
                    .manager
                    .manual_allocation(admin, &mut self.vault, &mut self.pool, &batch)?;
                let parts: Vec<String> = positions
                    .iter()
                    .zip(moved)
                    .map(|(p, m)| format!("{} moved {}", p.lender, m))
                    .collect();
                Ok(parts.join(", "))
            }
            Step::UpdateDebt { lender, target } => {
                let id = self.lender(lender)?;
                let moved = self.vault.update_debt(admin, &mut self.pool, id, *target as u128)?;
                Ok(format!("{} moved {}", lender, moved))
            }
            Step::Accrue { lender, days } => {
                let secs = days.saturating_mul(SECONDS_PER_DAY);
                let targets = match lender {
                    Some(name) => vec![self.lender(name)?],
                    None => self.vault.get_lenders(),
                };
                let mut parts = Vec::new();
                for id in targets {
                    let gained = self.pool.get_mut(id)?.accrue(secs)?;
                    parts.push(format!("{} +{}", self.lender_name(id), gained));
                }
                Ok(format!("{} days: {}", days, parts.join(", ")))
            }
            Step::Report { lender } => {
                let id = self.lender(lender)?;
                let report = self.vault.process_report(admin, &self.pool, id)?;
                Ok(format!(
                    "{} gain {} loss {} fee shares {}/{}",
                    lender, report.gain, report.loss, report.admin_fee_shares, report.protocol_fee_shares
                ))
            }
            Step::Borrow { lender, amount } => {
                let id = self.lender(lender)?;
                let gateway = self.gateway.as_ref().context("No gateway configured")?;
                let outcome =
                    gateway.borrow(&self.manager, &mut self.vault, &mut self.pool, id, *amount as u128)?;
                Ok(format!(
                    "borrowed {} from {} (topped up {})",
                    outcome.borrowed, lender, outcome.topped_up
                ))
            }
            Step::SetMaxDebt { lender, max_debt } => {
                let id = self.lender(lender)?;
                self.vault.update_max_debt_for_lender(admin, id, *max_debt as u128)?;
                Ok(format!("{} max debt {}", lender, max_debt))
            }
            Step::RemoveLender { lender, force } => {
                let id = self.lender(lender)?;
                self.vault.remove_lender(admin, &self.pool, id, *force)?;
                Ok(format!("{} removed", lender))
            }
            Step::Shutdown => {
                if self.vault.is_shutdown() {
                    bail!("Vault already shut down");
                }
                self.vault.set_shutdown(admin, true)?;
                Ok("vault shut down".to_string())
            }
        }
    }

    pub fn live_assets(&self, id: LenderId) -> u128 {
        self.pool.get(id).map(|l| l.total_assets()).unwrap_or(0)
    }

    pub fn apr(&self, id: LenderId) -> u64 {
        self.pool.get(id).map(|l| l.apr()).unwrap_or(0)
    }
}

fn insert_template(pool: &mut LenderPool, lender: &LenderConfig, asset: AssetId) -> Result<LenderId> {
    let name = format!("{} template", lender.name);
    let id = match lender.kind {
        LenderKind::Market => {
            let model = match &lender.rate {
                Some(rate) => RateModel::new(
                    rate.base_rate_bps,
                    rate.slope1_bps,
                    rate.slope2_bps,
                    rate.optimal_utilization_bps,
                    rate.reserve_factor_bps,
                )
                .with_context(|| format!("Lender {}: invalid rate model", lender.name))?,
                None => RateModel::default(),
            };
            let model = Arc::new(model);
            pool.insert(|id| {
                Box::new(
                    MarketLender::new(id, AccountId::ZERO, asset, &name, model)
                        .with_market(lender.supply as u128, lender.borrowed as u128)
                        .with_supply_cap(lender.supply_cap as u128),
                ) as Box<dyn LenderAdapter>
            })
        }
        LenderKind::Fixed => pool.insert(|id| {
            Box::new(
                FixedRateLender::new(id, AccountId::ZERO, asset, &name, lender.apr_bps)
                    .with_deposit_limit(lender.deposit_limit as u128),
            ) as Box<dyn LenderAdapter>
        }),
    };
    Ok(id)
}

/// Holder name → (shares, claim in assets)
pub fn holder_positions(sim: &Simulation) -> BTreeMap<String, (u128, u128)> {
    let mut positions = BTreeMap::new();
    let named = sim
        .users
        .iter()
        .map(|u| (u.clone(), account(u)))
        .chain([
            ("admin".to_string(), account("admin")),
            ("treasury".to_string(), account("treasury")),
        ]);
    for (name, id) in named {
        let shares = sim.vault.balance_of(&id);
        if shares == 0 {
            continue;
        }
        let assets = sim.vault.convert_to_assets(shares).unwrap_or(0);
        positions.insert(name, (shares, assets));
    }
    positions
}
