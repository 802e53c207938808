//! Shared fixtures for the vault integration suites
#![allow(dead_code)]

use std::sync::Arc;

use aggregator::*;
use lender_model::{FixedRateLender, MarketLender, RateModel};

pub const DEPLOYER: AccountId = AccountId::from_byte(0xd0);
pub const ADMIN: AccountId = AccountId::from_byte(0xad);
pub const TREASURY: AccountId = AccountId::from_byte(0x7e);
pub const MANAGER: AccountId = AccountId::from_byte(0x3a);
pub const GATEWAY: AccountId = AccountId::from_byte(0x6a);
pub const FACTORY: AccountId = AccountId::from_byte(0xfa);

pub const USER1: AccountId = AccountId::from_byte(0x01);
pub const USER2: AccountId = AccountId::from_byte(0x02);
pub const USER3: AccountId = AccountId::from_byte(0x03);
pub const USER4: AccountId = AccountId::from_byte(0x04);
pub const USER5: AccountId = AccountId::from_byte(0x05);

pub const ADMIN_FEE: u64 = 1_000;
pub const PROTOCOL_FEE: u64 = 1_000;
pub const ONE_YEAR: u64 = 365 * 24 * 60 * 60;

/// One whole token at 18 decimals
pub const E18: u128 = 1_000_000_000_000_000_000;

pub fn frax() -> AssetId {
    AssetId::from_symbol("FRAX")
}

/// Everything one vault deployment consists of
pub struct Env {
    pub pool: LenderPool,
    pub vault: Vault,
    pub manager: DebtManager,
    pub provider: DataProvider,
    pub crv: LenderId,
    pub cvx: LenderId,
}

impl Env {
    pub fn allocate(&mut self, positions: &[(LenderId, u128)]) -> Result<Vec<u128>> {
        let positions: Vec<AllocationPosition> = positions
            .iter()
            .map(|(lender, debt)| AllocationPosition::new(*lender, *debt))
            .collect();
        self.manager
            .manual_allocation(ADMIN, &mut self.vault, &mut self.pool, &positions)
    }

    pub fn deposit(&mut self, user: AccountId, assets: u128) -> u128 {
        self.vault.deposit(user, assets, user).unwrap()
    }

    pub fn accrue(&mut self, lender: LenderId, secs: u64) -> u128 {
        self.pool.get_mut(lender).unwrap().accrue(secs).unwrap()
    }

    pub fn live_assets(&self, lender: LenderId) -> u128 {
        self.pool.get(lender).unwrap().total_assets()
    }

    pub fn debt(&self, lender: LenderId) -> u128 {
        self.vault.get_lender_data(&lender).unwrap().current_debt
    }
}

/// Two lending markets cloned from one template, the richer one first.
/// Fees 10% / 10%, minimum idle 1000, crv capped at 8000, cvx uncapped.
pub fn setup() -> Env {
    setup_scaled(1)
}

/// [`setup`] with every amount expressed in multiples of `unit`
pub fn setup_scaled(unit: u128) -> Env {
    let model = Arc::new(RateModel::default());
    let mut pool = LenderPool::new();
    let crv_template = pool.insert(|id| {
        Box::new(
            MarketLender::new(id, AccountId::ZERO, frax(), "CRV", Arc::clone(&model))
                .with_market(100_000 * unit, 70_000 * unit),
        )
    });
    let cvx_template = pool.insert(|id| {
        Box::new(
            MarketLender::new(id, AccountId::ZERO, frax(), "CVX", Arc::clone(&model))
                .with_market(100_000 * unit, 30_000 * unit),
        )
    });

    let mut config = VaultConfig::new("FRAX", "Frax Aggregator", "frax-ag-lp", 18, ADMIN);
    config.admin_fee_bps = ADMIN_FEE;
    config.protocol_fee_bps = PROTOCOL_FEE;
    config.minimum_total_idle = 1_000 * unit;
    config.treasury = TREASURY;

    let specs = [
        LenderSpec { template: crv_template, name: "CRV".into(), max_debt: 0 },
        LenderSpec { template: cvx_template, name: "CVX".into(), max_debt: 0 },
    ];

    let mut provider = DataProvider::new();
    let mut factory = VaultFactory::new(FACTORY);
    let mut vault = factory.create(&config, &specs, &mut pool, &mut provider).unwrap();

    vault.set_manager(ADMIN, MANAGER).unwrap();
    let lenders = vault.get_lenders();
    let (crv, cvx) = (lenders[0], lenders[1]);
    vault.update_max_debt_for_lender(ADMIN, crv, 8_000 * unit).unwrap();

    let mut manager = DebtManager::new(MANAGER, vault.id);
    manager.add_lender(ADMIN, &vault, crv).unwrap();
    manager.add_lender(ADMIN, &vault, cvx).unwrap();

    Env {
        pool,
        vault,
        manager,
        provider,
        crv,
        cvx,
    }
}

/// Plain vault over fixed-rate lenders, no fees, no idle floor
pub fn setup_fixed(aprs: &[(u64, u128)]) -> (Vault, DebtManager, LenderPool, Vec<LenderId>) {
    let vault_id = AccountId::from_byte(0x99);
    let mut vault = Vault::new(vault_id, ADMIN, TREASURY);
    vault.init(ADMIN, frax(), "Fixed", "fx", 18).unwrap();
    vault.set_manager(ADMIN, MANAGER).unwrap();

    let mut pool = LenderPool::new();
    let mut manager = DebtManager::new(MANAGER, vault_id);
    let mut ids = Vec::new();
    for (i, (apr, max_debt)) in aprs.iter().enumerate() {
        let name = format!("fixed-{}", i);
        let id = pool.insert(|id| Box::new(FixedRateLender::new(id, vault_id, frax(), &name, *apr)));
        vault.add_lender(ADMIN, &pool, id, *max_debt).unwrap();
        manager.add_lender(ADMIN, &vault, id).unwrap();
        ids.push(id);
    }
    (vault, manager, pool, ids)
}
