//! Pooled lending market adapter

use std::sync::Arc;

use adapter_core::{
    bps_of, mul_div_down, utilization_bps, AccountId, AdapterError, AssetId, BorrowMarket, LenderAdapter,
    LenderId, BPS_SCALE, SECONDS_PER_YEAR,
};

use crate::rate::RateModel;

/// Vault position inside a lending market shared with other suppliers and
/// borrowers.
///
/// Accounting:
/// - `cash = Σ supply + reserves - total_borrowed` (free liquidity)
/// - the vault's claim is `vault_assets`, growing with interest and shrinking
///   with written-off bad debt
#[derive(Debug, Clone)]
pub struct MarketLender {
    id: LenderId,
    vault: AccountId,
    asset: AssetId,
    name: String,
    model: Arc<RateModel>,

    /// Vault's claim on the market
    vault_assets: u128,
    /// Claims of every other supplier
    other_supply: u128,
    /// Outstanding borrows, interest included
    total_borrowed: u128,
    /// Free liquidity
    cash: u128,
    /// Interest kept by the market
    reserves: u128,
    /// Ceiling on total supply; 0 means none
    supply_cap: u128,
}

impl MarketLender {
    pub fn new(id: LenderId, vault: AccountId, asset: AssetId, name: &str, model: Arc<RateModel>) -> Self {
        Self {
            id,
            vault,
            asset,
            name: name.to_string(),
            model,
            vault_assets: 0,
            other_supply: 0,
            total_borrowed: 0,
            cash: 0,
            reserves: 0,
            supply_cap: 0,
        }
    }

    /// Seed the market with outside suppliers and borrowers
    pub fn with_market(mut self, other_supply: u128, borrowed: u128) -> Self {
        let borrowed = borrowed.min(other_supply);
        self.other_supply = other_supply;
        self.total_borrowed = borrowed;
        self.cash = other_supply - borrowed;
        self
    }

    pub fn with_supply_cap(mut self, supply_cap: u128) -> Self {
        self.supply_cap = supply_cap;
        self
    }

    pub fn model(&self) -> &Arc<RateModel> {
        &self.model
    }

    pub fn cash(&self) -> u128 {
        self.cash
    }

    pub fn reserves(&self) -> u128 {
        self.reserves
    }

    pub fn supply_cap(&self) -> u128 {
        self.supply_cap
    }

    fn supplied(&self) -> u128 {
        self.vault_assets.saturating_add(self.other_supply)
    }

    fn utilization(&self) -> u64 {
        utilization_bps(self.total_borrowed, self.supplied())
    }
}

impl LenderAdapter for MarketLender {
    fn id(&self) -> LenderId {
        self.id
    }

    fn vault(&self) -> AccountId {
        self.vault
    }

    fn asset(&self) -> AssetId {
        self.asset
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn total_assets(&self) -> u128 {
        self.vault_assets
    }

    fn apr(&self) -> u64 {
        self.model.supply_rate_bps(self.total_borrowed, self.supplied())
    }

    fn apr_after_debt_change(&self, delta: u128, increase: bool) -> u64 {
        let supplied = if increase {
            self.supplied().saturating_add(delta)
        } else {
            self.supplied().saturating_sub(delta)
        };
        self.model.supply_rate_bps(self.total_borrowed, supplied)
    }

    fn max_deposit(&self) -> u128 {
        if self.supply_cap == 0 {
            u128::MAX
        } else {
            self.supply_cap.saturating_sub(self.supplied())
        }
    }

    fn max_withdraw(&self) -> u128 {
        self.vault_assets.min(self.cash)
    }

    fn deposit(&mut self, amount: u128) -> Result<(), AdapterError> {
        if amount == 0 {
            return Err(AdapterError::ZeroAmount);
        }
        let limit = self.max_deposit();
        if amount > limit {
            return Err(AdapterError::DepositLimitExceeded { requested: amount, limit });
        }
        let vault_assets = self.vault_assets.checked_add(amount).ok_or(AdapterError::Overflow)?;
        let cash = self.cash.checked_add(amount).ok_or(AdapterError::Overflow)?;
        self.vault_assets = vault_assets;
        self.cash = cash;
        Ok(())
    }

    fn withdraw(&mut self, amount: u128) -> Result<u128, AdapterError> {
        if amount == 0 {
            return Err(AdapterError::ZeroAmount);
        }
        let sent = amount.min(self.max_withdraw());
        self.vault_assets -= sent;
        self.cash -= sent;
        Ok(sent)
    }

    fn accrue(&mut self, elapsed_secs: u64) -> Result<u128, AdapterError> {
        let rate = self.model.borrow_rate_bps(self.utilization()) as u128;
        let interest = mul_div_down(
            self.total_borrowed,
            rate * elapsed_secs as u128,
            BPS_SCALE * SECONDS_PER_YEAR,
        )
        .ok_or(AdapterError::Overflow)?;
        if interest == 0 {
            return Ok(0);
        }

        let reserve_cut = bps_of(interest, self.model.reserve_factor_bps).ok_or(AdapterError::Overflow)?;
        let to_suppliers = interest - reserve_cut;
        let vault_cut = match self.supplied() {
            0 => 0,
            supplied => mul_div_down(to_suppliers, self.vault_assets, supplied).ok_or(AdapterError::Overflow)?,
        };

        let total_borrowed = self.total_borrowed.checked_add(interest).ok_or(AdapterError::Overflow)?;
        let reserves = self.reserves.checked_add(reserve_cut).ok_or(AdapterError::Overflow)?;
        let vault_assets = self.vault_assets.checked_add(vault_cut).ok_or(AdapterError::Overflow)?;
        let other_supply = self
            .other_supply
            .checked_add(to_suppliers - vault_cut)
            .ok_or(AdapterError::Overflow)?;

        self.total_borrowed = total_borrowed;
        self.reserves = reserves;
        self.vault_assets = vault_assets;
        self.other_supply = other_supply;
        Ok(vault_cut)
    }

    fn clone_fresh(&self, id: LenderId, vault: AccountId, name: &str) -> Box<dyn LenderAdapter> {
        let fresh = MarketLender::new(id, vault, self.asset, name, Arc::clone(&self.model))
            .with_market(self.other_supply, self.total_borrowed)
            .with_supply_cap(self.supply_cap);
        Box::new(fresh)
    }

    fn clone_box(&self) -> Box<dyn LenderAdapter> {
        Box::new(self.clone())
    }

    fn as_market(&self) -> Option<&dyn BorrowMarket> {
        Some(self)
    }

    fn as_market_mut(&mut self) -> Option<&mut dyn BorrowMarket> {
        Some(self)
    }
}

impl BorrowMarket for MarketLender {
    fn total_supplied(&self) -> u128 {
        self.supplied()
    }

    fn total_borrowed(&self) -> u128 {
        self.total_borrowed
    }

    fn borrow(&mut self, amount: u128) -> Result<u128, AdapterError> {
        if amount == 0 {
            return Err(AdapterError::ZeroAmount);
        }
        if amount > self.cash {
            return Err(AdapterError::InsufficientLiquidity {
                requested: amount,
                available: self.cash,
            });
        }
        let borrowed = self.total_borrowed.checked_add(amount).ok_or(AdapterError::Overflow)?;
        self.cash -= amount;
        self.total_borrowed = borrowed;
        Ok(amount)
    }

    fn repay(&mut self, amount: u128) -> Result<u128, AdapterError> {
        if amount == 0 {
            return Err(AdapterError::ZeroAmount);
        }
        let applied = amount.min(self.total_borrowed);
        let cash = self.cash.checked_add(applied).ok_or(AdapterError::Overflow)?;
        self.total_borrowed -= applied;
        self.cash = cash;
        Ok(applied)
    }

    fn write_off(&mut self, amount: u128) -> Result<u128, AdapterError> {
        let written = amount.min(self.total_borrowed);
        if written == 0 {
            return Ok(0);
        }
        // borrows never exceed supply plus reserves, so supplied is non-zero here
        let supplied = self.supplied().max(1);
        let vault_loss = mul_div_down(written, self.vault_assets, supplied)
            .ok_or(AdapterError::Overflow)?
            .min(self.vault_assets);
        let other_loss = (written - vault_loss).min(self.other_supply);

        self.total_borrowed -= written;
        self.vault_assets -= vault_loss;
        self.other_supply -= other_loss;
        Ok(vault_loss)
    }
}
