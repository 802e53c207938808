//! Constant-APR savings adapter

use adapter_core::{
    mul_div_down, AccountId, AdapterError, AssetId, LenderAdapter, LenderId, BPS_SCALE, SECONDS_PER_YEAR,
};

/// Savings source paying a fixed APR with no liquidity constraint.
/// `deposit_limit` bounds the total position (0 = unbounded).
#[derive(Debug, Clone)]
pub struct FixedRateLender {
    id: LenderId,
    vault: AccountId,
    asset: AssetId,
    name: String,
    apr_bps: u64,
    deposit_limit: u128,
    assets: u128,
}

impl FixedRateLender {
    pub fn new(id: LenderId, vault: AccountId, asset: AssetId, name: &str, apr_bps: u64) -> Self {
        Self {
            id,
            vault,
            asset,
            name: name.to_string(),
            apr_bps,
            deposit_limit: 0,
            assets: 0,
        }
    }

    pub fn with_deposit_limit(mut self, deposit_limit: u128) -> Self {
        self.deposit_limit = deposit_limit;
        self
    }
}

impl LenderAdapter for FixedRateLender {
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
        self.assets
    }

    fn apr(&self) -> u64 {
        self.apr_bps
    }

    fn apr_after_debt_change(&self, _delta: u128, _increase: bool) -> u64 {
        self.apr_bps
    }

    fn max_deposit(&self) -> u128 {
        if self.deposit_limit == 0 {
            u128::MAX
        } else {
            self.deposit_limit.saturating_sub(self.assets)
        }
    }

    fn max_withdraw(&self) -> u128 {
        self.assets
    }

    fn deposit(&mut self, amount: u128) -> Result<(), AdapterError> {
        if amount == 0 {
            return Err(AdapterError::ZeroAmount);
        }
        let limit = self.max_deposit();
        if amount > limit {
            return Err(AdapterError::DepositLimitExceeded { requested: amount, limit });
        }
        self.assets = self.assets.checked_add(amount).ok_or(AdapterError::Overflow)?;
        Ok(())
    }

    fn withdraw(&mut self, amount: u128) -> Result<u128, AdapterError> {
        if amount == 0 {
            return Err(AdapterError::ZeroAmount);
        }
        let sent = amount.min(self.assets);
        self.assets -= sent;
        Ok(sent)
    }

    fn accrue(&mut self, elapsed_secs: u64) -> Result<u128, AdapterError> {
        let gained = mul_div_down(
            self.assets,
            self.apr_bps as u128 * elapsed_secs as u128,
            BPS_SCALE * SECONDS_PER_YEAR,
        )
        .ok_or(AdapterError::Overflow)?;
        self.assets = self.assets.checked_add(gained).ok_or(AdapterError::Overflow)?;
        Ok(gained)
    }

    fn clone_fresh(&self, id: LenderId, vault: AccountId, name: &str) -> Box<dyn LenderAdapter> {
        Box::new(FixedRateLender::new(id, vault, self.asset, name, self.apr_bps).with_deposit_limit(self.deposit_limit))
    }

    fn clone_box(&self) -> Box<dyn LenderAdapter> {
        Box::new(self.clone())
    }
}
