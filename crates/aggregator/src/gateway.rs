//! Liquidity gateway: borrow entrypoint in front of a lending-market lender.
//!
//! When a borrow would push the market's utilization above the configured
//! limit, the gateway asks the debt manager to top the lender up with just
//! enough idle capital to bring utilization back to the limit. A partial
//! top-up does not block the borrow; only the market's own liquidity does.

use adapter_core::{mul_div_up, AccountId, AdapterError, LenderId, BPS_SCALE};
use log::{info, warn};

use crate::debt_manager::DebtManager;
use crate::error::{Result, VaultError};
use crate::lender_pool::LenderPool;
use crate::vault::Vault;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BorrowOutcome {
    /// Amount delivered to the borrower
    pub borrowed: u128,
    /// Capital the vault added to the lender before the borrow
    pub topped_up: u128,
}

#[derive(Clone, Debug)]
pub struct LiquidityGateway {
    pub id: AccountId,
    pub owner: AccountId,
    utilization_limit_bps: u64,
}

impl LiquidityGateway {
    pub fn new(id: AccountId, owner: AccountId, utilization_limit_bps: u64) -> Result<Self> {
        validate_limit(utilization_limit_bps)?;
        Ok(Self {
            id,
            owner,
            utilization_limit_bps,
        })
    }

    pub fn utilization_limit_bps(&self) -> u64 {
        self.utilization_limit_bps
    }

    pub fn set_utilization_limit(&mut self, caller: AccountId, limit_bps: u64) -> Result<()> {
        if caller != self.owner {
            return Err(VaultError::Unauthorized);
        }
        validate_limit(limit_bps)?;
        self.utilization_limit_bps = limit_bps;
        info!("gateway {}: utilization limit -> {} bps", self.id, limit_bps);
        Ok(())
    }

    /// Supply the market needs so that `borrowed_after` sits at the limit
    ///
    /// # Formula
    /// shortfall = ceil(borrowed_after * 10_000 / limit) - supplied
    pub fn shortfall(&self, supplied: u128, borrowed_after: u128) -> Result<u128> {
        let required = mul_div_up(borrowed_after, BPS_SCALE, self.utilization_limit_bps as u128)
            .ok_or(VaultError::Overflow)?;
        Ok(required.saturating_sub(supplied))
    }

    /// Borrow `amount` from `lender`'s market, topping the lender up first when
    /// the borrow would breach the utilization limit.
    ///
    /// All-or-nothing: if the market cannot deliver `amount`, the top-up is
    /// rolled back together with the borrow.
    pub fn borrow(
        &self,
        manager: &DebtManager,
        vault: &mut Vault,
        pool: &mut LenderPool,
        lender: LenderId,
        amount: u128,
    ) -> Result<BorrowOutcome> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let (supplied, borrowed) = {
            let market = pool
                .get(lender)?
                .as_market()
                .ok_or(AdapterError::Unsupported("borrow"))?;
            (market.total_supplied(), market.total_borrowed())
        };
        let borrowed_after = borrowed.checked_add(amount).ok_or(VaultError::Overflow)?;

        let mut staged_vault = vault.clone();
        let mut staged_pool = pool.clone();

        let shortfall = self.shortfall(supplied, borrowed_after)?;
        let topped_up = if shortfall > 0 {
            let added = manager.request_liquidity(self.id, &mut staged_vault, &mut staged_pool, lender, shortfall)?;
            if added < shortfall {
                warn!(
                    "gateway {}: {} utilization stays above {} bps (needed {}, got {})",
                    self.id, lender, self.utilization_limit_bps, shortfall, added
                );
            }
            added
        } else {
            0
        };

        let delivered = staged_pool
            .get_mut(lender)?
            .as_market_mut()
            .ok_or(AdapterError::Unsupported("borrow"))?
            .borrow(amount)?;

        *vault = staged_vault;
        *pool = staged_pool;

        info!(
            "gateway {}: borrowed {} from {} (topped up {})",
            self.id, delivered, lender, topped_up
        );
        Ok(BorrowOutcome {
            borrowed: delivered,
            topped_up,
        })
    }
}

fn validate_limit(limit_bps: u64) -> Result<()> {
    if limit_bps == 0 || limit_bps as u128 > BPS_SCALE {
        return Err(VaultError::InvalidUtilizationLimit(limit_bps));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: AccountId = AccountId::from_byte(0xa0);

    #[test]
    fn test_limit_validation() {
        assert!(LiquidityGateway::new(AccountId::from_byte(1), OWNER, 0).is_err());
        assert!(LiquidityGateway::new(AccountId::from_byte(1), OWNER, 10_001).is_err());
        let mut gw = LiquidityGateway::new(AccountId::from_byte(1), OWNER, 8_000).unwrap();
        assert_eq!(
            gw.set_utilization_limit(AccountId::from_byte(2), 9_000),
            Err(VaultError::Unauthorized)
        );
        gw.set_utilization_limit(OWNER, 9_000).unwrap();
        assert_eq!(gw.utilization_limit_bps(), 9_000);
    }

    #[test]
    fn test_shortfall() {
        let gw = LiquidityGateway::new(AccountId::from_byte(1), OWNER, 8_000).unwrap();
        // 10k borrowed at 80% needs 12.5k supplied
        assert_eq!(gw.shortfall(10_000, 10_000).unwrap(), 2_500);
        assert_eq!(gw.shortfall(20_000, 10_000).unwrap(), 0);
        // rounds the requirement up
        assert_eq!(gw.shortfall(0, 1).unwrap(), 2);
    }
}
