//! Debt manager: atomic multi-lender reallocation on top of
//! [`Vault::update_debt`], with its own lender whitelist and the set of
//! gateways allowed to request just-in-time liquidity.
//!
//! The manager never writes vault state directly; every movement goes through
//! the vault's debt-update primitive.

use std::collections::BTreeSet;

use adapter_core::{AccountId, LenderId};
use log::{info, warn};

use crate::error::{Result, VaultError};
use crate::lender_pool::LenderPool;
use crate::vault::Vault;

/// One `{lender, target debt}` pair of a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationPosition {
    pub lender: LenderId,
    pub debt: u128,
}

impl AllocationPosition {
    pub fn new(lender: LenderId, debt: u128) -> Self {
        Self { lender, debt }
    }
}

#[derive(Clone, Debug)]
pub struct DebtManager {
    /// Identity the vault recognizes as its manager
    pub id: AccountId,
    /// Vault this manager allocates for
    pub vault: AccountId,
    lenders: Vec<LenderId>,
    gateways: BTreeSet<AccountId>,
}

impl DebtManager {
    pub fn new(id: AccountId, vault: AccountId) -> Self {
        Self {
            id,
            vault,
            lenders: Vec::new(),
            gateways: BTreeSet::new(),
        }
    }

    /// Whitelisted lenders in insertion order
    pub fn get_lenders(&self) -> &[LenderId] {
        &self.lenders
    }

    pub fn is_whitelisted(&self, lender: &LenderId) -> bool {
        self.lenders.contains(lender)
    }

    pub fn is_gateway(&self, gateway: &AccountId) -> bool {
        self.gateways.contains(gateway)
    }

    fn check_vault(&self, vault: &Vault) -> Result<()> {
        if vault.id != self.vault {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    // ========================================================================
    // Whitelist
    // ========================================================================

    /// Whitelist a lender the vault already lists. Vault admin only.
    pub fn add_lender(&mut self, caller: AccountId, vault: &Vault, lender: LenderId) -> Result<()> {
        self.check_vault(vault)?;
        if caller != vault.admin() {
            return Err(VaultError::Unauthorized);
        }
        if !vault.lenders().contains(&lender) {
            return Err(VaultError::NotRegisteredInVault);
        }
        if self.is_whitelisted(&lender) {
            return Err(VaultError::LenderAlreadyAdded);
        }

        self.lenders.push(lender);
        info!("manager {}: whitelisted {}", self.id, lender);
        Ok(())
    }

    /// Drop a lender from the whitelist.
    ///
    /// The vault admin may always do this. Anyone else may once the vault no
    /// longer lists the lender, since no vault-side debt can remain.
    pub fn remove_lender(&mut self, caller: AccountId, vault: &Vault, lender: LenderId) -> Result<()> {
        self.check_vault(vault)?;
        let position = self
            .lenders
            .iter()
            .position(|l| *l == lender)
            .ok_or(VaultError::LenderNotWhitelisted)?;
        if caller != vault.admin() && vault.lenders().contains(&lender) {
            return Err(VaultError::Unauthorized);
        }

        self.lenders.remove(position);
        info!("manager {}: removed {} from whitelist", self.id, lender);
        Ok(())
    }

    pub fn set_whitelisted_gateway(&mut self, caller: AccountId, vault: &Vault, gateway: AccountId, allowed: bool) -> Result<()> {
        self.check_vault(vault)?;
        if caller != vault.admin() {
            return Err(VaultError::Unauthorized);
        }
        if allowed {
            self.gateways.insert(gateway);
        } else {
            self.gateways.remove(&gateway);
        }
        info!("manager {}: gateway {} allowed = {}", self.id, gateway, allowed);
        Ok(())
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Apply `positions` in order as one all-or-nothing batch.
    ///
    /// Before any funds move, every position is checked: the lender must be
    /// whitelisted and registered, and its target must respect a configured
    /// `max_debt`. Each increase must also fit what the adapter accepts once
    /// the earlier positions have run. A failing check rejects the whole
    /// batch with `CapExceeded`. Otherwise each position runs through
    /// `update_debt`, which caps rather than fails when idle runs short; the
    /// caller's order is authoritative, so put decreases first to free idle.
    ///
    /// Returns the amount moved per position.
    pub fn manual_allocation(
        &self,
        caller: AccountId,
        vault: &mut Vault,
        pool: &mut LenderPool,
        positions: &[AllocationPosition],
    ) -> Result<Vec<u128>> {
        self.check_vault(vault)?;
        if caller != vault.admin() {
            return Err(VaultError::Unauthorized);
        }

        // Step 1: Validate every position against the current state
        for position in positions {
            if !self.is_whitelisted(&position.lender) {
                return Err(VaultError::LenderNotWhitelisted);
            }
            let entry = vault
                .get_lender_data(&position.lender)
                .map_err(|_| VaultError::NotRegisteredInVault)?;
            if entry.exceeds_cap(position.debt) {
                warn!(
                    "manager {}: {} target {} above max debt {}",
                    self.id, position.lender, position.debt, entry.max_debt
                );
                return Err(VaultError::CapExceeded);
            }
        }

        // Step 2: Run the batch on staged copies; adapter limits are checked
        // against the state left by the earlier positions
        let mut staged_vault = vault.clone();
        let mut staged_pool = pool.clone();
        let mut moved = Vec::with_capacity(positions.len());
        for position in positions {
            let current = staged_vault.get_lender_data(&position.lender)?.current_debt;
            if position.debt > current {
                let limit = staged_pool.get(position.lender)?.max_deposit();
                if position.debt - current > limit {
                    warn!(
                        "manager {}: {} target {} above adapter limit {}",
                        self.id, position.lender, position.debt, limit
                    );
                    return Err(VaultError::CapExceeded);
                }
            }
            let amount = staged_vault.update_debt(self.id, &mut staged_pool, position.lender, position.debt)?;
            moved.push(amount);
        }

        // Step 3: Commit (update_debt never raises debt past a cap)
        *vault = staged_vault;
        *pool = staged_pool;

        info!(
            "manager {}: allocation of {} positions applied, idle {}",
            self.id,
            positions.len(),
            vault.total_idle()
        );
        Ok(moved)
    }

    /// Just-in-time top-up of one lender by up to `amount`, for whitelisted gateways.
    ///
    /// Capped exactly like any debt increase; returns what was actually added.
    /// A shut-down vault provides nothing instead of failing the caller.
    pub fn request_liquidity(
        &self,
        gateway: AccountId,
        vault: &mut Vault,
        pool: &mut LenderPool,
        lender: LenderId,
        amount: u128,
    ) -> Result<u128> {
        self.check_vault(vault)?;
        if !self.is_gateway(&gateway) {
            return Err(VaultError::Unauthorized);
        }
        if !self.is_whitelisted(&lender) {
            return Err(VaultError::LenderNotWhitelisted);
        }
        if vault.is_shutdown() {
            warn!("manager {}: liquidity request for {} ignored, vault shut down", self.id, lender);
            return Ok(0);
        }
        if amount == 0 {
            return Ok(0);
        }

        let current = vault.get_lender_data(&lender)?.current_debt;
        let target = current.checked_add(amount).ok_or(VaultError::Overflow)?;
        let added = vault.update_debt(self.id, pool, lender, target)?;
        if added < amount {
            warn!(
                "manager {}: {} requested {} for {}, provided {}",
                self.id, gateway, amount, lender, added
            );
        }
        Ok(added)
    }
}
