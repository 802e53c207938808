//! Vault: custody of idle assets, share issuance, the debt-update primitive,
//! gain/loss realization, fee accrual and shutdown gating.
//!
//! `total_assets()` is `total_idle + Σ current_debt`, the vault's own ledger.
//! Live adapter balances only enter the ledger through [`Vault::process_report`].
//!
//! Every entrypoint validates before it mutates. The only external call that
//! can fail mid-way is the adapter's deposit/withdraw, and it runs before any
//! vault field is written.

use adapter_core::{bps_of, mul_div_down, AccountId, AssetId, LenderId, BPS_SCALE};
use log::{debug, info, warn};

use crate::error::{Result, VaultError};
use crate::lender_pool::LenderPool;
use crate::registry::{LenderEntry, LenderRegistry};
use crate::share_ledger::{Rounding, ShareLedger};

/// Outcome of reconciling one lender's recorded debt with its live assets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub gain: u128,
    pub loss: u128,
    /// Shares minted to the admin out of the gain
    pub admin_fee_shares: u128,
    /// Shares minted to the treasury out of the gain
    pub protocol_fee_shares: u128,
    /// Recorded debt after the report
    pub current_debt: u128,
}

#[derive(Clone, Debug)]
pub struct Vault {
    /// Identity of this vault; adapters are bound to it
    pub id: AccountId,

    asset: AssetId,
    name: String,
    symbol: String,
    decimals: u8,

    admin: AccountId,
    treasury: AccountId,
    manager: Option<AccountId>,

    /// Admin share of realized gains (basis points)
    admin_fee_bps: u64,
    /// Treasury share of realized gains (basis points)
    protocol_fee_bps: u64,

    /// Floor forward allocation never draws idle below
    minimum_total_idle: u128,

    /// Assets held directly by the vault
    total_idle: u128,
    /// Σ current_debt over the registry
    total_debt: u128,

    is_shutdown: bool,
    initialized: bool,

    shares: ShareLedger,
    lenders: LenderRegistry,
}

// ============================================================================
// Construction & Configuration
// ============================================================================

impl Vault {
    /// Un-initialized vault administered by `deployer`
    pub fn new(id: AccountId, deployer: AccountId, treasury: AccountId) -> Self {
        Self {
            id,
            asset: AssetId::NONE,
            name: String::new(),
            symbol: String::new(),
            decimals: 0,
            admin: deployer,
            treasury,
            manager: None,
            admin_fee_bps: 0,
            protocol_fee_bps: 0,
            minimum_total_idle: 0,
            total_idle: 0,
            total_debt: 0,
            is_shutdown: false,
            initialized: false,
            shares: ShareLedger::new(),
            lenders: LenderRegistry::new(),
        }
    }

    /// One-time initializer, admin only
    pub fn init(&mut self, caller: AccountId, asset: AssetId, name: &str, symbol: &str, decimals: u8) -> Result<()> {
        if self.initialized {
            return Err(VaultError::AlreadyInitialized);
        }
        self.only_admin(caller)?;

        self.asset = asset;
        self.name = name.to_string();
        self.symbol = symbol.to_string();
        self.decimals = decimals;
        self.initialized = true;

        info!("vault {}: initialized {} ({}) over {}", self.id, name, symbol, asset);
        Ok(())
    }

    pub fn set_admin(&mut self, caller: AccountId, new_admin: AccountId, admin_fee_bps: u64) -> Result<()> {
        self.only_admin(caller)?;
        validate_fees(admin_fee_bps, self.protocol_fee_bps)?;
        self.admin = new_admin;
        self.admin_fee_bps = admin_fee_bps;
        info!("vault {}: admin -> {} (fee {} bps)", self.id, new_admin, admin_fee_bps);
        Ok(())
    }

    pub fn set_treasury(&mut self, caller: AccountId, treasury: AccountId, protocol_fee_bps: u64) -> Result<()> {
        self.only_admin(caller)?;
        validate_fees(self.admin_fee_bps, protocol_fee_bps)?;
        self.treasury = treasury;
        self.protocol_fee_bps = protocol_fee_bps;
        info!("vault {}: treasury -> {} (fee {} bps)", self.id, treasury, protocol_fee_bps);
        Ok(())
    }

    pub fn set_minimum_total_idle(&mut self, caller: AccountId, amount: u128) -> Result<()> {
        self.only_admin(caller)?;
        self.minimum_total_idle = amount;
        info!("vault {}: minimum total idle -> {}", self.id, amount);
        Ok(())
    }

    /// Name the debt manager allowed to move debt alongside the admin
    pub fn set_manager(&mut self, caller: AccountId, manager: AccountId) -> Result<()> {
        self.only_admin(caller)?;
        self.manager = Some(manager);
        info!("vault {}: manager -> {}", self.id, manager);
        Ok(())
    }

    /// Enter shutdown. There is no way back: clearing the flag fails with `Shutdown`.
    pub fn set_shutdown(&mut self, caller: AccountId, shutdown: bool) -> Result<()> {
        self.only_admin(caller)?;
        if self.is_shutdown && !shutdown {
            return Err(VaultError::Shutdown);
        }
        if shutdown && !self.is_shutdown {
            warn!("vault {}: shutdown, forward allocation disabled", self.id);
        }
        self.is_shutdown = shutdown;
        Ok(())
    }

    fn only_admin(&self, caller: AccountId) -> Result<()> {
        if caller != self.admin {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    /// Admin or the configured debt manager
    fn only_allocator(&self, caller: AccountId) -> Result<()> {
        if caller == self.admin || Some(caller) == self.manager {
            Ok(())
        } else {
            Err(VaultError::Unauthorized)
        }
    }

    fn require_initialized(&self) -> Result<()> {
        if !self.initialized {
            return Err(VaultError::NotInitialized);
        }
        Ok(())
    }
}

fn validate_fees(admin_fee_bps: u64, protocol_fee_bps: u64) -> Result<()> {
    let total = (admin_fee_bps as u128).saturating_add(protocol_fee_bps as u128);
    if total > BPS_SCALE {
        return Err(VaultError::InvalidFee);
    }
    Ok(())
}

// ============================================================================
// Views
// ============================================================================

impl Vault {
    pub fn asset(&self) -> AssetId {
        self.asset
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    pub fn treasury(&self) -> AccountId {
        self.treasury
    }

    pub fn manager(&self) -> Option<AccountId> {
        self.manager
    }

    pub fn admin_fee_bps(&self) -> u64 {
        self.admin_fee_bps
    }

    pub fn protocol_fee_bps(&self) -> u64 {
        self.protocol_fee_bps
    }

    pub fn minimum_total_idle(&self) -> u128 {
        self.minimum_total_idle
    }

    pub fn total_idle(&self) -> u128 {
        self.total_idle
    }

    pub fn total_debt(&self) -> u128 {
        self.total_debt
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Idle plus recorded debt
    pub fn total_assets(&self) -> u128 {
        self.total_idle.saturating_add(self.total_debt)
    }

    pub fn convert_to_shares(&self, assets: u128) -> Result<u128> {
        self.shares.convert_to_shares(assets, self.total_assets(), Rounding::Down)
    }

    pub fn convert_to_assets(&self, shares: u128) -> Result<u128> {
        self.shares.convert_to_assets(shares, self.total_assets(), Rounding::Down)
    }

    pub fn preview_deposit(&self, assets: u128) -> Result<u128> {
        self.convert_to_shares(assets)
    }

    /// Shares burned to withdraw `assets` (rounded against the withdrawer)
    pub fn preview_withdraw(&self, assets: u128) -> Result<u128> {
        self.shares.convert_to_shares(assets, self.total_assets(), Rounding::Up)
    }

    pub fn preview_redeem(&self, shares: u128) -> Result<u128> {
        self.convert_to_assets(shares)
    }

    /// Assets `owner` can withdraw right now, bounded by idle liquidity
    pub fn max_withdraw(&self, owner: &AccountId) -> Result<u128> {
        let claim = self.convert_to_assets(self.shares.balance_of(owner))?;
        Ok(claim.min(self.total_idle))
    }

    /// Registered lenders in registry order
    pub fn get_lenders(&self) -> Vec<LenderId> {
        self.lenders.lenders()
    }

    pub fn get_lender_data(&self, lender: &LenderId) -> Result<LenderEntry> {
        self.lenders.get(lender).copied().ok_or(VaultError::LenderNotFound)
    }

    pub fn lenders(&self) -> &LenderRegistry {
        &self.lenders
    }

    pub fn shares(&self) -> &ShareLedger {
        &self.shares
    }

    /// Cached `total_debt` equals the sum of the registry's per-lender debt
    pub fn check_debt_ledger(&self) -> bool {
        self.total_debt == self.lenders.total_debt()
    }

    /// Every registered lender holds at least its recorded debt, so no loss
    /// is waiting to be reported. A lender missing from `pool` fails the check.
    pub fn check_backing(&self, pool: &LenderPool) -> bool {
        self.lenders.iter().all(|entry| {
            pool.get(entry.lender)
                .map(|adapter| adapter.total_assets() >= entry.current_debt)
                .unwrap_or(false)
        })
    }
}

// ============================================================================
// Share Token
// ============================================================================

impl Vault {
    pub fn balance_of(&self, owner: &AccountId) -> u128 {
        self.shares.balance_of(owner)
    }

    pub fn total_supply(&self) -> u128 {
        self.shares.total_supply()
    }

    pub fn transfer(&mut self, caller: AccountId, to: AccountId, shares: u128) -> Result<()> {
        self.shares.transfer(caller, to, shares)
    }

    pub fn transfer_from(&mut self, caller: AccountId, from: AccountId, to: AccountId, shares: u128) -> Result<()> {
        if self.shares.balance_of(&from) < shares {
            return Err(VaultError::InsufficientShares);
        }
        self.shares.spend_allowance(from, caller, shares)?;
        self.shares.transfer(from, to, shares)
    }

    pub fn approve(&mut self, caller: AccountId, spender: AccountId, shares: u128) {
        self.shares.approve(caller, spender, shares);
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.shares.allowance(owner, spender)
    }
}

// ============================================================================
// Deposit / Withdraw
// ============================================================================

impl Vault {
    /// Deposit `assets` from `caller`, minting shares to `receiver`
    pub fn deposit(&mut self, caller: AccountId, assets: u128, receiver: AccountId) -> Result<u128> {
        self.require_initialized()?;
        if self.is_shutdown {
            return Err(VaultError::Shutdown);
        }
        if assets == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let shares = self.preview_deposit(assets)?;
        if shares == 0 {
            return Err(VaultError::ZeroShares);
        }
        let idle = self.total_idle.checked_add(assets).ok_or(VaultError::Overflow)?;

        self.shares.mint(receiver, shares)?;
        self.total_idle = idle;

        info!(
            "vault {}: {} deposited {} for {} ({} shares)",
            self.id, caller, assets, receiver, shares
        );
        Ok(shares)
    }

    /// Withdraw exactly `assets` out of idle, burning `owner`'s shares.
    /// Never pulls from lenders; idle must be staged by the allocator.
    pub fn withdraw(&mut self, caller: AccountId, assets: u128, receiver: AccountId, owner: AccountId) -> Result<u128> {
        self.require_initialized()?;
        if assets == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let shares = self.preview_withdraw(assets)?;
        self.exit(caller, owner, shares, assets)?;

        info!(
            "vault {}: withdrew {} to {} burning {} shares of {}",
            self.id, assets, receiver, shares, owner
        );
        Ok(shares)
    }

    /// Burn exactly `shares` of `owner` for the assets they convert to
    pub fn redeem(&mut self, caller: AccountId, shares: u128, receiver: AccountId, owner: AccountId) -> Result<u128> {
        self.require_initialized()?;
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let assets = self.preview_redeem(shares)?;
        if assets == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.exit(caller, owner, shares, assets)?;

        info!(
            "vault {}: redeemed {} shares of {} for {} to {}",
            self.id, shares, owner, assets, receiver
        );
        Ok(assets)
    }

    fn exit(&mut self, caller: AccountId, owner: AccountId, shares: u128, assets: u128) -> Result<()> {
        if shares > self.shares.balance_of(&owner) {
            return Err(VaultError::InsufficientShares);
        }
        if assets > self.total_idle {
            return Err(VaultError::InsufficientLiquidity);
        }
        if caller != owner && self.shares.allowance(&owner, &caller) < shares {
            return Err(VaultError::InsufficientAllowance);
        }

        self.shares.spend_allowance(owner, caller, shares)?;
        self.shares.burn(owner, shares)?;
        self.total_idle -= assets;
        Ok(())
    }
}

// ============================================================================
// Lender Management
// ============================================================================

impl Vault {
    /// Register `lender` with zero debt. The adapter must be bound to this vault and asset.
    pub fn add_lender(&mut self, caller: AccountId, pool: &LenderPool, lender: LenderId, max_debt: u128) -> Result<()> {
        self.only_admin(caller)?;
        self.require_initialized()?;
        if self.is_shutdown {
            return Err(VaultError::Shutdown);
        }

        let adapter = pool.get(lender)?;
        if adapter.vault() != self.id || adapter.asset() != self.asset {
            return Err(VaultError::LenderMismatch);
        }
        self.lenders.add(lender, max_debt)?;

        info!(
            "vault {}: added {} ({}) max debt {}",
            self.id, lender, adapter.name(), max_debt
        );
        Ok(())
    }

    /// Remove `lender` from the registry.
    ///
    /// A lender with recorded debt needs `force`, and even then is only removed
    /// when reporting brings its debt to zero (its live assets are gone).
    /// Forced removal books a loss and is reserved to the admin.
    pub fn remove_lender(&mut self, caller: AccountId, pool: &LenderPool, lender: LenderId, force: bool) -> Result<()> {
        if force {
            self.only_admin(caller)?;
        } else {
            self.only_allocator(caller)?;
        }
        let entry = self.get_lender_data(&lender)?;

        if entry.current_debt != 0 {
            if !force {
                return Err(VaultError::NonZeroDebt);
            }
            if pool.get(lender)?.total_assets() != 0 {
                return Err(VaultError::NonZeroDebt);
            }
            let report = self.report(pool, lender)?;
            warn!("vault {}: force-removing {} after loss {}", self.id, lender, report.loss);
        }

        self.lenders.remove(&lender)?;
        info!("vault {}: removed {}", self.id, lender);
        Ok(())
    }

    /// Change a lender's cap. Existing debt above the new cap is left to be drained.
    pub fn update_max_debt_for_lender(&mut self, caller: AccountId, lender: LenderId, max_debt: u128) -> Result<()> {
        self.only_admin(caller)?;
        let entry = self.lenders.get_mut(&lender).ok_or(VaultError::LenderNotFound)?;
        entry.max_debt = max_debt;
        info!("vault {}: {} max debt -> {}", self.id, lender, max_debt);
        Ok(())
    }
}

// ============================================================================
// Debt Update
// ============================================================================

impl Vault {
    /// Move `lender`'s recorded debt toward `target_debt`.
    ///
    /// Increases are capped by the lender's headroom under `max_debt`, by idle
    /// above `minimum_total_idle`, and by the adapter's deposit limit.
    /// Decreases are capped by what the adapter can return right now.
    /// Either way a capped move is a success; the amount actually moved is returned.
    ///
    /// While shut down a target above current debt fails with `Shutdown` and any
    /// other target drains the lender completely.
    pub fn update_debt(&mut self, caller: AccountId, pool: &mut LenderPool, lender: LenderId, target_debt: u128) -> Result<u128> {
        self.only_allocator(caller)?;
        let entry = self.get_lender_data(&lender)?;

        let mut target = target_debt;
        if self.is_shutdown {
            if target > entry.current_debt {
                return Err(VaultError::Shutdown);
            }
            target = 0;
        }

        if target > entry.current_debt {
            self.increase_debt(pool, entry, target - entry.current_debt)
        } else if target < entry.current_debt {
            self.decrease_debt(pool, entry, entry.current_debt - target)
        } else {
            Ok(0)
        }
    }

    fn increase_debt(&mut self, pool: &mut LenderPool, entry: LenderEntry, requested: u128) -> Result<u128> {
        let adapter = pool.get_mut(entry.lender)?;

        let available_idle = self.total_idle.saturating_sub(self.minimum_total_idle);
        let amount = requested
            .min(entry.headroom())
            .min(available_idle)
            .min(adapter.max_deposit());

        if amount < requested {
            debug!(
                "vault {}: {} increase capped {} -> {} (headroom {}, idle {}, limit {})",
                self.id,
                entry.lender,
                requested,
                amount,
                entry.headroom(),
                available_idle,
                adapter.max_deposit()
            );
        }
        if amount == 0 {
            return Ok(0);
        }

        let new_debt = entry.current_debt.checked_add(amount).ok_or(VaultError::Overflow)?;
        let total_debt = self.total_debt.checked_add(amount).ok_or(VaultError::Overflow)?;

        adapter.deposit(amount)?;

        self.set_current_debt(entry.lender, new_debt)?;
        self.total_debt = total_debt;
        self.total_idle -= amount;

        info!(
            "vault {}: {} debt {} -> {} (+{})",
            self.id, entry.lender, entry.current_debt, new_debt, amount
        );
        Ok(amount)
    }

    fn decrease_debt(&mut self, pool: &mut LenderPool, entry: LenderEntry, requested: u128) -> Result<u128> {
        let adapter = pool.get_mut(entry.lender)?;

        let amount = requested.min(adapter.max_withdraw());
        if amount < requested {
            warn!(
                "vault {}: {} can only return {} of {} requested",
                self.id, entry.lender, amount, requested
            );
        }
        if amount == 0 {
            return Ok(0);
        }

        if self.total_idle.checked_add(amount).is_none() {
            return Err(VaultError::Overflow);
        }

        let received = adapter.withdraw(amount)?.min(amount);

        let new_debt = entry.current_debt - received;
        self.set_current_debt(entry.lender, new_debt)?;
        self.total_debt = self.total_debt.saturating_sub(received);
        self.total_idle += received;

        info!(
            "vault {}: {} debt {} -> {} (-{})",
            self.id, entry.lender, entry.current_debt, new_debt, received
        );
        Ok(received)
    }

    fn set_current_debt(&mut self, lender: LenderId, debt: u128) -> Result<()> {
        let entry = self.lenders.get_mut(&lender).ok_or(VaultError::LenderNotFound)?;
        entry.current_debt = debt;
        Ok(())
    }
}

// ============================================================================
// Reporting
// ============================================================================

impl Vault {
    /// Reconcile `lender`'s recorded debt with its live assets.
    ///
    /// A gain raises debt and mints fee shares to the admin and the treasury;
    /// the rest of the gain accrues to holders through the share price.
    /// A loss lowers debt; holders absorb it through the share price.
    /// Repeating the call without a change in live assets is a no-op.
    pub fn process_report(&mut self, caller: AccountId, pool: &LenderPool, lender: LenderId) -> Result<Report> {
        self.only_admin(caller)?;
        self.report(pool, lender)
    }

    fn report(&mut self, pool: &LenderPool, lender: LenderId) -> Result<Report> {
        let entry = self.get_lender_data(&lender)?;
        let live = pool.get(lender)?.total_assets();

        if live > entry.current_debt {
            let gain = live - entry.current_debt;
            let total_debt = self.total_debt.checked_add(gain).ok_or(VaultError::Overflow)?;
            let total_after = self.total_idle.checked_add(total_debt).ok_or(VaultError::Overflow)?;
            let (admin_fee_shares, protocol_fee_shares) = self.fee_shares(gain, total_after)?;

            if admin_fee_shares > 0 {
                self.shares.mint(self.admin, admin_fee_shares)?;
            }
            if protocol_fee_shares > 0 {
                self.shares.mint(self.treasury, protocol_fee_shares)?;
            }
            self.set_current_debt(lender, live)?;
            self.total_debt = total_debt;

            info!(
                "vault {}: {} reported gain {} (fee shares admin {}, protocol {})",
                self.id, lender, gain, admin_fee_shares, protocol_fee_shares
            );
            Ok(Report {
                gain,
                loss: 0,
                admin_fee_shares,
                protocol_fee_shares,
                current_debt: live,
            })
        } else if live < entry.current_debt {
            let loss = entry.current_debt - live;
            self.set_current_debt(lender, live)?;
            self.total_debt = self.total_debt.saturating_sub(loss);

            warn!("vault {}: {} reported loss {}", self.id, lender, loss);
            Ok(Report {
                gain: 0,
                loss,
                admin_fee_shares: 0,
                protocol_fee_shares: 0,
                current_debt: live,
            })
        } else {
            debug!("vault {}: {} report unchanged at {}", self.id, lender, live);
            Ok(Report {
                current_debt: live,
                ..Report::default()
            })
        }
    }

    /// Fee shares for `gain`, sized so the recipients' claim is at most the fee
    /// assets once the gain is booked into `total_after`.
    ///
    /// # Formula
    /// fee_shares = fee * supply / (total_after - fee)
    fn fee_shares(&self, gain: u128, total_after: u128) -> Result<(u128, u128)> {
        let admin_fee = bps_of(gain, self.admin_fee_bps).ok_or(VaultError::Overflow)?;
        let protocol_fee = bps_of(gain, self.protocol_fee_bps).ok_or(VaultError::Overflow)?;
        let fee = admin_fee.checked_add(protocol_fee).ok_or(VaultError::Overflow)?;
        let supply = self.shares.total_supply();

        let remaining = total_after.saturating_sub(fee);
        if fee == 0 || supply == 0 || remaining == 0 {
            return Ok((0, 0));
        }

        let fee_shares = mul_div_down(fee, supply, remaining).ok_or(VaultError::Overflow)?;
        let admin_shares = mul_div_down(fee_shares, admin_fee, fee).ok_or(VaultError::Overflow)?;
        Ok((admin_shares, fee_shares - admin_shares))
    }
}
