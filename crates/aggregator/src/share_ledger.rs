//! Share Ledger
//!
//! Fixed-point conversion between asset units and share units, plus the share
//! token bookkeeping (balances, supply, allowances).
//!
//! Conversions carry a virtual offset of one share and one asset so an empty
//! vault converts 1:1 and a donation cannot inflate the price of the first
//! share to zero.
//!
//! # Properties
//! - **S1**: `to_assets(to_shares(x, Down), Down) <= x`
//! - **S2**: `to_shares(x, Up) >= to_shares(x, Down)`
//! - **S3**: mint/burn change `total_supply` by exactly the amount moved
//! - **S4**: `total_supply == Σ balances`

use std::collections::BTreeMap;

use adapter_core::{mul_div_down, mul_div_up, AccountId};

use crate::error::{Result, VaultError};

/// Virtual shares added to supply in every conversion
pub const VIRTUAL_SHARES: u128 = 1;

/// Virtual assets added to total assets in every conversion
pub const VIRTUAL_ASSETS: u128 = 1;

/// Rounding direction of a conversion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

/// Shares worth `assets` at the given supply and total assets
///
/// # Formula
/// shares = assets * (supply + 1) / (total_assets + 1)
pub fn assets_to_shares(assets: u128, supply: u128, total_assets: u128, rounding: Rounding) -> Result<u128> {
    let num = supply.checked_add(VIRTUAL_SHARES).ok_or(VaultError::Overflow)?;
    let den = total_assets.checked_add(VIRTUAL_ASSETS).ok_or(VaultError::Overflow)?;
    let shares = match rounding {
        Rounding::Down => mul_div_down(assets, num, den),
        Rounding::Up => mul_div_up(assets, num, den),
    };
    shares.ok_or(VaultError::Overflow)
}

/// Assets claimed by `shares` at the given supply and total assets
///
/// # Formula
/// assets = shares * (total_assets + 1) / (supply + 1)
pub fn shares_to_assets(shares: u128, supply: u128, total_assets: u128, rounding: Rounding) -> Result<u128> {
    let num = total_assets.checked_add(VIRTUAL_ASSETS).ok_or(VaultError::Overflow)?;
    let den = supply.checked_add(VIRTUAL_SHARES).ok_or(VaultError::Overflow)?;
    let assets = match rounding {
        Rounding::Down => mul_div_down(shares, num, den),
        Rounding::Up => mul_div_up(shares, num, den),
    };
    assets.ok_or(VaultError::Overflow)
}

/// Share token state of one vault
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShareLedger {
    total_supply: u128,
    balances: BTreeMap<AccountId, u128>,
    allowances: BTreeMap<(AccountId, AccountId), u128>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, owner: &AccountId) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    /// Holders with a non-zero balance, ordered by identity
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &u128)> {
        self.balances.iter()
    }

    pub fn convert_to_shares(&self, assets: u128, total_assets: u128, rounding: Rounding) -> Result<u128> {
        assets_to_shares(assets, self.total_supply, total_assets, rounding)
    }

    pub fn convert_to_assets(&self, shares: u128, total_assets: u128, rounding: Rounding) -> Result<u128> {
        shares_to_assets(shares, self.total_supply, total_assets, rounding)
    }

    /// Credit `shares` to `to`
    ///
    /// # Properties
    /// - **S3**: total_supply' = total_supply + shares
    pub fn mint(&mut self, to: AccountId, shares: u128) -> Result<()> {
        let supply = self.total_supply.checked_add(shares).ok_or(VaultError::Overflow)?;
        let balance = self.balance_of(&to).checked_add(shares).ok_or(VaultError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    /// Debit `shares` from `from`
    ///
    /// # Properties
    /// - **S3**: total_supply' = total_supply - shares
    /// - Fails with `InsufficientShares` without touching state
    pub fn burn(&mut self, from: AccountId, shares: u128) -> Result<()> {
        let balance = self.balance_of(&from);
        let remaining = balance.checked_sub(shares).ok_or(VaultError::InsufficientShares)?;
        // supply >= any balance, so this cannot underflow
        self.total_supply = self.total_supply.saturating_sub(shares);
        self.set_balance(from, remaining);
        Ok(())
    }

    pub fn transfer(&mut self, from: AccountId, to: AccountId, shares: u128) -> Result<()> {
        let from_balance = self.balance_of(&from);
        let from_after = from_balance.checked_sub(shares).ok_or(VaultError::InsufficientShares)?;
        if from == to {
            return Ok(());
        }
        let to_after = self.balance_of(&to).checked_add(shares).ok_or(VaultError::Overflow)?;
        self.set_balance(from, from_after);
        self.set_balance(to, to_after);
        Ok(())
    }

    pub fn approve(&mut self, owner: AccountId, spender: AccountId, shares: u128) {
        if shares == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), shares);
        }
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Consume allowance for a spender acting on behalf of `owner`.
    /// The owner itself needs none; `u128::MAX` never decreases.
    pub fn spend_allowance(&mut self, owner: AccountId, spender: AccountId, shares: u128) -> Result<()> {
        if owner == spender {
            return Ok(());
        }
        let current = self.allowance(&owner, &spender);
        if current == u128::MAX {
            return Ok(());
        }
        let remaining = current.checked_sub(shares).ok_or(VaultError::InsufficientAllowance)?;
        self.approve(owner, spender, remaining);
        Ok(())
    }

    fn set_balance(&mut self, owner: AccountId, balance: u128) {
        if balance == 0 {
            self.balances.remove(&owner);
        } else {
            self.balances.insert(owner, balance);
        }
    }
}


#[cfg(kani)]
mod proofs {
    use super::*;

    /// **Proof S1: round trip through shares never creates assets**
    #[kani::proof]
    fn proof_s1_round_trip_no_value_creation() {
        let assets: u128 = kani::any();
        let supply: u128 = kani::any();
        let total: u128 = kani::any();
        kani::assume(assets <= 1_000_000_000);
        kani::assume(supply <= 1_000_000_000);
        kani::assume(total <= 1_000_000_000);

        let shares = assets_to_shares(assets, supply, total, Rounding::Down).unwrap();
        let back = shares_to_assets(shares, supply, total, Rounding::Down).unwrap();
        assert!(back <= assets);
    }

    /// **Proof S2: rounding up never yields fewer shares than rounding down**
    #[kani::proof]
    fn proof_s2_rounding_order() {
        let assets: u128 = kani::any();
        let supply: u128 = kani::any();
        let total: u128 = kani::any();
        kani::assume(assets <= 1_000_000_000);
        kani::assume(supply <= 1_000_000_000);
        kani::assume(total <= 1_000_000_000);

        let down = assets_to_shares(assets, supply, total, Rounding::Down).unwrap();
        let up = assets_to_shares(assets, supply, total, Rounding::Up).unwrap();
        assert!(up >= down);
        assert!(up - down <= 1);
    }

    /// **Proof S3: burn fails or reduces supply by exactly the amount**
    #[kani::proof]
    fn proof_s3_burn_exact() {
        let minted: u128 = kani::any();
        let burned: u128 = kani::any();
        kani::assume(minted <= 1_000_000);
        kani::assume(burned <= 1_000_000);

        let owner = AccountId::from_byte(7);
        let mut ledger = ShareLedger::new();
        ledger.mint(owner, minted).unwrap();

        match ledger.burn(owner, burned) {
            Ok(()) => assert!(ledger.total_supply() == minted - burned),
            Err(_) => {
                assert!(burned > minted);
                assert!(ledger.total_supply() == minted);
            }
        }
    }
}
