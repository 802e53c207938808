//! Ordered lender registry of a vault
//!
//! Insertion order is preserved across removals: later entries shift down by
//! one instead of being swapped into the hole, so "first" and "last" lender
//! keep their meaning for callers iterating by index.

use std::collections::BTreeMap;

use adapter_core::LenderId;

use crate::error::{Result, VaultError};

/// Debt bookkeeping for one registered lender
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LenderEntry {
    /// Adapter handle in the lender arena
    pub lender: LenderId,
    /// Debt ceiling; 0 means no cap configured
    pub max_debt: u128,
    /// Capital deployed to the lender as recorded by the vault
    pub current_debt: u128,
}

impl LenderEntry {
    /// Room left under the cap (unbounded when no cap is configured)
    pub fn headroom(&self) -> u128 {
        if self.max_debt == 0 {
            u128::MAX
        } else {
            self.max_debt.saturating_sub(self.current_debt)
        }
    }

    /// Whether `debt` would breach a configured cap
    pub fn exceeds_cap(&self, debt: u128) -> bool {
        self.max_debt != 0 && debt > self.max_debt
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LenderRegistry {
    entries: Vec<LenderEntry>,
    index: BTreeMap<LenderId, usize>,
}

impl LenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, lender: &LenderId) -> bool {
        self.index.contains_key(lender)
    }

    pub fn get(&self, lender: &LenderId) -> Option<&LenderEntry> {
        self.index.get(lender).and_then(|i| self.entries.get(*i))
    }

    pub fn get_mut(&mut self, lender: &LenderId) -> Option<&mut LenderEntry> {
        match self.index.get(lender) {
            Some(i) => self.entries.get_mut(*i),
            None => None,
        }
    }

    /// Entry at registry position `position`
    pub fn at(&self, position: usize) -> Option<&LenderEntry> {
        self.entries.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LenderEntry> {
        self.entries.iter()
    }

    /// Lender handles in registry order
    pub fn lenders(&self) -> Vec<LenderId> {
        self.entries.iter().map(|e| e.lender).collect()
    }

    /// Sum of recorded debt across all entries
    pub fn total_debt(&self) -> u128 {
        self.entries
            .iter()
            .fold(0u128, |acc, e| acc.saturating_add(e.current_debt))
    }

    /// Append a lender with zero debt
    pub fn add(&mut self, lender: LenderId, max_debt: u128) -> Result<()> {
        if self.contains(&lender) {
            return Err(VaultError::LenderAlreadyAdded);
        }
        self.index.insert(lender, self.entries.len());
        self.entries.push(LenderEntry {
            lender,
            max_debt,
            current_debt: 0,
        });
        Ok(())
    }

    /// Remove a lender, shifting later entries down by one
    pub fn remove(&mut self, lender: &LenderId) -> Result<LenderEntry> {
        let position = self.index.remove(lender).ok_or(VaultError::LenderNotFound)?;
        let entry = self.entries.remove(position);
        for (i, e) in self.entries.iter().enumerate().skip(position) {
            self.index.insert(e.lender, i);
        }
        Ok(entry)
    }
}
