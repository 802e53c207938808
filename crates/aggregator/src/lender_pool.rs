//! Arena of lender adapter instances
//!
//! Instances are addressed by an opaque [`LenderId`]. Cloning a lender asks the
//! template for a fresh instance that shares its immutable logic but starts
//! with an empty position bound to the target vault.

use std::collections::BTreeMap;

use adapter_core::{AccountId, LenderAdapter, LenderId};
use log::info;

use crate::error::{Result, VaultError};

#[derive(Clone, Debug, Default)]
pub struct LenderPool {
    next_id: u64,
    lenders: BTreeMap<LenderId, Box<dyn LenderAdapter>>,
}

impl LenderPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an adapter built for the freshly allocated id
    pub fn insert<F>(&mut self, build: F) -> LenderId
    where
        F: FnOnce(LenderId) -> Box<dyn LenderAdapter>,
    {
        let id = LenderId(self.next_id);
        self.next_id += 1;
        let adapter = build(id);
        info!("lender pool: inserted {} ({})", id, adapter.name());
        self.lenders.insert(id, adapter);
        id
    }

    /// Fresh instance of `template`'s logic, bound to `vault`
    pub fn clone_lender(&mut self, template: LenderId, vault: AccountId, name: &str) -> Result<LenderId> {
        let id = LenderId(self.next_id);
        let adapter = self.get(template)?.clone_fresh(id, vault, name);
        self.next_id += 1;
        info!("lender pool: cloned {} from {} for vault {}", id, template, vault);
        self.lenders.insert(id, adapter);
        Ok(id)
    }

    pub fn get(&self, id: LenderId) -> Result<&dyn LenderAdapter> {
        self.lenders
            .get(&id)
            .map(|b| b.as_ref())
            .ok_or(VaultError::LenderNotFound)
    }

    pub fn get_mut(&mut self, id: LenderId) -> Result<&mut (dyn LenderAdapter + 'static)> {
        self.lenders
            .get_mut(&id)
            .map(|b| b.as_mut())
            .ok_or(VaultError::LenderNotFound)
    }

    pub fn contains(&self, id: LenderId) -> bool {
        self.lenders.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<LenderId> {
        self.lenders.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lenders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lenders.is_empty()
    }
}
