//! Discovery of deployed vaults

use adapter_core::{AccountId, AssetId};

/// Every vault a factory deployed, in creation order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataProvider {
    aggregators: Vec<(AccountId, AssetId)>,
}

impl DataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vault; registering the same vault twice keeps one record
    pub fn register(&mut self, vault: AccountId, asset: AssetId) {
        if !self.aggregators.iter().any(|(v, _)| *v == vault) {
            self.aggregators.push((vault, asset));
        }
    }

    pub fn get_aggregators(&self) -> Vec<AccountId> {
        self.aggregators.iter().map(|(v, _)| *v).collect()
    }

    /// Vaults over one asset family
    pub fn get_aggregators_for(&self, asset: AssetId) -> Vec<AccountId> {
        self.aggregators
            .iter()
            .filter(|(_, a)| *a == asset)
            .map(|(v, _)| *v)
            .collect()
    }
}
