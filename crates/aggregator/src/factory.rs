//! Vault factory: one call creates, configures and initializes a vault,
//! clones its lenders from templates, and lists it with the data provider.

use adapter_core::{AccountId, AssetId};
use log::info;

use crate::config::{LenderSpec, VaultConfig};
use crate::data_provider::DataProvider;
use crate::error::Result;
use crate::lender_pool::LenderPool;
use crate::vault::Vault;

#[derive(Clone, Debug)]
pub struct VaultFactory {
    pub id: AccountId,
    deployed: u64,
}

impl VaultFactory {
    pub fn new(id: AccountId) -> Self {
        Self { id, deployed: 0 }
    }

    pub fn deployed(&self) -> u64 {
        self.deployed
    }

    /// Identity the next created vault will get: the factory id with the
    /// deployment counter in its last 8 bytes
    pub fn next_vault_id(&self) -> AccountId {
        let mut raw = self.id.0;
        raw[24..].copy_from_slice(&(self.deployed + 1).to_be_bytes());
        AccountId(raw)
    }

    /// Stand up a vault per `config` with one cloned lender per `lenders` entry.
    ///
    /// The factory administers the vault while wiring it and hands admin over
    /// to `config.admin` last. Nothing is inserted into `pool` or `provider`
    /// unless every step succeeds.
    pub fn create(
        &mut self,
        config: &VaultConfig,
        lenders: &[LenderSpec],
        pool: &mut LenderPool,
        provider: &mut DataProvider,
    ) -> Result<Vault> {
        let id = self.next_vault_id();
        let asset = AssetId::from_symbol(&config.asset);

        let mut vault = Vault::new(id, self.id, config.treasury);
        vault.init(self.id, asset, &config.name, &config.symbol, config.decimals)?;
        vault.set_treasury(self.id, config.treasury, config.protocol_fee_bps)?;
        vault.set_minimum_total_idle(self.id, config.minimum_total_idle)?;

        let mut staged_pool = pool.clone();
        for spec in lenders {
            let lender = staged_pool.clone_lender(spec.template, id, &spec.name)?;
            vault.add_lender(self.id, &staged_pool, lender, spec.max_debt)?;
        }
        vault.set_admin(self.id, config.admin, config.admin_fee_bps)?;

        *pool = staged_pool;
        self.deployed += 1;
        provider.register(id, asset);

        info!(
            "factory {}: created vault {} ({}) with {} lenders",
            self.id,
            id,
            config.symbol,
            lenders.len()
        );
        Ok(vault)
    }
}
