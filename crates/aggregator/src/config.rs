//! Construction parameters for a vault and its initial lenders

use adapter_core::{AccountId, LenderId};

/// Everything [`crate::VaultFactory::create`] needs to stand a vault up
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VaultConfig {
    /// Asset ticker (e.g. "USDC")
    pub asset: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Admin share of realized gains (basis points)
    pub admin_fee_bps: u64,
    /// Treasury share of realized gains (basis points)
    pub protocol_fee_bps: u64,
    pub minimum_total_idle: u128,
    pub treasury: AccountId,
    pub admin: AccountId,
}

impl VaultConfig {
    /// Config with zero fees and no idle floor, admin doubling as treasury
    pub fn new(asset: &str, name: &str, symbol: &str, decimals: u8, admin: AccountId) -> Self {
        Self {
            asset: asset.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            admin_fee_bps: 0,
            protocol_fee_bps: 0,
            minimum_total_idle: 0,
            treasury: admin,
            admin,
        }
    }
}

/// Lender to clone from a template and register with the new vault
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LenderSpec {
    /// Instance whose logic the new lender shares
    pub template: LenderId,
    pub name: String,
    /// 0 means no cap
    pub max_debt: u128,
}
