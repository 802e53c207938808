//! Multi-lender capital allocation vault
//!
//! Depositors contribute a single base asset and receive proportional shares.
//! An allocation manager spreads the pooled capital over pluggable lender
//! adapters, tracks per-lender debt, realizes gains and losses, and a
//! whitelisted gateway can pull capital into one lender on demand.
//!
//! Guarantees:
//! 1. `total_assets == total_idle + Σ current_debt` after every entrypoint
//! 2. `convert_to_assets(convert_to_shares(x)) <= x` (rounding never creates value)
//! 3. Batch reallocation is all-or-nothing
//! 4. Once shut down, no lender's recorded debt can increase
//!
//! Every entrypoint runs to completion or fails without leaving partial state.
//! Components never share ambient state: identities, the lender arena and the
//! vault are passed in explicitly.

#![forbid(unsafe_code)]

#[cfg(kani)]
extern crate kani;

pub mod config;
pub mod data_provider;
pub mod debt_manager;
pub mod error;
pub mod factory;
pub mod gateway;
pub mod lender_pool;
pub mod registry;
pub mod share_ledger;
pub mod vault;

pub use adapter_core::{AccountId, AdapterError, AssetId, BorrowMarket, LenderAdapter, LenderId};
pub use config::{LenderSpec, VaultConfig};
pub use data_provider::DataProvider;
pub use debt_manager::{AllocationPosition, DebtManager};
pub use error::{Result, VaultError};
pub use factory::VaultFactory;
pub use gateway::{BorrowOutcome, LiquidityGateway};
pub use lender_pool::LenderPool;
pub use registry::{LenderEntry, LenderRegistry};
pub use share_ledger::{Rounding, ShareLedger};
pub use vault::{Report, Vault};
