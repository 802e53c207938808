//! Lender Model - Reference yield sources behind the `LenderAdapter` interface
//!
//! Two variants with deliberately different behavior:
//! - [`MarketLender`]: pooled lending market. Supply APR follows a kinked
//!   utilization curve, withdrawals are bounded by free liquidity, deposits by
//!   an optional supply cap, and bad debt is socialized over suppliers.
//! - [`FixedRateLender`]: constant-APR savings source with unlimited liquidity.
//!
//! Both share their immutable logic between clones: a cloned market keeps the
//! same `Arc<RateModel>` and market parameters but starts with an empty vault
//! position.

pub mod fixed;
pub mod market;
pub mod rate;

pub use fixed::FixedRateLender;
pub use market::MarketLender;
pub use rate::RateModel;

use thiserror::Error;

/// Error types for model construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Optimal utilization outside (0, 10_000] bps
    #[error("optimal utilization must be in (0, 10000] bps, got {0}")]
    InvalidUtilization(u64),
    /// Reserve factor above 100%
    #[error("reserve factor must be <= 10000 bps, got {0}")]
    InvalidReserveFactor(u64),
}
