//! Kinked utilization rate curve

use adapter_core::{utilization_bps, BPS_SCALE};

use crate::ModelError;

/// Borrow rate as a function of utilization, two linear legs joined at the
/// optimal utilization.
///
/// # Formula
/// - util <= optimal: `base + slope1 * util / optimal`
/// - util >  optimal: `base + slope1 + slope2 * (util - optimal) / (1 - optimal)`
///
/// Suppliers earn `borrow_rate * util * (1 - reserve_factor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateModel {
    pub base_rate_bps: u64,
    pub slope1_bps: u64,
    pub slope2_bps: u64,
    pub optimal_utilization_bps: u64,
    /// Share of interest kept by the market instead of paid to suppliers
    pub reserve_factor_bps: u64,
}

impl Default for RateModel {
    fn default() -> Self {
        Self {
            base_rate_bps: 0,
            slope1_bps: 400,
            slope2_bps: 7_500,
            optimal_utilization_bps: 8_000,
            reserve_factor_bps: 0,
        }
    }
}

impl RateModel {
    pub fn new(
        base_rate_bps: u64,
        slope1_bps: u64,
        slope2_bps: u64,
        optimal_utilization_bps: u64,
        reserve_factor_bps: u64,
    ) -> Result<Self, ModelError> {
        if optimal_utilization_bps == 0 || optimal_utilization_bps as u128 > BPS_SCALE {
            return Err(ModelError::InvalidUtilization(optimal_utilization_bps));
        }
        if reserve_factor_bps as u128 > BPS_SCALE {
            return Err(ModelError::InvalidReserveFactor(reserve_factor_bps));
        }
        Ok(Self {
            base_rate_bps,
            slope1_bps,
            slope2_bps,
            optimal_utilization_bps,
            reserve_factor_bps,
        })
    }

    /// Borrow APR (bps) at `util_bps`
    pub fn borrow_rate_bps(&self, util_bps: u64) -> u64 {
        let util = (util_bps as u128).min(BPS_SCALE);
        let optimal = self.optimal_utilization_bps as u128;
        let base = self.base_rate_bps as u128;
        let slope1 = self.slope1_bps as u128;
        let slope2 = self.slope2_bps as u128;

        let rate = if util <= optimal {
            base + slope1 * util / optimal
        } else {
            let excess_range = BPS_SCALE - optimal;
            // optimal == 100% leaves no second leg
            let steep = if excess_range == 0 {
                0
            } else {
                slope2 * (util - optimal) / excess_range
            };
            base + slope1 + steep
        };
        rate.min(u64::MAX as u128) as u64
    }

    /// Supply APR (bps) for a market with `borrowed` out of `supplied`
    pub fn supply_rate_bps(&self, borrowed: u128, supplied: u128) -> u64 {
        let util = utilization_bps(borrowed, supplied);
        let gross = self.borrow_rate_bps(util) as u128 * util as u128 / BPS_SCALE;
        let net = gross * (BPS_SCALE - self.reserve_factor_bps as u128) / BPS_SCALE;
        net as u64
    }
}
