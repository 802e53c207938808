//! Adapter Core - Stable interface between a vault and its lender adapters
//!
//! This crate defines the capability surface the allocation engine consumes
//! from a yield source ("lender"): asset accounting, APR quotes, deposit and
//! withdraw entrypoints. The engine depends only on [`LenderAdapter`], never on
//! a concrete adapter type.
//!
//! # Design Principles
//! - Identifiers are plain copyable values (no ambient registry)
//! - Adapters report live assets; the vault keeps its own debt ledger
//! - Instances are cloned cheaply: fresh state, shared immutable logic
//! - Pure helper math with provable rounding direction

use core::fmt;

use ruint::aliases::U256;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

/// Identity of an actor (depositor, admin, treasury, manager, gateway, vault)
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The all-zero identity, used for "unset" roles
    pub const ZERO: Self = Self([0; 32]);

    /// Identity filled with a single byte (handy for fixtures and configs)
    pub const fn from_byte(b: u8) -> Self {
        Self([b; 32])
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..")?;
        for b in &self.0[28..] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Opaque handle of an adapter instance inside a lender arena
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LenderId(pub u64);

impl fmt::Display for LenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lender#{}", self.0)
    }
}

/// Asset identifier (ticker, zero padded, e.g. "USDC\0\0\0\0")
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AssetId(pub [u8; 8]);

impl AssetId {
    /// Unset asset (vault not initialized yet)
    pub const NONE: Self = Self([0; 8]);

    /// Build from a ticker; anything past 8 bytes is dropped
    pub fn from_symbol(symbol: &str) -> Self {
        let mut raw = [0u8; 8];
        for (dst, src) in raw.iter_mut().zip(symbol.as_bytes()) {
            *dst = *src;
        }
        Self(raw)
    }

    /// Ticker without padding
    pub fn symbol(&self) -> &str {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(self.0.len());
        core::str::from_utf8(&self.0[..end]).unwrap_or("?")
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.symbol())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failures raised by an adapter entrypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// Amount is zero
    #[error("zero amount")]
    ZeroAmount,
    /// Deposit above what the underlying market accepts
    #[error("deposit of {requested} exceeds limit {limit}")]
    DepositLimitExceeded { requested: u128, limit: u128 },
    /// Not enough free liquidity in the underlying market
    #[error("requested {requested} but only {available} available")]
    InsufficientLiquidity { requested: u128, available: u128 },
    /// Capability not offered by this adapter
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    /// Arithmetic overflow
    #[error("arithmetic overflow")]
    Overflow,
}

// ============================================================================
// Lender Adapter Interface
// ============================================================================

/// Capability interface of a yield source
///
/// The vault moves capital with [`deposit`](Self::deposit) and
/// [`withdraw`](Self::withdraw) and reconciles its ledger against
/// [`total_assets`](Self::total_assets). APR figures are basis points.
pub trait LenderAdapter: fmt::Debug {
    /// Arena handle of this instance
    fn id(&self) -> LenderId;

    /// Vault this adapter accepts capital from
    fn vault(&self) -> AccountId;

    /// Underlying asset
    fn asset(&self) -> AssetId;

    /// Human readable name
    fn name(&self) -> &str;

    /// Live value of the vault's position, including accrued yield or losses
    fn total_assets(&self) -> u128;

    /// Current supply APR in basis points
    fn apr(&self) -> u64;

    /// Supply APR after the vault's position changes by `delta`
    fn apr_after_debt_change(&self, delta: u128, increase: bool) -> u64;

    /// Largest amount `deposit` currently accepts
    fn max_deposit(&self) -> u128;

    /// Largest amount `withdraw` can currently return
    fn max_withdraw(&self) -> u128;

    /// Take `amount` of the asset from the vault into the yield source
    fn deposit(&mut self, amount: u128) -> Result<(), AdapterError>;

    /// Return up to `amount` to the vault; the result is what was actually sent
    fn withdraw(&mut self, amount: u128) -> Result<u128, AdapterError>;

    /// Let `elapsed_secs` of yield accrue; returns the amount credited to the vault's position
    fn accrue(&mut self, _elapsed_secs: u64) -> Result<u128, AdapterError> {
        Ok(0)
    }

    /// New instance with the same immutable logic but empty position state
    fn clone_fresh(&self, id: LenderId, vault: AccountId, name: &str) -> Box<dyn LenderAdapter>;

    /// Full copy of this instance, state included
    fn clone_box(&self) -> Box<dyn LenderAdapter>;

    /// Borrow side of the underlying market, when the source is a lending market
    fn as_market(&self) -> Option<&dyn BorrowMarket> {
        None
    }

    fn as_market_mut(&mut self) -> Option<&mut dyn BorrowMarket> {
        None
    }
}

impl Clone for Box<dyn LenderAdapter> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Borrow side of a lending market backing an adapter
pub trait BorrowMarket {
    /// Everything supplied to the market, the vault's position included
    fn total_supplied(&self) -> u128;

    /// Outstanding borrows
    fn total_borrowed(&self) -> u128;

    /// Lend `amount` out to a borrower; returns the amount delivered
    fn borrow(&mut self, amount: u128) -> Result<u128, AdapterError>;

    /// Pay back up to `amount`; returns the amount applied
    fn repay(&mut self, amount: u128) -> Result<u128, AdapterError>;

    /// Write off up to `amount` of borrows as bad debt, socialized over suppliers.
    /// Returns the loss taken by the vault's position.
    fn write_off(&mut self, amount: u128) -> Result<u128, AdapterError>;

    /// Borrowed over supplied, in basis points
    fn utilization_bps(&self) -> u64 {
        utilization_bps(self.total_borrowed(), self.total_supplied())
    }
}

// ============================================================================
// Pure Helper Functions
// ============================================================================

/// Basis points scale (10,000 bps = 100%)
pub const BPS_SCALE: u128 = 10_000;

/// Seconds per year used to turn an APR into per-second accrual
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;

/// `a * b / d` over a 256-bit intermediate, with whether the division was inexact.
/// `None` when `d == 0`.
fn wide_div(a: u128, b: u128, d: u128) -> Option<(U256, bool)> {
    if d == 0 {
        return None;
    }
    // u128 * u128 always fits in 256 bits
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(d);
    Some((product / divisor, product % divisor != U256::ZERO))
}

/// `a * b / d`, rounded down. `None` when `d == 0` or the quotient exceeds `u128`.
pub fn mul_div_down(a: u128, b: u128, d: u128) -> Option<u128> {
    let (q, _) = wide_div(a, b, d)?;
    u128::try_from(q).ok()
}

/// `a * b / d`, rounded up. `None` when `d == 0` or the quotient exceeds `u128`.
pub fn mul_div_up(a: u128, b: u128, d: u128) -> Option<u128> {
    let (q, inexact) = wide_div(a, b, d)?;
    let q = if inexact { q + U256::from(1u8) } else { q };
    u128::try_from(q).ok()
}

/// `amount * bps / 10_000`, rounded down
pub fn bps_of(amount: u128, bps: u64) -> Option<u128> {
    mul_div_down(amount, bps as u128, BPS_SCALE)
}

/// Utilization in basis points; an empty market reports 0, an over-borrowed one caps at 100%
pub fn utilization_bps(borrowed: u128, supplied: u128) -> u64 {
    if supplied == 0 {
        return 0;
    }
    let util = mul_div_down(borrowed.min(supplied), BPS_SCALE, supplied).unwrap_or(BPS_SCALE);
    util as u64
}
