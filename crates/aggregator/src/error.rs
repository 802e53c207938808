use adapter_core::AdapterError;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Caller lacks the required role
    #[error("caller is not authorized")]
    Unauthorized,

    #[error("vault already initialized")]
    AlreadyInitialized,

    #[error("vault not initialized")]
    NotInitialized,

    #[error("amount must be non-zero")]
    ZeroAmount,

    /// Deposit too small to mint a single share
    #[error("operation would mint or burn zero shares")]
    ZeroShares,

    #[error("insufficient shares")]
    InsufficientShares,

    #[error("insufficient allowance")]
    InsufficientAllowance,

    /// Idle balance cannot cover the request
    #[error("insufficient idle liquidity")]
    InsufficientLiquidity,

    /// Max debt or adapter deposit limit breached
    #[error("debt cap exceeded")]
    CapExceeded,

    #[error("lender still carries debt")]
    NonZeroDebt,

    #[error("vault is shut down")]
    Shutdown,

    #[error("lender is not registered in the vault")]
    NotRegisteredInVault,

    #[error("lender is not whitelisted by the debt manager")]
    LenderNotWhitelisted,

    #[error("lender not found")]
    LenderNotFound,

    #[error("lender already added")]
    LenderAlreadyAdded,

    /// Adapter is bound to another vault or asset
    #[error("lender is bound to a different vault or asset")]
    LenderMismatch,

    /// Admin plus protocol fee above 100%
    #[error("invalid fee configuration")]
    InvalidFee,

    #[error("utilization limit must be in (0, 10000] bps, got {0}")]
    InvalidUtilizationLimit(u64),

    #[error("arithmetic overflow")]
    Overflow,

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

pub type Result<T> = core::result::Result<T, VaultError>;
