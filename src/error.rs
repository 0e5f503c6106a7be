//! Ledger Error Types
//!
//! One taxonomy for every caller-facing operation. Each variant carries a
//! stable string code and a process exit code for the batch runner.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::core_types::AccountId;

/// Ledger error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Validation Errors (no lock ever taken) ===
    #[error(
        "Invalid transfer amount. Amount to be transfered must be greater than zero. amount={0}"
    )]
    InvalidAmount(Decimal),

    #[error("Source and target account cannot be the same: {0}")]
    SameAccount(AccountId),

    #[error("Account id must not be empty")]
    InvalidAccountId,

    #[error("Initial balance must be positive. balance={0}")]
    NegativeBalance(Decimal),

    // === Account Errors ===
    #[error("Account id {0} not found")]
    AccountNotFound(AccountId),

    #[error("Account id {0} already exists!")]
    DuplicateAccountId(AccountId),

    // === Detected under lock, nothing mutated ===
    #[error(
        "Insufficient balance in account for transfer. amountTransfer={requested} account={account} available={available}"
    )]
    InsufficientFunds {
        account: AccountId,
        requested: Decimal,
        available: Decimal,
    },

    // === System Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Stable error code for logs and machine-readable output
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::SameAccount(_) => "SAME_ACCOUNT",
            LedgerError::InvalidAccountId => "INVALID_ACCOUNT_ID",
            LedgerError::NegativeBalance(_) => "NEGATIVE_BALANCE",
            LedgerError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            LedgerError::DuplicateAccountId(_) => "DUPLICATE_ACCOUNT_ID",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Process exit code suggestion
    pub fn exit_code(&self) -> u8 {
        match self {
            LedgerError::InvalidAmount(_)
            | LedgerError::SameAccount(_)
            | LedgerError::InvalidAccountId
            | LedgerError::NegativeBalance(_) => 2,
            LedgerError::AccountNotFound(_) => 3,
            LedgerError::DuplicateAccountId(_) => 4,
            LedgerError::InsufficientFunds { .. } => 5,
            LedgerError::Internal(_) => 70,
        }
    }

    /// True for errors raised before any account lock is taken
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            LedgerError::InsufficientFunds { .. } | LedgerError::Internal(_)
        )
    }
}

/// Ledger result type
pub type Result<T> = std::result::Result<T, LedgerError>;
