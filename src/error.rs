use crate::domain::account::{AccountId, Role};
use crate::domain::status::EscrowStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EscrowError>;

#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("You are not the {0}")]
    Unauthorized(Role),
    #[error("Invalid status")]
    InvalidStatus(EscrowStatus),
    #[error("This escrow does not accept native currency directly")]
    NativeTransferRejected,
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("An escrow is already deployed in this store")]
    AlreadyDeployed,
    #[error("No escrow has been deployed in this store")]
    NotDeployed,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

/// Failures reported by an [`AssetLedger`](crate::domain::ports::AssetLedger).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{account} holds {available} but {needed} is required")]
    InsufficientBalance {
        account: AccountId,
        available: u128,
        needed: u128,
    },
    #[error("{spender} may spend {available} from {owner} but {needed} is required")]
    InsufficientAllowance {
        owner: AccountId,
        spender: AccountId,
        available: u128,
        needed: u128,
    },
    #[error("balance overflow for {0}")]
    Overflow(AccountId),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EscrowError {
    fn from(e: rocksdb::Error) -> Self {
        EscrowError::InternalError(Box::new(e))
    }
}
