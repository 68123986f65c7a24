use super::account::{AccountId, AssetId};
use super::event::EscrowEvent;
use super::transaction::Transaction;
use crate::error::Result;
use async_trait::async_trait;

/// A fungible-asset ledger with allowance-gated transfers.
///
/// Every method takes the acting identity explicitly. A failed call must leave
/// balances and allowances untouched.
#[async_trait]
pub trait AssetLedger: Send + Sync {
    fn id(&self) -> AssetId;
    async fn balance_of(&self, account: &AccountId) -> Result<u128>;
    async fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<u128>;
    async fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u128) -> Result<()>;
    async fn transfer(&self, from: &AccountId, to: &AccountId, amount: u128) -> Result<()>;
    async fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()>;
}

#[async_trait]
pub trait EscrowStore: Send + Sync {
    async fn load(&self) -> Result<Option<Transaction>>;
    async fn store(&self, transaction: Transaction) -> Result<()>;
}

/// Append-only record of emitted events.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: EscrowEvent) -> Result<()>;
    async fn events(&self) -> Result<Vec<EscrowEvent>>;
}

pub type AssetLedgerBox = Box<dyn AssetLedger>;
pub type EscrowStoreBox = Box<dyn EscrowStore>;
pub type EventLogBox = Box<dyn EventLog>;
