use crate::domain::account::{AccountId, AssetId};
use crate::domain::event::EscrowEvent;
use crate::domain::ports::{AssetLedger, EscrowStore, EventLog};
use crate::domain::transaction::Transaction;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Default)]
struct LedgerState {
    balances: HashMap<AccountId, u128>,
    allowances: HashMap<(AccountId, AccountId), u128>,
}

impl LedgerState {
    fn balance(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Moves `amount` after validating both sides, so a failure changes nothing.
    fn move_balance(&mut self, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        let available = self.balance(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from.clone(),
                available,
                needed: amount,
            }
            .into());
        }
        if from != to {
            self.balance(to)
                .checked_add(amount)
                .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
        }
        *self.balances.entry(from.clone()).or_default() -= amount;
        *self.balances.entry(to.clone()).or_default() += amount;
        Ok(())
    }
}

/// A thread-safe in-memory fungible-asset ledger.
///
/// Stands in for a real token ledger in tests and in-memory runs. Clones share state.
#[derive(Clone)]
pub struct InMemoryAssetLedger {
    id: AssetId,
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryAssetLedger {
    pub fn new(id: AssetId) -> Self {
        Self {
            id,
            state: Arc::new(RwLock::new(LedgerState::default())),
        }
    }

    /// Credits `amount` to `to` out of thin air.
    pub async fn mint(&self, to: &AccountId, amount: u128) -> Result<()> {
        let mut state = self.state.write().await;
        let balance = state.balances.entry(to.clone()).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
        Ok(())
    }
}

#[async_trait]
impl AssetLedger for InMemoryAssetLedger {
    fn id(&self) -> AssetId {
        self.id.clone()
    }

    async fn balance_of(&self, account: &AccountId) -> Result<u128> {
        Ok(self.state.read().await.balance(account))
    }

    async fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<u128> {
        Ok(self.state.read().await.allowance(owner, spender))
    }

    async fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u128) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .allowances
            .insert((owner.clone(), spender.clone()), amount);
        Ok(())
    }

    async fn transfer(&self, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        self.state.write().await.move_balance(from, to, amount)
    }

    async fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let allowed = state.allowance(from, spender);
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: from.clone(),
                spender: spender.clone(),
                available: allowed,
                needed: amount,
            }
            .into());
        }
        state.move_balance(from, to, amount)?;
        state
            .allowances
            .insert((from.clone(), spender.clone()), allowed - amount);
        Ok(())
    }
}

/// In-memory holder for the singleton escrow record.
#[derive(Default, Clone)]
pub struct InMemoryEscrowStore {
    transaction: Arc<RwLock<Option<Transaction>>>,
}

impl InMemoryEscrowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EscrowStore for InMemoryEscrowStore {
    async fn load(&self) -> Result<Option<Transaction>> {
        Ok(self.transaction.read().await.clone())
    }

    async fn store(&self, transaction: Transaction) -> Result<()> {
        *self.transaction.write().await = Some(transaction);
        Ok(())
    }
}

/// Append-only in-memory event log that also fans events out to subscribers.
#[derive(Clone)]
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<EscrowEvent>>>,
    sender: broadcast::Sender<EscrowEvent>,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            sender,
        }
    }

    /// Receives every event appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EscrowEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: EscrowEvent) -> Result<()> {
        self.events.write().await.push(event.clone());
        // No subscribers is not an error.
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn events(&self) -> Result<Vec<EscrowEvent>> {
        Ok(self.events.read().await.clone())
    }
}
