use crate::domain::account::{AccountId, Amount, AssetId};
use crate::domain::event::EscrowEvent;
use crate::domain::ports::{AssetLedgerBox, EscrowStoreBox, EventLogBox};
use crate::domain::status::EscrowStatus;
use crate::domain::transaction::{Transaction, Transition};
use crate::error::{EscrowError, Result};
use tokio::sync::Mutex;

/// Parameters fixed at deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub custody: AccountId,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub arbitrator: AccountId,
    pub price: u128,
}

impl Deployment {
    /// The custody account must be distinct from every participant, otherwise
    /// `pay` and the releases would move funds onto themselves.
    pub fn validate(&self) -> Result<Amount> {
        for (role, account) in [
            ("buyer", &self.buyer),
            ("seller", &self.seller),
            ("arbitrator", &self.arbitrator),
        ] {
            if *account == self.custody {
                return Err(EscrowError::ValidationError(format!(
                    "custody account '{}' cannot also be the {role}",
                    self.custody
                )));
            }
        }
        Amount::new(self.price)
    }
}

/// The escrow between one buyer and one seller, with an arbitrator for disputes.
///
/// Every operation holds the record lock from validation until the event is
/// appended, so operations on one instance are totally ordered: of two
/// conflicting calls, the second always observes the status left by the first.
/// An operation that fails leaves the record, the ledger and the event log as
/// they were. A ledger movement is reversed when persisting the record or
/// appending the event fails afterwards.
pub struct EscrowStateMachine {
    record: Mutex<Transaction>,
    ledger: AssetLedgerBox,
    store: EscrowStoreBox,
    events: EventLogBox,
}

impl EscrowStateMachine {
    /// Creates and persists a new escrow in `Created` status.
    ///
    /// The asset reference is taken from the ledger the escrow settles in.
    pub async fn deploy(
        deployment: Deployment,
        ledger: AssetLedgerBox,
        store: EscrowStoreBox,
        events: EventLogBox,
    ) -> Result<Self> {
        if store.load().await?.is_some() {
            return Err(EscrowError::AlreadyDeployed);
        }
        let price = deployment.validate()?;
        let transaction = Transaction::new(
            deployment.custody,
            deployment.buyer,
            deployment.seller,
            deployment.arbitrator,
            price,
            ledger.id(),
        );
        store.store(transaction.clone()).await?;
        tracing::info!(
            custody = %transaction.custody,
            buyer = %transaction.buyer,
            seller = %transaction.seller,
            arbitrator = %transaction.arbitrator,
            price = %transaction.price,
            asset = %transaction.asset,
            "escrow deployed"
        );
        Ok(Self::from_parts(transaction, ledger, store, events))
    }

    /// Reopens a previously deployed escrow.
    pub async fn open(
        ledger: AssetLedgerBox,
        store: EscrowStoreBox,
        events: EventLogBox,
    ) -> Result<Self> {
        let transaction = store.load().await?.ok_or(EscrowError::NotDeployed)?;
        if transaction.asset != ledger.id() {
            return Err(EscrowError::ConfigError(format!(
                "escrow settles in {} but the ledger is {}",
                transaction.asset,
                ledger.id()
            )));
        }
        tracing::debug!(status = %transaction.status, "escrow reopened");
        Ok(Self::from_parts(transaction, ledger, store, events))
    }

    fn from_parts(
        transaction: Transaction,
        ledger: AssetLedgerBox,
        store: EscrowStoreBox,
        events: EventLogBox,
    ) -> Self {
        Self {
            record: Mutex::new(transaction),
            ledger,
            store,
            events,
        }
    }

    pub async fn snapshot(&self) -> Transaction {
        self.record.lock().await.clone()
    }

    pub async fn custody(&self) -> AccountId {
        self.record.lock().await.custody.clone()
    }

    pub async fn buyer(&self) -> AccountId {
        self.record.lock().await.buyer.clone()
    }

    pub async fn seller(&self) -> AccountId {
        self.record.lock().await.seller.clone()
    }

    pub async fn arbitrator(&self) -> AccountId {
        self.record.lock().await.arbitrator.clone()
    }

    pub async fn price(&self) -> u128 {
        self.record.lock().await.price.value()
    }

    pub async fn asset(&self) -> AssetId {
        self.record.lock().await.asset.clone()
    }

    pub async fn status(&self) -> EscrowStatus {
        self.record.lock().await.status
    }

    /// Pulls the price from the buyer into custody. Requires a prior ledger
    /// allowance of at least the price for the custody account.
    pub async fn pay(&self, caller: &AccountId) -> Result<EscrowEvent> {
        self.apply(caller, Transition::Pay).await
    }

    pub async fn deliver(&self, caller: &AccountId) -> Result<EscrowEvent> {
        self.apply(caller, Transition::Deliver).await
    }

    /// Releases the held price to the seller.
    pub async fn complete(&self, caller: &AccountId) -> Result<EscrowEvent> {
        self.apply(caller, Transition::Complete).await
    }

    pub async fn dispute(&self, caller: &AccountId) -> Result<EscrowEvent> {
        self.apply(caller, Transition::Dispute).await
    }

    /// Settles a dispute. With `release` the seller is paid and the escrow is
    /// `Resolved`; without it the funds stay held and the escrow returns to `Paid`.
    pub async fn resolve_dispute(&self, caller: &AccountId, release: bool) -> Result<EscrowEvent> {
        self.apply(caller, Transition::Resolve { release }).await
    }

    /// Direct native-currency transfers are always refused.
    pub fn receive_native(&self, from: &AccountId, value: u128) -> Result<()> {
        tracing::warn!(%from, value, "rejected direct native transfer");
        Err(EscrowError::NativeTransferRejected)
    }

    pub async fn apply(&self, caller: &AccountId, transition: Transition) -> Result<EscrowEvent> {
        let mut record = self.record.lock().await;
        let next = record.check(caller, transition).inspect_err(|e| {
            tracing::debug!(%caller, ?transition, status = %record.status, "rejected: {e}");
        })?;

        let price = record.price.value();
        let allowance = self.move_funds(&record, transition).await?;

        let mut updated = record.clone();
        updated.status = next;
        if let Err(e) = self.store.store(updated.clone()).await {
            self.undo_funds(&record, transition, allowance).await;
            return Err(e);
        }

        let event = match transition {
            Transition::Pay => EscrowEvent::Payment {
                buyer: caller.clone(),
                amount: price,
            },
            Transition::Deliver => EscrowEvent::Delivered {
                buyer: caller.clone(),
            },
            Transition::Complete => EscrowEvent::Completed {
                buyer: caller.clone(),
            },
            Transition::Dispute => EscrowEvent::Dispute {
                buyer: caller.clone(),
            },
            Transition::Resolve { .. } => EscrowEvent::Resolved {
                arbitrator: caller.clone(),
                status: next,
            },
        };
        if let Err(e) = self.events.append(event.clone()).await {
            if let Err(restore) = self.store.store(record.clone()).await {
                tracing::error!(status = %record.status, "failed to restore escrow record: {restore}");
            }
            self.undo_funds(&record, transition, allowance).await;
            return Err(e);
        }

        let previous = std::mem::replace(&mut *record, updated).status;
        tracing::info!(%caller, from = %previous, to = %next, "escrow transition");
        Ok(event)
    }

    /// Performs the ledger side of `transition`. For `Pay` returns the
    /// allowance held before the pull so it can be reinstated.
    async fn move_funds(&self, record: &Transaction, transition: Transition) -> Result<Option<u128>> {
        let price = record.price.value();
        match transition {
            Transition::Pay => {
                let allowance = self.ledger.allowance(&record.buyer, &record.custody).await?;
                self.ledger
                    .transfer_from(&record.custody, &record.buyer, &record.custody, price)
                    .await?;
                Ok(Some(allowance))
            }
            Transition::Complete | Transition::Resolve { release: true } => {
                self.ledger
                    .transfer(&record.custody, &record.seller, price)
                    .await?;
                Ok(None)
            }
            Transition::Deliver | Transition::Dispute | Transition::Resolve { release: false } => {
                Ok(None)
            }
        }
    }

    /// Reverses a completed `move_funds` after a later step failed.
    async fn undo_funds(&self, record: &Transaction, transition: Transition, allowance: Option<u128>) {
        let price = record.price.value();
        let undone = match transition {
            Transition::Pay => {
                let refund = self
                    .ledger
                    .transfer(&record.custody, &record.buyer, price)
                    .await;
                match (refund, allowance) {
                    (Ok(()), Some(allowance)) => {
                        self.ledger
                            .approve(&record.buyer, &record.custody, allowance)
                            .await
                    }
                    (result, _) => result,
                }
            }
            Transition::Complete | Transition::Resolve { release: true } => {
                self.ledger
                    .transfer(&record.seller, &record.custody, price)
                    .await
            }
            Transition::Deliver | Transition::Dispute | Transition::Resolve { release: false } => {
                Ok(())
            }
        };
        if let Err(e) = undone {
            tracing::error!(?transition, price, "failed to reverse ledger movement: {e}");
        }
    }

    pub async fn events(&self) -> Result<Vec<EscrowEvent>> {
        self.events.events().await
    }
}
