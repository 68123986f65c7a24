use crate::domain::account::{AccountId, AssetId};
use crate::domain::event::EscrowEvent;
use crate::domain::ports::{AssetLedger, EscrowStore, EventLog};
use crate::domain::transaction::Transaction;
use crate::error::{EscrowError, LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding the escrow record.
pub const CF_ESCROW: &str = "escrow";
/// Column Family holding the event log, keyed by big-endian sequence number.
pub const CF_EVENTS: &str = "events";
/// Column Family holding ledger balances.
pub const CF_BALANCES: &str = "balances";
/// Column Family holding ledger allowances, keyed by `owner \0 spender`.
pub const CF_ALLOWANCES: &str = "allowances";

const ESCROW_KEY: &[u8] = b"transaction";

/// A persistent backend using RocksDB.
///
/// Implements all three ports over one database so an escrow, its event log
/// and its ledger survive restarts together. Ledger mutations are committed as
/// a single `WriteBatch`.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    asset: AssetId,
    // Serializes read-modify-write sequences.
    write_lock: Arc<Mutex<()>>,
}

fn internal(message: String) -> EscrowError {
    EscrowError::InternalError(Box::new(std::io::Error::other(message)))
}

fn decode_amount(bytes: &[u8]) -> Result<u128> {
    let raw: [u8; 16] = bytes
        .try_into()
        .map_err(|_| internal(format!("Corrupt amount of {} bytes", bytes.len())))?;
    Ok(u128::from_be_bytes(raw))
}

fn allowance_key(owner: &AccountId, spender: &AccountId) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.as_str().len() + spender.as_str().len() + 1);
    key.extend_from_slice(owner.as_str().as_bytes());
    key.push(0);
    key.extend_from_slice(spender.as_str().as_bytes());
    key
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path` whose ledger is `asset`.
    pub fn open<P: AsRef<Path>>(path: P, asset: AssetId) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_ESCROW, CF_EVENTS, CF_BALANCES, CF_ALLOWANCES]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            asset,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| internal(format!("Column family '{name}' not found")))
    }

    fn read_amount(&self, cf: &str, key: &[u8]) -> Result<u128> {
        match self.db.get_cf(self.cf(cf)?, key)? {
            Some(bytes) => decode_amount(&bytes),
            None => Ok(0),
        }
    }

    fn balance(&self, account: &AccountId) -> Result<u128> {
        self.read_amount(CF_BALANCES, account.as_str().as_bytes())
    }

    /// Stages a balance move into `batch` after validating both sides.
    fn stage_move(
        &self,
        batch: &mut WriteBatch,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()> {
        let available = self.balance(from)?;
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                account: from.clone(),
                available,
                needed: amount,
            }
            .into());
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)?
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
        let cf = self.cf(CF_BALANCES)?;
        batch.put_cf(cf, from.as_str().as_bytes(), (available - amount).to_be_bytes());
        batch.put_cf(cf, to.as_str().as_bytes(), credited.to_be_bytes());
        Ok(())
    }

    /// Credits `amount` to `to` out of thin air.
    pub async fn mint(&self, to: &AccountId, amount: u128) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let balance = self
            .balance(to)?
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;
        self.db.put_cf(
            self.cf(CF_BALANCES)?,
            to.as_str().as_bytes(),
            balance.to_be_bytes(),
        )?;
        Ok(())
    }
}

#[async_trait]
impl EscrowStore for RocksDBStore {
    async fn load(&self) -> Result<Option<Transaction>> {
        match self.db.get_cf(self.cf(CF_ESCROW)?, ESCROW_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| internal(format!("Deserialization error: {e}"))),
            None => Ok(None),
        }
    }

    async fn store(&self, transaction: Transaction) -> Result<()> {
        let value = serde_json::to_vec(&transaction)
            .map_err(|e| internal(format!("Serialization error: {e}")))?;
        self.db.put_cf(self.cf(CF_ESCROW)?, ESCROW_KEY, value)?;
        Ok(())
    }
}

#[async_trait]
impl EventLog for RocksDBStore {
    async fn append(&self, event: EscrowEvent) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_EVENTS)?;
        let next = match self.db.iterator_cf(cf, IteratorMode::End).next() {
            Some(item) => {
                let (key, _) = item?;
                let raw: [u8; 8] = key
                    .as_ref()
                    .try_into()
                    .map_err(|_| internal("Corrupt event key".to_string()))?;
                u64::from_be_bytes(raw) + 1
            }
            None => 0,
        };
        let value = serde_json::to_vec(&event)
            .map_err(|e| internal(format!("Serialization error: {e}")))?;
        self.db.put_cf(cf, next.to_be_bytes(), value)?;
        Ok(())
    }

    async fn events(&self) -> Result<Vec<EscrowEvent>> {
        let mut events = Vec::new();
        for item in self.db.iterator_cf(self.cf(CF_EVENTS)?, IteratorMode::Start) {
            let (_key, value) = item?;
            let event = serde_json::from_slice(&value)
                .map_err(|e| internal(format!("Failed to deserialize event: {e}")))?;
            events.push(event);
        }
        Ok(events)
    }
}

#[async_trait]
impl AssetLedger for RocksDBStore {
    fn id(&self) -> AssetId {
        self.asset.clone()
    }

    async fn balance_of(&self, account: &AccountId) -> Result<u128> {
        self.balance(account)
    }

    async fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Result<u128> {
        self.read_amount(CF_ALLOWANCES, &allowance_key(owner, spender))
    }

    async fn approve(&self, owner: &AccountId, spender: &AccountId, amount: u128) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.db.put_cf(
            self.cf(CF_ALLOWANCES)?,
            allowance_key(owner, spender),
            amount.to_be_bytes(),
        )?;
        Ok(())
    }

    async fn transfer(&self, from: &AccountId, to: &AccountId, amount: u128) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        self.stage_move(&mut batch, from, to, amount)?;
        self.db.write(batch)?;
        Ok(())
    }

    async fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: u128,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = allowance_key(from, spender);
        let allowed = self.read_amount(CF_ALLOWANCES, &key)?;
        if allowed < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: from.clone(),
                spender: spender.clone(),
                available: allowed,
                needed: amount,
            }
            .into());
        }
        let mut batch = WriteBatch::default();
        self.stage_move(&mut batch, from, to, amount)?;
        batch.put_cf(self.cf(CF_ALLOWANCES)?, key, (allowed - amount).to_be_bytes());
        self.db.write(batch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Amount;
    use crate::domain::status::EscrowStatus;
    use tempfile::tempdir;

    fn open(path: &Path) -> RocksDBStore {
        RocksDBStore::open(path, AssetId::new("TST")).expect("Failed to open RocksDB")
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());

        for name in [CF_ESCROW, CF_EVENTS, CF_BALANCES, CF_ALLOWANCES] {
            assert!(store.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_escrow_store() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        assert!(store.load().await.unwrap().is_none());

        let mut tx = Transaction::new(
            AccountId::new("escrow"),
            AccountId::new("buyer"),
            AccountId::new("seller"),
            AccountId::new("arbitrator"),
            Amount::new(1_000_000).unwrap(),
            AssetId::new("TST"),
        );
        tx.status = EscrowStatus::Disputed;
        store.store(tx.clone()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(tx));
    }

    #[tokio::test]
    async fn test_rocksdb_event_log_keeps_order() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let buyer = AccountId::new("buyer");
        let events = vec![
            EscrowEvent::Payment {
                buyer: buyer.clone(),
                amount: 7,
            },
            EscrowEvent::Dispute {
                buyer: buyer.clone(),
            },
        ];
        for event in &events {
            store.append(event.clone()).await.unwrap();
        }
        assert_eq!(store.events().await.unwrap(), events);
    }

    #[tokio::test]
    async fn test_rocksdb_ledger_transfer_from() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let (owner, spender) = (AccountId::new("owner"), AccountId::new("spender"));
        store.mint(&owner, 100).await.unwrap();
        store.approve(&owner, &spender, 60).await.unwrap();

        store
            .transfer_from(&spender, &owner, &spender, 60)
            .await
            .unwrap();
        assert_eq!(store.balance_of(&owner).await.unwrap(), 40);
        assert_eq!(store.balance_of(&spender).await.unwrap(), 60);
        assert_eq!(store.allowance(&owner, &spender).await.unwrap(), 0);

        assert!(store.transfer(&owner, &spender, 41).await.is_err());
        assert_eq!(store.balance_of(&owner).await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_rocksdb_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let account = AccountId::new("buyer");
        {
            let store = open(dir.path());
            store.mint(&account, 42).await.unwrap();
        }
        let store = open(dir.path());
        assert_eq!(store.balance_of(&account).await.unwrap(), 42);
    }
}
