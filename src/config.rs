use crate::application::engine::Deployment;
use crate::domain::account::{AccountId, AssetId};
use crate::domain::transaction::Transaction;
use crate::error::{EscrowError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Deployment file describing one escrow and the ledger it settles in.
///
/// ```json
/// {
///   "custody": "escrow",
///   "seller": "seller",
///   "buyer": "buyer",
///   "arbitrator": "arbitrator",
///   "price": 1000000,
///   "asset": "TST",
///   "balances": { "buyer": 1000000 }
/// }
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DeploymentConfig {
    pub custody: AccountId,
    pub seller: AccountId,
    pub buyer: AccountId,
    pub arbitrator: AccountId,
    pub price: u128,
    pub asset: AssetId,
    /// Minted on first deployment only.
    #[serde(default)]
    pub balances: BTreeMap<AccountId, u128>,
}

impl DeploymentConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| EscrowError::ConfigError(format!("{}: {e}", path.display())))
    }

    /// Fails when a persisted escrow disagrees with this deployment file.
    pub fn check_matches(&self, record: &Transaction) -> Result<()> {
        let mut mismatched = Vec::new();
        if record.custody != self.custody {
            mismatched.push("custody");
        }
        if record.buyer != self.buyer {
            mismatched.push("buyer");
        }
        if record.seller != self.seller {
            mismatched.push("seller");
        }
        if record.arbitrator != self.arbitrator {
            mismatched.push("arbitrator");
        }
        if record.price.value() != self.price {
            mismatched.push("price");
        }
        if record.asset != self.asset {
            mismatched.push("asset");
        }
        if mismatched.is_empty() {
            Ok(())
        } else {
            Err(EscrowError::ConfigError(format!(
                "persisted escrow differs from the deployment file in: {}",
                mismatched.join(", ")
            )))
        }
    }

    pub fn deployment(&self) -> Deployment {
        Deployment {
            custody: self.custody.clone(),
            buyer: self.buyer.clone(),
            seller: self.seller.clone(),
            arbitrator: self.arbitrator.clone(),
            price: self.price,
        }
    }
}
