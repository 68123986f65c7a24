use super::account::{AccountId, Amount, AssetId, Role};
use super::status::EscrowStatus;
use crate::error::{EscrowError, Result};
use serde::{Deserialize, Serialize};

/// The transition operations an escrow accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Pay,
    Deliver,
    Complete,
    Dispute,
    /// `release == true` settles in favor of completion and pays the seller;
    /// `false` reopens the escrow with funds still held.
    Resolve { release: bool },
}

impl Transition {
    pub const ALL: [Transition; 6] = [
        Transition::Pay,
        Transition::Deliver,
        Transition::Complete,
        Transition::Dispute,
        Transition::Resolve { release: true },
        Transition::Resolve { release: false },
    ];

    /// The only role allowed to invoke this transition.
    pub fn role(self) -> Role {
        match self {
            Transition::Resolve { .. } => Role::Arbitrator,
            _ => Role::Buyer,
        }
    }

    /// Status reached from `from`, or `None` when `from` is not a legal precondition.
    pub fn target(self, from: EscrowStatus) -> Option<EscrowStatus> {
        use EscrowStatus::*;
        match (self, from) {
            (Transition::Pay, Created) => Some(Paid),
            (Transition::Deliver, Paid) => Some(Delivered),
            (Transition::Complete, Delivered) => Some(Completed),
            (Transition::Dispute, Paid | Delivered) => Some(Disputed),
            (Transition::Resolve { release: true }, Disputed) => Some(Resolved),
            (Transition::Resolve { release: false }, Disputed) => Some(Paid),
            _ => None,
        }
    }
}

/// The singleton escrow record. Only `status` ever changes after deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger account that holds funds while they are in escrow.
    pub custody: AccountId,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub arbitrator: AccountId,
    pub price: Amount,
    pub asset: AssetId,
    pub status: EscrowStatus,
}

impl Transaction {
    pub fn new(
        custody: AccountId,
        buyer: AccountId,
        seller: AccountId,
        arbitrator: AccountId,
        price: Amount,
        asset: AssetId,
    ) -> Self {
        Self {
            custody,
            buyer,
            seller,
            arbitrator,
            price,
            asset,
            status: EscrowStatus::Created,
        }
    }

    pub fn holder(&self, role: Role) -> &AccountId {
        match role {
            Role::Buyer => &self.buyer,
            Role::Seller => &self.seller,
            Role::Arbitrator => &self.arbitrator,
        }
    }

    /// Validates `caller` and the current status for `transition` and returns the
    /// status it leads to. The caller is checked before the status.
    pub fn check(&self, caller: &AccountId, transition: Transition) -> Result<EscrowStatus> {
        let role = transition.role();
        if self.holder(role) != caller {
            return Err(EscrowError::Unauthorized(role));
        }
        transition
            .target(self.status)
            .ok_or(EscrowError::InvalidStatus(self.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(status: EscrowStatus) -> Transaction {
        let mut tx = Transaction::new(
            AccountId::new("escrow"),
            AccountId::new("buyer"),
            AccountId::new("seller"),
            AccountId::new("arbitrator"),
            Amount::new(1_000_000).unwrap(),
            AssetId::new("TST"),
        );
        tx.status = status;
        tx
    }

    #[test]
    fn test_new_transaction_starts_created() {
        assert_eq!(transaction(EscrowStatus::Created).status, EscrowStatus::Created);
    }

    #[test]
    fn test_at_most_one_transition_per_state() {
        for status in EscrowStatus::ALL {
            let legal: Vec<Transition> = Transition::ALL
                .into_iter()
                .filter(|t| t.target(status).is_some())
                .collect();
            match status {
                // Both resolutions share the single `Disputed` precondition.
                EscrowStatus::Disputed => assert_eq!(legal.len(), 2),
                // `Paid` and `Delivered` accept their forward step plus `dispute`.
                EscrowStatus::Paid | EscrowStatus::Delivered => assert_eq!(legal.len(), 2),
                EscrowStatus::Created => assert_eq!(legal, vec![Transition::Pay]),
                EscrowStatus::Completed | EscrowStatus::Resolved => assert!(legal.is_empty()),
            }
        }
    }

    #[test]
    fn test_check_rejects_wrong_caller_before_status() {
        let tx = transaction(EscrowStatus::Created);
        let err = tx
            .check(&AccountId::new("buyer"), Transition::Resolve { release: true })
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized(Role::Arbitrator)));
    }

    #[test]
    fn test_check_rejects_invalid_status() {
        let tx = transaction(EscrowStatus::Created);
        let err = tx
            .check(&AccountId::new("buyer"), Transition::Deliver)
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidStatus(EscrowStatus::Created)));
        assert_eq!(err.to_string(), "Invalid status");
    }

    #[test]
    fn test_resolution_targets() {
        let tx = transaction(EscrowStatus::Disputed);
        let arbitrator = AccountId::new("arbitrator");
        assert_eq!(
            tx.check(&arbitrator, Transition::Resolve { release: true }).unwrap(),
            EscrowStatus::Resolved
        );
        assert_eq!(
            tx.check(&arbitrator, Transition::Resolve { release: false }).unwrap(),
            EscrowStatus::Paid
        );
    }

    #[test]
    fn test_seller_cannot_drive_buyer_transitions() {
        let tx = transaction(EscrowStatus::Delivered);
        let err = tx
            .check(&AccountId::new("seller"), Transition::Complete)
            .unwrap_err();
        assert!(matches!(err, EscrowError::Unauthorized(Role::Buyer)));
    }
}
