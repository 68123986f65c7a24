use super::account::AccountId;
use super::status::EscrowStatus;
use serde::{Deserialize, Serialize};

/// One notification per successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum EscrowEvent {
    Payment { buyer: AccountId, amount: u128 },
    Delivered { buyer: AccountId },
    Completed { buyer: AccountId },
    Dispute { buyer: AccountId },
    Resolved {
        arbitrator: AccountId,
        status: EscrowStatus,
    },
}

impl EscrowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EscrowEvent::Payment { .. } => "payment",
            EscrowEvent::Delivered { .. } => "delivered",
            EscrowEvent::Completed { .. } => "completed",
            EscrowEvent::Dispute { .. } => "dispute",
            EscrowEvent::Resolved { .. } => "resolved",
        }
    }

    /// The identity that triggered the transition.
    pub fn actor(&self) -> &AccountId {
        match self {
            EscrowEvent::Payment { buyer, .. }
            | EscrowEvent::Delivered { buyer }
            | EscrowEvent::Completed { buyer }
            | EscrowEvent::Dispute { buyer } => buyer,
            EscrowEvent::Resolved { arbitrator, .. } => arbitrator,
        }
    }
}
