use crate::error::EscrowError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the escrow. The discriminants are part of the observable
/// contract and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum EscrowStatus {
    #[default]
    Created = 0,
    Paid = 1,
    Delivered = 2,
    Completed = 3,
    Disputed = 4,
    Resolved = 5,
}

impl EscrowStatus {
    pub const ALL: [EscrowStatus; 6] = [
        EscrowStatus::Created,
        EscrowStatus::Paid,
        EscrowStatus::Delivered,
        EscrowStatus::Completed,
        EscrowStatus::Disputed,
        EscrowStatus::Resolved,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the escrow custody account is expected to hold the price.
    pub fn holds_funds(self) -> bool {
        matches!(
            self,
            EscrowStatus::Paid | EscrowStatus::Delivered | EscrowStatus::Disputed
        )
    }

    /// `Completed` and `Resolved` are where the normal and disputed paths end.
    pub fn is_rest_state(self) -> bool {
        matches!(self, EscrowStatus::Completed | EscrowStatus::Resolved)
    }
}

impl TryFrom<u8> for EscrowStatus {
    type Error = EscrowError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| EscrowError::ValidationError(format!("Unknown status code {code}")))
    }
}

impl From<EscrowStatus> for u8 {
    fn from(status: EscrowStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EscrowStatus::Created => "Created",
            EscrowStatus::Paid => "Paid",
            EscrowStatus::Delivered => "Delivered",
            EscrowStatus::Completed => "Completed",
            EscrowStatus::Disputed => "Disputed",
            EscrowStatus::Resolved => "Resolved",
        };
        f.write_str(name)
    }
}
