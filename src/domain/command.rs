use super::account::AccountId;
use super::transaction::Transition;

/// An operation a party can issue against the escrow or its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Ledger-side allowance for the escrow custody account.
    Approve { amount: u128 },
    Pay,
    Deliver,
    Complete,
    Dispute,
    Resolve { release: bool },
    /// Direct transfer of native currency to the escrow.
    SendNative { value: u128 },
}

impl Command {
    pub fn transition(self) -> Option<Transition> {
        match self {
            Command::Pay => Some(Transition::Pay),
            Command::Deliver => Some(Transition::Deliver),
            Command::Complete => Some(Transition::Complete),
            Command::Dispute => Some(Transition::Dispute),
            Command::Resolve { release } => Some(Transition::Resolve { release }),
            Command::Approve { .. } | Command::SendNative { .. } => None,
        }
    }
}

/// A command together with the identity issuing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub caller: AccountId,
    pub command: Command,
}
