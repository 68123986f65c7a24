use super::engine::EscrowStateMachine;
use crate::domain::account::AccountId;
use crate::domain::command::Command;
use crate::domain::event::EscrowEvent;
use crate::domain::ports::AssetLedgerBox;
use crate::error::Result;

/// Drives a stream of caller-attributed commands against an escrow and the
/// ledger it settles in.
pub struct ScriptRunner {
    machine: EscrowStateMachine,
    ledger: AssetLedgerBox,
}

impl ScriptRunner {
    /// `ledger` must be a handle to the same ledger the machine was built with.
    pub fn new(machine: EscrowStateMachine, ledger: AssetLedgerBox) -> Self {
        Self { machine, ledger }
    }

    pub fn machine(&self) -> &EscrowStateMachine {
        &self.machine
    }

    /// Executes one command. Returns the event emitted by a successful
    /// escrow transition, or `None` for ledger-side commands.
    pub async fn apply(&self, caller: &AccountId, command: Command) -> Result<Option<EscrowEvent>> {
        match command {
            Command::Approve { amount } => {
                let custody = self.machine.custody().await;
                self.ledger.approve(caller, &custody, amount).await?;
                tracing::debug!(%caller, amount, "allowance granted to escrow");
                Ok(None)
            }
            Command::SendNative { value } => {
                self.machine.receive_native(caller, value)?;
                Ok(None)
            }
            Command::Pay => self.machine.pay(caller).await.map(Some),
            Command::Deliver => self.machine.deliver(caller).await.map(Some),
            Command::Complete => self.machine.complete(caller).await.map(Some),
            Command::Dispute => self.machine.dispute(caller).await.map(Some),
            Command::Resolve { release } => {
                self.machine.resolve_dispute(caller, release).await.map(Some)
            }
        }
    }

    /// Ledger balance of `account`.
    pub async fn balance_of(&self, account: &AccountId) -> Result<u128> {
        self.ledger.balance_of(account).await
    }
}
