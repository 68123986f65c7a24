use crate::domain::account::AccountId;
use crate::domain::command::{Command, Instruction};
use crate::error::{EscrowError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum Action {
    Approve,
    Pay,
    Deliver,
    Complete,
    Dispute,
    Resolve,
    SendNative,
}

#[derive(Debug, Deserialize)]
struct CommandRecord {
    caller: AccountId,
    action: Action,
    arg: Option<String>,
}

impl CommandRecord {
    fn into_instruction(self) -> Result<Instruction> {
        let command = match self.action {
            Action::Approve => Command::Approve {
                amount: parse_amount(self.arg.as_deref())?,
            },
            Action::Pay => Command::Pay,
            Action::Deliver => Command::Deliver,
            Action::Complete => Command::Complete,
            Action::Dispute => Command::Dispute,
            Action::Resolve => Command::Resolve {
                release: parse_flag(self.arg.as_deref())?,
            },
            Action::SendNative => Command::SendNative {
                value: parse_amount(self.arg.as_deref())?,
            },
        };
        Ok(Instruction {
            caller: self.caller,
            command,
        })
    }
}

fn parse_amount(arg: Option<&str>) -> Result<u128> {
    let arg = arg.ok_or_else(|| EscrowError::ValidationError("Missing amount".to_string()))?;
    arg.parse()
        .map_err(|_| EscrowError::ValidationError(format!("Invalid amount '{arg}'")))
}

fn parse_flag(arg: Option<&str>) -> Result<bool> {
    match arg {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(EscrowError::ValidationError(format!(
            "Invalid resolution '{other}', expected true or false"
        ))),
        None => Err(EscrowError::ValidationError(
            "Missing resolution".to_string(),
        )),
    }
}

/// Reads caller-attributed commands from a CSV source with header
/// `caller, action, arg`.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and validates instructions; a bad row yields an error and
    /// the stream continues with the next one.
    pub fn instructions(self) -> impl Iterator<Item = Result<Instruction>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|result| result.map_err(EscrowError::from)?.into_instruction())
    }
}
