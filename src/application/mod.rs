//! Application layer containing the escrow orchestration.
//!
//! `EscrowStateMachine` owns the escrow record and performs the role-gated
//! transitions against the injected ledger. `ScriptRunner` feeds it a stream of
//! caller-attributed commands.

pub mod engine;
pub mod script;
