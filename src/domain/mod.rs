//! Domain types and the ports the escrow talks through.

pub mod account;
pub mod command;
pub mod event;
pub mod ports;
pub mod status;
pub mod transaction;
