//! CSV adapters for command streams and emitted events.

pub mod command_reader;
pub mod event_writer;
