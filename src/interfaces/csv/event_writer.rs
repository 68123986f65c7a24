use crate::domain::event::EscrowEvent;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct EventRecord<'a> {
    event: &'static str,
    actor: &'a str,
    amount: Option<u128>,
    status: Option<u8>,
}

impl<'a> From<&'a EscrowEvent> for EventRecord<'a> {
    fn from(event: &'a EscrowEvent) -> Self {
        let (amount, status) = match event {
            EscrowEvent::Payment { amount, .. } => (Some(*amount), None),
            EscrowEvent::Resolved { status, .. } => (None, Some(status.code())),
            _ => (None, None),
        };
        Self {
            event: event.name(),
            actor: event.actor().as_str(),
            amount,
            status,
        }
    }
}

const HEADER: [&str; 4] = ["event", "actor", "amount", "status"];

/// Writes escrow events as CSV rows `event,actor,amount,status`.
///
/// The header is written up front so an empty stream still yields valid CSV.
pub struct EventWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> EventWriter<W> {
    pub fn new(sink: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(sink);
        writer.write_record(HEADER)?;
        Ok(Self { writer })
    }

    pub fn write_event(&mut self, event: &EscrowEvent) -> Result<()> {
        self.writer.serialize(EventRecord::from(event))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
