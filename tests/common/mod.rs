use std::io::{Error, Write};
use tempfile::NamedTempFile;

const PRICE: u128 = 1_000_000;

/// Deployment with the buyer funded for exactly one payment.
pub fn deployment_file() -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"{{
  "custody": "escrow",
  "seller": "seller",
  "buyer": "buyer",
  "arbitrator": "arbitrator",
  "price": {PRICE},
  "asset": "TST",
  "balances": {{ "buyer": {PRICE} }}
}}"#
    )?;
    Ok(file)
}

/// Command stream with the standard header followed by `rows`.
pub fn command_file(rows: &[&str]) -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "caller, action, arg")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    Ok(file)
}
