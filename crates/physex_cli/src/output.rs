use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

/// Writes `report` to `out` as pretty JSON or as its text form.
pub fn write_report<R, W>(out: &mut W, report: &R, json: bool) -> Result<()>
where
    R: Serialize + Display,
    W: Write,
{
    if json {
        serde_json::to_writer_pretty(&mut *out, report).context("Failed to serialize report.")?;
        writeln!(out)?;
    } else {
        writeln!(out, "{report}")?;
    }
    Ok(())
}

/// Prints `report` on stdout.
pub fn emit<R: Serialize + Display>(report: &R, json: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_report(&mut lock, report, json)
}
