//! Record command: import already-recorded time entries.
//!
//! Input is a JSON array of `{date, hours, matter_id?, description?}`.
//! These are the entries gap detection and duplicate checks compare against.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use wa_core::RecordedEntry;
use wa_core::types::validate_hours;

use crate::Config;
use crate::commands::util::open_database;

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// JSON file with recorded entries, or "-" for stdin.
    pub file: PathBuf,
}

pub fn run<W: Write>(writer: &mut W, args: &RecordArgs, config: &Config) -> Result<()> {
    let raw = if args.file.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read entries from stdin")?;
        raw
    } else {
        std::fs::read_to_string(&args.file)
            .with_context(|| format!("failed to read {}", args.file.display()))?
    };

    let entries = parse_entries(&raw)?;
    let mut db = open_database(config)?;
    let inserted = db
        .insert_recorded_entries(&entries)
        .context("failed to store recorded entries")?;

    let hours: f64 = entries.iter().map(|entry| entry.hours).sum();
    writeln!(writer, "Recorded {inserted} entries ({hours:.2}h).")?;
    Ok(())
}

fn parse_entries(raw: &str) -> Result<Vec<RecordedEntry>> {
    let entries: Vec<RecordedEntry> =
        serde_json::from_str(raw).context("expected a JSON array of recorded entries")?;
    for (index, entry) in entries.iter().enumerate() {
        validate_hours("recorded hours", entry.hours)
            .with_context(|| format!("entry {index} ({})", entry.date))?;
    }
    Ok(entries)
}
