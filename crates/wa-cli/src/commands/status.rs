//! Status command: database contents and configured sources.

use std::io::Write;

use anyhow::Result;
use wa_core::ReconstructionStore;

use crate::Config;
use crate::commands::util::open_database;

/// Reconstructions listed by `status`.
const RECENT_RECONSTRUCTIONS: usize = 5;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let counts = db.counts()?;

    writeln!(writer, "Workflow archaeology status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    if let Some(user_id) = &config.user_id {
        writeln!(writer, "User: {user_id}")?;
    }
    writeln!(writer, "Recorded entries: {}", counts.recorded_entries)?;
    writeln!(writer, "Reconstructions: {}", counts.reconstructions)?;

    if config.connectors.is_empty() {
        writeln!(writer, "No evidence sources configured.")?;
    } else {
        writeln!(writer, "Sources:")?;
        for source in &config.connectors {
            writeln!(writer, "- {} ({})", source.name(), source.kind())?;
        }
    }

    let recent = db.recent(RECENT_RECONSTRUCTIONS)?;
    if !recent.is_empty() {
        writeln!(writer, "Recent reconstructions:")?;
        for record in recent {
            writeln!(
                writer,
                "- {} to {}: {} events from {} artifacts ({})",
                record.period_start.format("%Y-%m-%d %H:%M"),
                record.period_end.format("%Y-%m-%d %H:%M"),
                record.event_count,
                record.artifact_count,
                record.aggregate_confidence
            )?;
        }
    }

    Ok(())
}
