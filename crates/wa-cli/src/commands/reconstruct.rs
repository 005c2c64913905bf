//! Reconstruct command: rebuild a timeline for a window and classify it.
//!
//! Artifacts come from the configured sources (or `--artifacts`), are trimmed
//! to the requested instants, reconstructed, recorded in the audit trail and
//! classified for billability. Suggested entries are always estimates and
//! carry the compliance warning.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use wa_collect::ArtifactFilters;
use wa_core::{
    BillableClassification, DateRange, ESTIMATE_DISCLAIMER, ReconstructionContext,
    ReconstructionLog, ReconstructionRequest, ReconstructionResult, TimeEntry, classify_events,
    time_entries,
};

use crate::Config;
use crate::commands::collect::{gather, write_errors};
use crate::commands::util::{open_database, parse_datetime, parse_matter};

#[derive(Debug, Args)]
pub struct ReconstructArgs {
    /// Window start (RFC 3339 or relative, e.g. "2 days ago").
    #[arg(long)]
    pub start: String,

    /// Window end. Defaults to now.
    #[arg(long)]
    pub end: Option<String>,

    /// Bind the window to a matter; every event becomes billable.
    #[arg(long)]
    pub matter: Option<String>,

    /// Read artifacts from this JSON file instead of the configured sources.
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ReconstructOutput<'a> {
    reconstruction: &'a ReconstructionResult,
    classification: &'a BillableClassification,
    entries: &'a [TimeEntry],
    source_errors: &'a [String],
}

pub fn run<W: Write>(writer: &mut W, args: &ReconstructArgs, config: &Config) -> Result<()> {
    let start = parse_datetime(&args.start)?;
    let end = args
        .end
        .as_deref()
        .map_or_else(|| Ok(Utc::now()), parse_datetime)?;
    let days = DateRange::new(start.date_naive(), end.date_naive())
        .context("invalid reconstruction window")?;
    let matter_id = parse_matter(args.matter.as_deref())?;

    let filters = ArtifactFilters {
        matter_id: matter_id.clone(),
        include_drafts: true,
        ..ArtifactFilters::default()
    };
    let collection = gather(config, args.artifacts.as_deref(), &days, &filters)?;
    let artifacts = collection
        .artifacts
        .into_iter()
        .filter(|artifact| within(artifact.timestamp, start, end))
        .collect();

    let request = ReconstructionRequest {
        start,
        end,
        context: matter_id
            .map(ReconstructionContext::for_matter)
            .unwrap_or_default(),
        artifacts,
    };

    let log = ReconstructionLog::new(open_database(config)?, config.policy.durations.clone());
    let result = log
        .reconstruct(config.user_id.as_ref(), &request)
        .context("failed to reconstruct timeline")?;

    let classification = classify_events(&result.timeline, &result.context, &config.policy.billable);
    let entries = time_entries(&classification, &result.context);

    if args.json {
        let output = ReconstructOutput {
            reconstruction: &result,
            classification: &classification,
            entries: &entries,
            source_errors: &collection.errors,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    } else {
        write_summary(writer, &result, &classification)?;
        write_errors(writer, &collection.errors)?;
    }
    Ok(())
}

fn within(timestamp: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start <= timestamp && timestamp <= end
}

fn write_summary<W: Write>(
    writer: &mut W,
    result: &ReconstructionResult,
    classification: &BillableClassification,
) -> Result<()> {
    const FORMAT: &str = "%Y-%m-%d %H:%M";

    writeln!(
        writer,
        "Reconstruction {} to {} UTC ({:?})",
        result.period_start.format(FORMAT),
        result.period_end.format(FORMAT),
        result.granularity
    )?;
    writeln!(
        writer,
        "Confidence: {} | Coverage: {:.1}% | Artifacts: {}",
        result.aggregate_confidence,
        result.evidence.coverage_percentage,
        result.evidence.total_artifacts
    )?;

    writeln!(writer, "Timeline:")?;
    for classified in &classification.events {
        let event = &classified.event;
        writeln!(
            writer,
            "- {} {:>4}m {:<6} {:<12} {}",
            event.timestamp.format(FORMAT),
            event.duration_minutes,
            event.confidence.as_str(),
            if classified.billable { "billable" } else { "non-billable" },
            event.description
        )?;
    }
    writeln!(
        writer,
        "Billable: {:.2}h | Non-billable: {:.2}h",
        classification.billable_hours, classification.non_billable_hours
    )?;

    if !result.quiet_periods.is_empty() {
        writeln!(writer, "Quiet periods:")?;
        for quiet in &result.quiet_periods {
            writeln!(
                writer,
                "- {} to {} ({}m)",
                quiet.start.format(FORMAT),
                quiet.end.format(FORMAT),
                quiet.minutes
            )?;
        }
    }
    if let Some(note) = &result.note {
        writeln!(writer, "Note: {note}")?;
    }
    writeln!(writer, "{ESTIMATE_DISCLAIMER}")?;
    Ok(())
}
