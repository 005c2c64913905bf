//! Prefill command: suggest entries for gap days from that day's evidence.
//!
//! Gaps come from the recorded entries in the database. Suggestions are
//! checked for duplicates against what is already recorded and traced back
//! to the artifacts that support them. Fallback entries are annotated with
//! the user's habits for that weekday, learned from recorded history.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use clap::Args;
use serde::Serialize;
use wa_collect::{ArtifactFilters, Collection};
use wa_core::dupes::{DuplicateMatch, DuplicateTarget};
use wa_core::{
    ArtifactId, DateRange, DuplicateReport, ESTIMATE_DISCLAIMER, GapOptions, GapReport, PrefillResult,
    Provenance, RecordedEntry, WorkPatterns, check_duplicates, identify_gaps_from_store,
    pre_fill_entries, trace_provenance,
};

use crate::Config;
use crate::commands::collect::{gather, write_errors};
use crate::commands::util::{date_range, open_database, parse_matter};

/// How far back recorded history is read for weekday habits.
const HABIT_LOOKBACK_WEEKS: i64 = 8;

#[derive(Debug, Args)]
pub struct PrefillArgs {
    /// First day (YYYY-MM-DD or relative, e.g. "7 days ago").
    #[arg(long)]
    pub start: String,

    /// Last day, inclusive. Defaults to today.
    #[arg(long)]
    pub end: Option<String>,

    /// Only consider time and evidence for this matter.
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
struct PrefillOutput<'a> {
    gaps: &'a GapReport,
    prefill: &'a PrefillResult,
    duplicates: &'a DuplicateReport,
    provenance: &'a [Provenance],
    source_errors: &'a [String],
}

/// Most common recorded description per weekday.
#[derive(Debug, Default)]
struct WeekdayHabits {
    by_weekday: HashMap<Weekday, String>,
}

impl WeekdayHabits {
    fn from_history(entries: &[RecordedEntry]) -> Self {
        let mut counts: HashMap<Weekday, HashMap<&str, usize>> = HashMap::new();
        for entry in entries {
            let description = entry.description.trim();
            if description.is_empty() {
                continue;
            }
            *counts
                .entry(entry.date.weekday())
                .or_default()
                .entry(description)
                .or_insert(0) += 1;
        }

        let by_weekday = counts
            .into_iter()
            .filter_map(|(weekday, descriptions)| {
                // Highest count wins; ties go to the alphabetically first description.
                descriptions
                    .into_iter()
                    .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then_with(|| b.cmp(a)))
                    .map(|(description, _)| (weekday, description.to_string()))
            })
            .collect();
        Self { by_weekday }
    }
}

impl WorkPatterns for WeekdayHabits {
    fn typical_activity(&self, date: NaiveDate) -> Option<String> {
        self.by_weekday.get(&date.weekday()).cloned()
    }
}

pub fn run<W: Write>(writer: &mut W, args: &PrefillArgs, config: &Config) -> Result<()> {
    let range = date_range(&args.start, args.end.as_deref())?;
    let matter_id = parse_matter(args.matter.as_deref())?;
    config
        .baseline
        .validate()
        .context("invalid baseline configuration")?;

    let db = open_database(config)?;
    let options = GapOptions {
        user_id: config.user_id.clone(),
        matter_id: matter_id.clone(),
    };
    let report = identify_gaps_from_store(&db, &range, &options, &config.baseline)
        .context("failed to identify gaps")?;

    let collection = if config.connectors.is_empty() && args.artifacts.is_none() {
        tracing::warn!("no evidence sources configured; suggestions fall back to gap arithmetic");
        Collection::default()
    } else {
        let filters = ArtifactFilters {
            matter_id: matter_id.clone(),
            include_drafts: true,
            ..ArtifactFilters::default()
        };
        gather(config, args.artifacts.as_deref(), &range, &filters)?
    };

    let history_start = range.start() - Duration::weeks(HABIT_LOOKBACK_WEEKS);
    let history = DateRange::new(history_start, range.start() - Duration::days(1))
        .context("invalid history range")?;
    let habits = WeekdayHabits::from_history(
        &db.list_recorded_entries(&history, matter_id.as_ref())
            .context("failed to read recorded history")?,
    );

    let result = pre_fill_entries(
        &report.gaps,
        &collection.artifacts,
        Some(&habits),
        &config.policy.prefill,
    );

    let existing = db
        .list_recorded_entries(&range, matter_id.as_ref())
        .context("failed to read recorded entries")?;
    let duplicates = check_duplicates(&result.entries, &existing, &config.policy.duplicates)
        .context("invalid duplicate policy")?;
    let provenance: Vec<Provenance> = result
        .entries
        .iter()
        .map(|entry| trace_provenance(entry, &collection.artifacts))
        .collect();

    if args.json {
        let output = PrefillOutput {
            gaps: &report,
            prefill: &result,
            duplicates: &duplicates,
            provenance: &provenance,
            source_errors: &collection.errors,
        };
        writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
    } else {
        write_suggestions(writer, &report, &result, &duplicates)?;
        write_errors(writer, &collection.errors)?;
    }
    Ok(())
}

fn write_suggestions<W: Write>(
    writer: &mut W,
    report: &GapReport,
    result: &PrefillResult,
    duplicates: &DuplicateReport,
) -> Result<()> {
    let totals = &result.totals;
    writeln!(
        writer,
        "Gap days: {} | Suggested entries: {} | Hours: {:.2}",
        report.gaps.len(),
        totals.total_entries,
        totals.total_hours
    )?;

    for entry in &result.entries {
        writeln!(
            writer,
            "- {} {:>5.2}h {:<6} {:<14} {}",
            entry.date,
            entry.hours,
            entry.confidence.as_str(),
            entry.evidence_kind.as_str(),
            entry.description
        )?;
        if !entry.artifact_ids.is_empty() {
            let ids: Vec<&str> = entry.artifact_ids.iter().map(ArtifactId::as_str).collect();
            writeln!(writer, "  evidence: {}", ids.join(", "))?;
        }
        if let Some(note) = &entry.note {
            writeln!(writer, "  note: {note}")?;
        }
    }
    writeln!(
        writer,
        "Confidence: {} high, {} medium, {} low",
        totals.high, totals.medium, totals.low
    )?;

    write_matches(writer, "Possible duplicates:", &duplicates.potential_duplicates)?;
    write_matches(writer, "Repeated work (review):", &duplicates.warnings)?;

    writeln!(writer, "Note: {}", result.note)?;
    if !result.entries.is_empty() {
        writeln!(writer, "{ESTIMATE_DISCLAIMER}")?;
    }
    Ok(())
}

fn write_matches<W: Write>(
    writer: &mut W,
    heading: &str,
    matches: &[DuplicateMatch],
) -> Result<()> {
    if matches.is_empty() {
        return Ok(());
    }
    writeln!(writer, "{heading}")?;
    for found in matches {
        let other = match found.other {
            DuplicateTarget::Existing(index) => format!("recorded entry {index}"),
            DuplicateTarget::Candidate(index) => format!("suggested entry {index}"),
        };
        writeln!(
            writer,
            "- suggested entry {} ~ {other} (similarity {:.2})",
            found.candidate_index, found.similarity
        )?;
    }
    Ok(())
}
