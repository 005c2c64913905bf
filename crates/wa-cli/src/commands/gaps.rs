//! Gaps command: days where recorded time falls short of the baseline.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use wa_core::gaps::GapKind;
use wa_core::{GapOptions, GapReport, identify_gaps_from_store};

use crate::Config;
use crate::commands::util::{date_range, open_database, parse_matter};

#[derive(Debug, Args)]
pub struct GapsArgs {
    /// First day (YYYY-MM-DD or relative, e.g. "7 days ago").
    #[arg(long)]
    pub start: String,

    /// Last day, inclusive. Defaults to today.
    #[arg(long)]
    pub end: Option<String>,

    /// Only count time recorded against this matter.
    #[arg(long)]
    pub matter: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &GapsArgs, config: &Config) -> Result<()> {
    let range = date_range(&args.start, args.end.as_deref())?;
    config
        .baseline
        .validate()
        .context("invalid baseline configuration")?;
    let options = GapOptions {
        user_id: config.user_id.clone(),
        matter_id: parse_matter(args.matter.as_deref())?,
    };

    let db = open_database(config)?;
    let report = identify_gaps_from_store(&db, &range, &options, &config.baseline)
        .context("failed to identify gaps")?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write_report(writer, &report)?;
    }
    Ok(())
}

fn write_report<W: Write>(writer: &mut W, report: &GapReport) -> Result<()> {
    let summary = &report.summary;
    writeln!(
        writer,
        "Gaps {}: {} of {} days",
        report.range, summary.days_with_gaps, summary.total_days
    )?;

    if report.gaps.is_empty() {
        writeln!(writer, "No gaps found.")?;
        return Ok(());
    }

    for gap in &report.gaps {
        let kind = match gap.kind {
            GapKind::Missing => "missing",
            GapKind::UnderRecorded => "under-recorded",
        };
        writeln!(
            writer,
            "- {} {:<14} {:>5.2}h of {:>5.2}h  gap {:>5.2}h ({})",
            gap.date, kind, gap.recorded_hours, gap.expected_hours, gap.gap_hours, gap.confidence
        )?;
    }
    writeln!(
        writer,
        "Total gap: {:.2}h (recorded {:.2}h)",
        summary.total_gap_hours, summary.total_recorded_hours
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use wa_core::{MatterId, RecordedEntry};

    fn config(temp: &tempfile::TempDir) -> Config {
        Config {
            database_path: temp.path().join("wa.db"),
            ..Config::default()
        }
    }

    fn args(json: bool) -> GapsArgs {
        GapsArgs {
            start: "2025-01-01".to_string(),
            end: Some("2025-01-03".to_string()),
            matter: None,
            json,
        }
    }

    #[test]
    fn gaps_command_reports_every_empty_weekday() {
        let temp = tempfile::tempdir().unwrap();
        let mut output = Vec::new();
        run(&mut output, &args(false), &config(&temp)).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Gaps 2025-01-01..2025-01-03: 3 of 3 days
        - 2025-01-01 missing         0.00h of  8.00h  gap  8.00h (high)
        - 2025-01-02 missing         0.00h of  8.00h  gap  8.00h (high)
        - 2025-01-03 missing         0.00h of  8.00h  gap  8.00h (high)
        Total gap: 24.00h (recorded 0.00h)
        ");
    }

    #[test]
    fn gaps_command_reads_recorded_entries() {
        let temp = tempfile::tempdir().unwrap();
        let config = config(&temp);
        let mut db = open_database(&config).unwrap();
        db.insert_recorded_entries(&[
            RecordedEntry {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                hours: 8.0,
                matter_id: Some(MatterId::new("M-1").unwrap()),
                description: "Trial prep".to_string(),
            },
            RecordedEntry {
                date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
                hours: 5.5,
                matter_id: None,
                description: String::new(),
            },
        ])
        .unwrap();

        let mut output = Vec::new();
        run(&mut output, &args(true), &config).unwrap();
        let report: serde_json::Value = serde_json::from_slice(&output).unwrap();

        let gaps = report["gaps"].as_array().unwrap();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0]["date"], "2025-01-02");
        assert_eq!(gaps[0]["kind"], "under_recorded");
        assert_eq!(gaps[0]["gap_hours"], 2.5);
        assert_eq!(gaps[1]["kind"], "missing");
        assert_eq!(report["summary"]["total_recorded_hours"], 13.5);
    }

    #[test]
    fn weekend_days_expect_no_time() {
        let temp = tempfile::tempdir().unwrap();
        let mut output = Vec::new();
        let args = GapsArgs {
            start: "2025-01-04".to_string(),
            end: Some("2025-01-05".to_string()),
            matter: None,
            json: false,
        };
        run(&mut output, &args, &config(&temp)).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Gaps 2025-01-04..2025-01-05: 0 of 2 days
        No gaps found.
        ");
    }
}
