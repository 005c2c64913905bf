//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::collect::CollectArgs;
use crate::commands::gaps::GapsArgs;
use crate::commands::prefill::PrefillArgs;
use crate::commands::reconstruct::ReconstructArgs;
use crate::commands::record::RecordArgs;

/// Workflow archaeology.
///
/// Finds days with missing billable time, gathers the digital evidence left
/// behind, and suggests reviewer-facing time entries. Every estimate is
/// labeled as such and nothing is finalized without human sign-off.
#[derive(Debug, Parser)]
#[command(name = "wa", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import already-recorded time entries from a JSON file.
    Record(RecordArgs),

    /// Show days where recorded time falls short of the baseline.
    Gaps(GapsArgs),

    /// Gather artifacts from the configured evidence sources.
    Collect(CollectArgs),

    /// Rebuild a timeline for a window and classify its billability.
    Reconstruct(ReconstructArgs),

    /// Suggest entries for gap days from that day's evidence.
    Prefill(PrefillArgs),

    /// Show database contents and configured sources.
    Status,
}
