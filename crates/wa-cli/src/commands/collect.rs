//! Collect command: gather artifacts from the configured evidence sources.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use wa_collect::{
    ArtifactCollector, ArtifactFilters, Collection, Connector, HttpConnector, JsonFileConnector,
};
use wa_core::{DateRange, DocumentKind};

use crate::commands::util::{date_range, parse_matter};
use crate::{Config, ConnectorConfig};

/// Connector name used for `--artifacts` files.
const ARTIFACTS_FILE_SOURCE: &str = "artifacts-file";

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// First day (YYYY-MM-DD or relative, e.g. "7 days ago").
    #[arg(long)]
    pub start: String,

    /// Last day, inclusive. Defaults to today.
    #[arg(long)]
    pub end: Option<String>,

    /// Drop artifacts filed under a different matter.
    #[arg(long)]
    pub matter: Option<String>,

    /// Search term passed to sources (repeatable).
    #[arg(long)]
    pub keyword: Vec<String>,

    /// Only keep documents of this kind (repeatable): motion, brief, letter, email, filing, other.
    #[arg(long, value_parser = parse_document_kind)]
    pub kind: Vec<DocumentKind>,

    /// Keep artifacts marked as drafts.
    #[arg(long)]
    pub include_drafts: bool,

    /// Read artifacts from this JSON file instead of the configured sources.
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &CollectArgs, config: &Config) -> Result<()> {
    let range = date_range(&args.start, args.end.as_deref())?;
    let filters = ArtifactFilters {
        matter_id: parse_matter(args.matter.as_deref())?,
        document_kinds: args.kind.clone(),
        include_drafts: args.include_drafts,
        keywords: args.keyword.clone(),
    };

    let collection = gather(config, args.artifacts.as_deref(), &range, &filters)?;

    if args.json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&collection)?)?;
    } else {
        write_collection(writer, &range, &collection)?;
    }
    Ok(())
}

fn parse_document_kind(value: &str) -> Result<DocumentKind, String> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .map_err(|_| format!("unknown document kind: {value}"))
}

/// Builds a collector over either one artifacts file or every configured source.
pub(crate) fn build_collector(
    config: &Config,
    artifacts_file: Option<&Path>,
) -> Result<ArtifactCollector> {
    let mut collector = ArtifactCollector::new().with_timeout(config.connector_timeout());

    if let Some(path) = artifacts_file {
        return Ok(collector.with_connector(JsonFileConnector::new(ARTIFACTS_FILE_SOURCE, path)));
    }

    for source in &config.connectors {
        let connector: Arc<dyn Connector> = match source {
            ConnectorConfig::File { name, path } => {
                Arc::new(JsonFileConnector::new(name.clone(), path.clone()))
            }
            ConnectorConfig::Http { name, url, token } => Arc::new(
                HttpConnector::new(name.clone(), url, token.clone(), config.connector_timeout())
                    .with_context(|| format!("invalid connector {name}"))?,
            ),
        };
        collector.register(connector);
    }

    if collector.is_empty() {
        bail!(
            "no evidence sources configured.\n\nHint: add [[connectors]] to config.toml or pass --artifacts <file>."
        );
    }
    Ok(collector)
}

/// Runs a collection on a fresh runtime.
pub(crate) fn gather(
    config: &Config,
    artifacts_file: Option<&Path>,
    range: &DateRange,
    filters: &ArtifactFilters,
) -> Result<Collection> {
    let collector = build_collector(config, artifacts_file)?;
    tracing::debug!(?collector, %range, "collecting artifacts");
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    Ok(runtime.block_on(collector.collect(range, filters)))
}

fn write_collection<W: Write>(
    writer: &mut W,
    range: &DateRange,
    collection: &Collection,
) -> Result<()> {
    writeln!(
        writer,
        "Collected {} artifacts from {} sources ({range})",
        collection.artifacts.len(),
        collection.connectors_attempted.len()
    )?;
    for artifact in &collection.artifacts {
        writeln!(
            writer,
            "- {} {:<8} {:<14} {}  {}",
            artifact.timestamp.format("%Y-%m-%d %H:%M"),
            artifact.artifact_type.as_str(),
            artifact.evidence_kind.as_str(),
            artifact.id,
            artifact.title().unwrap_or("-")
        )?;
    }
    write_errors(writer, &collection.errors)
}

/// Lists failed sources, if any.
pub(crate) fn write_errors<W: Write>(writer: &mut W, errors: &[String]) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    writeln!(writer, "Source errors:")?;
    for error in errors {
        writeln!(writer, "- {error}")?;
    }
    Ok(())
}
