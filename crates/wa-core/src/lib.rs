//! Core domain logic for workflow archaeology.
//!
//! This crate contains the pure, synchronous pipeline stages:
//! - Gap detection: days where recorded time falls short of a baseline
//! - Timeline reconstruction: confidence-scored events from collected artifacts
//! - Billability classification and the estimated-time compliance guard
//! - Pre-fill: suggested entries for gap days, never invented from nothing
//! - Duplicate checks and provenance trails for suggested entries

pub mod artifact;
pub mod billing;
pub mod compliance;
pub mod dupes;
pub mod gaps;
pub mod policy;
pub mod prefill;
pub mod provenance;
pub mod store;
pub mod timeline;
pub mod types;

pub use artifact::{Artifact, ArtifactType, DocumentKind, classify_evidence};
pub use billing::{
    BillableClassification, BillableEvent, BillableReason, classify_events, time_entries,
};
pub use compliance::{BillingMode, DraftEntry, ESTIMATE_DISCLAIMER, TimeEntry, finalize};
pub use dupes::{DuplicateReport, check_duplicates};
pub use gaps::{
    BaselineConfig, FixedBaseline, Gap, GapKind, GapOptions, GapReport, RecordedEntry,
    TimeEntryStore, WeeklyBaseline, identify_gaps, identify_gaps_from_store,
};
pub use policy::Policy;
pub use prefill::{PrefillResult, WorkPatterns, pre_fill_entries};
pub use provenance::{Provenance, trace_provenance};
pub use store::{InMemoryStore, ReconstructionLog, ReconstructionRecord, ReconstructionStore};
pub use timeline::{
    Granularity, ReconstructError, ReconstructionContext, ReconstructionRequest,
    ReconstructionResult, TimelineEvent, reconstruct_timeline, reconstruct_windows,
};
pub use types::{
    ArtifactId, Confidence, DateRange, EvidenceKind, MatterId, UserId, ValidationError,
};
