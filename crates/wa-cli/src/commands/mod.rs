//! CLI subcommand implementations.

pub mod collect;
pub mod gaps;
pub mod prefill;
pub mod reconstruct;
pub mod record;
pub mod status;
pub mod util;
