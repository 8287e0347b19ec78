//! State module for tracking run progress
//!
//! # Components
//!
//! - `AttemptResult`: the immutable outcome of one target in one run
//! - `RunState`: shared counters for the current run
//! - `DedupIndex`: content hashes of downloaded icons, for duplicate detection

mod attempt;
mod dedup;
mod run_state;

// Re-export main types
pub use attempt::{AttemptResult, AttemptStatus, SavedIcon, Strategy};
pub use dedup::{content_hash, DedupIndex};
pub use run_state::{RunState, RunSummary};
