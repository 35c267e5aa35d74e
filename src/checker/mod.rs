// src/checker/mod.rs
// =============================================================================
// Reference checking: the core of an audit.
//
// Submodules:
// - extract:      finds the resources a page references (pure, no I/O)
// - probe:        lightweight HEAD probes behind the Prober trait
// - reachability: bounded-concurrency, deadline-bounded checking of a batch
// - cache:        optional caller-supplied cache of verdicts
// =============================================================================

mod cache;
mod extract;
mod probe;
mod reachability;

pub use cache::{ResultCache, TtlCache, Verdict};
pub use extract::{extract_references, resolve_reference, Category, ResourceReference};
pub use probe::{HttpProber, ProbeOutcome, Prober};
pub use reachability::{
    classify, CheckOptions, ReachabilityChecker, ReachabilityResult, ReachabilityStatus,
    BATCH_TIMED_OUT, REQUEST_TIMED_OUT, SKIPPED_OVER_CAP,
};
