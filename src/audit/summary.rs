// src/audit/summary.rs
// =============================================================================
// Result aggregation: folds the checker's per-URL results into the counts
// and lists the report shows.
//
// The checker's output is a map, so completion order is lost on purpose.
// Lists here are rebuilt from the reference sequence, which is in document
// order, so reports are stable from run to run.
//
// Rust concepts:
// - BTreeMap: per-category counts come out in a fixed order
// - Copy types: StatusCounts is small enough to pass by value
// =============================================================================

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::checker::{Category, ReachabilityResult, ReachabilityStatus, ResourceReference};

/// Everything one checking pass produced for one page.
#[derive(Debug, Clone, Serialize)]
pub struct AuditBatch {
    /// Document order, deduplicated
    pub references: Vec<ResourceReference>,
    /// Keyed by resolved URL
    pub results: HashMap<String, ReachabilityResult>,
    pub cap: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub reachable: usize,
    pub broken: usize,
    pub indeterminate: usize,
}

impl StatusCounts {
    fn record(&mut self, status: ReachabilityStatus) {
        self.total += 1;
        match status {
            ReachabilityStatus::Reachable => self.reachable += 1,
            ReachabilityStatus::Broken => self.broken += 1,
            ReachabilityStatus::Indeterminate => self.indeterminate += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub reachable_count: usize,
    pub broken_count: usize,
    pub indeterminate_count: usize,
    /// Broken results in document order
    pub broken_list: Vec<ReachabilityResult>,
    /// Indeterminate results in document order
    pub indeterminate_list: Vec<ReachabilityResult>,
    pub by_category: BTreeMap<Category, StatusCounts>,
}

impl AuditSummary {
    pub fn has_broken(&self) -> bool {
        self.broken_count > 0
    }
}

// Builds the summary for a finished batch
//
// A reference with no result (a caller-assembled batch can have gaps) is
// counted as Indeterminate so the totals always add up.
pub fn aggregate(batch: &AuditBatch) -> AuditSummary {
    let mut counts = StatusCounts::default();
    let mut by_category: BTreeMap<Category, StatusCounts> = BTreeMap::new();
    let mut broken_list = Vec::new();
    let mut indeterminate_list = Vec::new();

    // Duplicate URLs share one result, so count them once
    let mut seen = HashSet::new();
    for reference in &batch.references {
        if !seen.insert(reference.resolved_url.as_str()) {
            continue;
        }
        let result = batch
            .results
            .get(&reference.resolved_url)
            .cloned()
            .unwrap_or_else(|| ReachabilityResult {
                reference: reference.clone(),
                status: ReachabilityStatus::Indeterminate,
                status_code: None,
                message: Some("not checked".to_string()),
            });

        counts.record(result.status);
        by_category
            .entry(reference.category)
            .or_default()
            .record(result.status);

        match result.status {
            ReachabilityStatus::Broken => broken_list.push(result),
            ReachabilityStatus::Indeterminate => indeterminate_list.push(result),
            ReachabilityStatus::Reachable => {}
        }
    }

    AuditSummary {
        total: counts.total,
        reachable_count: counts.reachable,
        broken_count: counts.broken,
        indeterminate_count: counts.indeterminate,
        broken_list,
        indeterminate_list,
        by_category,
    }
}
