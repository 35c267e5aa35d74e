// src/checker/cache.rs
// =============================================================================
// Caller-supplied cache of probe verdicts, keyed by resolved URL.
//
// The checker itself keeps no state between runs. A caller that audits
// several pages in one go (shared stylesheets, shared logo, ...) can hand
// the checker a cache so each resource is probed once per TTL window.
//
// Only definitive verdicts (Reachable / Broken) are stored; "could not
// determine" is never cached.
//
// Rust concepts:
// - DashMap: a sharded concurrent map, so probes finishing on different
//   tasks can write verdicts without a global Mutex
// - Trait objects: the checker holds an Arc<dyn ResultCache>, so callers
//   may plug in their own store
// =============================================================================

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::reachability::ReachabilityStatus;

/// The cacheable part of a reachability result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: ReachabilityStatus,
    pub status_code: Option<u16>,
    pub message: Option<String>,
}

pub trait ResultCache: Send + Sync {
    fn get(&self, url: &str) -> Option<Verdict>;
    fn put(&self, url: &str, verdict: Verdict);
}

/// In-memory cache whose entries expire after a fixed time-to-live.
#[derive(Debug)]
pub struct TtlCache {
    ttl: Duration,
    entries: DashMap<String, (Instant, Verdict)>,
}

impl TtlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry and returns how many went.
    ///
    /// Expired entries are also removed lazily on lookup; this sweeps the
    /// ones nobody asks for again, so a long multi-page run stays bounded.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        before.saturating_sub(self.entries.len())
    }
}

impl ResultCache for TtlCache {
    fn get(&self, url: &str) -> Option<Verdict> {
        {
            let entry = self.entries.get(url)?;
            let (stored, verdict) = entry.value();
            if stored.elapsed() < self.ttl {
                return Some(verdict.clone());
            }
        }
        // Must run after the read guard is dropped, or the shard deadlocks
        let ttl = self.ttl;
        self.entries
            .remove_if(url, |_, (stored, _)| stored.elapsed() >= ttl);
        None
    }

    fn put(&self, url: &str, verdict: Verdict) {
        if verdict.status == ReachabilityStatus::Indeterminate {
            return;
        }
        self.entries
            .insert(url.to_string(), (Instant::now(), verdict));
    }
}
