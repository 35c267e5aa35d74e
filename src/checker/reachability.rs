// src/checker/reachability.rs
// =============================================================================
// The reachability checker: probes a page's references concurrently and
// decides, for each one, Reachable / Broken / Indeterminate.
//
// How a batch runs:
// 0. Duplicate URLs are collapsed (first occurrence wins).
// 1. References past `cap` are not probed; they become Indeterminate
//    ("skipped - over cap").
// 2. Cache hits (if a cache was supplied) are answered without probing.
// 3. The rest are probed through a buffer_unordered stream, so at most
//    `max_concurrency` probes are in flight; the next one starts as soon as
//    a slot frees up.
// 4. Each probe gets `per_request_timeout`. The whole batch gets
//    `overall_timeout`; when it expires the stream is dropped, which cancels
//    every outstanding probe, and those references become Indeterminate.
//
// Only this coordinator writes to the result map, once per URL, so there is
// no shared mutable state between probes. Every input reference ends up
// with exactly one result.
//
// Status mapping:
//   200..=399            -> Reachable
//   400..                -> Broken
//   transport failure    -> Broken
//   timeout              -> Indeterminate
//
// Rust concepts:
// - Streams: buffer_unordered turns "a list of futures" into "a bounded pool"
// - Cancellation by drop: a future that is dropped simply stops running
// - Borrowing: probe futures borrow the references, nothing is cloned until
//   a result is written
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use super::cache::{ResultCache, Verdict};
use super::extract::ResourceReference;
use super::probe::{ProbeOutcome, Prober};
use crate::error::ConfigError;

pub const SKIPPED_OVER_CAP: &str = "skipped - over cap";
pub const REQUEST_TIMED_OUT: &str = "request timed out";
pub const BATCH_TIMED_OUT: &str = "abandoned at overall timeout";

/// Knobs for one checking pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    /// Maximum number of probes in flight at once
    pub max_concurrency: usize,
    /// Budget for a single probe
    pub per_request_timeout: Duration,
    /// Budget for the whole batch
    pub overall_timeout: Duration,
    /// Maximum number of references probed; the rest are skipped
    pub cap: usize,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            per_request_timeout: Duration::from_secs(5),
            overall_timeout: Duration::from_secs(45),
            cap: 50,
        }
    }
}

impl CheckOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.per_request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("per_request_timeout"));
        }
        if self.overall_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("overall_timeout"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReachabilityStatus {
    Reachable,
    Broken,
    Indeterminate,
}

/// The verdict for one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachabilityResult {
    pub reference: ResourceReference,
    pub status: ReachabilityStatus,
    /// HTTP status observed by the probe, if it got that far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Why the verdict is what it is (HTTP code, error, skip reason)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReachabilityResult {
    fn from_verdict(reference: &ResourceReference, verdict: Verdict) -> Self {
        Self {
            reference: reference.clone(),
            status: verdict.status,
            status_code: verdict.status_code,
            message: verdict.message,
        }
    }

    fn indeterminate(reference: &ResourceReference, reason: &str) -> Self {
        Self {
            reference: reference.clone(),
            status: ReachabilityStatus::Indeterminate,
            status_code: None,
            message: Some(reason.to_string()),
        }
    }

    pub fn is_broken(&self) -> bool {
        self.status == ReachabilityStatus::Broken
    }
}

/// Checks batches of references against live endpoints.
pub struct ReachabilityChecker<P> {
    prober: P,
    options: CheckOptions,
    cache: Option<Arc<dyn ResultCache>>,
}

impl<P: Prober> ReachabilityChecker<P> {
    pub fn new(prober: P, options: CheckOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            prober,
            options,
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    // Checks every reference once and returns one result per resolved URL
    //
    // Never fails: per-reference problems are recorded in the results, and
    // an expired overall timeout just leaves the unfinished ones
    // Indeterminate.
    pub async fn check(
        &self,
        references: &[ResourceReference],
    ) -> HashMap<String, ReachabilityResult> {
        // The deadline is fixed up front: however many references there are,
        // the batch never runs longer than overall_timeout
        let deadline = Instant::now() + self.options.overall_timeout;
        let mut results = HashMap::with_capacity(references.len());

        // A URL listed twice is still one resource: keep the first occurrence
        // so each URL is probed (and written) at most once
        let mut seen = HashSet::new();
        let unique: Vec<&ResourceReference> = references
            .iter()
            .filter(|r| seen.insert(r.resolved_url.as_str()))
            .collect();

        // Everything past the cap is reported, never probed
        let (retained, skipped) = unique.split_at(unique.len().min(self.options.cap));
        for &reference in skipped {
            results.insert(
                reference.resolved_url.clone(),
                ReachabilityResult::indeterminate(reference, SKIPPED_OVER_CAP),
            );
        }
        if !skipped.is_empty() {
            debug!(skipped = skipped.len(), cap = self.options.cap, "references over cap");
        }

        let mut pending = Vec::with_capacity(retained.len());
        for &reference in retained {
            let cached = self
                .cache
                .as_ref()
                .and_then(|cache| cache.get(&reference.resolved_url));
            match cached {
                Some(verdict) => {
                    results.insert(
                        reference.resolved_url.clone(),
                        ReachabilityResult::from_verdict(reference, verdict),
                    );
                }
                None => pending.push(reference),
            }
        }

        // Turn each pending reference into a future (nothing runs yet)
        let probes = pending.iter().copied().map(|reference| async move {
            let verdict = self.probe_reference(reference).await;
            (reference, verdict)
        });

        // buffer_unordered(N) keeps at most N of those futures running and
        // starts the next one as soon as any finishes. Results come back in
        // completion order, which is fine: the aggregator restores document
        // order later.
        let mut in_flight = stream::iter(probes).buffer_unordered(self.options.max_concurrency);

        // Pull results one at a time, but never wait past the deadline.
        // timeout_at (not timeout) because the deadline is absolute: each
        // loop iteration gets only what is left of the batch budget.
        loop {
            match tokio::time::timeout_at(deadline, in_flight.next()).await {
                Ok(Some((reference, verdict))) => {
                    if let Some(cache) = &self.cache {
                        cache.put(&reference.resolved_url, verdict.clone());
                    }
                    results.insert(
                        reference.resolved_url.clone(),
                        ReachabilityResult::from_verdict(reference, verdict),
                    );
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        timeout = ?self.options.overall_timeout,
                        "overall timeout reached, abandoning outstanding probes"
                    );
                    break;
                }
            }
        }
        // Dropping the stream cancels whatever is still in flight
        drop(in_flight);

        for reference in pending {
            results
                .entry(reference.resolved_url.clone())
                .or_insert_with(|| ReachabilityResult::indeterminate(reference, BATCH_TIMED_OUT));
        }

        results
    }

    async fn probe_reference(&self, reference: &ResourceReference) -> Verdict {
        let url = match Url::parse(&reference.resolved_url) {
            Ok(url) => url,
            Err(e) => {
                return Verdict {
                    status: ReachabilityStatus::Broken,
                    status_code: None,
                    message: Some(format!("malformed URL: {}", e)),
                }
            }
        };

        let outcome =
            match tokio::time::timeout(self.options.per_request_timeout, self.prober.probe(&url))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => ProbeOutcome::TimedOut,
            };
        debug!(url = %url, ?outcome, "probed");
        classify(outcome)
    }
}

/// Maps a raw probe outcome onto the tri-state verdict.
pub fn classify(outcome: ProbeOutcome) -> Verdict {
    match outcome {
        ProbeOutcome::Status(code @ 200..=399) => Verdict {
            status: ReachabilityStatus::Reachable,
            status_code: Some(code),
            message: Some(format!("HTTP {}", code)),
        },
        ProbeOutcome::Status(code) if code >= 400 => Verdict {
            status: ReachabilityStatus::Broken,
            status_code: Some(code),
            message: Some(format!("HTTP {}", code)),
        },
        ProbeOutcome::Status(code) => Verdict {
            status: ReachabilityStatus::Indeterminate,
            status_code: Some(code),
            message: Some(format!("unexpected informational status {}", code)),
        },
        ProbeOutcome::TimedOut => Verdict {
            status: ReachabilityStatus::Indeterminate,
            status_code: None,
            message: Some(REQUEST_TIMED_OUT.to_string()),
        },
        ProbeOutcome::Failed(message) => Verdict {
            status: ReachabilityStatus::Broken,
            status_code: None,
            message: Some(message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::cache::TtlCache;
    use crate::checker::extract::Category;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Clone)]
    enum Script {
        Status(u16, Duration),
        Fail,
        Hang,
    }

    // Prober that answers from a script and records what it saw
    struct ScriptedProber {
        scripts: HashMap<String, Script>,
        fallback: Script,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        probed: Mutex<Vec<String>>,
    }

    impl ScriptedProber {
        fn new(fallback: Script) -> Self {
            Self {
                scripts: HashMap::new(),
                fallback,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                probed: Mutex::new(Vec::new()),
            }
        }

        fn script(mut self, url: &str, script: Script) -> Self {
            self.scripts.insert(url.to_string(), script);
            self
        }

        fn probed(&self) -> Vec<String> {
            self.probed.lock().unwrap().clone()
        }
    }

    // Decrements the in-flight counter even when the probe is cancelled
    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, url: &Url) -> ProbeOutcome {
            self.probed.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            let script = self.scripts.get(url.as_str()).unwrap_or(&self.fallback).clone();
            match script {
                Script::Status(code, delay) => {
                    tokio::time::sleep(delay).await;
                    ProbeOutcome::Status(code)
                }
                Script::Fail => ProbeOutcome::Failed("connection refused".to_string()),
                Script::Hang => std::future::pending().await,
            }
        }
    }

    fn reference(url: &str) -> ResourceReference {
        ResourceReference {
            original_href: url.to_string(),
            resolved_url: url.to_string(),
            category: Category::ExternalLink,
        }
    }

    fn references(n: usize) -> Vec<ResourceReference> {
        (0..n)
            .map(|i| reference(&format!("https://site.example/page/{}", i)))
            .collect()
    }

    fn options() -> CheckOptions {
        CheckOptions {
            max_concurrency: 4,
            per_request_timeout: Duration::from_millis(200),
            overall_timeout: Duration::from_secs(5),
            cap: 50,
        }
    }

    const FAST_OK: Script = Script::Status(200, Duration::from_millis(1));

    #[tokio::test]
    async fn test_status_mapping_scenario() {
        let prober = ScriptedProber::new(FAST_OK)
            .script("https://site.example/ok", Script::Status(200, Duration::ZERO))
            .script("https://site.example/gone", Script::Status(404, Duration::ZERO))
            .script("https://site.example/slow", Script::Hang)
            .script("https://down.example/", Script::Fail);
        let checker = ReachabilityChecker::new(prober, options()).unwrap();

        let refs = vec![
            reference("https://site.example/ok"),
            reference("https://site.example/gone"),
            reference("https://site.example/slow"),
            reference("https://down.example/"),
        ];
        let results = checker.check(&refs).await;

        let ok = &results["https://site.example/ok"];
        assert_eq!(ok.status, ReachabilityStatus::Reachable);
        assert_eq!(ok.status_code, Some(200));

        let gone = &results["https://site.example/gone"];
        assert_eq!(gone.status, ReachabilityStatus::Broken);
        assert_eq!(gone.status_code, Some(404));

        let slow = &results["https://site.example/slow"];
        assert_eq!(slow.status, ReachabilityStatus::Indeterminate);
        assert_eq!(slow.message.as_deref(), Some(REQUEST_TIMED_OUT));

        let down = &results["https://down.example/"];
        assert_eq!(down.status, ReachabilityStatus::Broken);
        assert_eq!(down.status_code, None);
    }

    #[tokio::test]
    async fn test_exactly_once_accounting() {
        let prober = ScriptedProber::new(FAST_OK)
            .script("https://site.example/page/3", Script::Status(500, Duration::ZERO))
            .script("https://site.example/page/7", Script::Hang);
        let checker = ReachabilityChecker::new(prober, options()).unwrap();

        let refs = references(12);
        let results = checker.check(&refs).await;

        assert_eq!(results.len(), refs.len());
        let expected: HashSet<_> = refs.iter().map(|r| r.resolved_url.clone()).collect();
        let got: HashSet<_> = results.keys().cloned().collect();
        assert_eq!(expected, got);
        for (url, result) in &results {
            assert_eq!(url, &result.reference.resolved_url);
        }
    }

    #[tokio::test]
    async fn test_cap_skips_without_probing() {
        let prober = ScriptedProber::new(FAST_OK);
        let checker = ReachabilityChecker::new(
            prober,
            CheckOptions {
                cap: 4,
                ..options()
            },
        )
        .unwrap();

        let refs = references(10);
        let results = checker.check(&refs).await;

        let skipped: Vec<_> = results
            .values()
            .filter(|r| r.message.as_deref() == Some(SKIPPED_OVER_CAP))
            .collect();
        assert_eq!(skipped.len(), 6);
        assert!(skipped.iter().all(|r| r.status == ReachabilityStatus::Indeterminate));

        let probed = checker.prober.probed();
        assert_eq!(probed.len(), 4);
        let first_four: HashSet<_> = refs[..4].iter().map(|r| r.resolved_url.clone()).collect();
        assert!(probed.iter().all(|url| first_four.contains(url)));
    }

    #[tokio::test]
    async fn test_duplicate_urls_checked_once() {
        let prober = ScriptedProber::new(FAST_OK);
        let checker = ReachabilityChecker::new(
            prober,
            CheckOptions {
                cap: 2,
                ..options()
            },
        )
        .unwrap();

        let mut refs = references(3);
        refs.insert(1, refs[0].clone());
        let results = checker.check(&refs).await;

        assert_eq!(results.len(), 3);
        // The duplicate neither costs a probe nor a slot under the cap
        assert_eq!(checker.prober.probed().len(), 2);
        assert_eq!(
            results["https://site.example/page/1"].status,
            ReachabilityStatus::Reachable
        );
        assert_eq!(
            results["https://site.example/page/2"].message.as_deref(),
            Some(SKIPPED_OVER_CAP)
        );
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let prober = ScriptedProber::new(Script::Status(200, Duration::from_millis(15)));
        let checker = ReachabilityChecker::new(
            prober,
            CheckOptions {
                max_concurrency: 3,
                ..options()
            },
        )
        .unwrap();

        let results = checker.check(&references(30)).await;

        assert_eq!(results.len(), 30);
        let peak = checker.prober.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "observed {} probes in flight", peak);
        assert!(peak >= 2, "probes never overlapped");
        assert_eq!(checker.prober.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hung_probe_does_not_stall_batch() {
        let prober = ScriptedProber::new(FAST_OK)
            .script("https://site.example/page/0", Script::Hang)
            .script("https://site.example/page/2", Script::Status(404, Duration::ZERO));
        let checker = ReachabilityChecker::new(
            prober,
            CheckOptions {
                per_request_timeout: Duration::from_secs(30),
                overall_timeout: Duration::from_millis(300),
                ..options()
            },
        )
        .unwrap();

        let started = std::time::Instant::now();
        let results = checker.check(&references(6)).await;
        assert!(started.elapsed() < Duration::from_secs(3));

        let hung = &results["https://site.example/page/0"];
        assert_eq!(hung.status, ReachabilityStatus::Indeterminate);
        assert_eq!(hung.message.as_deref(), Some(BATCH_TIMED_OUT));

        assert_eq!(results["https://site.example/page/2"].status, ReachabilityStatus::Broken);
        for i in [1, 3, 4, 5] {
            let url = format!("https://site.example/page/{}", i);
            assert_eq!(results[&url].status, ReachabilityStatus::Reachable);
        }
        // The abandoned probe was cancelled, not leaked
        assert_eq!(checker.prober.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_hits_skip_probes() {
        let cache = Arc::new(TtlCache::new(Duration::from_secs(60)));
        cache.put(
            "https://site.example/page/0",
            Verdict {
                status: ReachabilityStatus::Broken,
                status_code: Some(410),
                message: Some("HTTP 410".to_string()),
            },
        );

        let prober = ScriptedProber::new(FAST_OK);
        let checker = ReachabilityChecker::new(prober, options())
            .unwrap()
            .with_cache(cache.clone());

        let results = checker.check(&references(3)).await;

        assert_eq!(results["https://site.example/page/0"].status_code, Some(410));
        assert_eq!(checker.prober.probed().len(), 2);
        // Fresh verdicts were stored for the next page
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let zero_pool = CheckOptions {
            max_concurrency: 0,
            ..CheckOptions::default()
        };
        assert!(matches!(
            ReachabilityChecker::new(ScriptedProber::new(FAST_OK), zero_pool),
            Err(ConfigError::ZeroConcurrency)
        ));

        let zero_timeout = CheckOptions {
            overall_timeout: Duration::ZERO,
            ..CheckOptions::default()
        };
        assert_eq!(
            zero_timeout.validate(),
            Err(ConfigError::ZeroTimeout("overall_timeout"))
        );
    }

    #[test]
    fn test_classify_edges() {
        assert_eq!(classify(ProbeOutcome::Status(399)).status, ReachabilityStatus::Reachable);
        assert_eq!(classify(ProbeOutcome::Status(400)).status, ReachabilityStatus::Broken);
        assert_eq!(classify(ProbeOutcome::Status(101)).status, ReachabilityStatus::Indeterminate);
    }
}
