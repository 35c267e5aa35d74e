// src/checker/probe.rs
// =============================================================================
// Lightweight existence probes.
//
// A probe answers one question: what status does this URL return? We send a
// HEAD request (no body download) and report one of three raw outcomes:
// - Status(code): the server answered
// - TimedOut:     the request did not finish in time
// - Failed(msg):  DNS, connection refused, TLS, too many redirects, ...
//
// Turning outcomes into Reachable / Broken / Indeterminate is the checker's
// job (see reachability.rs). Probes are never retried.
//
// The Prober trait is the seam between the checker and the network, so the
// checker can be driven by scripted probers in tests.
//
// Rust concepts:
// - async-trait: async methods in a trait, so Prober can be a trait object
// - Send + Sync bounds: one prober is shared by every in-flight probe
// - Error introspection: reqwest::Error tells timeouts from connect failures
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::trace;
use url::Url;

/// What a single probe observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Status(u16),
    TimedOut,
    Failed(String),
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &Url) -> ProbeOutcome;
}

/// Probes over HTTP with a shared reqwest client (connection pooling).
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    // Builds a prober whose client gives up after `timeout`
    //
    // The checker also enforces the per-request timeout on its side; the
    // client timeout just lets reqwest tear the connection down itself.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        // A moved resource still exists, so follow a few hops before judging
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("seo-audit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &Url) -> ProbeOutcome {
        // Any answer from the server is a Status, even 4xx/5xx; only
        // transport problems end up in the Err arm
        let outcome = match self.client.head(url.as_str()).send().await {
            Ok(response) => ProbeOutcome::Status(response.status().as_u16()),
            Err(e) => categorize_error(e),
        };
        trace!(%url, ?outcome, "probe finished");
        outcome
    }
}

// Maps a transport error onto TimedOut or Failed with a short reason
fn categorize_error(error: reqwest::Error) -> ProbeOutcome {
    // Checked first: a timed-out connect is a timeout, not a connect failure
    if error.is_timeout() {
        return ProbeOutcome::TimedOut;
    }

    let message = if error.is_redirect() {
        "too many redirects".to_string()
    } else if error.is_connect() {
        // DNS failures and refused connections both surface as connect errors
        let detail = std::error::Error::source(&error)
            .map(|s| s.to_string())
            .unwrap_or_default();
        if detail.is_empty() {
            "connection failed".to_string()
        } else {
            format!("connection failed: {}", detail)
        }
    } else {
        error.to_string()
    };

    ProbeOutcome::Failed(message)
}
