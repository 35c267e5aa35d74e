// src/error.rs
// =============================================================================
// Typed errors for the library surface.
//
// Per-reference failures (404s, DNS errors, timeouts) are NOT errors here:
// they are recorded as data in ReachabilityResult. These types cover the
// few things that really are errors:
// - ConfigError: the caller passed checker options that make no sense
// - ReferenceError: an href/src could not become a fetchable absolute URL
// - FetchError: the audited page itself could not be fetched
// =============================================================================

use thiserror::Error;

/// Invalid checker configuration. Raised once, when the checker is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Why a raw attribute value was rejected during extraction.
///
/// Rejected references never reach the checker and are never reported as
/// broken: they were never valid candidates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("empty reference")]
    Empty,

    #[error("fragment-only reference points at the page itself")]
    FragmentOnly,

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("unparsable reference: {0}")]
    Unparsable(#[from] url::ParseError),
}

/// Failure to fetch the page under audit.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("more than {limit} redirects")]
    TooManyRedirects { limit: usize },

    #[error("page returned HTTP {status}")]
    Status { status: u16 },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}
