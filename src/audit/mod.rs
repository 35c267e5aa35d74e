// src/audit/mod.rs
// =============================================================================
// Audits one page end to end:
//
//   fetch page -> parse -> SEO signals + extract references
//              -> reachability check -> aggregate -> PageAudit
//
// The parsed document is dropped before the first probe is awaited, so only
// owned data crosses await points.
//
// Rust concepts:
// - Generics: Auditor<P> works with any Prober, real or scripted
// - #[serde(skip)]: the raw batch stays out of the JSON report
// =============================================================================

mod page;
mod signals;
mod summary;

pub use page::{build_client, fetch_page, FetchedPage};
pub use signals::{
    analyze_anchor_texts, analyze_headings, analyze_images, analyze_metadata, analyze_page,
    AnchorTextSignals, HeadingSignals, ImageSignals, MetadataSignals, PageSignals,
};
pub use summary::{aggregate, AuditBatch, AuditSummary, StatusCounts};

use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use tracing::info;

use crate::checker::{extract_references, Prober, ReachabilityChecker, ResourceReference};
use crate::error::FetchError;

/// How much of the page to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditMode {
    /// SEO signals and reference reachability
    Full,
    /// Reference reachability only
    LinksOnly,
}

/// Everything the report needs for one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageAudit {
    pub page: FetchedPage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<PageSignals>,
    pub summary: AuditSummary,
    #[serde(skip)]
    pub batch: AuditBatch,
}

pub struct Auditor<P> {
    client: Client,
    checker: ReachabilityChecker<P>,
}

impl<P: Prober> Auditor<P> {
    pub fn new(client: Client, checker: ReachabilityChecker<P>) -> Self {
        Self { client, checker }
    }

    pub async fn audit(&self, url: &str, mode: AuditMode) -> Result<PageAudit, FetchError> {
        let page = fetch_page(&self.client, url).await?;

        let (references, signals) = {
            let document = Html::parse_document(&page.html);
            let references = extract_references(&document, &page.final_url);
            let signals = match mode {
                AuditMode::Full => Some(analyze_page(&document, &page.final_url)),
                AuditMode::LinksOnly => None,
            };
            (references, signals)
        };
        info!(url = %page.final_url, references = references.len(), "extracted references");

        let batch = check_references(&self.checker, references).await;
        let summary = aggregate(&batch);

        Ok(PageAudit {
            page,
            signals,
            summary,
            batch,
        })
    }
}

// Runs the checker over an already-extracted reference list
pub async fn check_references<P: Prober>(
    checker: &ReachabilityChecker<P>,
    references: Vec<ResourceReference>,
) -> AuditBatch {
    let results = checker.check(&references).await;
    AuditBatch {
        references,
        results,
        cap: checker.options().cap,
    }
}
