// src/report.rs
// =============================================================================
// Renders finished audits for the terminal: a human-readable report or
// pretty JSON (for CI pipelines and other tools).
//
// Each URL on the command line yields one PageReport: either a finished
// audit or the reason the page could not be fetched. JSON output carries
// both, so a consumer can tell which page failed.
//
// Rust concepts:
// - fmt::Write: the same writeln! macro works on a String as on stdout
// - Serde enum tagging: `outcome` tells the two kinds of entry apart in JSON
// =============================================================================

use std::fmt::{self, Write};

use anyhow::Result;
use serde::Serialize;

use crate::audit::{PageAudit, PageSignals};
use crate::checker::{Category, ReachabilityResult, ReachabilityStatus};

/// What happened to one requested URL.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PageReport {
    Audited(PageAudit),
    Failed { url: String, error: String },
}

impl PageReport {
    pub fn has_broken(&self) -> bool {
        match self {
            PageReport::Audited(audit) => audit.summary.has_broken(),
            PageReport::Failed { .. } => false,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PageReport::Failed { .. })
    }
}

pub fn print_reports(reports: &[PageReport], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }

    let mut out = String::new();
    for report in reports {
        match report {
            PageReport::Audited(audit) => render_text(&mut out, audit)?,
            PageReport::Failed { url, error } => render_failure(&mut out, url, error)?,
        }
    }
    print!("{}", out);
    Ok(())
}

pub fn render_failure(out: &mut impl Write, url: &str, error: &str) -> fmt::Result {
    writeln!(out, "🔍 {}", url)?;
    writeln!(out, "   ⚠️  Could not fetch the page: {}", error)?;
    writeln!(out)
}

pub fn render_text(out: &mut impl Write, audit: &PageAudit) -> fmt::Result {
    let page = &audit.page;

    writeln!(out, "🔍 {}", page.requested_url)?;
    if page.redirected {
        writeln!(
            out,
            "   ↪ final URL: {} ({} redirect(s))",
            page.final_url, page.redirect_count
        )?;
    }
    writeln!(out, "   HTTP {}", page.status_code)?;

    if let Some(signals) = &audit.signals {
        render_signals(out, signals)?;
    }

    let summary = &audit.summary;
    writeln!(out, "\n🌐 Referenced resources")?;
    writeln!(
        out,
        "{:<16} {:>6} {:>6} {:>7} {:>8}",
        "CATEGORY", "TOTAL", "OK", "BROKEN", "UNKNOWN"
    )?;
    writeln!(out, "{}", "=".repeat(47))?;
    for category in Category::ALL {
        if let Some(counts) = summary.by_category.get(&category) {
            writeln!(
                out,
                "{:<16} {:>6} {:>6} {:>7} {:>8}",
                category.to_string(),
                counts.total,
                counts.reachable,
                counts.broken,
                counts.indeterminate
            )?;
        }
    }

    if !summary.broken_list.is_empty() {
        writeln!(out, "\n❌ Broken:")?;
        for result in &summary.broken_list {
            render_result(out, result)?;
        }
    }
    if !summary.indeterminate_list.is_empty() {
        writeln!(out, "\n⏱️  Could not determine:")?;
        for result in &summary.indeterminate_list {
            render_result(out, result)?;
        }
    }

    writeln!(out, "\n📊 Summary:")?;
    writeln!(out, "   ✅ OK: {}", summary.reachable_count)?;
    writeln!(out, "   ❌ Broken: {}", summary.broken_count)?;
    writeln!(out, "   ❔ Indeterminate: {}", summary.indeterminate_count)?;
    writeln!(out, "   📋 Total: {}", summary.total)?;
    writeln!(out)
}

fn render_signals(out: &mut impl Write, signals: &PageSignals) -> fmt::Result {
    let meta = &signals.metadata;
    writeln!(out, "\n🏷️  Title & meta description")?;
    writeln!(
        out,
        "   Title ({} chars): {}",
        meta.title_length,
        meta.title.as_deref().unwrap_or("No title found")
    )?;
    writeln!(
        out,
        "   Meta description ({} chars): {}",
        meta.meta_description_length,
        meta.meta_description
            .as_deref()
            .unwrap_or("No meta description found")
    )?;

    let headings = &signals.headings;
    writeln!(
        out,
        "\n🔖 H1 tags: {} ({})",
        headings.h1_count, headings.suggestion
    )?;
    for text in &headings.h1_texts {
        writeln!(out, "   - {}", text)?;
    }

    let anchors = &signals.anchors;
    writeln!(
        out,
        "\n⚓ Anchors: {} total, {} without text",
        anchors.total_anchors, anchors.empty_anchor_texts
    )?;

    let images = &signals.images;
    writeln!(
        out,
        "\n🖼️  Images: {} total, {} missing alt text",
        images.total_images,
        images.missing_alt.len()
    )?;
    for src in &images.missing_alt {
        writeln!(out, "   - {}", src)?;
    }
    Ok(())
}

fn render_result(out: &mut impl Write, result: &ReachabilityResult) -> fmt::Result {
    let url = &result.reference.resolved_url;
    // Truncate long URLs so the columns stay readable
    let url_display = if url.chars().count() > 57 {
        format!("{}...", url.chars().take(57).collect::<String>())
    } else {
        url.clone()
    };
    writeln!(
        out,
        "   {:<60} {:<10} {:<14} {}",
        url_display,
        format_status(result.status),
        result.reference.category.to_string(),
        result.message.as_deref().unwrap_or("")
    )
}

fn format_status(status: ReachabilityStatus) -> &'static str {
    match status {
        ReachabilityStatus::Reachable => "✅ OK",
        ReachabilityStatus::Broken => "❌ BROKEN",
        ReachabilityStatus::Indeterminate => "❔ UNKNOWN",
    }
}
