// src/audit/signals.rs
// =============================================================================
// On-page SEO signals read straight from the parsed document:
// - title and meta description (text + length)
// - H1 headings
// - anchor texts (links with no visible text)
// - images without alt text
//
// Pure functions over the DOM; the network side of the audit lives in
// checker/.
//
// Rust concepts:
// - macro_rules!: one macro declares each cached selector
// - Iterator adapters: counts and lists come straight from select() chains
// =============================================================================

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataSignals {
    pub title: Option<String>,
    pub title_length: usize,
    pub meta_description: Option<String>,
    pub meta_description_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingSignals {
    pub h1_count: usize,
    pub h1_texts: Vec<String>,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorTextSignals {
    pub total_anchors: usize,
    pub empty_anchor_texts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSignals {
    pub total_images: usize,
    /// Resolved src (or the raw value when it does not resolve), document order
    pub missing_alt: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSignals {
    pub metadata: MetadataSignals,
    pub headings: HeadingSignals,
    pub anchors: AnchorTextSignals,
    pub images: ImageSignals,
}

pub fn analyze_page(document: &Html, base_url: &Url) -> PageSignals {
    PageSignals {
        metadata: analyze_metadata(document),
        headings: analyze_headings(document),
        anchors: analyze_anchor_texts(document),
        images: analyze_images(document, base_url),
    }
}

macro_rules! selector {
    ($css:literal) => {{
        static SELECTOR: OnceLock<Selector> = OnceLock::new();
        SELECTOR.get_or_init(|| Selector::parse($css).expect("static selector is valid"))
    }};
}

// Collapses the element's text nodes into one trimmed, single-spaced string
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn analyze_metadata(document: &Html) -> MetadataSignals {
    let title = document
        .select(selector!("title"))
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    let meta_description = document
        .select(selector!("meta[name]"))
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case("description"))
        })
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    MetadataSignals {
        title_length: title.as_ref().map_or(0, |t| t.chars().count()),
        title,
        meta_description_length: meta_description.as_ref().map_or(0, |d| d.chars().count()),
        meta_description,
    }
}

pub fn analyze_headings(document: &Html) -> HeadingSignals {
    let h1_texts: Vec<String> = document.select(selector!("h1")).map(element_text).collect();

    let suggestion = match h1_texts.len() {
        0 => "Add a main H1 tag to the page",
        1 => "Looks good",
        _ => "Use only one main H1 tag for better SEO",
    };

    HeadingSignals {
        h1_count: h1_texts.len(),
        h1_texts,
        suggestion: suggestion.to_string(),
    }
}

pub fn analyze_anchor_texts(document: &Html) -> AnchorTextSignals {
    let mut total = 0;
    let mut empty = 0;
    for anchor in document.select(selector!("a")) {
        total += 1;
        // An image with alt text inside the link still gives it a label
        let has_img_label = anchor
            .select(selector!("img[alt]"))
            .any(|img| img.value().attr("alt").is_some_and(|a| !a.trim().is_empty()));
        if element_text(anchor).is_empty() && !has_img_label {
            empty += 1;
        }
    }

    AnchorTextSignals {
        total_anchors: total,
        empty_anchor_texts: empty,
    }
}

pub fn analyze_images(document: &Html, base_url: &Url) -> ImageSignals {
    let mut total = 0;
    let mut missing_alt = Vec::new();
    for img in document.select(selector!("img")) {
        total += 1;
        let alt = img.value().attr("alt").map(str::trim).unwrap_or("");
        if alt.is_empty() {
            let src = img.value().attr("src").unwrap_or("").trim();
            let shown = base_url
                .join(src)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| src.to_string());
            missing_alt.push(shown);
        }
    }

    ImageSignals {
        total_images: total,
        missing_alt,
    }
}
