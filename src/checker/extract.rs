// src/checker/extract.rs
// =============================================================================
// Reference extraction: turns a parsed page into the list of resources the
// reachability checker should probe.
//
// What we look at, in document order:
// - <a href>                          -> InternalLink / ExternalLink
// - <img src>                         -> Image
// - <script src>                      -> Script
// - <link rel="stylesheet" href>      -> Stylesheet
//
// Every value is joined against the page URL with standard URL-joining
// rules. Anything that does not end up as an absolute http(s) URL is
// dropped (javascript:, mailto:, data:, "#top", garbage). The first
// occurrence of a resolved URL wins; later duplicates are skipped.
//
// No network I/O happens here.
//
// Rust concepts:
// - OnceLock: each CSS selector is parsed once and reused
// - Result<T, E> with a typed error: rejected references say why
// - HashSet: drops repeats while keeping document order
// =============================================================================

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::ReferenceError;

/// What kind of resource a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    InternalLink,
    ExternalLink,
    Image,
    Script,
    Stylesheet,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::InternalLink,
        Category::ExternalLink,
        Category::Image,
        Category::Script,
        Category::Stylesheet,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::InternalLink => "internal link",
            Category::ExternalLink => "external link",
            Category::Image => "image",
            Category::Script => "script",
            Category::Stylesheet => "stylesheet",
        };
        f.write_str(label)
    }
}

/// One resource referenced by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    /// The attribute value exactly as written in the markup
    pub original_href: String,
    /// Absolute http(s) URL, fragment removed
    pub resolved_url: String,
    pub category: Category,
}

fn reference_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    // A single selector keeps the matches in document order
    SELECTOR.get_or_init(|| {
        Selector::parse("a[href], img[src], script[src], link[href]")
            .expect("static selector is valid")
    })
}

// Extracts every probe-able reference from a parsed document
//
// Parameters:
//   document: the parsed page
//   base_url: the page URL, already validated by the caller
//
// Returns: references in document order, deduplicated by resolved URL
pub fn extract_references(document: &Html, base_url: &Url) -> Vec<ResourceReference> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for element in document.select(reference_selector()) {
        let Some((raw, kind)) = candidate(element) else {
            continue;
        };

        let resolved = match resolve_reference(base_url, raw) {
            Ok(url) => url,
            Err(e) => {
                debug!(href = raw, reason = %e, "discarding reference");
                continue;
            }
        };

        let category = match kind {
            Kind::Anchor if same_origin(&resolved, base_url) => Category::InternalLink,
            Kind::Anchor => Category::ExternalLink,
            Kind::Image => Category::Image,
            Kind::Script => Category::Script,
            Kind::Stylesheet => Category::Stylesheet,
        };

        let resolved_url = resolved.to_string();
        if !seen.insert(resolved_url.clone()) {
            continue;
        }

        references.push(ResourceReference {
            original_href: raw.to_string(),
            resolved_url,
            category,
        });
    }

    references
}

#[derive(Clone, Copy)]
enum Kind {
    Anchor,
    Image,
    Script,
    Stylesheet,
}

// Picks the relevant attribute for an element, or None if the element is
// not one we probe (e.g. <link rel="icon">)
fn candidate(element: ElementRef<'_>) -> Option<(&str, Kind)> {
    let el = element.value();
    match el.name() {
        "a" => el.attr("href").map(|v| (v, Kind::Anchor)),
        "img" => el.attr("src").map(|v| (v, Kind::Image)),
        "script" => el.attr("src").map(|v| (v, Kind::Script)),
        "link" => {
            let is_stylesheet = el
                .attr("rel")
                .map(|rel| {
                    rel.split_ascii_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
                })
                .unwrap_or(false);
            if is_stylesheet {
                el.attr("href").map(|v| (v, Kind::Stylesheet))
            } else {
                None
            }
        }
        _ => None,
    }
}

// Resolves a raw attribute value against the page URL
//
// Examples (base = "https://site.example/blog/"):
//   "/about"             -> https://site.example/about
//   "post#comments"      -> https://site.example/blog/post
//   "//cdn.example/a.js" -> https://cdn.example/a.js
//   "#top"               -> Err(FragmentOnly)
//   "javascript:void(0)" -> Err(UnsupportedScheme)
pub fn resolve_reference(base: &Url, href: &str) -> Result<Url, ReferenceError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(ReferenceError::Empty);
    }
    if href.starts_with('#') {
        return Err(ReferenceError::FragmentOnly);
    }

    let mut url = base.join(href)?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ReferenceError::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ReferenceError::Unparsable(url::ParseError::EmptyHost));
    }

    // "/page#a" and "/page#b" are the same resource on the wire
    url.set_fragment(None);
    Ok(url)
}

// Scheme + host + port equality. Substring checks would treat
// "https://site.example.evil.test" as internal to "https://site.example".
fn same_origin(url: &Url, base: &Url) -> bool {
    url.origin() == base.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str, base: &str) -> Vec<ResourceReference> {
        let document = Html::parse_document(html);
        extract_references(&document, &Url::parse(base).unwrap())
    }

    #[test]
    fn test_anchor_scenario() {
        let html = r#"
            <a href="/about">About</a>
            <a href="https://other.example/x">Other</a>
            <a href="javascript:void(0)">Nothing</a>
        "#;
        let refs = extract(html, "https://site.example");

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].resolved_url, "https://site.example/about");
        assert_eq!(refs[0].category, Category::InternalLink);
        assert_eq!(refs[0].original_href, "/about");
        assert_eq!(refs[1].resolved_url, "https://other.example/x");
        assert_eq!(refs[1].category, Category::ExternalLink);
    }

    #[test]
    fn test_duplicates_first_wins() {
        let html = r#"
            <a href="/docs">Docs</a>
            <a href="https://site.example/docs">Docs again</a>
            <a href="/docs#install">Install</a>
        "#;
        let refs = extract(html, "https://site.example/");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].original_href, "/docs");
    }

    #[test]
    fn test_all_categories_in_document_order() {
        let html = r#"
            <html><head>
              <link rel="stylesheet" href="/style.css">
              <link rel="icon" href="/favicon.ico">
              <script src="https://cdn.example/app.js"></script>
              <script>inline()</script>
            </head><body>
              <img src="logo.png" alt="logo">
              <img alt="no source">
              <a href="//cdn.example/page">CDN page</a>
            </body></html>
        "#;
        let refs = extract(html, "https://site.example/blog/");
        let got: Vec<_> = refs
            .iter()
            .map(|r| (r.resolved_url.as_str(), r.category))
            .collect();

        assert_eq!(
            got,
            vec![
                ("https://site.example/style.css", Category::Stylesheet),
                ("https://cdn.example/app.js", Category::Script),
                ("https://site.example/blog/logo.png", Category::Image),
                ("https://cdn.example/page", Category::ExternalLink),
            ]
        );
    }

    #[test]
    fn test_lookalike_host_is_external() {
        let html = r#"<a href="https://site.example.evil.test/login">Login</a>"#;
        let refs = extract(html, "https://site.example");
        assert_eq!(refs[0].category, Category::ExternalLink);
    }

    #[test]
    fn test_different_port_or_scheme_is_external() {
        let html = r#"
            <a href="http://site.example/plain">Plain</a>
            <a href="https://site.example:8443/admin">Admin</a>
        "#;
        let refs = extract(html, "https://site.example");
        assert!(refs.iter().all(|r| r.category == Category::ExternalLink));
    }

    #[test]
    fn test_resolve_rejections() {
        let base = Url::parse("https://site.example/page").unwrap();
        assert_eq!(resolve_reference(&base, "#top"), Err(ReferenceError::FragmentOnly));
        assert_eq!(resolve_reference(&base, "   "), Err(ReferenceError::Empty));
        assert_eq!(
            resolve_reference(&base, "mailto:team@site.example"),
            Err(ReferenceError::UnsupportedScheme("mailto".to_string()))
        );
        assert!(matches!(
            resolve_reference(&base, "http://[::1"),
            Err(ReferenceError::Unparsable(_))
        ));
    }

    #[test]
    fn test_resolve_relative_paths() {
        let base = Url::parse("https://site.example/blog/post/").unwrap();
        assert_eq!(
            resolve_reference(&base, "../other").unwrap().as_str(),
            "https://site.example/blog/other"
        );
        assert_eq!(
            resolve_reference(&base, "?page=2").unwrap().as_str(),
            "https://site.example/blog/post/?page=2"
        );
    }
}
