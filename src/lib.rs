// src/lib.rs
// =============================================================================
// seo-audit: audits a single web page for on-page SEO signals and checks
// that every resource it references (links, images, scripts, stylesheets)
// is actually reachable.
//
// Modules:
// - checker: reference extraction and bounded concurrent reachability checks
// - audit:   page fetch, SEO signals, aggregation into a summary
// - report:  terminal / JSON rendering
// - error:   typed errors
// =============================================================================

pub mod audit;
pub mod checker;
pub mod error;
pub mod report;
