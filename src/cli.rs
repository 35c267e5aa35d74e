// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   seo-audit audit https://example.com            full on-page audit
//   seo-audit links https://example.com --json     resource checks only
//
// Rust concepts:
// - Derive macros: clap builds the parser from struct definitions
// - #[command(flatten)]: both subcommands share the checker flags
// =============================================================================

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use seo_audit::checker::CheckOptions;

#[derive(Parser, Debug)]
#[command(
    name = "seo-audit",
    version,
    about = "Audit a web page for on-page SEO signals and broken resources",
    long_about = "seo-audit fetches a page, reports its title, meta description, headings and \
                  image alt text, and checks every link, image, script and stylesheet it \
                  references. Exit code 1 means something is broken."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Full audit: SEO signals plus resource reachability
    ///
    /// Example: seo-audit audit https://example.com
    Audit(AuditArgs),

    /// Only check that the page's references are reachable
    ///
    /// Example: seo-audit links https://example.com --cap 200
    Links(AuditArgs),
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Page URL(s) to audit; each page is audited on its own
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Output results in JSON format instead of a report
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub checker: CheckerArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CheckerArgs {
    /// Maximum number of probes in flight at once
    #[arg(long, default_value_t = 16)]
    pub max_concurrency: usize,

    /// Timeout for a single probe, in milliseconds
    #[arg(long, default_value_t = 5_000)]
    pub request_timeout_ms: u64,

    /// Time budget for checking one page's references, in milliseconds
    #[arg(long, default_value_t = 45_000)]
    pub overall_timeout_ms: u64,

    /// Maximum number of references probed per page
    #[arg(long, default_value_t = 50)]
    pub cap: usize,

    /// Timeout for fetching the page itself, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub fetch_timeout_ms: u64,

    /// How long a verdict is reused when several pages share a resource, in seconds
    #[arg(long, default_value_t = 300)]
    pub cache_ttl_secs: u64,
}

impl CheckerArgs {
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            max_concurrency: self.max_concurrency,
            per_request_timeout: Duration::from_millis(self.request_timeout_ms),
            overall_timeout: Duration::from_millis(self.overall_timeout_ms),
            cap: self.cap,
        }
    }
}
