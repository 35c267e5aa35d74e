// src/main.rs
// =============================================================================
// Entry point of the seo-audit CLI.
//
// 1. Parse command-line arguments (clap)
// 2. Set up logging (tracing, to stderr so --json output stays clean)
// 3. Audit each page, sharing one verdict cache across pages
// 4. Print the report (pages that could not be fetched included) and exit:
//    0 = clean, 1 = broken resources or a failed page, 2 = nothing audited
//
// Rust concepts used:
// - #[tokio::main]: turns async fn main into a runtime entry point
// - anyhow::Context: setup errors carry a readable explanation
// - Arc: the verdict cache is shared by the checker and the page loop
// =============================================================================

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{AuditArgs, Cli, Commands};
use seo_audit::audit::{build_client, AuditMode, Auditor};
use seo_audit::checker::{HttpProber, ReachabilityChecker, ResultCache, TtlCache};
use seo_audit::report::{print_reports, PageReport};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

// Returns:
//   Ok(0) = nothing broken
//   Ok(1) = at least one broken resource, or some page could not be fetched
//   Ok(2) = no page could be fetched
//   Err   = setup failure (bad options, client construction)
async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Audit(args) => handle_audit(args, AuditMode::Full).await,
        Commands::Links(args) => handle_audit(args, AuditMode::LinksOnly).await,
    }
}

async fn handle_audit(args: AuditArgs, mode: AuditMode) -> Result<i32> {
    let options = args.checker.check_options();
    let prober = HttpProber::new(options.per_request_timeout)
        .context("failed to create probe client")?;
    let cache = Arc::new(TtlCache::new(Duration::from_secs(args.checker.cache_ttl_secs)));
    let checker = ReachabilityChecker::new(prober, options)
        .context("invalid checker options")?
        .with_cache(Arc::clone(&cache) as Arc<dyn ResultCache>);

    let client = build_client(Duration::from_millis(args.checker.fetch_timeout_ms))
        .context("failed to create page client")?;
    let auditor = Auditor::new(client, checker);

    // One entry per requested URL, in command-line order
    let mut reports = Vec::with_capacity(args.urls.len());
    for url in &args.urls {
        // Verdicts that aged out while the previous page ran are dropped here
        let purged = cache.purge_expired();
        if purged > 0 {
            debug!(purged, "dropped expired cache entries");
        }

        info!(url = %url, "auditing page");
        match auditor.audit(url, mode).await {
            Ok(audit) => reports.push(PageReport::Audited(audit)),
            Err(e) => {
                warn!(url = %url, error = %e, "could not audit page");
                eprintln!("⚠️  Could not fetch {}: {}", url, e);
                reports.push(PageReport::Failed {
                    url: url.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    print_reports(&reports, args.json)?;

    if reports.iter().all(PageReport::is_failed) {
        return Ok(2);
    }
    let broken = reports.iter().any(PageReport::has_broken);
    let failed = reports.iter().any(PageReport::is_failed);
    if broken || failed {
        Ok(1)
    } else {
        Ok(0)
    }
}
