// src/audit/page.rs
// =============================================================================
// Fetches the page under audit: one GET, redirects followed.
//
// Besides the HTML we keep the final URL, the status code and how many
// redirects it took to get there; the report shows these as the page's
// accessibility check. Relative references are resolved against the final
// URL, since that is where the browser ends up.
//
// We follow redirects ourselves (the client is built with
// Policy::none()) so every hop can be counted. reqwest's own redirect
// handling only hands back the final response.
//
// Rust concepts:
// - loop with break value: the redirect loop yields the final response
// - let-else: leave the loop as soon as a response is not a redirect
// - thiserror: FetchError converts from reqwest::Error through `?`
// =============================================================================

use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::error::FetchError;

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct FetchedPage {
    pub requested_url: String,
    pub final_url: Url,
    pub status_code: u16,
    pub redirected: bool,
    /// Number of redirect hops between the requested and the final URL
    pub redirect_count: usize,
    #[serde(skip)]
    pub html: String,
}

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(concat!("seo-audit/", env!("CARGO_PKG_VERSION")))
        .build()
}

// Fetches a web page and returns its HTML content plus where it ended up
pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage, FetchError> {
    let requested = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;

    let mut current = requested.clone();
    let mut redirect_count = 0;
    let response = loop {
        let response = client.get(current.as_str()).send().await?;
        let Some(next) = redirect_target(&current, &response) else {
            break response;
        };
        if redirect_count == MAX_REDIRECTS {
            return Err(FetchError::TooManyRedirects {
                limit: MAX_REDIRECTS,
            });
        }
        redirect_count += 1;
        debug!(from = %current, to = %next, hop = redirect_count, "following redirect");
        current = next;
    };

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
        });
    }

    let html = response.text().await?;
    info!(url = %current, bytes = html.len(), redirects = redirect_count, "fetched page");

    Ok(FetchedPage {
        requested_url: url.to_string(),
        redirected: current != requested,
        final_url: current,
        status_code: status.as_u16(),
        redirect_count,
        html,
    })
}

// Where a 3xx response points, resolved against the URL that produced it.
// None for anything that is not a usable redirect (a 3xx without Location
// then fails the status check like any other non-success answer).
fn redirect_target(current: &Url, response: &Response) -> Option<Url> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}
