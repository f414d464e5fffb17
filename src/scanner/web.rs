//! Web classification: server banner and edge-protection signals.

use crate::scanner::traits::{HttpProbe, WebResponse};
use crate::types::OS_SENTINEL;
use std::borrow::Cow;
use std::fmt;
use std::net::Ipv6Addr;
use tracing::debug;

const SERVER_HEADER: &str = "server";
const CLOUDFLARE_HEADER: &str = "cf-ray";
const AKAMAI_HEADER: &str = "x-akamai-transformed";

/// Front-line CDN / WAF provider inferred from response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeProvider {
    Cloudflare,
    Akamai,
}

impl fmt::Display for EdgeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloudflare => write!(f, "Cloudflare"),
            Self::Akamai => write!(f, "Akamai"),
        }
    }
}

/// Resolve the edge provider. Explicit provider headers take priority over
/// the `Server` banner; the first match wins.
pub fn detect_edge(response: &WebResponse) -> Option<EdgeProvider> {
    if response.has_header(CLOUDFLARE_HEADER) {
        return Some(EdgeProvider::Cloudflare);
    }
    if response.has_header(AKAMAI_HEADER) {
        return Some(EdgeProvider::Akamai);
    }

    response
        .header(SERVER_HEADER)
        .filter(|server| server.to_ascii_lowercase().contains("cloudflare"))
        .map(|_| EdgeProvider::Cloudflare)
}

/// Fold a web response into an OS signature.
///
/// The server banner is appended in parentheses, or replaces the
/// `DETECTION_FAILED` sentinel outright. A resolved edge provider is then
/// appended as `[EDGE: <provider>]`.
pub fn compose_signature(os_signature: &str, response: &WebResponse) -> String {
    let mut signature = os_signature.to_string();

    if let Some(server) = response.header(SERVER_HEADER).filter(|s| !s.is_empty()) {
        signature = if signature == OS_SENTINEL {
            server.to_string()
        } else {
            format!("{} ({})", signature, server)
        };
    }

    if let Some(edge) = detect_edge(response) {
        signature = format!("{} [EDGE: {}]", signature, edge);
    }

    signature
}

/// URL authority for `address`. Bare IPv6 literals are bracketed.
pub fn http_authority(address: &str) -> Cow<'_, str> {
    if address.parse::<Ipv6Addr>().is_ok() {
        Cow::Owned(format!("[{}]", address))
    } else {
        Cow::Borrowed(address)
    }
}

/// Fetch `https://<address>` first, then `http://<address>`.
///
/// Returns `None` when both attempts fail.
pub async fn fetch_landing(http: &dyn HttpProbe, address: &str) -> Option<WebResponse> {
    let authority = http_authority(address);
    let secure = format!("https://{}", authority);
    match http.fetch(&secure).await {
        Ok(response) => return Some(response),
        Err(e) => debug!(url = %secure, error = %e, "secure fetch failed, falling back"),
    }

    let plain = format!("http://{}", authority);
    match http.fetch(&plain).await {
        Ok(response) => Some(response),
        Err(e) => {
            debug!(url = %plain, error = %e, "web fetch failed");
            None
        }
    }
}
