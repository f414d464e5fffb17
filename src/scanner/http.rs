//! reqwest-backed HTTP probe.

use crate::error::{ProbeError, ProbeResult};
use crate::scanner::traits::{HttpProbe, WebResponse};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

/// HTTP probe with a fixed timeout and certificate policy.
///
/// Redirects are not followed: a 301 from the target is itself the
/// interesting answer during enumeration.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: Client,
}

impl ReqwestProbe {
    /// Build a probe. With `accept_invalid_certs`, TLS certificate and
    /// hostname validation are skipped.
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> ProbeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(Policy::none())
            .user_agent(concat!("outrider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Http(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn fetch(&self, url: &str) -> ProbeResult<WebResponse> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Http(e.to_string())
            }
        })?;

        let mut web = WebResponse::new(response.status().as_u16());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                web.insert_header(name.as_str(), value);
            }
        }

        Ok(web)
    }
}
