//! Scripted stand-ins for the prober and the HTTP client.
//!
//! Both return canned answers, record what they were asked, and track how
//! many calls were in flight at once so callers can assert on concurrency
//! bounds.

use crate::error::{ProbeError, ProbeResult};
use crate::scanner::traits::{HttpProbe, ProbeOutput, ProbeRequest, Prober, WebResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Counts concurrent calls and remembers the peak.
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Prober returning canned text per address.
#[derive(Debug, Default)]
pub struct ScriptedProber {
    outputs: HashMap<String, String>,
    default_output: String,
    failing: bool,
    latency: Duration,
    requests: Mutex<Vec<ProbeRequest>>,
    in_flight: InFlight,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text returned for `address`.
    pub fn with_output(mut self, address: &str, text: impl Into<String>) -> Self {
        self.outputs.insert(address.to_string(), text.into());
        self
    }

    /// Text returned for any address without its own script.
    pub fn with_default_output(mut self, text: impl Into<String>) -> Self {
        self.default_output = text.into();
        self
    }

    /// Report every run as a non-zero exit (text is still returned).
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Simulated run time per probe.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most probes ever running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(&self, request: &ProbeRequest) -> ProbeOutput {
        self.in_flight.enter();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let text = self
            .outputs
            .get(&request.address)
            .cloned()
            .unwrap_or_else(|| self.default_output.clone());
        self.in_flight.leave();

        if self.failing {
            ProbeOutput::failed(
                text,
                ProbeError::ExitStatus {
                    tool: "scripted".to_string(),
                    code: Some(1),
                },
            )
        } else {
            ProbeOutput::ok(text)
        }
    }
}

/// HTTP probe answering from a URL table.
///
/// URLs with no scripted response get `default_status` if one is set, and a
/// connection error otherwise.
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    responses: HashMap<String, WebResponse>,
    default_status: Option<u16>,
    latency: Duration,
    requested: Mutex<Vec<String>>,
    in_flight: InFlight,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response returned for `url`.
    pub fn with_response(mut self, url: &str, response: WebResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Status returned for any unscripted URL.
    pub fn with_default_status(mut self, status: u16) -> Self {
        self.default_status = Some(status);
        self
    }

    /// Simulated round-trip time per request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// URLs fetched so far, in arrival order.
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most requests ever in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.in_flight.peak()
    }
}

#[async_trait]
impl HttpProbe for ScriptedHttp {
    async fn fetch(&self, url: &str) -> ProbeResult<WebResponse> {
        self.in_flight.enter();
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let result = match (self.responses.get(url), self.default_status) {
            (Some(response), _) => Ok(response.clone()),
            (None, Some(status)) => Ok(WebResponse::new(status)),
            (None, None) => Err(ProbeError::Http(format!("connection refused: {}", url))),
        };
        self.in_flight.leave();
        result
    }
}
