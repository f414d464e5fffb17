//! Capabilities the pipeline drives.
//!
//! The baseline prober and the HTTP client are external collaborators. They
//! sit behind these traits so the parsing and classification logic can be
//! exercised with scripted doubles.

use crate::error::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::HashMap;

/// One baseline probe invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Address passed as the final argument.
    pub address: String,
    /// Flags from the selected baseline profile.
    pub flags: Vec<String>,
    /// Comma-joined ports, or `None` to let the profile decide (full range).
    pub ports: Option<String>,
}

impl ProbeRequest {
    /// Build the argument vector: `[...flags, -p <ports>, address]`.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.flags.clone();
        if let Some(ports) = &self.ports {
            args.push("-p".to_string());
            args.push(ports.clone());
        }
        args.push(self.address.clone());
        args
    }
}

/// Captured prober output.
///
/// A failed run still carries whatever text was produced; the pipeline
/// parses it regardless.
#[derive(Debug, Default)]
pub struct ProbeOutput {
    /// Combined stdout and stderr.
    pub text: String,
    /// Set when the process could not be launched or exited non-zero.
    pub failure: Option<ProbeError>,
}

impl ProbeOutput {
    /// Output of a successful run.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failure: None,
        }
    }

    /// Output of a failed run with the partial text it produced.
    pub fn failed(text: impl Into<String>, failure: ProbeError) -> Self {
        Self {
            text: text.into(),
            failure: Some(failure),
        }
    }
}

/// Baseline port/service discovery.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Name of the underlying tool, for logs.
    fn name(&self) -> &str;

    /// Run one probe and capture its text.
    async fn probe(&self, request: &ProbeRequest) -> ProbeOutput;
}

/// The parts of an HTTP response the classifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebResponse {
    /// HTTP status code.
    pub status: u16,
    headers: HashMap<String, String>,
}

impl WebResponse {
    /// Create a response with no headers.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
        }
    }

    /// Add a header. Names are case-insensitive.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Add a header in place.
    pub fn insert_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether a header is present with a non-empty value.
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some_and(|v| !v.is_empty())
    }
}

/// Single-shot HTTP GET with the timeout and TLS policy fixed at construction.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// Fetch `url`. Transport failures (connect, TLS, timeout) are errors;
    /// any HTTP status is a successful response.
    async fn fetch(&self, url: &str) -> ProbeResult<WebResponse>;
}
