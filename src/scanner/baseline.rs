//! Baseline probe output parsing.
//!
//! Prober output is free text. Parsing is line-oriented and tolerant: lines
//! that do not look like findings are ignored, and anything not found falls
//! back to a sentinel.

use crate::types::OS_SENTINEL;

const PROTOCOL_MARKER: &str = "/tcp";
const OPEN_MARKER: &str = "open";
const OS_DETAILS_MARKER: &str = "OS details:";
const RUNNING_MARKER: &str = "Running:";

/// What the baseline phase extracted from one probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineFindings {
    /// `port/proto` tokens, in output order.
    pub open_ports: Vec<String>,
    /// Service names aligned with `open_ports`.
    pub services: Vec<String>,
    /// OS signature, or the `DETECTION_FAILED` sentinel.
    pub os_signature: String,
}

impl BaselineFindings {
    /// Whether the probe reported any OS hint.
    pub fn os_detected(&self) -> bool {
        self.os_signature != OS_SENTINEL
    }
}

/// Parse raw prober text.
///
/// - A line containing both `/tcp` and `open` is an open-port line; its
///   first token is the port and its third token the service.
/// - A line containing `OS details:` or `Running:` is an OS hint; the text
///   after the first colon becomes the signature. The last hint wins.
pub fn parse_baseline(text: &str) -> BaselineFindings {
    let mut open_ports = Vec::new();
    let mut services = Vec::new();
    let mut os_signature = None;

    for line in text.lines() {
        if line.contains(PROTOCOL_MARKER) && line.contains(OPEN_MARKER) {
            let mut tokens = line.split_whitespace();
            if let (Some(port), Some(_state), Some(service)) =
                (tokens.next(), tokens.next(), tokens.next())
            {
                open_ports.push(port.to_string());
                services.push(service.to_string());
            }
        }

        if line.contains(OS_DETAILS_MARKER) || line.contains(RUNNING_MARKER) {
            if let Some((_, hint)) = line.split_once(':') {
                os_signature = Some(hint.trim().to_string());
            }
        }
    }

    BaselineFindings {
        open_ports,
        services,
        os_signature: os_signature.unwrap_or_else(|| OS_SENTINEL.to_string()),
    }
}
