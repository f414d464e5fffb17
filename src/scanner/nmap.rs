//! Subprocess-backed baseline prober.
//!
//! Runs the external discovery tool (nmap by default) as a child process and
//! hands back its combined stdout/stderr. The process has no timeout of its
//! own; a run ends when the tool exits.

use crate::error::{ProbeError, ProbeResult};
use crate::scanner::traits::{ProbeOutput, ProbeRequest, Prober};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Default prober binary.
pub const DEFAULT_PROBER: &str = "nmap";

/// Runs the prober binary once per request.
#[derive(Debug, Clone)]
pub struct NmapProber {
    binary: String,
}

impl NmapProber {
    /// Create a prober that invokes `binary`.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve the binary on `PATH`.
    pub fn ensure_available(&self) -> ProbeResult<PathBuf> {
        which::which(&self.binary).map_err(|_| ProbeError::ToolMissing(self.binary.clone()))
    }
}

impl Default for NmapProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBER)
    }
}

#[async_trait]
impl Prober for NmapProber {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn probe(&self, request: &ProbeRequest) -> ProbeOutput {
        let args = request.args();
        debug!(tool = %self.binary, ?args, "launching prober");

        let output = match Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(source) => {
                return ProbeOutput::failed(
                    String::new(),
                    ProbeError::Spawn {
                        tool: self.binary.clone(),
                        source,
                    },
                )
            }
        };

        let text = combine_output(&output.stdout, &output.stderr);

        if output.status.success() {
            ProbeOutput::ok(text)
        } else {
            ProbeOutput::failed(
                text,
                ProbeError::ExitStatus {
                    tool: self.binary.clone(),
                    code: output.status.code(),
                },
            )
        }
    }
}

/// Stdout followed by stderr, line-separated so the last stdout line and the
/// first stderr line never merge.
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut text = String::from_utf8_lossy(stdout).into_owned();
    if !text.is_empty() && !text.ends_with('\n') && !stderr.is_empty() {
        text.push('\n');
    }
    text.push_str(&String::from_utf8_lossy(stderr));
    text
}
