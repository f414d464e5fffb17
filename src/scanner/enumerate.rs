//! Path enumeration sweep.
//!
//! One GET per wordlist entry against `http://<address>/<entry>`, with at
//! most `threads` requests in flight. A slot is taken before the request
//! task is spawned, so a huge wordlist never turns into a huge backlog of
//! parked tasks.

use crate::config::EnumerationProfile;
use crate::output;
use crate::scanner::traits::HttpProbe;
use crate::scanner::web::http_authority;
use indicatif::ProgressBar;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::debug;

/// Progress is reported every this many dispatched requests.
pub const PROGRESS_INTERVAL: usize = 100;

const NOT_FOUND: u16 = 404;

/// A path that answered with something other than 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub status: u16,
    pub url: String,
}

/// Totals for one sweep.
#[derive(Debug, Clone, Default)]
pub struct EnumerationReport {
    /// Requests dispatched (one per usable wordlist line).
    pub dispatched: usize,
    /// Non-404 responses, in completion order.
    pub hits: Vec<Hit>,
    /// Wall-clock duration of the sweep.
    pub elapsed: Duration,
}

/// Bounded-concurrency path prober for one target.
pub struct EnumerationEngine {
    http: Arc<dyn HttpProbe>,
    threads: usize,
    delay: Duration,
    extensions: Vec<String>,
    progress: ProgressBar,
}

impl EnumerationEngine {
    /// Create an engine with an explicit request bound and per-request delay.
    pub fn new(http: Arc<dyn HttpProbe>, threads: usize, delay: Duration) -> Self {
        Self {
            http,
            threads: threads.max(1),
            delay,
            extensions: Vec::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Create an engine from an enumeration profile.
    pub fn from_profile(http: Arc<dyn HttpProbe>, profile: &EnumerationProfile) -> Self {
        Self::new(http, profile.threads, profile.delay()).with_extensions(&profile.extensions)
    }

    /// Comma-separated extension list. Recorded only; paths are requested as-is.
    pub fn with_extensions(mut self, extensions: &str) -> Self {
        self.extensions = extensions
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Report progress and hits through `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Maximum requests in flight.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Extensions carried from the profile.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Sweep `address` with every usable line of `wordlist`.
    ///
    /// Blank lines and `#` comments are skipped. Lines that are not valid
    /// UTF-8 are decoded lossily. Transport errors are dropped silently; only
    /// a failure to read the wordlist itself is returned.
    pub async fn run<R>(&self, address: &str, mut wordlist: R) -> io::Result<EnumerationReport>
    where
        R: AsyncBufRead + Unpin,
    {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.threads));
        let mut tasks: JoinSet<Option<Hit>> = JoinSet::new();
        let mut report = EnumerationReport::default();

        debug!(
            address,
            threads = self.threads,
            delay_ms = self.delay.as_millis() as u64,
            extensions = ?self.extensions,
            "enumeration started"
        );

        let authority = http_authority(address);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if wordlist.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let entry = line.trim();
            if entry.is_empty() || entry.starts_with('#') {
                continue;
            }

            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            report.dispatched += 1;
            if report.dispatched % PROGRESS_INTERVAL == 0 {
                self.progress.set_position(report.dispatched as u64);
                debug!(address, dispatched = report.dispatched, "enumeration progress");
            }

            let url = format!("http://{}/{}", authority, entry.trim_start_matches('/'));
            let http = Arc::clone(&self.http);
            let delay = self.delay;
            let progress = self.progress.clone();

            tasks.spawn(async move {
                let _permit = permit;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                let response = http.fetch(&url).await.ok()?;
                if response.status == NOT_FOUND {
                    return None;
                }

                progress.suspend(|| output::print_hit(response.status, &url));
                Some(Hit {
                    status: response.status,
                    url,
                })
            });

            while let Some(done) = tasks.try_join_next() {
                collect(&mut report, done);
            }
        }

        while let Some(done) = tasks.join_next().await {
            collect(&mut report, done);
        }

        report.elapsed = started.elapsed();
        self.progress.set_position(report.dispatched as u64);
        Ok(report)
    }
}

fn collect(report: &mut EnumerationReport, done: Result<Option<Hit>, JoinError>) {
    match done {
        Ok(Some(hit)) => report.hits.push(hit),
        Ok(None) => {}
        Err(e) => debug!(error = %e, "enumeration request task failed"),
    }
}
