//! Scanner module - schedules per-target pipelines.
//!
//! [`ScanScheduler`] walks the loaded targets in address order and runs one
//! [`PhaseExecutor`] pipeline per target, with at most `concurrency`
//! pipelines alive at once. A permit is taken before each pipeline task is
//! created and released when the task ends.

pub mod baseline;
pub mod enumerate;
pub mod http;
pub mod nmap;
pub mod pipeline;
pub mod scripted;
pub mod traits;
pub mod web;

pub use baseline::{parse_baseline, BaselineFindings};
pub use enumerate::{EnumerationEngine, EnumerationReport, Hit};
pub use http::ReqwestProbe;
pub use nmap::{NmapProber, DEFAULT_PROBER};
pub use pipeline::{
    select_profile, EnumerationPlan, OutcomeStatus, Phase, PhaseExecutor, PipelineOutcome,
    RunMode,
};
pub use traits::{HttpProbe, ProbeOutput, ProbeRequest, Prober, WebResponse};
pub use web::{compose_signature, detect_edge, fetch_landing, http_authority, EdgeProvider};

use crate::config::DEFAULT_CONCURRENCY;
use crate::types::Target;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    /// When dispatch started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Pipelines started (one per target).
    pub dispatched: usize,
    /// Pipelines that ran to completion, in completion order.
    pub outcomes: Vec<PipelineOutcome>,
    /// Pipelines that panicked.
    pub aborted: usize,
}

impl RunSummary {
    /// Targets whose findings were written back.
    pub fn synchronized(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Synchronized))
    }

    /// Targets whose registry update was rejected.
    pub fn update_failures(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::UpdateFailed(_)))
    }

    /// Targets swept by the enumeration engine.
    pub fn enumerated(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Enumerated(_)))
    }

    /// Enumeration hits across all targets.
    pub fn hits(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match &o.status {
                OutcomeStatus::Enumerated(report) => report.hits.len(),
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Bounded fan-out of target pipelines.
pub struct ScanScheduler {
    executor: Arc<PhaseExecutor>,
    concurrency: usize,
}

impl ScanScheduler {
    /// Create a scheduler with the default concurrency bound.
    pub fn new(executor: PhaseExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the maximum number of concurrent pipelines (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Maximum concurrent pipelines.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every target exactly once and wait for all pipelines to finish.
    pub async fn run(&self, targets: BTreeMap<String, Target>) -> RunSummary {
        let started_at = Utc::now();
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<PipelineOutcome> = JoinSet::new();
        let mut summary = RunSummary {
            started_at,
            elapsed: Duration::ZERO,
            dispatched: 0,
            outcomes: Vec::with_capacity(targets.len()),
            aborted: 0,
        };

        info!(
            targets = targets.len(),
            concurrency = self.concurrency,
            "dispatching pipelines"
        );

        for target in targets.into_values() {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };

            debug!(id = %target.id, address = %target.address, "pipeline dispatched");
            summary.dispatched += 1;

            let executor = Arc::clone(&self.executor);
            tasks.spawn(async move {
                let _permit = permit;
                executor.run(target).await
            });

            while let Some(done) = tasks.try_join_next() {
                record(&mut summary, done);
            }
        }

        while let Some(done) = tasks.join_next().await {
            record(&mut summary, done);
        }

        summary.elapsed = started.elapsed();
        info!(
            dispatched = summary.dispatched,
            completed = summary.outcomes.len(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "all pipelines finished"
        );
        summary
    }
}

fn record(summary: &mut RunSummary, done: Result<PipelineOutcome, JoinError>) {
    match done {
        Ok(outcome) => summary.outcomes.push(outcome),
        Err(e) => {
            error!(error = %e, "pipeline task aborted");
            summary.aborted += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileConfig;
    use crate::scanner::scripted::{ScriptedHttp, ScriptedProber};
    use crate::storage::{load_targets_from_path, RegistryStore, COL_STATUS};
    use std::collections::HashSet;
    use std::fmt::Write as _;
    use std::fs;
    use tempfile::TempDir;

    const PROFILES: &str = r#"{
        "nmap": { "scan_profiles": {
            "framework_aggressive": { "flags": "-sV" },
            "framework_diagnostic": { "flags": "-sV" }
        } },
        "ffuf": { "profiles": {} }
    }"#;

    fn registry(dir: &TempDir, rows: usize) -> std::path::PathBuf {
        let mut csv = String::from(
            "Target_ID,Target_Name,Input_Value,Scope_Status,Notes,OS_Tech,Open_Ports,Services\n",
        );
        for i in 0..rows {
            writeln!(csv, "T{i},host{i},10.0.{}.{},PENDING,,TBD,TBD,TBD", i / 250, i % 250)
                .unwrap();
        }
        // Repeated address collapses onto the first row's id.
        csv.push_str("T-dup,again,10.0.0.0,PENDING,,TBD,TBD,TBD\n");

        let path = dir.path().join("targets.csv");
        fs::write(&path, csv).unwrap();
        path
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_target_runs_once_within_bound() {
        let dir = TempDir::new().unwrap();
        let path = registry(&dir, 40);
        let targets = load_targets_from_path(&path).unwrap();
        assert_eq!(targets.len(), 40);

        let prober = Arc::new(
            ScriptedProber::new()
                .with_default_output("80/tcp open http")
                .with_latency(Duration::from_millis(10)),
        );
        let executor = PhaseExecutor::new(
            prober.clone(),
            Arc::new(ScriptedHttp::new()),
            Arc::new(RegistryStore::open(&path).unwrap()),
            Arc::new(ProfileConfig::from_json(PROFILES).unwrap()),
        );
        let scheduler = ScanScheduler::new(executor).with_concurrency(3);

        let summary = scheduler.run(targets).await;

        assert_eq!(summary.dispatched, 40);
        assert_eq!(summary.outcomes.len(), 40);
        assert_eq!(summary.synchronized(), 40);
        assert_eq!(summary.aborted, 0);

        let requests = prober.requests();
        let addresses: HashSet<_> = requests.iter().map(|r| r.address.clone()).collect();
        assert_eq!(requests.len(), 40);
        assert_eq!(addresses.len(), 40);
        assert!(prober.peak_in_flight() <= 3, "peak {}", prober.peak_in_flight());

        let store = RegistryStore::open(&path).unwrap();
        for i in 0..40 {
            let row = store.row(&format!("T{i}")).unwrap().unwrap();
            assert_eq!(row[COL_STATUS], "ACTIVE");
        }
        assert_eq!(store.row("T-dup").unwrap().unwrap()[COL_STATUS], "PENDING");
    }

    #[tokio::test]
    async fn test_default_concurrency() {
        let dir = TempDir::new().unwrap();
        let path = registry(&dir, 0);
        let executor = PhaseExecutor::new(
            Arc::new(ScriptedProber::new()),
            Arc::new(ScriptedHttp::new()),
            Arc::new(RegistryStore::open(&path).unwrap()),
            Arc::new(ProfileConfig::from_json(PROFILES).unwrap()),
        );
        let scheduler = ScanScheduler::new(executor);
        assert_eq!(scheduler.concurrency(), DEFAULT_CONCURRENCY);

        let scheduler = scheduler.with_concurrency(0);
        assert_eq!(scheduler.concurrency(), 1);
    }

    #[tokio::test]
    async fn test_empty_run() {
        let dir = TempDir::new().unwrap();
        let path = registry(&dir, 0);
        let executor = PhaseExecutor::new(
            Arc::new(ScriptedProber::new()),
            Arc::new(ScriptedHttp::new()),
            Arc::new(RegistryStore::open(&path).unwrap()),
            Arc::new(ProfileConfig::from_json(PROFILES).unwrap()),
        );

        let summary = ScanScheduler::new(executor).run(BTreeMap::new()).await;
        assert_eq!(summary.dispatched, 0);
        assert!(summary.outcomes.is_empty());
    }
}
