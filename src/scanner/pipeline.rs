//! Per-target phase pipeline.
//!
//! Recon runs walk `Baseline -> WebClassify -> Done`; enumeration runs walk
//! `Enumerate -> Done`. Each phase runs at most once, nothing is retried, and
//! a failing phase degrades to sentinel values instead of stopping the
//! pipeline. Only the `Done` phase of a recon run touches the registry.

use crate::config::{EnumerationProfile, ProfileConfig, AGGRESSIVE_PROFILE, DIAGNOSTIC_PROFILE};
use crate::output;
use crate::scanner::baseline::parse_baseline;
use crate::scanner::enumerate::{EnumerationEngine, EnumerationReport};
use crate::scanner::traits::{HttpProbe, ProbeRequest, Prober};
use crate::scanner::web::{compose_signature, fetch_landing};
use crate::storage::{RecordUpdate, RegistryStore};
use crate::types::{Port, Target, TargetStatus};
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{debug, error, warn};

/// Pipeline states, in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Baseline,
    WebClassify,
    Enumerate,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::WebClassify => write!(f, "web-classify"),
            Self::Enumerate => write!(f, "enumerate"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Everything an enumeration run needs besides the target.
#[derive(Clone)]
pub struct EnumerationPlan {
    pub wordlist: PathBuf,
    pub profile_name: String,
    pub profile: EnumerationProfile,
    pub http: Arc<dyn HttpProbe>,
}

/// Run-level mode. Applies to every target in the run.
#[derive(Clone)]
pub enum RunMode {
    /// Baseline probe, web classification, registry write-back.
    Recon,
    /// Path enumeration only; nothing is persisted.
    Enumerate(EnumerationPlan),
}

/// How a pipeline ended.
#[derive(Debug)]
pub enum OutcomeStatus {
    /// Findings written to the registry.
    Synchronized,
    /// The registry rejected the update.
    UpdateFailed(String),
    /// Enumeration sweep finished.
    Enumerated(EnumerationReport),
    /// The wordlist could not be read for this target.
    WordlistUnreadable(String),
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// The target as it stood when the pipeline finished.
    pub target: Target,
    /// Phases visited, in order.
    pub phases: Vec<Phase>,
    pub status: OutcomeStatus,
}

/// Baseline profile and port argument chosen for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSelection {
    pub profile: &'static str,
    pub ports: Option<String>,
}

/// Pick the baseline profile: diagnostic when a port override is set or the
/// target has assigned ports, aggressive (full range) otherwise.
pub fn select_profile(port_override: Option<Port>, target: &Target) -> ProfileSelection {
    let ports = port_override
        .map(|p| p.to_string())
        .or_else(|| target.port_argument());

    let profile = if ports.is_some() {
        DIAGNOSTIC_PROFILE
    } else {
        AGGRESSIVE_PROFILE
    };

    ProfileSelection { profile, ports }
}

/// Runs the phase pipeline for one target at a time. Shared by all workers.
pub struct PhaseExecutor {
    prober: Arc<dyn Prober>,
    web: Arc<dyn HttpProbe>,
    store: Arc<RegistryStore>,
    profiles: Arc<ProfileConfig>,
    port_override: Option<Port>,
    mode: RunMode,
    progress: MultiProgress,
}

impl PhaseExecutor {
    /// Create a recon executor.
    pub fn new(
        prober: Arc<dyn Prober>,
        web: Arc<dyn HttpProbe>,
        store: Arc<RegistryStore>,
        profiles: Arc<ProfileConfig>,
    ) -> Self {
        Self {
            prober,
            web,
            store,
            profiles,
            port_override: None,
            mode: RunMode::Recon,
            progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    /// Probe only this port on every target.
    pub fn with_port_override(mut self, port: Option<Port>) -> Self {
        self.port_override = port;
        self
    }

    /// Select the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Draw enumeration progress through `progress`.
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Run the pipeline for `target`.
    pub async fn run(&self, target: Target) -> PipelineOutcome {
        match &self.mode {
            RunMode::Recon => self.run_recon(target).await,
            RunMode::Enumerate(plan) => self.run_enumeration(target, plan).await,
        }
    }

    /// Profile name and port scope shown in the scan banner. Enumeration runs
    /// name their enumeration profile.
    fn banner_fields(&self, target: &Target) -> (String, String) {
        let selection = select_profile(self.port_override, target);
        let profile = match &self.mode {
            RunMode::Recon => selection.profile.to_string(),
            RunMode::Enumerate(plan) => plan.profile_name.clone(),
        };
        (profile, selection.ports.unwrap_or_else(|| "FULL".to_string()))
    }

    fn announce(&self, target: &Target) {
        let (profile, ports) = self.banner_fields(target);
        self.progress
            .suspend(|| output::print_scan_start(&target.address, &profile, &ports));
    }

    async fn run_recon(&self, mut target: Target) -> PipelineOutcome {
        let mut phases = Vec::with_capacity(3);
        self.announce(&target);
        let selection = select_profile(self.port_override, &target);

        phases.push(Phase::Baseline);
        self.baseline(&mut target, selection).await;

        phases.push(Phase::WebClassify);
        self.classify(&mut target).await;

        phases.push(Phase::Done);
        target.status = TargetStatus::Active;
        let status = match self
            .store
            .update_async(RecordUpdate::from_target(&target))
            .await
        {
            Ok(()) => {
                self.progress.suspend(|| {
                    output::print_synchronized(
                        target.id.as_str(),
                        &target.ports_column(),
                        &target.services_column(),
                    )
                });
                OutcomeStatus::Synchronized
            }
            Err(e) => {
                error!(id = %target.id, error = %e, "registry update failed");
                OutcomeStatus::UpdateFailed(e.to_string())
            }
        };

        PipelineOutcome {
            target,
            phases,
            status,
        }
    }

    async fn baseline(&self, target: &mut Target, selection: ProfileSelection) {
        let flags = match self.profiles.baseline(selection.profile) {
            Ok(profile) => profile.args(),
            Err(e) => {
                warn!(address = %target.address, error = %e, "probing without profile flags");
                Vec::new()
            }
        };

        let request = ProbeRequest {
            address: target.address.clone(),
            flags,
            ports: selection.ports,
        };

        debug!(id = %target.id, phase = %Phase::Baseline, tool = self.prober.name(), "phase started");
        let output = self.prober.probe(&request).await;
        if let Some(failure) = &output.failure {
            warn!(address = %target.address, error = %failure, "baseline probe failed; parsing captured output");
        }

        let findings = parse_baseline(&output.text);
        target.open_ports = findings.open_ports;
        target.services = findings.services;
        target.os_signature = findings.os_signature;
    }

    async fn classify(&self, target: &mut Target) {
        debug!(id = %target.id, phase = %Phase::WebClassify, "phase started");
        match fetch_landing(self.web.as_ref(), &target.address).await {
            Some(response) => {
                target.os_signature = compose_signature(&target.os_signature, &response);
            }
            None => debug!(address = %target.address, "no web response; signature unchanged"),
        }
    }

    async fn run_enumeration(&self, target: Target, plan: &EnumerationPlan) -> PipelineOutcome {
        let phases = vec![Phase::Enumerate, Phase::Done];
        self.announce(&target);

        let file = match File::open(&plan.wordlist).await {
            Ok(file) => file,
            Err(e) => {
                warn!(wordlist = %plan.wordlist.display(), error = %e, "wordlist unreadable");
                self.progress
                    .suspend(|| output::print_warning(&format!("Wordlist error: {}", e)));
                return PipelineOutcome {
                    target,
                    phases,
                    status: OutcomeStatus::WordlistUnreadable(e.to_string()),
                };
            }
        };

        self.progress.suspend(|| {
            output::print_enumeration_start(
                &target.address,
                &plan.profile_name,
                plan.profile.threads,
                plan.profile.delay,
            )
        });

        let bar = self
            .progress
            .add(output::enumeration_spinner(&target.address));
        let engine = EnumerationEngine::from_profile(Arc::clone(&plan.http), &plan.profile)
            .with_progress(bar.clone());

        let status = match engine.run(&target.address, BufReader::new(file)).await {
            Ok(report) => {
                bar.finish_and_clear();
                self.progress.suspend(|| {
                    output::print_enumeration_complete(
                        &target.address,
                        report.dispatched,
                        report.elapsed,
                    )
                });
                OutcomeStatus::Enumerated(report)
            }
            Err(e) => {
                bar.finish_and_clear();
                warn!(wordlist = %plan.wordlist.display(), error = %e, "wordlist read failed");
                OutcomeStatus::WordlistUnreadable(e.to_string())
            }
        };

        PipelineOutcome {
            target,
            phases,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scripted::{ScriptedHttp, ScriptedProber};
    use crate::scanner::traits::WebResponse;
    use crate::storage::{COL_OS, COL_PORTS, COL_SERVICES, COL_STATUS};
    use std::fs;
    use tempfile::TempDir;

    const PROFILES: &str = r#"{
        "nmap": { "scan_profiles": {
            "framework_aggressive": { "flags": "-sV -O -p-" },
            "framework_diagnostic": { "flags": "-sV -O" }
        } },
        "ffuf": { "profiles": { "stealth": { "threads": 3, "delay": 0.0, "extensions": "" } } }
    }"#;

    const REGISTRY: &str = "\
Target_ID,Target_Name,Input_Value,Scope_Status,Notes,OS_Tech,Open_Ports,Services,A,B,Assigned_Port
T1,web,10.0.0.1,PENDING,,TBD,TBD,TBD,,,443
T2,db,10.0.0.2,PENDING,,TBD,TBD,TBD,,,
";

    struct Fixture {
        _dir: TempDir,
        path: PathBuf,
        store: Arc<RegistryStore>,
        profiles: Arc<ProfileConfig>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("targets.csv");
        fs::write(&path, REGISTRY).unwrap();
        Fixture {
            store: Arc::new(RegistryStore::open(&path).unwrap()),
            profiles: Arc::new(ProfileConfig::from_json(PROFILES).unwrap()),
            path,
            _dir: dir,
        }
    }

    fn target(id: &str, address: &str, ports: &[&str]) -> Target {
        let mut target = Target::new(id, address);
        for port in ports {
            target.add_known_port(port);
        }
        target
    }

    #[test]
    fn test_profile_selection() {
        let plain = target("T2", "10.0.0.2", &[]);
        assert_eq!(
            select_profile(None, &plain),
            ProfileSelection {
                profile: AGGRESSIVE_PROFILE,
                ports: None
            }
        );

        let assigned = target("T1", "10.0.0.1", &["8443", "443"]);
        assert_eq!(
            select_profile(None, &assigned),
            ProfileSelection {
                profile: DIAGNOSTIC_PROFILE,
                ports: Some("443,8443".to_string())
            }
        );

        assert_eq!(
            select_profile(Port::new(22), &plain),
            ProfileSelection {
                profile: DIAGNOSTIC_PROFILE,
                ports: Some("22".to_string())
            }
        );
        assert_eq!(select_profile(Port::new(22), &assigned).ports.as_deref(), Some("22"));
    }

    #[tokio::test]
    async fn test_recon_pipeline_updates_registry() {
        let fx = fixture();
        let prober = Arc::new(ScriptedProber::new().with_output(
            "10.0.0.2",
            "22/tcp open ssh\n80/tcp open http\nOS details: Linux 5.x",
        ));
        let web = Arc::new(ScriptedHttp::new().with_response(
            "https://10.0.0.2",
            WebResponse::new(200)
                .with_header("Server", "nginx")
                .with_header("CF-RAY", "abc-AMS"),
        ));
        let executor = PhaseExecutor::new(prober.clone(), web, fx.store.clone(), fx.profiles);

        let outcome = executor.run(target("T2", "10.0.0.2", &[])).await;

        assert!(matches!(outcome.status, OutcomeStatus::Synchronized));
        assert_eq!(
            outcome.phases,
            vec![Phase::Baseline, Phase::WebClassify, Phase::Done]
        );
        assert_eq!(prober.requests()[0].args(), vec!["-sV", "-O", "-p-", "10.0.0.2"]);

        let row = RegistryStore::open(&fx.path).unwrap().row("T2").unwrap().unwrap();
        assert_eq!(row[COL_STATUS], "ACTIVE");
        assert_eq!(row[COL_OS], "Linux 5.x (nginx) [EDGE: Cloudflare]");
        assert_eq!(row[COL_PORTS], "22/tcp|80/tcp");
        assert_eq!(row[COL_SERVICES], "ssh|http");
    }

    #[tokio::test]
    async fn test_failures_degrade_to_sentinels() {
        let fx = fixture();
        let prober = Arc::new(ScriptedProber::new().failing());
        let web = Arc::new(ScriptedHttp::new());
        let executor = PhaseExecutor::new(prober.clone(), web, fx.store.clone(), fx.profiles);

        let outcome = executor.run(target("T1", "10.0.0.1", &["443"])).await;

        assert!(matches!(outcome.status, OutcomeStatus::Synchronized));
        assert_eq!(prober.requests()[0].args(), vec!["-sV", "-O", "-p", "443", "10.0.0.1"]);
        let row = fx.store.row("T1").unwrap().unwrap();
        assert_eq!(row[COL_STATUS], "ACTIVE");
        assert_eq!(row[COL_OS], "DETECTION_FAILED");
        assert_eq!(row[COL_PORTS], "FILTERED");
        assert_eq!(row[COL_SERVICES], "TBD");
    }

    #[tokio::test]
    async fn test_unknown_id_is_isolated() {
        let fx = fixture();
        let before = fs::read_to_string(&fx.path).unwrap();
        let executor = PhaseExecutor::new(
            Arc::new(ScriptedProber::new()),
            Arc::new(ScriptedHttp::new()),
            fx.store.clone(),
            fx.profiles,
        );

        let outcome = executor.run(target("T404", "10.9.9.9", &[])).await;

        assert!(matches!(outcome.status, OutcomeStatus::UpdateFailed(_)));
        assert_eq!(fs::read_to_string(&fx.path).unwrap(), before);
    }

    #[test]
    fn test_banner_names_the_active_profile() {
        let fx = fixture();
        let recon = PhaseExecutor::new(
            Arc::new(ScriptedProber::new()),
            Arc::new(ScriptedHttp::new()),
            fx.store.clone(),
            fx.profiles.clone(),
        );
        assert_eq!(
            recon.banner_fields(&target("T1", "10.0.0.1", &["443"])),
            (DIAGNOSTIC_PROFILE.to_string(), "443".to_string())
        );

        let plan = EnumerationPlan {
            wordlist: fx._dir.path().join("words.txt"),
            profile_name: "stealth".to_string(),
            profile: fx.profiles.enumeration("stealth").unwrap().clone(),
            http: Arc::new(ScriptedHttp::new()),
        };
        let enumerate = recon.with_mode(RunMode::Enumerate(plan));
        assert_eq!(
            enumerate.banner_fields(&target("T2", "10.0.0.2", &[])),
            ("stealth".to_string(), "FULL".to_string())
        );
    }

    #[tokio::test]
    async fn test_enumeration_mode_skips_registry() {
        let fx = fixture();
        let wordlist = fx._dir.path().join("words.txt");
        fs::write(&wordlist, "admin\n# comment\nlogin\n").unwrap();
        let before = fs::read_to_string(&fx.path).unwrap();

        let prober = Arc::new(ScriptedProber::new());
        let enum_http = Arc::new(
            ScriptedHttp::new()
                .with_default_status(404)
                .with_response("http://10.0.0.1/admin", WebResponse::new(403)),
        );
        let plan = EnumerationPlan {
            wordlist,
            profile_name: "stealth".to_string(),
            profile: fx.profiles.enumeration("stealth").unwrap().clone(),
            http: enum_http,
        };
        let executor = PhaseExecutor::new(
            prober.clone(),
            Arc::new(ScriptedHttp::new()),
            fx.store.clone(),
            fx.profiles.clone(),
        )
        .with_mode(RunMode::Enumerate(plan));

        let outcome = executor.run(target("T1", "10.0.0.1", &[])).await;

        assert_eq!(outcome.phases, vec![Phase::Enumerate, Phase::Done]);
        match outcome.status {
            OutcomeStatus::Enumerated(report) => {
                assert_eq!(report.dispatched, 2);
                assert_eq!(report.hits.len(), 1);
                assert_eq!(report.hits[0].url, "http://10.0.0.1/admin");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(prober.requests().is_empty());
        assert_eq!(fs::read_to_string(&fx.path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_missing_wordlist_is_per_target() {
        let fx = fixture();
        let plan = EnumerationPlan {
            wordlist: PathBuf::from("/nonexistent/words.txt"),
            profile_name: "stealth".to_string(),
            profile: fx.profiles.enumeration("stealth").unwrap().clone(),
            http: Arc::new(ScriptedHttp::new()),
        };
        let executor = PhaseExecutor::new(
            Arc::new(ScriptedProber::new()),
            Arc::new(ScriptedHttp::new()),
            fx.store.clone(),
            fx.profiles.clone(),
        )
        .with_mode(RunMode::Enumerate(plan));

        let outcome = executor.run(target("T1", "10.0.0.1", &[])).await;
        assert!(matches!(outcome.status, OutcomeStatus::WordlistUnreadable(_)));
    }
}
