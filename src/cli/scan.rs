//! Scan subcommand implementation.
//!
//! Handles `outrider scan`: load the profile document and the registry, then
//! fan the targets out through the scheduler.

use crate::config::{
    ProfileConfig, DEFAULT_CONCURRENCY, DEFAULT_CONFIG_PATH, DEFAULT_ENUM_PROFILE, ENUM_TIMEOUT,
    WEB_TIMEOUT,
};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::scanner::{
    EnumerationPlan, NmapProber, PhaseExecutor, ReqwestProbe, RunMode, ScanScheduler,
    DEFAULT_PROBER,
};
use crate::storage::{load_targets_from_path, RegistryStore};
use crate::types::Port;
use clap::Parser;
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run every registry target through the phase pipeline.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Target registry (CSV)
    #[arg(short = 'r', long, value_name = "PATH")]
    pub registry: PathBuf,

    /// Profile document
    #[arg(short = 'C', long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Probe only this port on every target (selects the diagnostic profile)
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<Port>,

    /// Sweep each target with a path wordlist instead of running recon
    #[arg(long, requires = "wordlist")]
    pub fuzz: bool,

    /// Wordlist for --fuzz, one path per line
    #[arg(short, long, value_name = "PATH")]
    pub wordlist: Option<PathBuf>,

    /// Enumeration profile for --fuzz
    #[arg(long, value_name = "NAME", default_value = DEFAULT_ENUM_PROFILE)]
    pub enum_profile: String,

    /// Maximum number of targets processed at once
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Baseline prober binary
    #[arg(long, value_name = "BIN", default_value = DEFAULT_PROBER, env = "OUTRIDER_PROBER")]
    pub prober: String,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, _verbose: bool, quiet: bool) -> CliResult<()> {
        let profiles = ProfileConfig::load(&self.config)?;
        let mode = self.run_mode(&profiles)?;

        let prober = NmapProber::new(&self.prober);
        if matches!(mode, RunMode::Recon) {
            let resolved = prober.ensure_available()?;
            info!(prober = %resolved.display(), "baseline prober found");
        }

        let targets = load_targets_from_path(&self.registry)?;
        let store = Arc::new(RegistryStore::open(&self.registry)?);

        if targets.is_empty() {
            if !quiet {
                output::print_warning("No scannable targets in registry.");
            }
            return Ok(());
        }

        if !quiet {
            output::print_info(&format!(
                "Loaded {} targets from {}",
                targets.len(),
                self.registry.display()
            ));
        }

        let progress = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let web = ReqwestProbe::new(WEB_TIMEOUT, true)?;
        let executor = PhaseExecutor::new(
            Arc::new(prober),
            Arc::new(web),
            store,
            Arc::new(profiles),
        )
        .with_port_override(self.port)
        .with_mode(mode)
        .with_progress(progress);

        let summary = ScanScheduler::new(executor)
            .with_concurrency(self.concurrency)
            .run(targets)
            .await;

        if !quiet {
            output::print_run_summary(&summary)?;
        }

        Ok(())
    }

    /// Validate the profile document for the requested mode.
    fn run_mode(&self, profiles: &ProfileConfig) -> CliResult<RunMode> {
        if !self.fuzz {
            profiles.validate_recon()?;
            return Ok(RunMode::Recon);
        }

        profiles.validate_enumeration(&self.enum_profile)?;
        let profile = profiles.enumeration(&self.enum_profile)?.clone();
        let wordlist = self
            .wordlist
            .clone()
            .ok_or_else(|| CliError::Other("--fuzz requires --wordlist".to_string()))?;

        Ok(RunMode::Enumerate(EnumerationPlan {
            wordlist,
            profile_name: self.enum_profile.clone(),
            profile,
            http: Arc::new(ReqwestProbe::new(ENUM_TIMEOUT, true)?),
        }))
    }
}
