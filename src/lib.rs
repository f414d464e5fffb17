//! # Outrider - Concurrent Recon Orchestration
//!
//! Outrider reads a CSV target registry, runs every unique address through a
//! fixed phase pipeline, and writes the findings back to the same file.
//!
//! ## Features
//!
//! - **Baseline probing**: drives an external discovery tool (nmap by default)
//!   with named flag profiles and parses open ports, services and OS hints
//! - **Edge classification**: one HTTP(S) request per target to enrich the
//!   signature with the server banner and Cloudflare/Akamai edge markers
//! - **Path enumeration**: wordlist sweeps with per-target request bounds
//!   and pacing
//! - **Safe write-back**: serialized, atomic registry rewrites shared by all
//!   concurrent pipelines
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use outrider::config::ProfileConfig;
//! use outrider::scanner::{NmapProber, PhaseExecutor, ReqwestProbe, ScanScheduler};
//! use outrider::storage::{load_targets_from_path, RegistryStore};
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Path::new("targets.csv");
//!     let profiles = ProfileConfig::load(Path::new("config/profiles.json"))?;
//!     profiles.validate_recon()?;
//!
//!     let executor = PhaseExecutor::new(
//!         Arc::new(NmapProber::default()),
//!         Arc::new(ReqwestProbe::new(Duration::from_secs(4), true)?),
//!         Arc::new(RegistryStore::open(registry)?),
//!         Arc::new(profiles),
//!     );
//!
//!     let summary = ScanScheduler::new(executor)
//!         .run(load_targets_from_path(registry)?)
//!         .await;
//!     println!("{} targets synchronized", summary.synchronized());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Targets, ids and validated ports
//! - [`storage`] - Registry loading, analysis and the serialized registry writer
//! - [`scanner`] - Scheduler, phase pipeline, probes and the enumeration engine
//! - [`config`] - The profile document
//! - [`error`] - Error types
//! - [`output`] - Operator-facing output

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ConfigError, ProbeError, RegistryError};
pub use scanner::{PhaseExecutor, RunSummary, ScanScheduler};
pub use storage::RegistryStore;
pub use types::{Port, Target, TargetId, TargetStatus};
