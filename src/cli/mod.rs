//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `outrider scan --registry <csv>` - Run recon (or enumeration) over a registry
//! - `outrider profiles` - List baseline and enumeration profiles
//! - `outrider import <file> --registry <csv>` - Bulk-import raw targets
//! - `outrider analyze --registry <csv>` - Summarize a scanned registry

mod analyze;
mod import;
mod profiles;
mod scan;

pub use analyze::AnalyzeCommand;
pub use import::ImportCommand;
pub use profiles::ProfilesCommand;
pub use scan::ScanCommand;

use crate::error::CliResult;
use clap::{Parser, Subcommand};

/// Outrider - concurrent recon orchestration over a CSV target registry.
///
/// Each target runs through a fixed phase pipeline: a baseline probe with an
/// external tool, HTTP edge classification, and a write-back to the
/// registry. With `--fuzz`, targets are swept with a path wordlist instead.
#[derive(Parser, Debug)]
#[command(name = "outrider")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concurrent recon orchestration over a target registry", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every registry target through the phase pipeline
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// List profiles from the profile document
    #[command(alias = "p")]
    Profiles(ProfilesCommand),

    /// Append raw targets from a text file to the registry
    #[command(alias = "i")]
    Import(ImportCommand),

    /// Summarize services, edge coverage and port clusters in the registry
    #[command(alias = "a")]
    Analyze(AnalyzeCommand),
}

impl Cli {
    /// Default log filter for the selected verbosity.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Run the selected subcommand.
    pub async fn run(self) -> CliResult<()> {
        let (verbose, quiet) = (self.verbose, self.quiet);
        match self.command {
            Commands::Scan(cmd) => cmd.execute(verbose, quiet).await,
            Commands::Profiles(cmd) => cmd.execute(verbose, quiet),
            Commands::Import(cmd) => cmd.execute(verbose, quiet),
            Commands::Analyze(cmd) => cmd.execute(verbose, quiet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fuzz_requires_wordlist() {
        let err = Cli::try_parse_from(["outrider", "scan", "--registry", "t.csv", "--fuzz"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli = Cli::try_parse_from([
            "outrider", "scan", "--registry", "t.csv", "--fuzz", "--wordlist", "w.txt",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan(cmd) => {
                assert!(cmd.fuzz);
                assert_eq!(cmd.enum_profile, "stealth");
                assert_eq!(cmd.concurrency, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::try_parse_from(["outrider", "-v", "profiles"]).unwrap();
        assert_eq!(cli.log_level(), "debug");
        let cli = Cli::try_parse_from(["outrider", "profiles", "--quiet"]).unwrap();
        assert_eq!(cli.log_level(), "error");
        let cli = Cli::try_parse_from(["outrider", "profiles"]).unwrap();
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_analyze_alias() {
        let cli = Cli::try_parse_from(["outrider", "a", "-r", "t.csv", "--json"]).unwrap();
        match cli.command {
            Commands::Analyze(cmd) => {
                assert!(cmd.json);
                assert!(cmd.output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_port_override_validated() {
        assert!(Cli::try_parse_from(["outrider", "scan", "--registry", "t.csv", "--port", "0"])
            .is_err());
        assert!(Cli::try_parse_from([
            "outrider", "scan", "--registry", "t.csv", "--port", "70000"
        ])
        .is_err());
        let cli =
            Cli::try_parse_from(["outrider", "scan", "--registry", "t.csv", "--port", "8443"])
                .unwrap();
        match cli.command {
            Commands::Scan(cmd) => assert_eq!(cmd.port.map(|p| p.as_u16()), Some(8443)),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
