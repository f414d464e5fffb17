//! Analyze subcommand implementation.
//!
//! Handles `outrider analyze`, a read-only summary of what earlier runs
//! wrote into the registry.

use crate::error::CliResult;
use crate::output;
use crate::storage::{analyze_registry_path, RegistryAnalysis};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// Summarize services, edge coverage and port clusters in a registry.
#[derive(Parser, Debug)]
pub struct AnalyzeCommand {
    /// Target registry (CSV)
    #[arg(short = 'r', long, value_name = "PATH")]
    pub registry: PathBuf,

    /// Print the analysis as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON analysis to this file
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl AnalyzeCommand {
    /// Execute the analyze command.
    pub fn execute(&self, _verbose: bool, quiet: bool) -> CliResult<()> {
        let analysis = analyze_registry_path(&self.registry)?;

        if let Some(ref path) = self.output {
            fs::write(path, render_json(&analysis)?)?;
            if !quiet {
                output::print_success(&format!("Analysis written to {}", path.display()));
            }
        }

        if self.json {
            println!("{}", render_json(&analysis)?);
            return Ok(());
        }

        if quiet {
            return Ok(());
        }

        if analysis.total == 0 {
            output::print_warning("No targets in registry.");
            return Ok(());
        }

        output::print_analysis(&analysis)?;
        Ok(())
    }
}

fn render_json(analysis: &RegistryAnalysis) -> CliResult<String> {
    Ok(serde_json::to_string_pretty(analysis)?)
}
