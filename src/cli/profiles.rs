//! Profiles subcommand implementation.
//!
//! Handles `outrider profiles`, listing what the profile document defines.

use crate::config::{ProfileConfig, DEFAULT_CONFIG_PATH};
use crate::error::CliResult;
use crate::output;
use clap::Parser;
use std::path::PathBuf;

/// List baseline and enumeration profiles.
#[derive(Parser, Debug)]
pub struct ProfilesCommand {
    /// Profile document
    #[arg(short = 'C', long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

impl ProfilesCommand {
    /// Execute the profiles command.
    pub fn execute(&self, _verbose: bool, quiet: bool) -> CliResult<()> {
        let config = ProfileConfig::load(&self.config)?;

        if config.baseline.scan_profiles.is_empty() && config.enumeration.profiles.is_empty() {
            if !quiet {
                println!("No profiles found in {}.", self.config.display());
            }
            return Ok(());
        }

        output::print_profiles(&config)?;

        if !quiet && config.validate_recon().is_err() {
            output::print_warning("Recon runs need both framework_aggressive and framework_diagnostic.");
        }

        Ok(())
    }
}
