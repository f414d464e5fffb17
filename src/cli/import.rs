//! Import subcommand implementation.
//!
//! Handles `outrider import`, turning a plain list of `host[:port]` lines
//! into pending registry rows.

use crate::error::{CliError, CliResult};
use crate::output;
use crate::storage::{NewRecord, RegistryStore};
use crate::types::{parse_target, TargetId};
use clap::Parser;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

const IMPORT_NOTE: &str = "Bulk imported";

/// Append raw targets to the registry.
#[derive(Parser, Debug)]
pub struct ImportCommand {
    /// Text file with one target per line (`host`, `host:port`, `[v6]:port`)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Target registry (CSV); created if missing
    #[arg(short = 'r', long, value_name = "PATH")]
    pub registry: PathBuf,
}

impl ImportCommand {
    /// Execute the import command.
    pub fn execute(&self, _verbose: bool, quiet: bool) -> CliResult<()> {
        let content = fs::read_to_string(&self.file)?;
        let mut records = parse_records(&content);

        if records.is_empty() {
            return Err(CliError::Other(format!(
                "no targets found in {}",
                self.file.display()
            )));
        }

        let store = RegistryStore::open_or_create(&self.registry)?;
        dedupe_ids(&mut records, &store, TargetId::generate)?;
        let added = store.append(&records)?;

        if !quiet {
            output::print_success(&format!(
                "Imported {} targets into {}",
                added,
                self.registry.display()
            ));
        }

        Ok(())
    }
}

/// Build one record per usable line. Unparseable lines are skipped.
fn parse_records(content: &str) -> Vec<NewRecord> {
    content
        .lines()
        .enumerate()
        .filter_map(|(n, line)| {
            let line = line.trim().trim_start_matches('\u{feff}');
            if line.is_empty() || line.starts_with('#') {
                return None;
            }

            match parse_target(line) {
                Ok(raw) => {
                    debug!(line = n + 1, host = %raw.host, port = ?raw.port, "target parsed");
                    Some(NewRecord {
                        id: TargetId::generate(),
                        name: raw.raw,
                        address: raw.host,
                        assigned_port: raw.port,
                        notes: IMPORT_NOTE.to_string(),
                    })
                }
                Err(e) => {
                    warn!(line = n + 1, error = %e, "skipping target");
                    None
                }
            }
        })
        .collect()
}

/// Regenerate any id that is already in the registry or earlier in the batch.
fn dedupe_ids(
    records: &mut [NewRecord],
    store: &RegistryStore,
    mut generate: impl FnMut() -> TargetId,
) -> CliResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records.iter_mut() {
        while store.contains(record.id.as_str())? || seen.contains(&record.id) {
            debug!(id = %record.id, "generated id already taken");
            record.id = generate();
        }
        seen.insert(record.id.clone());
    }
    Ok(())
}
