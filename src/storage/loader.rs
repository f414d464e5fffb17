//! Registry loading.
//!
//! Rows are merged by address: the first row seen for an address supplies
//! the id, and every row for that address contributes its assigned port.
//! Fields are decoded lossily; no row is dropped for its encoding.

use super::csv_store::decode;
use super::{COL_ADDRESS, COL_ASSIGNED_PORT, COL_ID, MIN_COLUMNS};
use crate::error::{RegistryError, RegistryResult};
use crate::types::Target;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Load targets from a registry file.
///
/// A missing or unreadable file is an error; the run cannot proceed without
/// a target list.
pub fn load_targets_from_path(path: &Path) -> RegistryResult<BTreeMap<String, Target>> {
    let file = File::open(path).map_err(|source| RegistryError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    load_targets(file)
}

/// Load targets from a CSV stream with a header row, keyed by address.
///
/// Short or malformed rows are skipped.
pub fn load_targets<R: Read>(reader: R) -> RegistryResult<BTreeMap<String, Target>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut targets: BTreeMap<String, Target> = BTreeMap::new();

    for (line, record) in csv.byte_records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                debug!(line = line + 2, error = %e, "skipping unreadable registry row");
                continue;
            }
        };

        if record.len() < MIN_COLUMNS {
            debug!(line = line + 2, columns = record.len(), "skipping short registry row");
            continue;
        }

        let address = decode(&record[COL_ADDRESS]);
        let address = address.trim();
        if address.is_empty() {
            debug!(line = line + 2, "skipping registry row without an address");
            continue;
        }

        let target = targets
            .entry(address.to_string())
            .or_insert_with(|| Target::new(decode(&record[COL_ID]).trim(), address));

        if let Some(port) = record.get(COL_ASSIGNED_PORT) {
            target.add_known_port(&decode(port));
        }
    }

    Ok(targets)
}
