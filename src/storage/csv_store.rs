//! CSV-backed target registry.
//!
//! The whole table is held in memory behind one mutex. Every mutation takes
//! the lock, edits the in-memory rows and rewrites the full file before the
//! lock is released, so concurrent pipelines can never interleave a
//! read-modify-write. The file is replaced through a temporary sibling and
//! an atomic rename; an interrupted run leaves either the old or the new
//! table on disk, never a truncated one.
//!
//! Rows are kept as raw bytes so fields in other encodings survive a rewrite
//! untouched. Ids are compared after lossy decoding and trimming, the same
//! normalization the loader applies.

use super::{
    COL_ADDRESS, COL_ASSIGNED_PORT, COL_ID, COL_NAME, COL_NOTES, COL_OS, COL_PORTS,
    COL_SERVICES, COL_STATUS, REGISTRY_HEADER,
};
use crate::error::{RegistryError, RegistryResult};
use crate::types::{Port, Target, TargetId, TargetStatus};
use csv::{ByteRecord, StringRecord};
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tracing::debug;

/// Number of columns an updated row is padded to.
const UPDATE_WIDTH: usize = COL_SERVICES + 1;

/// Value of the result columns on a freshly imported row.
const UNSCANNED: &str = "TBD";

/// Field values written back for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    pub id: TargetId,
    pub status: TargetStatus,
    pub os_signature: String,
    /// Pipe-joined ports (or sentinel).
    pub open_ports: String,
    /// Pipe-joined services (or sentinel).
    pub services: String,
}

impl RecordUpdate {
    /// Build the update a finished pipeline publishes for its target.
    pub fn from_target(target: &Target) -> Self {
        Self {
            id: target.id.clone(),
            status: target.status,
            os_signature: target.os_signature.clone(),
            open_ports: target.ports_column(),
            services: target.services_column(),
        }
    }
}

/// A row to append during bulk import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub id: TargetId,
    pub name: String,
    pub address: String,
    pub assigned_port: Option<Port>,
    pub notes: String,
}

impl NewRecord {
    fn to_record(&self) -> ByteRecord {
        let mut fields = vec![String::new(); REGISTRY_HEADER.len()];
        fields[COL_ID] = self.id.to_string();
        fields[COL_NAME] = self.name.clone();
        fields[COL_ADDRESS] = self.address.clone();
        fields[COL_STATUS] = TargetStatus::Pending.to_string();
        fields[COL_NOTES] = self.notes.clone();
        fields[COL_OS] = UNSCANNED.to_string();
        fields[COL_PORTS] = UNSCANNED.to_string();
        fields[COL_SERVICES] = UNSCANNED.to_string();
        fields[COL_ASSIGNED_PORT] = self
            .assigned_port
            .map(|p| p.to_string())
            .unwrap_or_default();
        StringRecord::from(fields).into_byte_record()
    }
}

/// In-memory copy of the registry. Row 0 is the header.
#[derive(Debug, Default)]
struct Table {
    rows: Vec<ByteRecord>,
    index: HashMap<String, usize>,
}

impl Table {
    fn from_rows(rows: Vec<ByteRecord>) -> Self {
        let mut table = Self {
            rows,
            index: HashMap::new(),
        };
        table.reindex();
        table
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, row) in self.rows.iter().enumerate().skip(1) {
            if let Some(id) = row.get(COL_ID) {
                // First row wins for duplicate ids.
                self.index.entry(normalize_id(id)).or_insert(i);
            }
        }
    }

    fn lookup(&self, id: &str) -> Option<usize> {
        self.index.get(id.trim()).copied()
    }
}

/// Registry id as the loader sees it: lossily decoded and trimmed.
pub(crate) fn normalize_id(raw: &[u8]) -> String {
    decode(raw).trim().to_string()
}

/// Lossy UTF-8 view of a raw field.
pub(crate) fn decode(raw: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(raw)
}

/// Serialized writer over the registry file.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    table: Mutex<Table>,
}

impl RegistryStore {
    /// Open an existing registry.
    pub fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| RegistryError::Open {
            path: path.clone(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);
        let rows = reader.byte_records().collect::<Result<Vec<_>, _>>()?;

        debug!(path = %path.display(), rows = rows.len(), "registry opened");

        Ok(Self {
            path,
            table: Mutex::new(Table::from_rows(rows)),
        })
    }

    /// Open a registry, creating an empty one with the standard header if the
    /// file does not exist yet. Nothing is written until the first mutation.
    pub fn open_or_create(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        if path.exists() {
            return Self::open(path);
        }

        let header = ByteRecord::from(REGISTRY_HEADER.to_vec());
        Ok(Self {
            path,
            table: Mutex::new(Table::from_rows(vec![header])),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of target rows (header excluded).
    pub fn len(&self) -> RegistryResult<usize> {
        let table = self.table.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(table.rows.len().saturating_sub(1))
    }

    /// Whether the registry holds no target rows.
    pub fn is_empty(&self) -> RegistryResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Whether a row with `id` exists.
    pub fn contains(&self, id: &str) -> RegistryResult<bool> {
        let table = self.table.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(table.lookup(id).is_some())
    }

    /// Fetch a copy of the row for `id`, lossily decoded.
    pub fn row(&self, id: &str) -> RegistryResult<Option<Vec<String>>> {
        let table = self.table.lock().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(table
            .lookup(id)
            .map(|i| table.rows[i].iter().map(|f| decode(f).into_owned()).collect()))
    }

    /// Overwrite status, OS signature, ports and services of an existing row
    /// and persist the whole table.
    ///
    /// Fails with [`RegistryError::NotFound`] when no row has the id; rows are
    /// never created here. Other fields keep their original bytes.
    pub fn update(&self, update: &RecordUpdate) -> RegistryResult<()> {
        let mut table = self.table.lock().map_err(|_| RegistryError::LockPoisoned)?;

        let idx = table
            .lookup(update.id.as_str())
            .ok_or_else(|| RegistryError::NotFound(update.id.to_string()))?;

        let mut fields: Vec<Vec<u8>> = table.rows[idx].iter().map(<[u8]>::to_vec).collect();
        if fields.len() < UPDATE_WIDTH {
            fields.resize(UPDATE_WIDTH, Vec::new());
        }
        fields[COL_STATUS] = update.status.to_string().into_bytes();
        fields[COL_OS] = update.os_signature.clone().into_bytes();
        fields[COL_PORTS] = update.open_ports.clone().into_bytes();
        fields[COL_SERVICES] = update.services.clone().into_bytes();

        let previous = std::mem::replace(&mut table.rows[idx], ByteRecord::from(fields));
        if let Err(e) = self.persist(&table.rows) {
            table.rows[idx] = previous;
            return Err(e);
        }

        debug!(id = %update.id, "registry row updated");
        Ok(())
    }

    /// Update from an async context without blocking the runtime worker.
    pub async fn update_async(self: &Arc<Self>, update: RecordUpdate) -> RegistryResult<()> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.update(&update))
            .await
            .map_err(|e| RegistryError::Persist(e.to_string()))?
    }

    /// Append new rows and persist. Returns the number of rows added.
    ///
    /// Rejected with [`RegistryError::DuplicateId`], and nothing written, when
    /// an id already exists or repeats within `records`.
    pub fn append(&self, records: &[NewRecord]) -> RegistryResult<usize> {
        let mut table = self.table.lock().map_err(|_| RegistryError::LockPoisoned)?;

        let mut batch = HashSet::with_capacity(records.len());
        for record in records {
            let id = record.id.as_str().trim();
            if table.lookup(id).is_some() || !batch.insert(id) {
                return Err(RegistryError::DuplicateId(id.to_string()));
            }
        }

        let before = table.rows.len();
        table.rows.extend(records.iter().map(NewRecord::to_record));

        if let Err(e) = self.persist(&table.rows) {
            table.rows.truncate(before);
            return Err(e);
        }

        table.reindex();
        Ok(records.len())
    }

    /// Write the full table to a temporary sibling and rename it into place.
    fn persist(&self, rows: &[ByteRecord]) -> RegistryResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(tmp.as_file_mut());
            for row in rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;

        tmp.persist(&self.path)
            .map_err(|e| RegistryError::Persist(e.error.to_string()))?;

        Ok(())
    }
}
