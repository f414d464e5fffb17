//! Target registry persistence.
//!
//! The registry is a CSV table keyed by target id. [`load_targets`] turns it
//! into one [`Target`](crate::types::Target) per distinct address, and
//! [`RegistryStore`] is the single serialized writer every pipeline reports
//! back through. [`analyze_registry`] summarizes a registry after the fact.

mod analysis;
mod csv_store;
mod loader;

pub use analysis::{
    analyze_registry, analyze_registry_path, RegistryAnalysis, ServiceCount, TOP_SERVICES,
};
pub use csv_store::{NewRecord, RecordUpdate, RegistryStore};
pub use loader::{load_targets, load_targets_from_path};

/// Column holding the target id.
pub const COL_ID: usize = 0;
/// Column holding the operator-facing name.
pub const COL_NAME: usize = 1;
/// Column holding the address handed to the prober.
pub const COL_ADDRESS: usize = 2;
/// Column holding the target status.
pub const COL_STATUS: usize = 3;
/// Column holding free-form notes.
pub const COL_NOTES: usize = 4;
/// Column holding the OS signature.
pub const COL_OS: usize = 5;
/// Column holding pipe-joined open ports.
pub const COL_PORTS: usize = 6;
/// Column holding pipe-joined services.
pub const COL_SERVICES: usize = 7;
/// Column holding an assigned port, if any.
pub const COL_ASSIGNED_PORT: usize = 10;

/// Rows shorter than this are not targets.
pub const MIN_COLUMNS: usize = 3;

/// Header written when a registry is created from scratch.
pub const REGISTRY_HEADER: [&str; 11] = [
    "Target_ID",
    "Target_Name",
    "Input_Value",
    "Scope_Status",
    "Notes",
    "OS_Tech",
    "Open_Ports",
    "Services",
    "Reserved_A",
    "Reserved_B",
    "Assigned_Port",
];
