//! Output formatting module.
//!
//! Operator-facing lines go through here; diagnostics go through `tracing`.

mod plain;

pub use plain::{
    edge_line, enumeration_spinner, hit_line, print_analysis, print_enumeration_complete, print_enumeration_start,
    print_error, print_hit, print_info, print_profiles, print_run_summary, print_scan_start,
    print_success, print_synchronized, print_warning, scan_start_line, synchronized_line,
};
