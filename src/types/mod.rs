//! Core type definitions using newtype patterns for type safety.
//!
//! These types keep registry ids, ports and raw target strings from being
//! mixed up as plain strings once they leave the parsing layer.

mod port;
mod target;
mod target_id;

pub use port::{Port, PortError};
pub use target::{
    parse_target, RawTarget, Target, TargetError, TargetStatus, OS_SENTINEL, PORTS_SENTINEL,
    SERVICES_SENTINEL,
};
pub use target_id::TargetId;
