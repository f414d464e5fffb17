//! Configuration management for Outrider.
//!
//! The profile document names the flag strings handed to the baseline
//! prober and the pacing of the enumeration sweep. It is loaded once at
//! startup and shared read-only by every pipeline.

mod profiles;

pub use profiles::{
    BaselineProfile, EnumerationProfile, ProfileConfig, AGGRESSIVE_PROFILE, DIAGNOSTIC_PROFILE,
};

use std::time::Duration;

/// Default location of the profile document.
pub const DEFAULT_CONFIG_PATH: &str = "config/profiles.json";

/// Default enumeration profile name.
pub const DEFAULT_ENUM_PROFILE: &str = "stealth";

/// Default number of target pipelines running at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Timeout for each web-classification fetch.
pub const WEB_TIMEOUT: Duration = Duration::from_secs(4);

/// Timeout for each enumeration request.
pub const ENUM_TIMEOUT: Duration = Duration::from_secs(5);
