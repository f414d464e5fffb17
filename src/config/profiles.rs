//! Scan profile document.
//!
//! ```json
//! {
//!   "nmap": { "scan_profiles": { "framework_aggressive": { "flags": "-sV -O -p-" } } },
//!   "ffuf": { "profiles": { "stealth": { "threads": 10, "delay": 0.2, "extensions": "php" } } }
//! }
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Baseline profile used when the prober should sweep the full port range.
pub const AGGRESSIVE_PROFILE: &str = "framework_aggressive";

/// Baseline profile used when specific ports are known.
pub const DIAGNOSTIC_PROFILE: &str = "framework_diagnostic";

/// Flags handed to the baseline prober.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineProfile {
    /// Whitespace-separated prober flags.
    pub flags: String,
}

impl BaselineProfile {
    /// Split the flag string into prober arguments.
    pub fn args(&self) -> Vec<String> {
        self.flags.split_whitespace().map(str::to_string).collect()
    }
}

/// Pacing for the path enumeration sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumerationProfile {
    /// Maximum requests in flight.
    pub threads: usize,
    /// Pause before each request, in seconds.
    #[serde(default)]
    pub delay: f64,
    /// Extension list. Carried through but not applied to paths yet.
    #[serde(default)]
    pub extensions: String,
}

impl EnumerationProfile {
    /// Per-request pacing delay.
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay.max(0.0))
    }

    fn validate(&self, name: &str) -> ConfigResult<()> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidProfile {
                name: name.to_string(),
                reason: "threads must be at least 1".to_string(),
            });
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(ConfigError::InvalidProfile {
                name: name.to_string(),
                reason: format!("delay must be a non-negative number of seconds, got {}", self.delay),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineSection {
    #[serde(default)]
    pub scan_profiles: BTreeMap<String, BaselineProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumerationSection {
    #[serde(default)]
    pub profiles: BTreeMap<String, EnumerationProfile>,
}

/// The whole profile document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(rename = "nmap", default)]
    pub baseline: BaselineSection,
    #[serde(rename = "ffuf", default)]
    pub enumeration: EnumerationSection,
}

impl ProfileConfig {
    /// Load the document from disk.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse the document from a JSON string.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Look up a baseline profile by name.
    pub fn baseline(&self, name: &str) -> ConfigResult<&BaselineProfile> {
        self.baseline
            .scan_profiles
            .get(name)
            .ok_or_else(|| ConfigError::MissingProfile(name.to_string()))
    }

    /// Look up an enumeration profile by name.
    pub fn enumeration(&self, name: &str) -> ConfigResult<&EnumerationProfile> {
        self.enumeration
            .profiles
            .get(name)
            .ok_or_else(|| ConfigError::MissingProfile(name.to_string()))
    }

    /// Check that both baseline profiles a recon run may select exist.
    pub fn validate_recon(&self) -> ConfigResult<()> {
        self.baseline(AGGRESSIVE_PROFILE)?;
        self.baseline(DIAGNOSTIC_PROFILE)?;
        Ok(())
    }

    /// Check that the named enumeration profile exists and is usable.
    pub fn validate_enumeration(&self, name: &str) -> ConfigResult<()> {
        self.enumeration(name)?.validate(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nmap": {
            "scan_profiles": {
                "framework_aggressive": { "flags": "-sS -sV -O -p-" },
                "framework_diagnostic": { "flags": "-sV  -O" }
            }
        },
        "ffuf": {
            "profiles": {
                "stealth": { "threads": 10, "delay": 0.25, "extensions": "php,html" },
                "broken": { "threads": 0, "delay": 0.0, "extensions": "" }
            }
        }
    }"#;

    #[test]
    fn test_parse_sample_document() {
        let config = ProfileConfig::from_json(SAMPLE).unwrap();
        assert_eq!(
            config.baseline(DIAGNOSTIC_PROFILE).unwrap().args(),
            vec!["-sV", "-O"]
        );
        let stealth = config.enumeration("stealth").unwrap();
        assert_eq!(stealth.threads, 10);
        assert_eq!(stealth.delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_validation() {
        let config = ProfileConfig::from_json(SAMPLE).unwrap();
        tokio_test::assert_ok!(config.validate_recon());
        tokio_test::assert_ok!(config.validate_enumeration("stealth"));
        assert!(matches!(
            config.validate_enumeration("broken"),
            Err(ConfigError::InvalidProfile { .. })
        ));
        assert!(matches!(
            config.validate_enumeration("loud"),
            Err(ConfigError::MissingProfile(_))
        ));
    }

    #[test]
    fn test_missing_baseline_profile() {
        let config = ProfileConfig::from_json(r#"{ "nmap": { "scan_profiles": {} } }"#).unwrap();
        assert!(matches!(
            config.validate_recon(),
            Err(ConfigError::MissingProfile(name)) if name == AGGRESSIVE_PROFILE
        ));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            ProfileConfig::from_json("{ not json"),
            Err(ConfigError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = ProfileConfig::load(Path::new("/nonexistent/profiles.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }
}
