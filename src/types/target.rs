//! Scan targets and raw target parsing.
//!
//! A [`Target`] is one registry subject: a stable id, the address the prober
//! runs against, and the fields the recon pipeline fills in. Raw operator
//! input (`host`, `host:port`, `[v6]:port`) is parsed by [`parse_target`].

use super::{Port, TargetId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Written to the ports column when no open port was reported.
pub const PORTS_SENTINEL: &str = "FILTERED";

/// Written to the services column when no open port was reported.
pub const SERVICES_SENTINEL: &str = "TBD";

/// OS signature used when neither the prober nor the web phase identified anything.
pub const OS_SENTINEL: &str = "DETECTION_FAILED";

/// Lifecycle status of a target row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetStatus {
    /// Loaded, not yet scanned.
    #[default]
    Pending,
    /// Baseline completed and synchronized.
    Active,
    /// Marked as failed.
    Failed,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for TargetStatus {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "ACTIVE" => Ok(Self::Active),
            "FAILED" => Ok(Self::Failed),
            other => Err(TargetError::InvalidStatus(other.to_string())),
        }
    }
}

/// A single scan subject.
///
/// `open_ports` and `services` are index-aligned: `open_ports[i]` was
/// reported as running `services[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Persistence key in the registry.
    pub id: TargetId,
    /// Address handed to the prober; dedup key during load.
    pub address: String,
    /// Ports assigned to this address in the registry.
    pub known_ports: BTreeSet<String>,
    /// Current status.
    pub status: TargetStatus,
    /// OS / technology signature.
    pub os_signature: String,
    /// Open `port/proto` pairs.
    pub open_ports: Vec<String>,
    /// Service names aligned with `open_ports`.
    pub services: Vec<String>,
}

impl Target {
    /// Create a pending target with no findings.
    pub fn new(id: impl Into<TargetId>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            known_ports: BTreeSet::new(),
            status: TargetStatus::Pending,
            os_signature: String::new(),
            open_ports: Vec::new(),
            services: Vec::new(),
        }
    }

    /// Record an assigned port. Blank values are ignored, repeats collapse.
    pub fn add_known_port(&mut self, port: &str) {
        let port = port.trim();
        if !port.is_empty() {
            self.known_ports.insert(port.to_string());
        }
    }

    /// Comma-joined known ports, or `None` when the full range should be probed.
    pub fn port_argument(&self) -> Option<String> {
        if self.known_ports.is_empty() {
            None
        } else {
            Some(
                self.known_ports
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }
    }

    /// Pipe-joined open ports, or the `FILTERED` sentinel.
    pub fn ports_column(&self) -> String {
        join_or(&self.open_ports, PORTS_SENTINEL)
    }

    /// Pipe-joined services, or the `TBD` sentinel.
    pub fn services_column(&self) -> String {
        join_or(&self.services, SERVICES_SENTINEL)
    }
}

fn join_or(values: &[String], sentinel: &str) -> String {
    if values.is_empty() {
        sentinel.to_string()
    } else {
        values.join("|")
    }
}

/// Error type for target parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TargetError {
    #[error("empty target")]
    Empty,
    #[error("invalid port in target '{0}'")]
    InvalidPort(String),
    #[error("unknown target status: {0}")]
    InvalidStatus(String),
}

/// A host with an optional explicit port, as typed by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTarget {
    /// The cleaned input line.
    pub raw: String,
    /// Host part (brackets stripped for IPv6).
    pub host: String,
    /// Explicit port, if one was given.
    pub port: Option<Port>,
}

/// Parse `host`, `host:port`, `[v6]` or `[v6]:port`.
///
/// Leading/trailing whitespace and a UTF-8 BOM are stripped. A bare IPv6
/// address without brackets is taken as a host with no port.
pub fn parse_target(raw: &str) -> Result<RawTarget, TargetError> {
    let cleaned = raw.trim().trim_start_matches('\u{feff}').trim();
    if cleaned.is_empty() {
        return Err(TargetError::Empty);
    }

    let (host, port) = if let Some(rest) = cleaned.strip_prefix('[') {
        match rest.split_once(']') {
            Some((host, tail)) => match tail.strip_prefix(':') {
                Some(port) if is_digits(port) => (host, Some(port)),
                _ => (host, None),
            },
            None => (rest, None),
        }
    } else {
        match cleaned.rsplit_once(':') {
            Some((host, port)) if is_digits(port) && !host.contains(':') => (host, Some(port)),
            _ => (cleaned, None),
        }
    };

    let port = port
        .map(|p| {
            p.parse::<Port>()
                .map_err(|_| TargetError::InvalidPort(cleaned.to_string()))
        })
        .transpose()?;

    let host = host.trim();
    if host.is_empty() {
        return Err(TargetError::Empty);
    }

    Ok(RawTarget {
        raw: cleaned.to_string(),
        host: host.to_string(),
        port,
    })
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_ports_union() {
        let mut target = Target::new("T1", "10.0.0.1");
        target.add_known_port("443");
        target.add_known_port(" 80 ");
        target.add_known_port("443");
        target.add_known_port("   ");
        assert_eq!(target.known_ports.len(), 2);
        assert_eq!(target.port_argument().as_deref(), Some("443,80"));
    }

    #[test]
    fn test_port_argument_empty_means_full_range() {
        let target = Target::new("T1", "10.0.0.1");
        assert_eq!(target.port_argument(), None);
    }

    #[test]
    fn test_columns_use_sentinels_when_empty() {
        let mut target = Target::new("T1", "10.0.0.1");
        assert_eq!(target.ports_column(), "FILTERED");
        assert_eq!(target.services_column(), "TBD");

        target.open_ports = vec!["22/tcp".into(), "80/tcp".into()];
        target.services = vec!["ssh".into(), "http".into()];
        assert_eq!(target.ports_column(), "22/tcp|80/tcp");
        assert_eq!(target.services_column(), "ssh|http");
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [TargetStatus::Pending, TargetStatus::Active, TargetStatus::Failed] {
            assert_eq!(status.to_string().parse::<TargetStatus>().unwrap(), status);
        }
        assert!("scanning".parse::<TargetStatus>().is_err());
    }

    #[test]
    fn test_parse_plain_host() {
        let parsed = parse_target("example.com").unwrap();
        assert_eq!(parsed.host, "example.com");
        assert_eq!(parsed.port, None);
    }

    #[test]
    fn test_parse_host_with_port() {
        let parsed = parse_target("\u{feff}10.0.0.5:8443 ").unwrap();
        assert_eq!(parsed.host, "10.0.0.5");
        assert_eq!(parsed.port.map(Port::as_u16), Some(8443));
        assert_eq!(parsed.raw, "10.0.0.5:8443");
    }

    #[test]
    fn test_parse_ipv6() {
        let parsed = parse_target("[::1]:443").unwrap();
        assert_eq!(parsed.host, "::1");
        assert_eq!(parsed.port.map(Port::as_u16), Some(443));

        let bare = parse_target("fe80::1").unwrap();
        assert_eq!(bare.host, "fe80::1");
        assert_eq!(bare.port, None);
    }

    #[test]
    fn test_parse_non_numeric_suffix_is_host() {
        let parsed = parse_target("host:http").unwrap();
        assert_eq!(parsed.host, "host:http");
        assert_eq!(parsed.port, None);
    }

    #[test]
    fn test_parse_rejects_empty_and_bad_port() {
        assert_eq!(parse_target("  "), Err(TargetError::Empty));
        assert!(matches!(
            parse_target("10.0.0.1:99999"),
            Err(TargetError::InvalidPort(_))
        ));
    }
}
