//! Read-only correlation over the registry.
//!
//! Summarizes what finished runs wrote back: which services show up most,
//! how many targets sit behind an edge provider, and which hosts share the
//! same open-port set.

use super::csv_store::decode;
use super::{COL_OS, COL_PORTS, COL_SERVICES, MIN_COLUMNS};
use crate::error::{RegistryError, RegistryResult};
use crate::types::SERVICES_SENTINEL;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Number of services listed in [`RegistryAnalysis::top_services`].
pub const TOP_SERVICES: usize = 5;

/// Lowercase markers searched for in the OS and services columns.
const EDGE_MARKERS: [(&str, &str); 5] = [
    ("cloudflare", "Cloudflare"),
    ("cf-ray", "Cloudflare"),
    ("akamai", "Akamai"),
    ("fastly", "Fastly"),
    ("incapsula", "Incapsula"),
];

/// Occurrences of one service name across the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCount {
    pub service: String,
    pub count: usize,
}

/// Registry-wide summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryAnalysis {
    /// Target rows considered.
    pub total: usize,
    /// Most frequent services, highest count first, ties by name.
    pub top_services: Vec<ServiceCount>,
    /// Distinct service names seen.
    pub unique_services: usize,
    /// Edge providers seen anywhere in the registry.
    pub edge_vendors: BTreeSet<String>,
    /// Rows with at least one edge marker.
    pub edge_protected: usize,
    /// Percentage of rows with an edge marker.
    pub edge_share: f64,
    /// Hosts per distinct open-ports value. Unscanned rows are left out.
    pub clusters: BTreeMap<String, usize>,
}

impl RegistryAnalysis {
    /// Whether any target showed an edge marker.
    pub fn is_edge_protected(&self) -> bool {
        self.edge_protected > 0
    }
}

/// Analyze a registry file.
pub fn analyze_registry_path(path: &Path) -> RegistryResult<RegistryAnalysis> {
    let file = File::open(path).map_err(|source| RegistryError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    analyze_registry(file)
}

/// Analyze a CSV stream with a header row.
///
/// Rows are read the way the loader reads them: unreadable and short rows
/// are skipped and fields are decoded lossily.
pub fn analyze_registry<R: Read>(reader: R) -> RegistryResult<RegistryAnalysis> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut total = 0;
    let mut services: HashMap<String, usize> = HashMap::new();
    let mut edge_vendors = BTreeSet::new();
    let mut edge_protected = 0;
    let mut clusters = BTreeMap::new();

    for (line, record) in csv.byte_records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                debug!(line = line + 2, error = %e, "skipping unreadable registry row");
                continue;
            }
        };
        if record.len() < MIN_COLUMNS {
            continue;
        }
        total += 1;

        let field = |col: usize| decode(record.get(col).unwrap_or_default()).trim().to_string();
        let os = field(COL_OS);
        let service_column = field(COL_SERVICES);
        let ports = field(COL_PORTS);

        for service in service_column.split('|').map(str::trim) {
            if !service.is_empty() && service != SERVICES_SENTINEL {
                *services.entry(service.to_string()).or_default() += 1;
            }
        }

        let haystack = format!("{} {}", os, service_column).to_lowercase();
        let mut protected = false;
        for (marker, vendor) in EDGE_MARKERS {
            if haystack.contains(marker) {
                edge_vendors.insert(vendor.to_string());
                protected = true;
            }
        }
        if protected {
            edge_protected += 1;
        }

        if !ports.is_empty() && ports != SERVICES_SENTINEL {
            *clusters.entry(ports).or_default() += 1;
        }
    }

    let unique_services = services.len();
    let mut top_services: Vec<ServiceCount> = services
        .into_iter()
        .map(|(service, count)| ServiceCount { service, count })
        .collect();
    top_services.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.service.cmp(&b.service)));
    top_services.truncate(TOP_SERVICES);

    let edge_share = if total == 0 {
        0.0
    } else {
        edge_protected as f64 * 100.0 / total as f64
    };

    debug!(total, unique_services, edge_protected, "registry analyzed");

    Ok(RegistryAnalysis {
        total,
        top_services,
        unique_services,
        edge_vendors,
        edge_protected,
        edge_share,
        clusters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = "\
Target_ID,Target_Name,Input_Value,Scope_Status,Notes,OS_Tech,Open_Ports,Services
T1,web,10.0.0.1,ACTIVE,,Linux 5.x (nginx) [EDGE: Cloudflare],22/tcp|443/tcp,ssh|https
T2,api,10.0.0.2,ACTIVE,,Linux 5.x,22/tcp|443/tcp,ssh|https
T3,cdn,10.0.0.3,ACTIVE,,AkamaiGHost [EDGE: Akamai],80/tcp,http
T4,db,10.0.0.4,ACTIVE,,DETECTION_FAILED,5432/tcp,postgresql
T5,new,10.0.0.5,PENDING,Bulk imported,TBD,TBD,TBD
T6,short,10.0.0.6
tiny,row
";

    #[test]
    fn test_service_counts() {
        let analysis = analyze_registry(REGISTRY.as_bytes()).unwrap();

        assert_eq!(analysis.total, 6);
        assert_eq!(analysis.unique_services, 4);
        let top: Vec<(&str, usize)> = analysis
            .top_services
            .iter()
            .map(|s| (s.service.as_str(), s.count))
            .collect();
        assert_eq!(
            top,
            vec![("https", 2), ("ssh", 2), ("http", 1), ("postgresql", 1)]
        );
    }

    #[test]
    fn test_top_services_are_capped() {
        let mut registry = String::from("Target_ID,Target_Name,Input_Value,S,N,OS,Ports,Services\n");
        for i in 0..8 {
            registry.push_str(&format!("T{i},h,10.0.1.{i},ACTIVE,,Linux,{i}/tcp,svc{i}\n"));
        }

        let analysis = analyze_registry(registry.as_bytes()).unwrap();
        assert_eq!(analysis.unique_services, 8);
        assert_eq!(analysis.top_services.len(), TOP_SERVICES);
    }

    #[test]
    fn test_edge_share() {
        let analysis = analyze_registry(REGISTRY.as_bytes()).unwrap();

        assert!(analysis.is_edge_protected());
        assert_eq!(analysis.edge_protected, 2);
        assert_eq!(
            analysis.edge_vendors.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Akamai", "Cloudflare"]
        );
        assert!((analysis.edge_share - 2.0 * 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_cf_ray_marker_maps_to_cloudflare() {
        let registry = "Target_ID,Target_Name,Input_Value,S,N,OS,Ports,Services\n\
                        T1,h,10.0.0.1,ACTIVE,,cf-ray seen,80/tcp,http\n";
        let analysis = analyze_registry(registry.as_bytes()).unwrap();
        assert_eq!(analysis.edge_vendors.len(), 1);
        assert!(analysis.edge_vendors.contains("Cloudflare"));
    }

    #[test]
    fn test_clusters_skip_unscanned() {
        let analysis = analyze_registry(REGISTRY.as_bytes()).unwrap();

        assert_eq!(analysis.clusters.get("22/tcp|443/tcp"), Some(&2));
        assert_eq!(analysis.clusters.get("80/tcp"), Some(&1));
        assert_eq!(analysis.clusters.get("TBD"), None);
        assert_eq!(analysis.clusters.len(), 3);
    }

    #[test]
    fn test_empty_registry() {
        let analysis = analyze_registry("Target_ID,Target_Name,Input_Value\n".as_bytes()).unwrap();
        assert_eq!(analysis.total, 0);
        assert_eq!(analysis.edge_share, 0.0);
        assert!(!analysis.is_edge_protected());
        assert!(analysis.top_services.is_empty());
    }

    #[test]
    fn test_serializes_to_json() {
        let analysis = analyze_registry(REGISTRY.as_bytes()).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["total"], 6);
        assert_eq!(json["top_services"][0]["service"], "https");
        assert_eq!(json["clusters"]["80/tcp"], 1);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = analyze_registry_path(Path::new("/nonexistent/targets.csv")).unwrap_err();
        assert!(matches!(err, RegistryError::Open { .. }));
    }
}
