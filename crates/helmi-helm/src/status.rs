//! Release status model and the textual status parser
//!
//! The chart engine reports release state as a human-readable text document.
//! The parser is line oriented and column aligned: header lines anchor the
//! column offsets, data rows are read at those offsets, and a blank line
//! closes the current table. Unknown or unparsable cells count as zero, and
//! the replica numbers accumulate across all workload sections of a release.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::collections::BTreeMap;

use helmi_kube::ClusterService;

const STATUS_FAILED: &str = "STATUS: FAILED";
const STATUS_DEPLOYED: &str = "STATUS: DEPLOYED";
const RESOURCE_PREFIX: &str = "==> ";
const NAMESPACE_PREFIX: &str = "NAMESPACE: ";
const DEPLOYED_PREFIX: &str = "LAST DEPLOYED: ";
const SERVICE_RESOURCE: &str = "v1/Service";

const DESIRED_LABEL: &str = "DESIRED";
const CURRENT_LABEL: &str = "CURRENT";
const AVAILABLE_LABEL: &str = "AVAILABLE";
const NAME_LABEL: &str = "NAME";

/// Structured release status
#[derive(Debug, Clone, Default)]
pub struct Status {
    pub name: String,
    pub namespace: String,
    pub is_failed: bool,
    pub is_deployed: bool,
    pub desired_nodes: i64,
    pub available_nodes: i64,
    pub services: BTreeMap<String, ClusterService>,
    pub deployment_time: Option<DateTime<Utc>>,
}

impl Status {
    /// A release is available once it deployed without failure, every
    /// workload reports at least the desired replicas, and no LoadBalancer
    /// service is still waiting for an external address.
    pub fn is_available(&self) -> bool {
        !self.is_failed
            && self.is_deployed
            && self.available_nodes >= self.desired_nodes
            && self.pending_load_balancers() == 0
    }

    /// Number of LoadBalancer services without an external address
    pub fn pending_load_balancers(&self) -> usize {
        self.services
            .values()
            .filter(|svc| svc.is_pending_load_balancer())
            .count()
    }
}

/// Parser output: everything in [`Status`] except the resolved cluster
/// services, which the caller looks up per name.
#[derive(Debug, Clone, Default)]
pub struct ParsedStatus {
    pub name: String,
    pub namespace: String,
    pub is_failed: bool,
    pub is_deployed: bool,
    pub desired_nodes: i64,
    pub available_nodes: i64,
    pub deployment_time: Option<DateTime<Utc>>,
    pub service_names: Vec<String>,
}

/// Parse the textual status report of one release
pub fn parse_status(release: &str, text: &str) -> ParsedStatus {
    let mut parsed = ParsedStatus {
        name: release.to_string(),
        ..ParsedStatus::default()
    };

    let mut last_resource = String::new();
    let mut column_desired: Option<usize> = None;
    let mut column_current: Option<usize> = None;
    let mut column_available: Option<usize> = None;
    let mut column_name: Option<usize> = None;

    for line in text.lines() {
        if line.starts_with(STATUS_FAILED) {
            parsed.is_failed = true;
        }
        if line.starts_with(STATUS_DEPLOYED) {
            parsed.is_deployed = true;
        }

        if line.is_empty() {
            last_resource.clear();
            column_desired = None;
            column_current = None;
            column_available = None;
            column_name = None;
        }

        if let Some(resource) = line.strip_prefix(RESOURCE_PREFIX) {
            last_resource = resource.to_string();
        }

        if let Some(namespace) = line.strip_prefix(NAMESPACE_PREFIX) {
            parsed.namespace = namespace.to_string();
        }

        if let Some(timestamp) = line.strip_prefix(DEPLOYED_PREFIX) {
            parsed.deployment_time = parse_deployment_time(timestamp);
        }

        // workload replica tables
        let index_desired = line.find(DESIRED_LABEL);
        let index_current = line.find(CURRENT_LABEL);
        let index_available = line.find(AVAILABLE_LABEL);

        if let (Some(desired), Some(current)) = (index_desired, index_current) {
            column_desired = Some(desired);
            column_current = Some(current);
            if index_available.is_some() {
                column_available = index_available;
            }
        } else if let (Some(desired), Some(current)) = (column_desired, column_current) {
            parsed.desired_nodes += field_as_number(line, desired);

            // CURRENT is the fallback when the table has no AVAILABLE column
            let mut available = field_as_number(line, current);
            if let Some(available_column) = column_available {
                if let Some(value) = field_at(line, available_column).and_then(|f| f.parse().ok()) {
                    available = value;
                }
            }
            parsed.available_nodes += available;
        }

        // service name tables
        if let Some(index_name) = line.find(NAME_LABEL) {
            column_name = Some(index_name);
        } else if let Some(name_column) = column_name {
            if last_resource == SERVICE_RESOURCE {
                if let Some(name) = field_at(line, name_column) {
                    parsed.service_names.push(name.to_string());
                }
            }
        }
    }

    parsed
}

/// Strip the release prefix from a service name
pub fn short_service_name(service_name: &str, release: &str) -> String {
    service_name
        .strip_prefix(&format!("{}-", release))
        .unwrap_or(service_name)
        .to_string()
}

/// The engine prints `LAST DEPLOYED` as an ANSI-C timestamp in local time
fn parse_deployment_time(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), "%a %b %e %H:%M:%S %Y").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

fn field_at(line: &str, column: usize) -> Option<&str> {
    line.get(column..)?.split_whitespace().next()
}

fn field_as_number(line: &str, column: usize) -> i64 {
    field_at(line, column)
        .and_then(|field| field.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use helmi_kube::ServiceType;

    const STATUS_TEXT: &str = "\
LAST DEPLOYED: Mon Nov  5 18:54:12 2018
NAMESPACE: test_namespace
STATUS: DEPLOYED

RESOURCES:
==> v1beta1/Deployment
NAME           DESIRED  CURRENT  UP-TO-DATE  AVAILABLE  AGE
helmiabc-web   2        2        2           2          5m

==> v1beta1/StatefulSet
NAME          DESIRED  CURRENT  AGE
helmiabc-db   1        1        5m

==> v1/Service
NAME                 TYPE       CLUSTER-IP  EXTERNAL-IP  PORT(S)   AGE
helmiabc-postgresql  ClusterIP  10.0.70.70  <none>       5432/TCP  5m
";

    #[test]
    fn test_parse_status_document() {
        let parsed = parse_status("helmiabc", STATUS_TEXT);

        assert_eq!(parsed.name, "helmiabc");
        assert_eq!(parsed.namespace, "test_namespace");
        assert!(parsed.is_deployed);
        assert!(!parsed.is_failed);

        // deployment (2/2) plus statefulset (1/1, CURRENT fallback)
        assert_eq!(parsed.desired_nodes, 3);
        assert_eq!(parsed.available_nodes, 3);

        assert_eq!(parsed.service_names, vec!["helmiabc-postgresql".to_string()]);

        let time = parsed.deployment_time.expect("deployment time parsed");
        let local = time.with_timezone(&Local);
        assert_eq!(local.format("%Y %b %e %H:%M:%S").to_string(), "2018 Nov  5 18:54:12");
    }

    #[test]
    fn test_parse_status_failed() {
        let parsed = parse_status("helmiabc", "STATUS: FAILED\n");
        assert!(parsed.is_failed);
        assert!(!parsed.is_deployed);
    }

    #[test]
    fn test_blank_line_resets_accumulator_columns() {
        // The row after the blank line must not be read against the stale
        // deployment columns.
        let text = "\
==> v1beta1/Deployment
NAME     DESIRED  CURRENT  AVAILABLE
rel-web  3        3        3

rel-orphan-row-without-header  9  9  9
";
        let parsed = parse_status("rel", text);
        assert_eq!(parsed.desired_nodes, 3);
        assert_eq!(parsed.available_nodes, 3);
    }

    #[test]
    fn test_unparsable_cells_count_zero() {
        let text = "\
==> v1beta1/Deployment
NAME     DESIRED  CURRENT  AVAILABLE
rel-web  <none>   x        y
";
        let parsed = parse_status("rel", text);
        assert_eq!(parsed.desired_nodes, 0);
        assert_eq!(parsed.available_nodes, 0);
    }

    #[test]
    fn test_services_only_from_service_sections() {
        let text = "\
==> v1/ConfigMap
NAME        DATA  AGE
rel-config  2     5m

==> v1/Service
NAME       TYPE      CLUSTER-IP  PORT(S)
rel-db     ClusterIP 10.0.0.9    5432/TCP
";
        let parsed = parse_status("rel", text);
        assert_eq!(parsed.service_names, vec!["rel-db".to_string()]);
    }

    #[test]
    fn test_short_service_name() {
        assert_eq!(short_service_name("helmiabc-postgresql", "helmiabc"), "postgresql");
        assert_eq!(short_service_name("unrelated", "helmiabc"), "unrelated");
    }

    #[test]
    fn test_availability_rule() {
        let mut status = Status {
            is_deployed: true,
            desired_nodes: 2,
            available_nodes: 2,
            ..Status::default()
        };
        assert!(status.is_available());

        status.available_nodes = 1;
        assert!(!status.is_available());

        status.available_nodes = 2;
        status.is_failed = true;
        assert!(!status.is_available());
    }

    #[test]
    fn test_pending_load_balancer_blocks_availability() {
        let mut services = BTreeMap::new();
        services.insert(
            "lb".to_string(),
            ClusterService {
                service_type: ServiceType::LoadBalancer,
                ..ClusterService::default()
            },
        );

        let mut status = Status {
            is_deployed: true,
            services,
            ..Status::default()
        };
        assert_eq!(status.pending_load_balancers(), 1);
        assert!(!status.is_available());

        status
            .services
            .get_mut("lb")
            .expect("lb service")
            .external_ip = "3.3.3.3".to_string();
        assert!(status.is_available());
    }

    #[test]
    fn test_no_workloads_is_available_when_deployed() {
        let status = Status {
            is_deployed: true,
            ..Status::default()
        };
        assert!(status.is_available());
    }
}
