//! Compute Engine API request and response models.

use serde::{Deserialize, Serialize};

use crate::key::{last_segment, Key, ResourceKind};
use crate::providers::traits::ComputeResource;

// ============================================================================
// Networking types
// ============================================================================

/// VPC network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// Network name.
    pub name: String,
    /// Description (holds the ownership tag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Self link, assigned by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// `Some(true)` for auto mode, `Some(false)` for custom mode, `None`
    /// for legacy. `Some(false)` is serialized so a custom-mode request is
    /// never sent as legacy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_subnetworks: Option<bool>,
    /// URLs of subnetworks in this network.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnetworks: Vec<String>,
}

impl Network {
    /// Whether subnetworks must be managed explicitly.
    #[must_use]
    pub fn is_custom_mode(&self) -> bool {
        self.auto_create_subnetworks != Some(true)
    }
}

/// Regional subnetwork.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnetwork {
    /// Subnetwork name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Region name or URL.
    #[serde(default)]
    pub region: String,
    /// Primary CIDR range.
    #[serde(default)]
    pub ip_cidr_range: String,
    /// Network reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// VPC flow logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_flow_logs: Option<bool>,
}

/// Cloud Router.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Router {
    /// Router name.
    pub name: String,
    /// Description (holds the ownership tag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Network reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Cloud NAT configurations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nats: Vec<RouterNat>,
}

/// Cloud NAT configuration attached to a router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterNat {
    /// NAT name.
    pub name: String,
    /// How external IPs are allocated (`AUTO_ONLY`).
    #[serde(default)]
    pub nat_ip_allocate_option: String,
    /// Which subnetwork ranges are translated.
    #[serde(default)]
    pub source_subnetwork_ip_ranges_to_nat: String,
}

/// Firewall rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    /// Rule name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Network reference.
    #[serde(default)]
    pub network: String,
    /// Allowed protocol/port tuples.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<FirewallAllowed>,
    /// `INGRESS` or `EGRESS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ranges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_tags: Vec<String>,
}

/// Allowed protocol and ports of a firewall rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallAllowed {
    #[serde(rename = "IPProtocol")]
    pub ip_protocol: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
}

/// Static route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Route name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Network reference.
    #[serde(default)]
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_hop_instance: Option<String>,
}

// ============================================================================
// Compute Engine instance types
// ============================================================================

/// Compute Engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// Instance name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Zone name or URL.
    #[serde(default)]
    pub zone: String,
    /// Machine type URL.
    #[serde(default)]
    pub machine_type: String,
    /// Provider status (`PROVISIONING`, `RUNNING`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub can_ip_forward: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<NetworkInterface>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<AttachedDisk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_accounts: Vec<ServiceAccount>,
}

/// Network interface of an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_configs: Vec<AccessConfig>,
    /// Internal IP.
    #[serde(rename = "networkIP", default, skip_serializing_if = "Option::is_none")]
    pub network_ip: Option<String>,
}

/// External access configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Access type (`ONE_TO_ONE_NAT`).
    #[serde(rename = "type")]
    pub access_type: String,
    pub name: String,
    /// External IP.
    #[serde(rename = "natIP", default, skip_serializing_if = "Option::is_none")]
    pub nat_ip: Option<String>,
}

/// Attached disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedDisk {
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub boot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialize_params: Option<InitializeParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Disk initialization parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// int64 in the API, sent as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
}

/// Network tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default)]
    pub items: Vec<String>,
}

/// Service account attached to an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub email: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

// ============================================================================
// Operations
// ============================================================================

/// Provider-side status of an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    #[default]
    Pending,
    Running,
    Done,
    #[serde(other)]
    Unknown,
}

/// Handle for an asynchronous mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation name.
    pub name: String,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Region URL for regional operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Zone URL for zonal operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Errors embedded in a finished operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationErrors>,
}

/// Errors reported by a finished operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrors {
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

/// A single operation error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Where an operation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    /// Not finished yet.
    Pending,
    /// Finished without errors.
    Succeeded,
    /// Finished with the given error messages.
    Failed(String),
}

impl Operation {
    /// Classify the operation.
    #[must_use]
    pub fn state(&self) -> OperationState {
        if self.status != OperationStatus::Done {
            return OperationState::Pending;
        }

        match &self.error {
            Some(errors) if !errors.errors.is_empty() => OperationState::Failed(
                errors
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => OperationState::Succeeded,
        }
    }

    /// Key under which the operation can be polled.
    #[must_use]
    pub fn key(&self) -> Key {
        match (&self.zone, &self.region) {
            (Some(zone), _) => Key::zonal(&self.name, last_segment(zone)),
            (None, Some(region)) => Key::regional(&self.name, last_segment(region)),
            (None, None) => Key::global(&self.name),
        }
    }
}

/// Paged list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

macro_rules! compute_resource {
    ($($ty:ty => $kind:expr),+ $(,)?) => {
        $(
            impl ComputeResource for $ty {
                const KIND: ResourceKind = $kind;

                fn self_link(&self) -> Option<&str> {
                    self.self_link.as_deref()
                }
            }
        )+
    };
}

compute_resource! {
    Network => ResourceKind::Network,
    Subnetwork => ResourceKind::Subnetwork,
    Router => ResourceKind::Router,
    Firewall => ResourceKind::Firewall,
    Route => ResourceKind::Route,
    Instance => ResourceKind::Instance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_mode_false_is_serialized() {
        let custom = Network {
            name: "net".into(),
            auto_create_subnetworks: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_value(&custom).unwrap();
        assert_eq!(json["autoCreateSubnetworks"], serde_json::json!(false));

        let legacy = Network {
            name: "net".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&legacy).unwrap();
        assert!(json.get("autoCreateSubnetworks").is_none());
    }

    #[test]
    fn test_custom_mode_detection() {
        let mut network = Network::default();
        assert!(network.is_custom_mode());
        network.auto_create_subnetworks = Some(false);
        assert!(network.is_custom_mode());
        network.auto_create_subnetworks = Some(true);
        assert!(!network.is_custom_mode());
    }

    #[test]
    fn test_operation_state() {
        let running: Operation = serde_json::from_str(r#"{"name":"op-1","status":"RUNNING"}"#).unwrap();
        assert_eq!(running.state(), OperationState::Pending);

        let done: Operation = serde_json::from_str(r#"{"name":"op-1","status":"DONE"}"#).unwrap();
        assert_eq!(done.state(), OperationState::Succeeded);

        let failed: Operation = serde_json::from_str(
            r#"{"name":"op-1","status":"DONE","error":{"errors":[{"code":"RESOURCE_IN_USE_BY_ANOTHER_RESOURCE","message":"in use"}]}}"#,
        )
        .unwrap();
        assert_eq!(
            failed.state(),
            OperationState::Failed("RESOURCE_IN_USE_BY_ANOTHER_RESOURCE: in use".into())
        );
    }

    #[test]
    fn test_operation_key_scope() {
        let zonal = Operation {
            name: "op-z".into(),
            zone: Some("https://www.googleapis.com/compute/v1/projects/p/zones/us-east1-a".into()),
            ..Default::default()
        };
        assert_eq!(zonal.key(), Key::zonal("op-z", "us-east1-a"));

        let regional = Operation {
            name: "op-r".into(),
            region: Some("https://www.googleapis.com/compute/v1/projects/p/regions/us-east1".into()),
            ..Default::default()
        };
        assert_eq!(regional.key(), Key::regional("op-r", "us-east1"));

        assert_eq!(
            Operation {
                name: "op-g".into(),
                ..Default::default()
            }
            .key(),
            Key::global("op-g")
        );
    }

    #[test]
    fn test_self_link_accessor() {
        let router: Router = serde_json::from_str(
            r#"{"name":"r","selfLink":"https://www.googleapis.com/compute/v1/projects/p/regions/us-east1/routers/r"}"#,
        )
        .unwrap();
        assert_eq!(
            router.self_link(),
            Some("https://www.googleapis.com/compute/v1/projects/p/regions/us-east1/routers/r")
        );
        assert_eq!(Firewall::default().self_link(), None);
    }

    #[test]
    fn test_firewall_protocol_field_name() {
        let allowed = FirewallAllowed {
            ip_protocol: "tcp".into(),
            ports: vec!["6443".into()],
        };
        let json = serde_json::to_value(&allowed).unwrap();
        assert_eq!(json["IPProtocol"], "tcp");
    }
}
