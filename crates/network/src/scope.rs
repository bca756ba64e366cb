//! Declared cluster inputs and the status written back after convergence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ownership::{cluster_tag_key, default_network_name, nat_name, router_name};
use crate::providers::gcp::models::{Network, Router, RouterNat, Subnetwork};

/// Default control plane load balancer backend port.
const DEFAULT_BACKEND_PORT: u16 = 6443;

/// NAT external IP allocation mode.
pub const NAT_IP_AUTO_ONLY: &str = "AUTO_ONLY";

/// NAT subnet range mode.
pub const NAT_ALL_SUBNETWORKS_ALL_IP_RANGES: &str = "ALL_SUBNETWORKS_ALL_IP_RANGES";

fn default_backend_port() -> u16 {
    DEFAULT_BACKEND_PORT
}

/// Everything declared about one cluster's network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterScope {
    /// Cluster name; all tags and derived names come from it.
    pub name: String,
    /// Project the cluster lives in.
    pub project: String,
    /// Region of the cluster.
    pub region: String,
    /// Network declaration.
    #[serde(default)]
    pub network: NetworkSpec,
    /// Subnetworks to create in custom mode.
    #[serde(default)]
    pub subnets: Vec<SubnetSpec>,
    /// Set when the network lives in (and is owned by) a host project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_vpc: Option<SharedVpc>,
    /// Port the control plane load balancer health-checks.
    #[serde(default = "default_backend_port")]
    pub load_balancer_backend_port: u16,
    /// Provision a bastion host.
    #[serde(default)]
    pub bastion: bool,
}

/// Network declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    /// Network name, `<cluster>-network` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `true` auto mode, `false` custom mode. When unset the network is
    /// created in auto mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_subnetworks: Option<bool>,
}

/// Subnetwork declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    pub name: String,
    /// Defaults to the cluster region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub cidr_block: String,
    #[serde(default)]
    pub enable_flow_logs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Shared VPC declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedVpc {
    /// Project owning the network.
    pub host_project: String,
}

impl ClusterScope {
    /// Check the declaration before any provider call.
    ///
    /// # Errors
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("cluster name must not be empty".into()));
        }
        if self.project.is_empty() {
            return Err(Error::Config("project must not be empty".into()));
        }
        if self.region.is_empty() {
            return Err(Error::Config("region must not be empty".into()));
        }
        if let Some(shared) = &self.shared_vpc {
            if shared.host_project.is_empty() {
                return Err(Error::Config("sharedVpc.hostProject must not be empty".into()));
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for subnet in &self.subnets {
            if subnet.name.is_empty() || subnet.cidr_block.is_empty() {
                return Err(Error::Config(format!(
                    "subnet '{}' needs both a name and a cidrBlock",
                    subnet.name
                )));
            }
            if !seen.insert((subnet.name.as_str(), self.subnet_region(subnet))) {
                return Err(Error::Config(format!(
                    "subnet '{}' is declared twice",
                    subnet.name
                )));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn network_name(&self) -> String {
        self.network
            .name
            .clone()
            .unwrap_or_else(|| default_network_name(&self.name))
    }

    /// Ownership tag of this cluster.
    #[must_use]
    pub fn cluster_tag(&self) -> String {
        cluster_tag_key(&self.name)
    }

    #[must_use]
    pub fn is_shared_vpc(&self) -> bool {
        self.shared_vpc.is_some()
    }

    /// Project holding the network, subnetworks and router.
    #[must_use]
    pub fn network_project(&self) -> &str {
        self.shared_vpc
            .as_ref()
            .map_or(self.project.as_str(), |s| s.host_project.as_str())
    }

    /// Network reference used when the provider has not reported a self link.
    #[must_use]
    pub fn network_reference(&self) -> String {
        format!(
            "projects/{}/global/networks/{}",
            self.network_project(),
            self.network_name()
        )
    }

    fn subnet_region<'a>(&'a self, subnet: &'a SubnetSpec) -> &'a str {
        subnet.region.as_deref().unwrap_or(&self.region)
    }

    /// Network to insert when it does not exist.
    #[must_use]
    pub fn network_spec(&self) -> Network {
        Network {
            name: self.network_name(),
            description: Some(self.cluster_tag()),
            auto_create_subnetworks: Some(self.network.auto_create_subnetworks.unwrap_or(true)),
            ..Default::default()
        }
    }

    /// Subnetworks to insert, bound to `network_link`.
    #[must_use]
    pub fn subnetwork_specs(&self, network_link: &str) -> Vec<Subnetwork> {
        self.subnets
            .iter()
            .map(|subnet| Subnetwork {
                name: subnet.name.clone(),
                description: subnet.description.clone(),
                region: self.subnet_region(subnet).to_string(),
                ip_cidr_range: subnet.cidr_block.clone(),
                network: Some(network_link.to_string()),
                enable_flow_logs: Some(subnet.enable_flow_logs),
                ..Default::default()
            })
            .collect()
    }

    /// NAT configuration attached to the cluster router.
    #[must_use]
    pub fn nat_spec(&self) -> RouterNat {
        RouterNat {
            name: nat_name(&self.network_name()),
            nat_ip_allocate_option: NAT_IP_AUTO_ONLY.to_string(),
            source_subnetwork_ip_ranges_to_nat: NAT_ALL_SUBNETWORKS_ALL_IP_RANGES.to_string(),
        }
    }

    /// Router to insert for `network`.
    #[must_use]
    pub fn nat_router_spec(&self, network: &Network) -> Router {
        Router {
            name: router_name(&network.name),
            description: Some(self.cluster_tag()),
            region: Some(self.region.clone()),
            network: network.self_link.clone(),
            nats: vec![self.nat_spec()],
            ..Default::default()
        }
    }
}

/// Status written back after each reconcile/delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub network: NetworkStatus,
    #[serde(default)]
    pub bastion: BastionStatus,
}

/// Network status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// Adopted network name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Network self link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Mode the network was found in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_create_subnetworks: Option<bool>,
    /// Cloud NAT router self link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    /// Firewall rule name to self link.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub firewall_rules: BTreeMap<String, String>,
}

impl NetworkStatus {
    /// Forget the network and router.
    pub fn clear_links(&mut self) {
        self.name = None;
        self.self_link = None;
        self.auto_create_subnetworks = None;
        self.router = None;
    }
}

/// Bastion status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BastionStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_status: Option<String>,
}
