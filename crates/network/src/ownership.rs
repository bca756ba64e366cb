//! Ownership tags and derived resource names.
//!
//! Every resource the engine creates carries a description (or target tag)
//! derived from the cluster name. Nothing is deleted, patched or adopted
//! unless that tag matches.

/// Prefix of the ownership tag written into resource descriptions.
pub const CLUSTER_TAG_PREFIX: &str = "capg-cluster-";

/// Description carried by node routes created by the cloud route controller.
pub const K8S_NODE_ROUTE_TAG: &str = "k8s-node-route";

/// Role tag value used in firewall rule names.
pub const API_SERVER_ROLE: &str = "apiserver";

/// Ownership tag for a cluster.
#[must_use]
pub fn cluster_tag_key(cluster: &str) -> String {
    format!("{CLUSTER_TAG_PREFIX}{cluster}")
}

/// Whether a resource description marks the resource as owned by `cluster`.
#[must_use]
pub fn owned(description: Option<&str>, cluster: &str) -> bool {
    description.is_some_and(|d| d == cluster_tag_key(cluster))
}

/// Whether a set of target tags marks a firewall rule as belonging to `cluster`.
#[must_use]
pub fn tagged_for_cluster(tags: &[String], cluster: &str) -> bool {
    tags.iter().any(|t| t == cluster)
}

#[must_use]
pub fn default_network_name(cluster: &str) -> String {
    format!("{cluster}-network")
}

#[must_use]
pub fn router_name(network: &str) -> String {
    format!("{network}-router")
}

#[must_use]
pub fn nat_name(network: &str) -> String {
    format!("{network}-nat")
}

#[must_use]
pub fn bastion_name(cluster: &str) -> String {
    format!("{cluster}-bastion")
}

/// Bastions always land in the first zone of the region.
#[must_use]
pub fn bastion_zone(region: &str) -> String {
    format!("{region}-a")
}

#[must_use]
pub fn control_plane_tag(cluster: &str) -> String {
    format!("{cluster}-control-plane")
}

#[must_use]
pub fn node_tag(cluster: &str) -> String {
    format!("{cluster}-node")
}
