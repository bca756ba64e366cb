//! Cluster firewall rules.
//!
//! Two rules are managed per cluster: one admitting Google's health-check
//! ranges to the control plane port, one allowing all traffic between
//! control plane and node instances. On delete, any rule on the cluster
//! network whose target tags name the cluster is swept as well, which
//! catches rules the status map no longer tracks.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{create_or_get, delete_and_wait, list};
use crate::error::Result;
use crate::filter::Filter;
use crate::key::{resource_name, Key};
use crate::ownership::{control_plane_tag, node_tag, tagged_for_cluster, API_SERVER_ROLE};
use crate::providers::gcp::models::{Firewall, FirewallAllowed};
use crate::providers::{Compute, ComputeResource};
use crate::scope::{ClusterScope, NetworkStatus};
use crate::wait::{OperationWaiter, WaitConfig};

/// Google Cloud health-check source ranges.
/// See <https://cloud.google.com/load-balancing/docs/health-checks#fw-rule>.
const HEALTH_CHECK_RANGES: [&str; 2] = ["35.191.0.0/16", "130.211.0.0/22"];

const INGRESS: &str = "INGRESS";

/// Reconciles the cluster's firewall rules.
#[derive(Clone)]
pub struct FirewallReconciler {
    scope: Arc<ClusterScope>,
    compute: Compute,
    waiter: OperationWaiter,
}

impl FirewallReconciler {
    #[must_use]
    pub fn new(scope: Arc<ClusterScope>, compute: Compute, wait: WaitConfig) -> Self {
        let waiter = OperationWaiter::new(compute.operations.clone(), wait);
        Self {
            scope,
            compute,
            waiter,
        }
    }

    /// Get or create every declared rule and record it in `status`.
    ///
    /// # Errors
    /// Returns the first provider/operation error encountered.
    pub async fn reconcile(&self, cancel: &CancellationToken, status: &mut NetworkStatus) -> Result<()> {
        debug!(cluster = %self.scope.name, "Reconciling firewall rules");

        let network_link = status
            .self_link
            .clone()
            .unwrap_or_else(|| self.scope.network_reference());

        for spec in self.firewall_specs(&network_link) {
            let key = Key::global(&spec.name);
            let firewall = create_or_get(cancel, &*self.compute.firewalls, &self.waiter, &key, &spec).await?;
            let self_link = firewall.self_link().unwrap_or_default().to_string();
            status.firewall_rules.insert(firewall.name, self_link);
        }

        Ok(())
    }

    /// Delete tracked rules, then sweep stale rules tagged for the cluster.
    ///
    /// # Errors
    /// Returns the first provider/operation error, or an error if a rule's
    /// network reference cannot be parsed.
    pub async fn delete(&self, cancel: &CancellationToken, status: &mut NetworkStatus) -> Result<()> {
        let tracked: Vec<String> = status.firewall_rules.keys().cloned().collect();
        for name in tracked {
            delete_and_wait::<Firewall, _>(cancel, &*self.compute.firewalls, &self.waiter, &Key::global(&name)).await?;
            status.firewall_rules.remove(&name);
        }

        let network_name = self.scope.network_name();
        let rules: Vec<Firewall> = list(cancel, &*self.compute.firewalls, &Filter::none()).await?;

        for rule in rules {
            if network_name_of(&rule)? != network_name {
                continue;
            }
            if !tagged_for_cluster(&rule.target_tags, &self.scope.name) {
                continue;
            }

            info!(firewall = %rule.name, "Deleting stale firewall rule");
            delete_and_wait::<Firewall, _>(cancel, &*self.compute.firewalls, &self.waiter, &Key::global(&rule.name)).await?;
        }

        Ok(())
    }

    /// The fixed rule set for this cluster.
    #[must_use]
    pub fn firewall_specs(&self, network_link: &str) -> Vec<Firewall> {
        let cluster = &self.scope.name;
        vec![
            Firewall {
                name: format!("allow-{cluster}-{API_SERVER_ROLE}-healthchecks"),
                network: network_link.to_string(),
                allowed: vec![FirewallAllowed {
                    ip_protocol: "TCP".into(),
                    ports: vec![self.scope.load_balancer_backend_port.to_string()],
                }],
                direction: Some(INGRESS.into()),
                source_ranges: HEALTH_CHECK_RANGES.iter().map(ToString::to_string).collect(),
                target_tags: vec![control_plane_tag(cluster)],
                ..Default::default()
            },
            Firewall {
                name: format!("allow-{cluster}-{API_SERVER_ROLE}-cluster"),
                network: network_link.to_string(),
                allowed: vec![FirewallAllowed {
                    ip_protocol: "all".into(),
                    ports: Vec::new(),
                }],
                direction: Some(INGRESS.into()),
                source_tags: vec![control_plane_tag(cluster), node_tag(cluster)],
                target_tags: vec![control_plane_tag(cluster), node_tag(cluster)],
                ..Default::default()
            },
        ]
    }
}

/// Name of the network a firewall rule applies to.
///
/// # Errors
/// Returns an error if the rule's network reference cannot be parsed.
pub fn network_name_of(firewall: &Firewall) -> Result<String> {
    resource_name(&firewall.network)
}
