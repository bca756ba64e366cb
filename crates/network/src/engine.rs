//! Convergence engine.
//!
//! Runs the reconcilers in dependency order: network, firewalls, bastion on
//! reconcile and the reverse on delete. Each pass re-reads everything from
//! the provider; the only state carried between passes is [`ClusterStatus`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{Error, Result};
use crate::providers::Compute;
use crate::scope::{ClusterScope, ClusterStatus};
use crate::services::bastion::BastionReconciler;
use crate::services::firewall::FirewallReconciler;
use crate::services::network::NetworkReconciler;
use crate::wait::WaitConfig;

/// Drives one cluster's network resources towards its [`ClusterScope`].
pub struct Engine {
    scope: Arc<ClusterScope>,
    network: NetworkReconciler,
    firewalls: FirewallReconciler,
    bastion: BastionReconciler,
}

impl Engine {
    /// Build an engine for `scope`.
    ///
    /// `compute` addresses the cluster's own project. For a shared VPC,
    /// `host` must address the host project; network, subnetwork and router
    /// calls go there, as does the bastion's network lookup.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the scope is invalid or a shared VPC is
    /// declared without host project clients.
    pub fn new(scope: ClusterScope, compute: Compute, host: Option<Compute>, wait: WaitConfig) -> Result<Self> {
        scope.validate()?;

        let network_compute = match (&scope.shared_vpc, host) {
            (Some(_), Some(host)) => host,
            (Some(shared), None) => {
                return Err(Error::Config(format!(
                    "shared VPC host project {} requires host project clients",
                    shared.host_project
                )));
            }
            (None, _) => compute.clone(),
        };

        let bastion_compute = Compute {
            networks: network_compute.networks.clone(),
            ..compute.clone()
        };

        let scope = Arc::new(scope);
        Ok(Self {
            network: NetworkReconciler::new(scope.clone(), network_compute, wait),
            firewalls: FirewallReconciler::new(scope.clone(), compute, wait),
            bastion: BastionReconciler::new(scope.clone(), bastion_compute, wait),
            scope,
        })
    }

    #[must_use]
    pub fn scope(&self) -> &ClusterScope {
        &self.scope
    }

    /// Converge every resource, updating `status` as each step completes.
    ///
    /// # Errors
    /// Returns the first error; later steps are not attempted.
    pub async fn reconcile(&self, cancel: &CancellationToken, status: &mut ClusterStatus) -> Result<()> {
        info!(cluster = %self.scope.name, project = %self.scope.project, "Reconciling cluster network");

        self.network.reconcile(cancel, &mut status.network).await?;
        self.firewalls.reconcile(cancel, &mut status.network).await?;
        if self.scope.bastion {
            self.bastion.reconcile(cancel, &mut status.bastion).await?;
        }

        info!(cluster = %self.scope.name, "Cluster network reconciled");
        Ok(())
    }

    /// Tear everything down in reverse dependency order.
    ///
    /// The bastion is always checked so that a bastion left over from an
    /// earlier configuration cannot block network deletion.
    ///
    /// # Errors
    /// Returns the first error; later steps are not attempted.
    pub async fn delete(&self, cancel: &CancellationToken, status: &mut ClusterStatus) -> Result<()> {
        info!(cluster = %self.scope.name, project = %self.scope.project, "Deleting cluster network");

        self.bastion.delete(cancel, &mut status.bastion).await?;
        self.firewalls.delete(cancel, &mut status.network).await?;
        self.network.delete(cancel, &mut status.network).await?;

        info!(cluster = %self.scope.name, "Cluster network deleted");
        Ok(())
    }
}
