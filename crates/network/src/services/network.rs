//! VPC network, subnetworks and Cloud NAT router.
//!
//! Creation runs network → subnetworks → router. Deletion runs the reverse
//! (router → node routes → subnetworks → network) because the provider
//! refuses to delete a resource that still has dependents.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{create, create_or_get, delete_and_wait, get_or_none, list};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::key::{Key, ResourceKind};
use crate::ownership::{owned, router_name, K8S_NODE_ROUTE_TAG};
use crate::providers::gcp::models::{Network, Route, Router, Subnetwork};
use crate::providers::Compute;
use crate::scope::{ClusterScope, NetworkStatus};
use crate::wait::{cancellable, OperationWaiter, WaitConfig};

/// Reconciles the network, its subnetworks and its NAT router.
#[derive(Clone)]
pub struct NetworkReconciler {
    scope: Arc<ClusterScope>,
    compute: Compute,
    waiter: OperationWaiter,
}

impl NetworkReconciler {
    /// `compute` must address the project that holds the network (the host
    /// project for a shared VPC).
    #[must_use]
    pub fn new(scope: Arc<ClusterScope>, compute: Compute, wait: WaitConfig) -> Self {
        let waiter = OperationWaiter::new(compute.operations.clone(), wait);
        Self {
            scope,
            compute,
            waiter,
        }
    }

    /// Converge the network resources.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a shared VPC network or subnetwork does
    /// not exist in the host project, or
    /// the first provider/operation error encountered.
    pub async fn reconcile(&self, cancel: &CancellationToken, status: &mut NetworkStatus) -> Result<()> {
        info!(
            cluster = %self.scope.name,
            network = %self.scope.network_name(),
            "Reconciling network resources"
        );

        let network = self.create_or_get_network(cancel).await?;
        let network_link = network
            .self_link
            .clone()
            .unwrap_or_else(|| self.scope.network_reference());

        if network.is_custom_mode() {
            for subnet in self.scope.subnetwork_specs(&network_link) {
                let key = Key::regional(&subnet.name, &subnet.region);
                let ready = if self.scope.is_shared_vpc() {
                    get_or_none::<Subnetwork, _>(cancel, &*self.compute.subnetworks, &key)
                        .await?
                        .ok_or_else(|| {
                            Error::Config(format!(
                                "shared VPC is enabled but subnetwork {key} does not exist in host project {}",
                                self.scope.network_project()
                            ))
                        })?
                } else {
                    create_or_get(cancel, &*self.compute.subnetworks, &self.waiter, &key, &subnet).await?
                };
                debug!(subnetwork = %ready.name, region = %subnet.region, "Subnetwork ready");
            }
        }

        if owned(network.description.as_deref(), &self.scope.name) {
            let router = self.create_or_get_router(cancel, &network).await?;
            status.router = router.self_link;
        } else {
            debug!(network = %network.name, "Network not owned by cluster, leaving router alone");
        }

        status.name = Some(network.name);
        status.auto_create_subnetworks = network.auto_create_subnetworks;
        status.self_link = Some(network_link);
        Ok(())
    }

    /// Tear the network resources down in dependency order.
    ///
    /// Shared VPC networks and networks not owned by this cluster are left
    /// untouched.
    ///
    /// # Errors
    /// Returns the first provider/operation error, wrapped with the identity
    /// of the resource that failed. Later steps are not attempted.
    pub async fn delete(&self, cancel: &CancellationToken, status: &mut NetworkStatus) -> Result<()> {
        if self.scope.is_shared_vpc() {
            debug!(cluster = %self.scope.name, "Shared VPC enabled, not deleting network resources");
            status.clear_links();
            return Ok(());
        }

        let network_name = self.scope.network_name();
        let network_key = Key::global(&network_name);
        let Some(network) = get_or_none::<Network, _>(cancel, &*self.compute.networks, &network_key).await? else {
            debug!(network = %network_name, "Network already absent");
            status.clear_links();
            return Ok(());
        };

        if !owned(network.description.as_deref(), &self.scope.name) {
            info!(network = %network_name, "Network not created by this cluster, skipping deletion");
            return Ok(());
        }

        info!(cluster = %self.scope.name, network = %network_name, "Deleting network resources");

        self.delete_router(cancel, &network).await?;
        self.delete_node_routes(cancel, &network).await?;

        if network.is_custom_mode() {
            for subnet in &self.scope.subnets {
                let region = subnet.region.as_deref().unwrap_or(&self.scope.region);
                let key = Key::regional(&subnet.name, region);
                delete_and_wait::<Subnetwork, _>(cancel, &*self.compute.subnetworks, &self.waiter, &key).await?;
            }
        }

        delete_and_wait::<Network, _>(cancel, &*self.compute.networks, &self.waiter, &network_key).await?;

        info!(network = %network_name, "Network deleted");
        status.clear_links();
        Ok(())
    }

    async fn create_or_get_network(&self, cancel: &CancellationToken) -> Result<Network> {
        let name = self.scope.network_name();
        let key = Key::global(&name);

        if let Some(network) = get_or_none::<Network, _>(cancel, &*self.compute.networks, &key).await? {
            return Ok(network);
        }

        if let Some(shared) = &self.scope.shared_vpc {
            return Err(Error::Config(format!(
                "shared VPC is enabled but network {name} does not exist in host project {}",
                shared.host_project
            )));
        }

        let network = create(cancel, &*self.compute.networks, &self.waiter, &key, &self.scope.network_spec()).await?;
        info!(network = %name, "Created VPC network");
        Ok(network)
    }

    async fn create_or_get_router(&self, cancel: &CancellationToken, network: &Network) -> Result<Router> {
        let key = Key::regional(router_name(&network.name), &self.scope.region);

        let mut router = match get_or_none::<Router, _>(cancel, &*self.compute.routers, &key).await? {
            Some(router) => router,
            None if self.scope.is_shared_vpc() => {
                return Err(Error::Config(format!(
                    "shared VPC is enabled but router {key} does not exist"
                )));
            }
            None => {
                let spec = self.scope.nat_router_spec(network);
                let router = create(cancel, &*self.compute.routers, &self.waiter, &key, &spec).await?;
                info!(router = %router.name, "Created Cloud NAT router");
                router
            }
        };

        if !owned(router.description.as_deref(), &self.scope.name) {
            warn!(router = %router.name, "Router exists but is not owned by cluster, not attaching NAT");
            return Ok(router);
        }

        if router.nats.is_empty() {
            router.nats = vec![self.scope.nat_spec()];
            let submitted = cancellable(cancel, &key, self.compute.routers.patch(&key, &router)).await;
            self.waiter
                .wait(cancel, "patch", ResourceKind::Router, &key, submitted)
                .await?;
            info!(router = %router.name, "Attached Cloud NAT to router");
        }

        Ok(router)
    }

    async fn delete_router(&self, cancel: &CancellationToken, network: &Network) -> Result<()> {
        let key = Key::regional(router_name(&network.name), &self.scope.region);
        match get_or_none::<Router, _>(cancel, &*self.compute.routers, &key).await? {
            Some(router) if owned(router.description.as_deref(), &self.scope.name) => {
                delete_and_wait::<Router, _>(cancel, &*self.compute.routers, &self.waiter, &key).await
            }
            Some(router) => {
                info!(router = %router.name, "Router not owned by cluster, skipping deletion");
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn delete_node_routes(&self, cancel: &CancellationToken, network: &Network) -> Result<()> {
        let filter = Filter::regexp("description", K8S_NODE_ROUTE_TAG);
        let routes: Vec<Route> = list(cancel, &*self.compute.routes, &filter).await?;

        for route in routes.iter().filter(|r| on_network(&r.network, &network.name)) {
            debug!(route = %route.name, "Deleting node route");
            delete_and_wait::<Route, _>(cancel, &*self.compute.routes, &self.waiter, &Key::global(&route.name)).await?;
        }

        Ok(())
    }
}

/// Whether a network reference points at the network called `name`.
fn on_network(reference: &str, name: &str) -> bool {
    reference == name || reference.ends_with(&format!("/{name}"))
}
