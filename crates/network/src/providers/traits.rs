//! Resource client traits and the per-project client bundle.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::gcp::models::{Firewall, Instance, Network, Operation, Route, Router, Subnetwork};
use crate::error::Result;
use crate::filter::Filter;
use crate::key::{Key, ResourceKind};

/// A compute resource addressable through a [`ResourceClient`].
pub trait ComputeResource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind of the resource.
    const KIND: ResourceKind;

    /// Self link, once the provider has assigned one.
    fn self_link(&self) -> Option<&str>;
}

/// Get/insert/delete access to one kind of resource.
#[async_trait]
pub trait ResourceClient<R: ComputeResource>: Send + Sync {
    /// Fetch a resource. Fails with `NotFound` when absent.
    async fn get(&self, key: &Key) -> Result<R>;

    /// Start creating a resource.
    async fn insert(&self, key: &Key, resource: &R) -> Result<Operation>;

    /// Start deleting a resource. Fails with `NotFound` when already absent.
    async fn delete(&self, key: &Key) -> Result<Operation>;
}

/// Listing for global collections (routes, firewall rules).
#[async_trait]
pub trait ListClient<R: ComputeResource>: ResourceClient<R> {
    /// List every resource matching `filter`.
    async fn list(&self, filter: &Filter) -> Result<Vec<R>>;
}

/// Routers additionally support in-place patching (used to attach NAT).
#[async_trait]
pub trait RouterClient: ResourceClient<Router> {
    /// Start patching a router.
    async fn patch(&self, key: &Key, router: &Router) -> Result<Operation>;
}

/// Polling access to operations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OperationClient: Send + Sync {
    /// Re-read an operation in its own scope.
    async fn get_operation(&self, operation: &Operation) -> Result<Operation>;
}

/// Every client the reconcilers need, for one project.
#[derive(Clone)]
pub struct Compute {
    pub networks: Arc<dyn ResourceClient<Network>>,
    pub subnetworks: Arc<dyn ResourceClient<Subnetwork>>,
    pub routers: Arc<dyn RouterClient>,
    pub firewalls: Arc<dyn ListClient<Firewall>>,
    pub routes: Arc<dyn ListClient<Route>>,
    pub instances: Arc<dyn ResourceClient<Instance>>,
    pub operations: Arc<dyn OperationClient>,
}

impl Compute {
    /// Build the bundle from a single backend implementing every client.
    pub fn from_api<C>(api: Arc<C>) -> Self
    where
        C: ResourceClient<Network>
            + ResourceClient<Subnetwork>
            + RouterClient
            + ListClient<Firewall>
            + ListClient<Route>
            + ResourceClient<Instance>
            + OperationClient
            + 'static,
    {
        Self {
            networks: api.clone(),
            subnetworks: api.clone(),
            routers: api.clone(),
            firewalls: api.clone(),
            routes: api.clone(),
            instances: api.clone(),
            operations: api,
        }
    }
}
