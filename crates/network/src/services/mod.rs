//! Reconcilers for the cluster's network resources.
//!
//! - [`network`] - VPC network, subnetworks and the Cloud NAT router
//! - [`firewall`] - the cluster's firewall rules
//! - [`bastion`] - the optional bastion host
//!
//! All of them share the idioms below: look a resource up, create it if it
//! is missing, and delete it tolerating that it is already gone.

pub mod bastion;
pub mod firewall;
pub mod network;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, ResultExt};
use crate::filter::Filter;
use crate::key::Key;
use crate::providers::{ComputeResource, ListClient, ResourceClient};
use crate::wait::{cancellable, OperationWaiter};

/// Fetch a resource, mapping `NotFound` to `None`.
pub(crate) async fn get_or_none<R, C>(
    cancel: &CancellationToken,
    client: &C,
    key: &Key,
) -> Result<Option<R>>
where
    R: ComputeResource,
    C: ResourceClient<R> + ?Sized,
{
    debug!(kind = %R::KIND, key = %key, "Looking up resource");
    cancellable(cancel, key, client.get(key))
        .await
        .found()
        .for_resource("get", R::KIND, key)
}

/// Create a resource from `spec`, wait for it, and read it back.
pub(crate) async fn create<R, C>(
    cancel: &CancellationToken,
    client: &C,
    waiter: &OperationWaiter,
    key: &Key,
    spec: &R,
) -> Result<R>
where
    R: ComputeResource,
    C: ResourceClient<R> + ?Sized,
{
    info!(kind = %R::KIND, key = %key, "Creating resource");
    let submitted = cancellable(cancel, key, client.insert(key, spec)).await;
    waiter.wait(cancel, "insert", R::KIND, key, submitted).await?;

    let created = cancellable(cancel, key, client.get(key))
        .await
        .for_resource("get", R::KIND, key)?;
    debug!(
        kind = %R::KIND,
        key = %key,
        self_link = created.self_link().unwrap_or_default(),
        "Resource created"
    );
    Ok(created)
}

/// Return the existing resource or create it from `spec`.
pub(crate) async fn create_or_get<R, C>(
    cancel: &CancellationToken,
    client: &C,
    waiter: &OperationWaiter,
    key: &Key,
    spec: &R,
) -> Result<R>
where
    R: ComputeResource,
    C: ResourceClient<R> + ?Sized,
{
    match get_or_none(cancel, client, key).await? {
        Some(existing) => Ok(existing),
        None => create(cancel, client, waiter, key, spec).await,
    }
}

/// Delete a resource and wait for it; absence counts as success.
pub(crate) async fn delete_and_wait<R, C>(
    cancel: &CancellationToken,
    client: &C,
    waiter: &OperationWaiter,
    key: &Key,
) -> Result<()>
where
    R: ComputeResource,
    C: ResourceClient<R> + ?Sized,
{
    info!(kind = %R::KIND, key = %key, "Deleting resource");
    let submitted = cancellable(cancel, key, client.delete(key)).await;
    waiter.wait_delete(cancel, R::KIND, key, submitted).await
}

/// List a global collection.
pub(crate) async fn list<R, C>(
    cancel: &CancellationToken,
    client: &C,
    filter: &Filter,
) -> Result<Vec<R>>
where
    R: ComputeResource,
    C: ListClient<R> + ?Sized,
{
    let scope = Key::global("");
    cancellable(cancel, &scope, client.list(filter))
        .await
        .for_resource("list", R::KIND, &scope)
}
