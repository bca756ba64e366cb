//! Optional bastion host.
//!
//! A single small instance with a public address on the cluster network.
//! It is only managed when the network exists and carries this cluster's
//! ownership tag.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{create_or_get, delete_and_wait, get_or_none};
use crate::error::Result;
use crate::key::Key;
use crate::ownership::{bastion_name, bastion_zone, owned};
use crate::providers::gcp::models::{
    AccessConfig, AttachedDisk, InitializeParams, Instance, Network, NetworkInterface,
    ServiceAccount, Tags,
};
use crate::providers::Compute;
use crate::scope::{BastionStatus, ClusterScope};
use crate::wait::{OperationWaiter, WaitConfig};

const MACHINE_TYPE: &str = "f1-micro";
const SOURCE_IMAGE: &str = "projects/ubuntu-os-cloud/global/images/family/ubuntu-minimal-1804-lts";
const DISK_TYPE: &str = "pd-standard";
const DISK_SIZE_GB: u32 = 10;
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Reconciles the bastion instance.
#[derive(Clone)]
pub struct BastionReconciler {
    scope: Arc<ClusterScope>,
    compute: Compute,
    waiter: OperationWaiter,
}

impl BastionReconciler {
    /// The network gate reads through `compute.networks`, so for a shared VPC
    /// that client must address the host project.
    #[must_use]
    pub fn new(scope: Arc<ClusterScope>, compute: Compute, wait: WaitConfig) -> Self {
        let waiter = OperationWaiter::new(compute.operations.clone(), wait);
        Self {
            scope,
            compute,
            waiter,
        }
    }

    fn instance_key(&self) -> Key {
        Key::zonal(bastion_name(&self.scope.name), bastion_zone(&self.scope.region))
    }

    /// The cluster network, if it exists and belongs to this cluster.
    async fn owned_network(&self, cancel: &CancellationToken) -> Result<Option<Network>> {
        let key = Key::global(self.scope.network_name());
        let network = get_or_none::<Network, _>(cancel, &*self.compute.networks, &key).await?;
        Ok(network.filter(|n| owned(n.description.as_deref(), &self.scope.name)))
    }

    /// Ensure the bastion exists and record its status.
    ///
    /// # Errors
    /// Returns the first provider/operation error encountered.
    pub async fn reconcile(&self, cancel: &CancellationToken, status: &mut BastionStatus) -> Result<()> {
        let Some(network) = self.owned_network(cancel).await? else {
            debug!(cluster = %self.scope.name, "Network missing or not owned, skipping bastion");
            return Ok(());
        };

        debug!(cluster = %self.scope.name, "Reconciling bastion host");

        let network_link = network
            .self_link
            .unwrap_or_else(|| self.scope.network_reference());
        let key = self.instance_key();
        let spec = self.bastion_spec(&network_link);
        let instance = create_or_get(cancel, &*self.compute.instances, &self.waiter, &key, &spec).await?;

        info!(
            instance = %instance.name,
            status = instance.status.as_deref().unwrap_or("UNKNOWN"),
            "Bastion host ready"
        );
        status.self_link = instance.self_link;
        status.instance_status = instance.status;
        Ok(())
    }

    /// Delete the bastion and clear its status.
    ///
    /// # Errors
    /// Returns the first provider/operation error encountered.
    pub async fn delete(&self, cancel: &CancellationToken, status: &mut BastionStatus) -> Result<()> {
        if self.owned_network(cancel).await?.is_none() {
            debug!(cluster = %self.scope.name, "Network missing or not owned, skipping bastion deletion");
            return Ok(());
        }

        let key = self.instance_key();
        if get_or_none::<Instance, _>(cancel, &*self.compute.instances, &key)
            .await?
            .is_none()
        {
            debug!(instance = %key, "Bastion instance does not exist");
            *status = BastionStatus::default();
            return Ok(());
        }

        delete_and_wait::<Instance, _>(cancel, &*self.compute.instances, &self.waiter, &key).await?;
        info!(instance = %key, "Bastion host deleted");
        *status = BastionStatus::default();
        Ok(())
    }

    /// Instance to insert when the bastion does not exist.
    #[must_use]
    pub fn bastion_spec(&self, network_link: &str) -> Instance {
        let name = bastion_name(&self.scope.name);
        let zone = bastion_zone(&self.scope.region);

        Instance {
            machine_type: format!("zones/{zone}/machineTypes/{MACHINE_TYPE}"),
            can_ip_forward: true,
            network_interfaces: vec![NetworkInterface {
                network: Some(network_link.to_string()),
                access_configs: vec![AccessConfig {
                    access_type: "ONE_TO_ONE_NAT".into(),
                    name: "External NAT".into(),
                    nat_ip: None,
                }],
                ..Default::default()
            }],
            disks: vec![AttachedDisk {
                auto_delete: true,
                boot: true,
                initialize_params: Some(InitializeParams {
                    disk_size_gb: Some(DISK_SIZE_GB.to_string()),
                    disk_type: Some(format!("zones/{zone}/diskTypes/{DISK_TYPE}")),
                    source_image: Some(SOURCE_IMAGE.into()),
                }),
                source: None,
            }],
            tags: Some(Tags {
                items: vec![name.clone()],
            }),
            service_accounts: vec![ServiceAccount {
                email: "default".into(),
                scopes: vec![CLOUD_PLATFORM_SCOPE.into()],
            }],
            name,
            zone,
            ..Default::default()
        }
    }
}
