//! GCP network convergence for CTO Platform.
//!
//! Drives a cluster's networking resources on Google Compute Engine from
//! whatever currently exists to what the cluster declares:
//!
//! - **Network** - VPC network in auto or custom subnet mode
//! - **Subnetworks** - created in custom mode only
//! - **Cloud NAT router** - outbound access for private instances
//! - **Firewall rules** - health checks and intra-cluster traffic
//! - **Bastion** - optional jump host with a public address
//!
//! Every pass is idempotent. Resources are only deleted or modified when
//! they carry the cluster's ownership tag (`capg-cluster-<name>`), so
//! pre-existing and shared VPC networks are adopted but never torn down.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cto_network::{ClusterScope, ClusterStatus, Compute, ComputeApi, Engine, WaitConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let scope: ClusterScope = serde_yaml::from_str(&std::fs::read_to_string("cluster.yaml")?)?;
//!     let api = Arc::new(ComputeApi::new(&scope.project, "access_token")?);
//!     let engine = Engine::new(scope, Compute::from_api(api), None, WaitConfig::default())?;
//!
//!     let mut status = ClusterStatus::default();
//!     engine.reconcile(&CancellationToken::new(), &mut status).await?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod error;
pub mod filter;
pub mod key;
pub mod ownership;
pub mod providers;
pub mod scope;
pub mod services;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::Engine;
pub use error::{Error, Result};
pub use filter::Filter;
pub use key::{Key, ResourceKind};
pub use providers::{Compute, ComputeApi};
pub use scope::{BastionStatus, ClusterScope, ClusterStatus, NetworkStatus};
pub use wait::WaitConfig;
