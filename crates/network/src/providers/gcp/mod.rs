//! Google Compute Engine backend.
//!
//! Implements every client trait in [`crate::providers`] against the
//! Compute Engine v1 REST API.
//!
//! ## Resources
//!
//! - **Global**: networks, firewalls, routes
//! - **Regional**: subnetworks, routers (Cloud NAT)
//! - **Zonal**: instances (bastion host)
//!
//! Every mutating call returns an [`models::Operation`] that must be polled
//! until `DONE`; see [`crate::wait::OperationWaiter`].

mod client;
pub mod models;

pub use client::ComputeApi;
pub use models::*;
