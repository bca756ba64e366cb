//! Compute provider abstractions.
//!
//! This module defines the per-resource client traits the reconcilers talk
//! to, and the GCP implementation of them.

pub mod gcp;
mod traits;

pub use traits::{
    Compute, ComputeResource, ListClient, OperationClient, ResourceClient, RouterClient,
};

#[cfg(test)]
pub use traits::MockOperationClient;

// Re-export provider clients
pub use gcp::ComputeApi;
