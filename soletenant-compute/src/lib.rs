//! soletenant-compute: provisions a sole-tenant chain on Compute Engine.
//!
//! The chain is a node template, a node group built from it, and one
//! instance pinned to the group that runs a single container. Every
//! mutation returns a long-running operation which is polled to completion
//! before the next step starts.
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use soletenant_compute::{ChainConfig, ComputeApi, ComputeClients, ResourceManager, WorkloadSpec};
//!
//! let api = Arc::new(ComputeApi::new(soletenant_compute::gce::DEFAULT_ENDPOINT, Some(token)));
//! let mut manager = ResourceManager::new(ChainConfig::new("my-project"), ComputeClients::from_backend(api));
//! let instance = manager.provision(&WorkloadSpec::new("docker.io/nginx:1.17")).await?;
//! ```

pub mod client;
pub mod config;
pub mod container;
pub mod error;
pub mod gce;
pub mod manager;
pub mod operation;
pub mod resource;
pub mod step;
pub mod watcher;

pub use client::{ComputeClients, OperationClient, ResourceClient};
pub use config::ChainConfig;
pub use container::WorkloadSpec;
pub use error::{ClientError, OperationError, StepError};
pub use gce::ComputeApi;
pub use manager::{ChainState, ResourceManager};
pub use operation::{Location, Operation, OperationStatus, Scope};
pub use resource::{Instance, NodeGroup, NodeTemplate};
pub use step::{LifecycleStep, Resolution};
pub use watcher::OperationWatcher;
