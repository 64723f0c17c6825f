//! Client traits for the cloud API.
//!
//! These are pure transport: no retries, no caching. The lifecycle steps
//! decide what to do with a `NotFound`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ClientError;
use crate::operation::{Operation, Scope};
use crate::resource::{Instance, NodeGroup, NodeTemplate, Resource};

/// Get/Insert/Delete for one resource kind.
#[async_trait]
pub trait ResourceClient<T: Resource>: Send + Sync {
    /// Fetch a resource by name. Absent resources yield `ClientError::NotFound`.
    async fn get(&self, scope: &Scope, name: &str) -> Result<T, ClientError>;

    /// Start creating a resource.
    async fn insert(&self, scope: &Scope, spec: T::Spec) -> Result<Operation, ClientError>;

    /// Start deleting a resource.
    async fn delete(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError>;
}

/// Status lookups for long-running operations.
#[async_trait]
pub trait OperationClient: Send + Sync {
    /// Fetch the current state of an operation from the endpoint matching `scope`.
    async fn get_operation(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError>;
}

/// The set of clients a resource manager needs.
#[derive(Clone)]
pub struct ComputeClients {
    pub templates: Arc<dyn ResourceClient<NodeTemplate>>,
    pub groups: Arc<dyn ResourceClient<NodeGroup>>,
    pub instances: Arc<dyn ResourceClient<Instance>>,
    pub operations: Arc<dyn OperationClient>,
}

impl ComputeClients {
    /// Use one backend for every resource kind and for operations.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ResourceClient<NodeTemplate>
            + ResourceClient<NodeGroup>
            + ResourceClient<Instance>
            + OperationClient
            + 'static,
    {
        Self {
            templates: backend.clone(),
            groups: backend.clone(),
            instances: backend.clone(),
            operations: backend,
        }
    }
}
