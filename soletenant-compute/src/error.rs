//! Error types for the sole-tenant chain.
//!
//! Three layers, innermost first:
//! - [`ClientError`]: a single Get/Insert/Delete or operation fetch failed.
//! - [`OperationError`]: waiting on a long-running operation failed.
//! - [`StepError`]: either of the above, tagged with the resource kind and
//!   lifecycle phase that was running.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors returned by a resource or operation client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The resource does not exist. Used as a signal by the lifecycle steps.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network, auth or API failure.
    #[error("transport: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("undecodable response ({reason}): {raw}")]
    Decode { raw: String, reason: String },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// Errors from [`crate::watcher::OperationWatcher::wait`].
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    /// The operation did not reach DONE before the deadline.
    #[error("operation {operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// The operation finished with an error body.
    #[error("operation {operation} failed: {payload}")]
    Failed { operation: String, payload: String },

    /// A status fetch returned a body that is not a valid operation, or a
    /// status earlier than one already observed.
    #[error("operation {operation} returned a malformed status: {raw}")]
    Malformed { operation: String, raw: String },

    /// A status fetch failed in transport.
    #[error("polling operation {operation}: {source}")]
    Poll {
        operation: String,
        #[source]
        source: ClientError,
    },

    /// The poll task died without producing a result.
    #[error("poll task for operation {operation} stopped: {reason}")]
    Abandoned { operation: String, reason: String },
}

/// Resource kinds in the chain, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    NodeTemplate,
    NodeGroup,
    Instance,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::NodeTemplate => write!(f, "node template"),
            ResourceKind::NodeGroup => write!(f, "node group"),
            ResourceKind::Instance => write!(f, "instance"),
        }
    }
}

/// Lifecycle phase a step was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Read,
    Create,
    Delete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Read => write!(f, "read"),
            Phase::Create => write!(f, "create"),
            Phase::Delete => write!(f, "delete"),
        }
    }
}

/// Which resource and phase an error belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepContext {
    pub kind: ResourceKind,
    pub name: String,
    pub phase: Phase,
}

impl StepContext {
    pub fn new(kind: ResourceKind, name: impl Into<String>, phase: Phase) -> Self {
        Self {
            kind,
            name: name.into(),
            phase,
        }
    }
}

impl fmt::Display for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.phase, self.kind, self.name)
    }
}

/// Errors surfaced by lifecycle steps and the resource manager.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    #[error("{context}: {source}")]
    Transport {
        context: StepContext,
        #[source]
        source: ClientError,
    },

    #[error("{context}: operation {operation} did not finish within {after:?}")]
    Timeout {
        context: StepContext,
        operation: String,
        after: Duration,
    },

    #[error("{context}: operation {operation} failed: {payload}")]
    OperationFailed {
        context: StepContext,
        operation: String,
        payload: String,
    },

    #[error("{context}: operation {operation} returned a malformed status: {raw}")]
    MalformedOperation {
        context: StepContext,
        operation: String,
        raw: String,
    },

    #[error("{context}: poll task for operation {operation} stopped: {reason}")]
    Abandoned {
        context: StepContext,
        operation: String,
        reason: String,
    },

    /// The re-read after a completed insert found nothing.
    #[error("{context}: resource is absent after its operation completed")]
    Vanished { context: StepContext },

    /// The template exists but does not carry the label instances are pinned to.
    #[error("node template {template} has no affinity label {key}={value}; instances would not schedule")]
    AffinityMismatch {
        template: String,
        key: String,
        value: String,
    },

    /// The workload could not be encoded into instance metadata.
    #[error("encoding container declaration: {0}")]
    Workload(String),
}

impl StepError {
    pub fn client(context: StepContext, source: ClientError) -> Self {
        StepError::Transport { context, source }
    }

    pub fn operation(context: StepContext, err: OperationError) -> Self {
        match err {
            OperationError::Timeout { operation, after } => StepError::Timeout {
                context,
                operation,
                after,
            },
            OperationError::Failed { operation, payload } => StepError::OperationFailed {
                context,
                operation,
                payload,
            },
            OperationError::Malformed { operation, raw } => StepError::MalformedOperation {
                context,
                operation,
                raw,
            },
            OperationError::Poll { source, .. } => StepError::Transport { context, source },
            OperationError::Abandoned { operation, reason } => StepError::Abandoned {
                context,
                operation,
                reason,
            },
        }
    }

    /// The resource and phase that failed, if the error is tied to one.
    pub fn context(&self) -> Option<&StepContext> {
        match self {
            StepError::Transport { context, .. }
            | StepError::Timeout { context, .. }
            | StepError::OperationFailed { context, .. }
            | StepError::MalformedOperation { context, .. }
            | StepError::Abandoned { context, .. }
            | StepError::Vanished { context } => Some(context),
            StepError::AffinityMismatch { .. } | StepError::Workload(_) => None,
        }
    }
}

/// Result type for lifecycle steps.
pub type Result<T> = std::result::Result<T, StepError>;
