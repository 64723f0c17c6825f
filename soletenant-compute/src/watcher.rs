//! Operation watcher - polls a long-running operation until it is DONE.
//!
//! The poll loop runs as its own task and is raced against the timeout.
//! When the timeout wins the task is aborted, not joined: it stops at its
//! next await point and its result is dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::client::OperationClient;
use crate::error::{ClientError, OperationError};
use crate::operation::{Operation, Scope};

/// Polls operations on the scope-specific status endpoint.
#[derive(Clone)]
pub struct OperationWatcher {
    operations: Arc<dyn OperationClient>,
    project: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl OperationWatcher {
    pub fn new(
        operations: Arc<dyn OperationClient>,
        project: impl Into<String>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            operations,
            project: project.into(),
            poll_interval,
            timeout,
        }
    }

    /// Wait for `op` to reach DONE.
    ///
    /// Returns the final operation. An operation that finishes with an error
    /// body yields [`OperationError::Failed`].
    pub async fn wait(&self, activity: &str, op: Operation) -> Result<Operation, OperationError> {
        let name = op.name.clone();
        let scope = op.scope(&self.project);

        let mut task = tokio::spawn(poll_until_done(
            Arc::clone(&self.operations),
            scope,
            activity.to_string(),
            op,
            self.poll_interval,
        ));

        let joined = match timeout(self.timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                warn!(operation = %name, "{} timed out after {:?}", activity, self.timeout);
                return Err(OperationError::Timeout {
                    operation: name,
                    after: self.timeout,
                });
            }
        };

        let done = joined.map_err(|e| OperationError::Abandoned {
            operation: name.clone(),
            reason: e.to_string(),
        })??;

        if let Some(payload) = done.error_payload() {
            error!(operation = %name, "Error with operation: {}", payload);
            return Err(OperationError::Failed {
                operation: name,
                payload,
            });
        }

        Ok(done)
    }
}

async fn poll_until_done(
    operations: Arc<dyn OperationClient>,
    scope: Scope,
    activity: String,
    mut op: Operation,
    poll_interval: Duration,
) -> Result<Operation, OperationError> {
    loop {
        info!("{} {}", activity, op.status);
        if op.is_done() {
            return Ok(op);
        }

        sleep(poll_interval).await;

        let previous = op.status;
        op = match operations.get_operation(&scope, &op.name).await {
            Ok(next) => next,
            Err(ClientError::Decode { raw, reason }) => {
                error!(operation = %op.name, %reason, "Error with operation: {}", raw);
                return Err(OperationError::Malformed {
                    operation: op.name,
                    raw,
                });
            }
            Err(source) => {
                return Err(OperationError::Poll {
                    operation: op.name,
                    source,
                });
            }
        };

        // Status only moves forward.
        if op.status < previous {
            let raw = format!("status went from {} back to {}", previous, op.status);
            error!(operation = %op.name, "Error with operation: {}", raw);
            return Err(OperationError::Malformed {
                operation: op.name,
                raw,
            });
        }
    }
}
