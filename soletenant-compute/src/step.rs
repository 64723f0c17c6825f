//! Lifecycle step - read-or-create and read-or-delete for one resource.
//!
//! A step owns the cached view of its resource as a [`Resolution`]:
//! `Unresolved` means we have not looked yet, `Deleted` means we know it is
//! absent. Only `Unresolved` triggers a Get.

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::ResourceClient;
use crate::error::{Phase, Result, StepContext, StepError};
use crate::operation::Scope;
use crate::resource::Resource;
use crate::watcher::OperationWatcher;

/// What a step knows about its resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Unresolved,
    Resolved(T),
    Deleted,
}

impl<T> Resolution<T> {
    pub fn resolved(&self) -> Option<&T> {
        match self {
            Resolution::Resolved(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Binds a resource client to a fixed name and scope.
pub struct LifecycleStep<T: Resource> {
    client: Arc<dyn ResourceClient<T>>,
    watcher: OperationWatcher,
    scope: Scope,
    name: String,
    state: Resolution<T>,
}

impl<T: Resource> LifecycleStep<T> {
    pub fn new(
        client: Arc<dyn ResourceClient<T>>,
        watcher: OperationWatcher,
        scope: Scope,
        name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            watcher,
            scope,
            name: name.into(),
            state: Resolution::Unresolved,
        }
    }

    pub fn state(&self) -> &Resolution<T> {
        &self.state
    }

    fn context(&self, phase: Phase) -> StepContext {
        StepContext::new(T::KIND, &self.name, phase)
    }

    /// Resolve the resource without creating it. `None` if it does not exist.
    pub async fn resolve(&mut self) -> Result<Option<&T>> {
        if let Resolution::Unresolved = self.state {
            self.state = match self.client.get(&self.scope, &self.name).await {
                Ok(found) => {
                    debug!("Found existing {} {}", T::KIND, self.name);
                    Resolution::Resolved(found)
                }
                Err(e) if e.is_not_found() => Resolution::Deleted,
                Err(e) => return Err(StepError::client(self.context(Phase::Read), e)),
            };
        }
        Ok(self.state.resolved())
    }

    /// Return the resource, creating it from `spec` if it does not exist.
    ///
    /// `spec` is only called when an insert is needed. After the insert
    /// operation completes the resource is read back, since server-assigned
    /// fields are missing from the insert response.
    pub async fn ensure_created<F>(&mut self, spec: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T::Spec>,
    {
        if self.resolve().await?.is_some() {
            return self.cached(Phase::Create);
        }

        let context = self.context(Phase::Create);
        // From here on the resource may exist even if a later call fails.
        self.state = Resolution::Unresolved;
        let op = self
            .client
            .insert(&self.scope, spec()?)
            .await
            .map_err(|e| StepError::client(context.clone(), e))?;

        let activity = format!("Creating new {} {} ...", T::KIND, self.name);
        self.watcher
            .wait(&activity, op)
            .await
            .map_err(|e| StepError::operation(context.clone(), e))?;
        info!("{} {} has been created", T::KIND, self.name);

        match self.client.get(&self.scope, &self.name).await {
            Ok(created) => self.state = Resolution::Resolved(created),
            Err(e) if e.is_not_found() => return Err(StepError::Vanished { context }),
            Err(e) => return Err(StepError::client(context, e)),
        }
        self.cached(Phase::Create)
    }

    /// Delete the resource if it exists. Absent resources are a no-op.
    pub async fn ensure_deleted(&mut self) -> Result<()> {
        if self.resolve().await?.is_none() {
            debug!("{} {} is already absent", T::KIND, self.name);
            return Ok(());
        }

        let context = self.context(Phase::Delete);
        // A failed delete leaves the cached copy stale; look again next time.
        self.state = Resolution::Unresolved;
        let op = match self.client.delete(&self.scope, &self.name).await {
            Ok(op) => op,
            Err(e) if e.is_not_found() => {
                self.state = Resolution::Deleted;
                return Ok(());
            }
            Err(e) => return Err(StepError::client(context, e)),
        };

        let activity = format!("Deleting {} {} ...", T::KIND, self.name);
        self.watcher
            .wait(&activity, op)
            .await
            .map_err(|e| StepError::operation(context, e))?;

        self.state = Resolution::Deleted;
        info!("{} {} has been deleted", T::KIND, self.name);
        Ok(())
    }

    fn cached(&self, phase: Phase) -> Result<&T> {
        self.state.resolved().ok_or_else(|| StepError::Vanished {
            context: self.context(phase),
        })
    }
}
