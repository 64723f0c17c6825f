//! Resource manager - drives the template → group → instance chain.
//!
//! Provisioning walks the chain top-down, each step threading the identity
//! of its resource into the next insert. Teardown walks it bottom-up and
//! stops at the first failure, so a group is never deleted while an instance
//! that could not be removed still sits on it.

use std::fmt;

use tracing::info;

use crate::client::ComputeClients;
use crate::config::ChainConfig;
use crate::container::{self, WorkloadSpec};
use crate::error::{Result, StepError};
use crate::resource::{Instance, NodeGroup, NodeTemplate};
use crate::step::LifecycleStep;
use crate::watcher::OperationWatcher;

/// How far the chain is provisioned, as far as this manager knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChainState {
    Unprovisioned,
    TemplateReady,
    GroupReady,
    InstanceReady,
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainState::Unprovisioned => write!(f, "unprovisioned"),
            ChainState::TemplateReady => write!(f, "template ready"),
            ChainState::GroupReady => write!(f, "group ready"),
            ChainState::InstanceReady => write!(f, "instance ready"),
        }
    }
}

/// Owns one sole-tenant chain. Not safe to share between processes targeting
/// the same resource names.
pub struct ResourceManager {
    config: ChainConfig,
    templates: LifecycleStep<NodeTemplate>,
    groups: LifecycleStep<NodeGroup>,
    instances: LifecycleStep<Instance>,
}

impl ResourceManager {
    pub fn new(config: ChainConfig, clients: ComputeClients) -> Self {
        let watcher = OperationWatcher::new(
            clients.operations,
            &config.project,
            config.poll_interval,
            config.operation_timeout,
        );
        Self {
            templates: LifecycleStep::new(
                clients.templates,
                watcher.clone(),
                config.region_scope(),
                &config.name,
            ),
            groups: LifecycleStep::new(
                clients.groups,
                watcher.clone(),
                config.zone_scope(),
                &config.name,
            ),
            instances: LifecycleStep::new(
                clients.instances,
                watcher,
                config.zone_scope(),
                &config.name,
            ),
            config,
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn state(&self) -> ChainState {
        match (
            self.templates.state().is_resolved(),
            self.groups.state().is_resolved(),
            self.instances.state().is_resolved(),
        ) {
            (true, true, true) => ChainState::InstanceReady,
            (true, true, false) => ChainState::GroupReady,
            (true, false, _) => ChainState::TemplateReady,
            (false, _, _) => ChainState::Unprovisioned,
        }
    }

    pub fn template(&self) -> Option<&NodeTemplate> {
        self.templates.state().resolved()
    }

    pub fn group(&self) -> Option<&NodeGroup> {
        self.groups.state().resolved()
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instances.state().resolved()
    }

    /// Look up every resource of the chain without changing anything.
    pub async fn refresh(&mut self) -> Result<ChainState> {
        self.templates.resolve().await?;
        self.groups.resolve().await?;
        self.instances.resolve().await?;
        Ok(self.state())
    }

    /// Create whatever is missing of the chain and return the running instance.
    pub async fn provision(&mut self, workload: &WorkloadSpec) -> Result<Instance> {
        // Encode first: a bad workload must not leave half a chain behind.
        let declaration =
            container::encode(workload).map_err(|e| StepError::Workload(e.to_string()))?;
        let config = &self.config;

        let template = self
            .templates
            .ensure_created(|| Ok(config.node_template()))
            .await?;
        if !template.has_label(&config.affinity_key, &config.affinity_value) {
            return Err(StepError::AffinityMismatch {
                template: template.name.clone(),
                key: config.affinity_key.clone(),
                value: config.affinity_value.clone(),
            });
        }
        let template_link = template.self_link.clone().unwrap_or_else(|| {
            format!(
                "projects/{}/regions/{}/nodeTemplates/{}",
                config.project, config.region, template.name
            )
        });

        self.groups
            .ensure_created(|| Ok(config.node_group(&template_link)))
            .await?;

        let instance = self
            .instances
            .ensure_created(|| Ok(config.instance(declaration)))
            .await?
            .clone();

        info!(
            "Instance {} is running {} (external IP: {})",
            instance.name,
            workload.image,
            instance.external_ip().unwrap_or("none")
        );
        Ok(instance)
    }

    /// Delete the chain bottom-up. Missing resources are skipped.
    pub async fn teardown(&mut self) -> Result<()> {
        self.instances.ensure_deleted().await?;
        self.groups.ensure_deleted().await?;
        self.templates.ensure_deleted().await?;
        info!("Sole-tenant chain {} has been torn down", self.config.name);
        Ok(())
    }
}
