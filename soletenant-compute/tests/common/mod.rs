//! Shared test utilities: an in-memory cloud that records every call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use soletenant_compute::error::ResourceKind;
use soletenant_compute::operation::{OperationErrorBody, OperationErrorEntry};
use soletenant_compute::resource::{AccessConfig, NetworkInterface, NodeGroupSpec};
use soletenant_compute::{
    ChainConfig, ClientError, ComputeClients, Instance, NodeGroup, NodeTemplate, Operation,
    OperationClient, OperationStatus, ResourceClient, ResourceManager, Scope,
};

pub const PROJECT: &str = "macro-mile-203600";

/// One client call, in the order the fake saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(ResourceKind),
    Insert(ResourceKind),
    Delete(ResourceKind),
    Poll(Scope, String),
}

#[derive(Default)]
struct State {
    templates: HashMap<String, NodeTemplate>,
    groups: HashMap<String, NodeGroup>,
    instances: HashMap<String, Instance>,
    /// Operation name → kind and whether it was a delete.
    operations: HashMap<String, (ResourceKind, bool)>,
    calls: Vec<Call>,
    next_op: u32,
    stalled: HashSet<ResourceKind>,
    malformed_delete: HashSet<ResourceKind>,
    vanishing: HashSet<ResourceKind>,
    failing: HashSet<ResourceKind>,
}

/// In-memory Compute Engine. Mutations apply immediately; their operations
/// report RUNNING on insert/delete and DONE on the first poll.
#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Mutating calls only, without gets and polls.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Insert(_) | Call::Delete(_)))
            .collect()
    }

    /// Operations for `kind` never reach DONE.
    pub fn stall(&self, kind: ResourceKind) {
        self.state.lock().unwrap().stalled.insert(kind);
    }

    /// Operations for `kind` complete again.
    pub fn resume(&self, kind: ResourceKind) {
        self.state.lock().unwrap().stalled.remove(&kind);
    }

    /// Inserts of `kind` report success but store nothing.
    pub fn vanish_on_insert(&self, kind: ResourceKind) {
        self.state.lock().unwrap().vanishing.insert(kind);
    }

    /// Operations for `kind` reach DONE with an error body.
    pub fn fail_operations(&self, kind: ResourceKind) {
        self.state.lock().unwrap().failing.insert(kind);
    }

    /// Polling a delete of `kind` returns an undecodable body.
    pub fn malformed_delete(&self, kind: ResourceKind) {
        self.state.lock().unwrap().malformed_delete.insert(kind);
    }

    pub fn seed_template(&self, template: NodeTemplate) {
        let mut state = self.state.lock().unwrap();
        state.templates.insert(template.name.clone(), template);
    }

    pub fn seed_group(&self, group: NodeGroup) {
        let mut state = self.state.lock().unwrap();
        state.groups.insert(group.name.clone(), group);
    }

    pub fn seed_instance(&self, instance: Instance) {
        let mut state = self.state.lock().unwrap();
        state.instances.insert(instance.name.clone(), instance);
    }

    /// Seed a complete chain as `config` would create it.
    pub fn seed_chain(&self, config: &ChainConfig) {
        let mut template = config.node_template();
        template.self_link = Some(template_link(&template.name));
        let group = config.node_group(template.self_link.as_deref().unwrap_or_default()).group;
        self.seed_template(template);
        self.seed_group(group);
        self.seed_instance(config.instance("{}".to_string()));
    }

    pub fn template(&self, name: &str) -> Option<NodeTemplate> {
        self.state.lock().unwrap().templates.get(name).cloned()
    }

    pub fn group(&self, name: &str) -> Option<NodeGroup> {
        self.state.lock().unwrap().groups.get(name).cloned()
    }

    pub fn instance(&self, name: &str) -> Option<Instance> {
        self.state.lock().unwrap().instances.get(name).cloned()
    }

    fn start_operation(state: &mut State, kind: ResourceKind, delete: bool, scope: &Scope) -> Operation {
        state.next_op += 1;
        let name = format!("operation-{}", state.next_op);
        state.operations.insert(name.clone(), (kind, delete));
        let op = Operation::new(name, OperationStatus::Running);
        match &scope.location {
            soletenant_compute::Location::Zone(z) => {
                op.in_zone(format!("https://www.googleapis.com/compute/v1/projects/{}/zones/{}", scope.project, z))
            }
            soletenant_compute::Location::Region(r) => {
                op.in_region(format!("https://www.googleapis.com/compute/v1/projects/{}/regions/{}", scope.project, r))
            }
            soletenant_compute::Location::Global => op,
        }
    }
}

pub fn template_link(name: &str) -> String {
    format!(
        "https://www.googleapis.com/compute/v1/projects/{}/regions/europe-west3/nodeTemplates/{}",
        PROJECT, name
    )
}

fn not_found(kind: ResourceKind, name: &str) -> ClientError {
    ClientError::NotFound(format!("{} {}", kind, name))
}

#[async_trait]
impl ResourceClient<NodeTemplate> for FakeCloud {
    async fn get(&self, _scope: &Scope, name: &str) -> Result<NodeTemplate, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Get(ResourceKind::NodeTemplate));
        state
            .templates
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::NodeTemplate, name))
    }

    async fn insert(&self, scope: &Scope, spec: NodeTemplate) -> Result<Operation, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Insert(ResourceKind::NodeTemplate));
        let mut created = spec;
        created.self_link = Some(template_link(&created.name));
        created.status = Some("READY".to_string());
        if !state.vanishing.contains(&ResourceKind::NodeTemplate) {
            state.templates.insert(created.name.clone(), created);
        }
        Ok(Self::start_operation(&mut state, ResourceKind::NodeTemplate, false, scope))
    }

    async fn delete(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(ResourceKind::NodeTemplate));
        if state.groups.values().any(|g| g.node_template.ends_with(name)) {
            return Err(ClientError::Transport(format!(
                "node template {} is in use by a node group",
                name
            )));
        }
        state.templates.remove(name);
        Ok(Self::start_operation(&mut state, ResourceKind::NodeTemplate, true, scope))
    }
}

#[async_trait]
impl ResourceClient<NodeGroup> for FakeCloud {
    async fn get(&self, _scope: &Scope, name: &str) -> Result<NodeGroup, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Get(ResourceKind::NodeGroup));
        state
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::NodeGroup, name))
    }

    async fn insert(&self, scope: &Scope, spec: NodeGroupSpec) -> Result<Operation, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Insert(ResourceKind::NodeGroup));
        let template_exists = state
            .templates
            .values()
            .any(|t| t.self_link.as_deref() == Some(spec.group.node_template.as_str()));
        if !template_exists {
            return Err(ClientError::Transport(format!(
                "unknown node template {}",
                spec.group.node_template
            )));
        }
        let mut created = spec.group;
        created.size = Some(spec.initial_node_count);
        created.status = Some("READY".to_string());
        if !state.vanishing.contains(&ResourceKind::NodeGroup) {
            state.groups.insert(created.name.clone(), created);
        }
        Ok(Self::start_operation(&mut state, ResourceKind::NodeGroup, false, scope))
    }

    async fn delete(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(ResourceKind::NodeGroup));
        if !state.instances.is_empty() {
            return Err(ClientError::Transport(format!(
                "node group {} still has instances",
                name
            )));
        }
        state.groups.remove(name);
        Ok(Self::start_operation(&mut state, ResourceKind::NodeGroup, true, scope))
    }
}

#[async_trait]
impl ResourceClient<Instance> for FakeCloud {
    async fn get(&self, _scope: &Scope, name: &str) -> Result<Instance, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Get(ResourceKind::Instance));
        state
            .instances
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(ResourceKind::Instance, name))
    }

    async fn insert(&self, scope: &Scope, spec: Instance) -> Result<Operation, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Insert(ResourceKind::Instance));
        if state.groups.is_empty() {
            return Err(ClientError::Transport("no node group to schedule on".to_string()));
        }
        let mut created = spec;
        created.status = Some("RUNNING".to_string());
        created.network_interfaces = vec![NetworkInterface {
            network_ip: Some("10.156.0.2".to_string()),
            access_configs: vec![AccessConfig {
                nat_ip: Some("35.198.0.10".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }];
        if !state.vanishing.contains(&ResourceKind::Instance) {
            state.instances.insert(created.name.clone(), created);
        }
        Ok(Self::start_operation(&mut state, ResourceKind::Instance, false, scope))
    }

    async fn delete(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(ResourceKind::Instance));
        state.instances.remove(name);
        Ok(Self::start_operation(&mut state, ResourceKind::Instance, true, scope))
    }
}

#[async_trait]
impl OperationClient for FakeCloud {
    async fn get_operation(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Poll(scope.clone(), name.to_string()));
        let (kind, delete) = *state
            .operations
            .get(name)
            .ok_or_else(|| ClientError::NotFound(format!("operation {}", name)))?;

        if delete && state.malformed_delete.contains(&kind) {
            return Err(ClientError::Decode {
                raw: r#"{"name": "operation", "status": 7"#.to_string(),
                reason: "EOF while parsing an object".to_string(),
            });
        }
        if state.failing.contains(&kind) {
            let mut op = Operation::new(name, OperationStatus::Done);
            op.error = Some(OperationErrorBody {
                errors: vec![OperationErrorEntry {
                    code: "ZONE_RESOURCE_POOL_EXHAUSTED".to_string(),
                    location: None,
                    message: "no capacity for n1-node-96-624".to_string(),
                }],
            });
            return Ok(op);
        }
        let status = if state.stalled.contains(&kind) {
            OperationStatus::Running
        } else {
            OperationStatus::Done
        };
        Ok(Operation::new(name, status))
    }
}

/// Config with the original deployment parameters and a short timeout.
pub fn test_config() -> ChainConfig {
    let mut config = ChainConfig::new(PROJECT);
    config.operation_timeout = Duration::from_secs(10);
    config
}

pub fn manager(cloud: &Arc<FakeCloud>, config: ChainConfig) -> ResourceManager {
    ResourceManager::new(config, ComputeClients::from_backend(Arc::clone(cloud)))
}
