//! Chain configuration and the static resource descriptors derived from it.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::container::CONTAINER_DECLARATION_KEY;
use crate::operation::Scope;
use crate::resource::{
    AccessConfig, AttachedDisk, AttachedDiskInitializeParams, Instance, Metadata, MetadataItem,
    NetworkInterface, NodeAffinity, NodeGroup, NodeGroupSpec, NodeTemplate, Scheduling,
};

pub const DEFAULT_REGION: &str = "europe-west3";
pub const DEFAULT_ZONE: &str = "europe-west3-b";
pub const DEFAULT_MACHINE_TYPE: &str = "n1-highmem-8";
pub const DEFAULT_NODE_TYPE: &str = "n1-node-96-624";
/// Name shared by the template, the group and the instance.
pub const DEFAULT_NAME: &str = "dedicated";
pub const DEFAULT_SOURCE_IMAGE: &str = "projects/cos-cloud/global/images/family/cos-stable";

/// Everything a resource manager needs to know about its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub project: String,
    pub region: String,
    pub zone: String,
    pub machine_type: String,
    pub node_type: String,
    pub name: String,
    pub node_group_initial_count: u32,
    pub affinity_key: String,
    pub affinity_value: String,
    pub boot_disk_size_gb: u64,
    pub source_image: String,
    pub poll_interval: Duration,
    pub operation_timeout: Duration,
}

impl ChainConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            region: DEFAULT_REGION.to_string(),
            zone: DEFAULT_ZONE.to_string(),
            machine_type: DEFAULT_MACHINE_TYPE.to_string(),
            node_type: DEFAULT_NODE_TYPE.to_string(),
            name: DEFAULT_NAME.to_string(),
            node_group_initial_count: 1,
            affinity_key: "workload".to_string(),
            affinity_value: "benchmark".to_string(),
            boot_disk_size_gb: 100,
            source_image: DEFAULT_SOURCE_IMAGE.to_string(),
            poll_interval: Duration::from_secs(1),
            operation_timeout: Duration::from_secs(60),
        }
    }

    /// Templates are regional.
    pub fn region_scope(&self) -> Scope {
        Scope::region(&self.project, &self.region)
    }

    /// Groups and instances are zonal.
    pub fn zone_scope(&self) -> Scope {
        Scope::zone(&self.project, &self.zone)
    }

    pub fn node_template(&self) -> NodeTemplate {
        NodeTemplate {
            name: self.name.clone(),
            node_type: self.node_type.clone(),
            node_affinity_labels: BTreeMap::from([(
                self.affinity_key.clone(),
                self.affinity_value.clone(),
            )]),
            ..Default::default()
        }
    }

    pub fn node_group(&self, template_link: &str) -> NodeGroupSpec {
        NodeGroupSpec {
            group: NodeGroup {
                name: self.name.clone(),
                node_template: template_link.to_string(),
                ..Default::default()
            },
            initial_node_count: self.node_group_initial_count,
        }
    }

    pub fn instance(&self, container_declaration: String) -> Instance {
        Instance {
            name: self.name.clone(),
            machine_type: format!("zones/{}/machineTypes/{}", self.zone, self.machine_type),
            disks: vec![AttachedDisk {
                boot: true,
                auto_delete: Some(true),
                initialize_params: Some(AttachedDiskInitializeParams {
                    disk_size_gb: Some(self.boot_disk_size_gb),
                    source_image: Some(self.source_image.clone()),
                }),
            }],
            network_interfaces: vec![NetworkInterface {
                access_configs: vec![AccessConfig {
                    name: Some("External NAT".to_string()),
                    kind: Some("ONE_TO_ONE_NAT".to_string()),
                    nat_ip: None,
                }],
                ..Default::default()
            }],
            metadata: Some(Metadata {
                fingerprint: None,
                items: vec![MetadataItem {
                    key: CONTAINER_DECLARATION_KEY.to_string(),
                    value: Some(container_declaration),
                }],
            }),
            scheduling: Some(Scheduling {
                node_affinities: vec![NodeAffinity {
                    key: self.affinity_key.clone(),
                    operator: "IN".to_string(),
                    values: vec![self.affinity_value.clone()],
                }],
            }),
            ..Default::default()
        }
    }
}
