//! Container declaration attached to the instance as metadata.
//!
//! The Container-Optimized OS agent (konlet) reads a YAML document from the
//! `gce-container-declaration` metadata key. We write it as JSON, which is
//! valid YAML, so one serializer covers both directions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata key read by the container agent on the instance.
pub const CONTAINER_DECLARATION_KEY: &str = "gce-container-declaration";

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container image must not be empty")]
    MissingImage,

    #[error("invalid environment entry {0:?}, expected NAME=VALUE")]
    InvalidEnv(String),

    #[error("declaration declares no container")]
    NoContainer,

    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The container to run on the instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkloadSpec {
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    /// Environment in declaration order.
    pub env: Vec<(String, String)>,
}

impl WorkloadSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }
}

/// Parse a `NAME=VALUE` pair. The value may itself contain `=`.
pub fn parse_env(entry: &str) -> Result<(String, String), ContainerError> {
    match entry.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(ContainerError::InvalidEnv(entry.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerDeclaration {
    pub spec: DeclarationSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationSpec {
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    Always,
    OnFailure,
    Never,
}

impl From<&WorkloadSpec> for ContainerDeclaration {
    fn from(spec: &WorkloadSpec) -> Self {
        ContainerDeclaration {
            spec: DeclarationSpec {
                containers: vec![Container {
                    image: spec.image.clone(),
                    command: spec.command.clone(),
                    args: spec.args.clone(),
                    env: spec
                        .env
                        .iter()
                        .map(|(name, value)| EnvVar {
                            name: name.clone(),
                            value: value.clone(),
                        })
                        .collect(),
                }],
                restart_policy: Some(RestartPolicy::Never),
            },
        }
    }
}

/// Encode a workload into the metadata value.
pub fn encode(spec: &WorkloadSpec) -> Result<String, ContainerError> {
    if spec.image.trim().is_empty() {
        return Err(ContainerError::MissingImage);
    }
    let declaration = ContainerDeclaration::from(spec);
    Ok(serde_json::to_string_pretty(&declaration)?)
}

/// Decode a metadata value back into the workload it describes.
pub fn decode(raw: &str) -> Result<WorkloadSpec, ContainerError> {
    let declaration: ContainerDeclaration = serde_json::from_str(raw)?;
    let container = declaration
        .spec
        .containers
        .into_iter()
        .next()
        .ok_or(ContainerError::NoContainer)?;
    Ok(WorkloadSpec {
        image: container.image,
        command: container.command,
        args: container.args,
        env: container.env.into_iter().map(|e| (e.name, e.value)).collect(),
    })
}
