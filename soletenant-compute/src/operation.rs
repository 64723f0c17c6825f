//! Long-running operation handles and their scopes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a resource or operation lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    Zone(String),
    Region(String),
    Global,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Zone(zone) => write!(f, "zones/{}", zone),
            Location::Region(region) => write!(f, "regions/{}", region),
            Location::Global => write!(f, "global"),
        }
    }
}

/// Keys addressing a resource collection: project plus location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    pub project: String,
    pub location: Location,
}

impl Scope {
    pub fn zone(project: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: Location::Zone(zone.into()),
        }
    }

    pub fn region(project: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: Location::Region(region.into()),
        }
    }

    pub fn global(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: Location::Global,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "projects/{}/{}", self.project, self.location)
    }
}

/// Operation status. Ordered: an operation only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Pending => write!(f, "PENDING"),
            OperationStatus::Running => write!(f, "RUNNING"),
            OperationStatus::Done => write!(f, "DONE"),
        }
    }
}

/// A single entry of an operation's error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationErrorEntry {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationErrorBody {
    #[serde(default)]
    pub errors: Vec<OperationErrorEntry>,
}

/// Handle to an asynchronous mutation, as returned by Insert and Delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    /// Zone URL, set for zonal operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Region URL, set for regional operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationErrorBody>,
}

impl Operation {
    pub fn new(name: impl Into<String>, status: OperationStatus) -> Self {
        Self {
            name: name.into(),
            zone: None,
            region: None,
            status,
            operation_type: None,
            target_link: None,
            progress: None,
            error: None,
        }
    }

    pub fn in_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn in_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn is_done(&self) -> bool {
        self.status == OperationStatus::Done
    }

    /// Location of the status endpoint: zone if set, else region, else global.
    pub fn location(&self) -> Location {
        match (non_empty(&self.zone), non_empty(&self.region)) {
            (Some(zone), _) => Location::Zone(name_from_resource_url(zone).to_string()),
            (None, Some(region)) => Location::Region(name_from_resource_url(region).to_string()),
            (None, None) => Location::Global,
        }
    }

    pub fn scope(&self, project: &str) -> Scope {
        Scope {
            project: project.to_string(),
            location: self.location(),
        }
    }

    /// The error body, serialized for diagnostics, if the operation reports one.
    pub fn error_payload(&self) -> Option<String> {
        let body = self.error.as_ref().filter(|b| !b.errors.is_empty())?;
        Some(serde_json::to_string(body).unwrap_or_else(|_| format!("{:?}", body)))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Last path segment of a resource URL.
pub fn name_from_resource_url(link: &str) -> &str {
    link.rsplit('/').next().unwrap_or(link)
}
