//! Compute Engine REST transport.
//!
//! Implements the client traits on top of the v1 JSON API. Authentication is
//! a caller-supplied OAuth bearer token.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::client::{OperationClient, ResourceClient};
use crate::error::ClientError;
use crate::operation::{Operation, Scope};
use crate::resource::{Instance, NodeGroup, NodeGroupSpec, NodeTemplate};

pub const DEFAULT_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";

/// Client for the Compute Engine API.
#[derive(Clone)]
pub struct ComputeApi {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl ComputeApi {
    pub fn new(endpoint: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// URL of a collection, e.g. `{endpoint}/projects/p/zones/z/instances`.
    pub fn collection_url(&self, scope: &Scope, collection: &str) -> String {
        format!("{}/{}/{}", self.endpoint, scope, collection)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, what: &str, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("{}: {}", what, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("{}: reading body: {}", what, e)))?;

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Transport(format!("{}: HTTP {}: {}", what, status, body)));
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode {
            raw: body,
            reason: e.to_string(),
        })
    }

    async fn get_resource<T: DeserializeOwned>(
        &self,
        scope: &Scope,
        collection: &str,
        name: &str,
    ) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.collection_url(scope, collection), name);
        self.send(&format!("{}/{}", collection, name), self.request(Method::GET, &url))
            .await
    }

    async fn insert_resource<B: Serialize + Sync>(
        &self,
        scope: &Scope,
        collection: &str,
        body: &B,
        query: &[(&str, String)],
    ) -> Result<Operation, ClientError> {
        let url = self.collection_url(scope, collection);
        let builder = self.request(Method::POST, &url).query(query).json(body);
        self.send(&format!("insert into {}", collection), builder).await
    }

    async fn delete_resource(
        &self,
        scope: &Scope,
        collection: &str,
        name: &str,
    ) -> Result<Operation, ClientError> {
        let url = format!("{}/{}", self.collection_url(scope, collection), name);
        self.send(
            &format!("delete {}/{}", collection, name),
            self.request(Method::DELETE, &url),
        )
        .await
    }
}

#[async_trait]
impl ResourceClient<NodeTemplate> for ComputeApi {
    async fn get(&self, scope: &Scope, name: &str) -> Result<NodeTemplate, ClientError> {
        self.get_resource(scope, "nodeTemplates", name).await
    }

    async fn insert(&self, scope: &Scope, spec: NodeTemplate) -> Result<Operation, ClientError> {
        self.insert_resource(scope, "nodeTemplates", &spec, &[]).await
    }

    async fn delete(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError> {
        self.delete_resource(scope, "nodeTemplates", name).await
    }
}

#[async_trait]
impl ResourceClient<NodeGroup> for ComputeApi {
    async fn get(&self, scope: &Scope, name: &str) -> Result<NodeGroup, ClientError> {
        self.get_resource(scope, "nodeGroups", name).await
    }

    async fn insert(&self, scope: &Scope, spec: NodeGroupSpec) -> Result<Operation, ClientError> {
        let query = [("initialNodeCount", spec.initial_node_count.to_string())];
        self.insert_resource(scope, "nodeGroups", &spec.group, &query)
            .await
    }

    async fn delete(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError> {
        self.delete_resource(scope, "nodeGroups", name).await
    }
}

#[async_trait]
impl ResourceClient<Instance> for ComputeApi {
    async fn get(&self, scope: &Scope, name: &str) -> Result<Instance, ClientError> {
        self.get_resource(scope, "instances", name).await
    }

    async fn insert(&self, scope: &Scope, spec: Instance) -> Result<Operation, ClientError> {
        self.insert_resource(scope, "instances", &spec, &[]).await
    }

    async fn delete(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError> {
        self.delete_resource(scope, "instances", name).await
    }
}

#[async_trait]
impl OperationClient for ComputeApi {
    async fn get_operation(&self, scope: &Scope, name: &str) -> Result<Operation, ClientError> {
        self.get_resource(scope, "operations", name).await
    }
}
