/*
Licensed to the Apache Software Foundation (ASF) under one
or more contributor license agreements.  See the NOTICE file
distributed with this work for additional information
regarding copyright ownership.  The ASF licenses this file
to you under the Apache License, Version 2.0 (the
"License"); you may not use this file except in compliance
with the License.  You may obtain a copy of the License at

  http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing,
software distributed under the License is distributed on an
"AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
KIND, either express or implied.  See the License for the
specific language governing permissions and limitations
under the License.
*/
//! Access to the small amount of cluster state this tool keeps: single ConfigMap keys and the
//! Secret holding the webhook signing tokens.

/// Client construction from in-cluster or local kubeconfig credentials
pub mod config;

use crate::error::SyncError;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{ObjectMeta, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

/// A Secret to be created
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SecretSpec {
    pub namespace: String,
    pub name: String,
    pub data: BTreeMap<String, String>,
}

#[async_trait]
pub trait ClusterState: Send + Sync {
    /// Read one key of a ConfigMap
    async fn read_config_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, SyncError>;

    /// Set one key of a ConfigMap, leaving the others alone. Last write wins.
    async fn write_config_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SyncError>;

    /// Every key of a Secret, decoded as utf-8
    async fn read_secret_values(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, SyncError>;

    async fn create_secret(&self, secret: &SecretSpec) -> Result<(), SyncError>;
}

/// Map a 404 from the api server onto a NotFound error
fn not_found(err: kube::Error, what: impl FnOnce() -> String) -> SyncError {
    match err {
        kube::Error::Api(response) if response.code == 404 => SyncError::NotFound(what()),
        err => SyncError::KubeError(err),
    }
}

/// [`ClusterState`] backed by the kubernetes api
pub struct KubeClusterState {
    client: Client,
}

impl KubeClusterState {
    pub async fn new(in_cluster: bool) -> Result<Self, SyncError> {
        let client = config::create_client(in_cluster).await?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterState for KubeClusterState {
    async fn read_config_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, SyncError> {
        let config_map = self
            .config_maps(namespace)
            .get(name)
            .await
            .map_err(|e| not_found(e, || format!("ConfigMap {namespace}/{name}")))?;
        config_map
            .data
            .and_then(|mut data| data.remove(key))
            .ok_or_else(|| SyncError::NotFound(format!("key {key} in ConfigMap {namespace}/{name}")))
    }

    async fn write_config_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SyncError> {
        let patch = json!({ "data": { key: value } });
        self.config_maps(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| not_found(e, || format!("ConfigMap {namespace}/{name}")))?;
        info!("updated ConfigMap {name} in Namespace {namespace}");
        Ok(())
    }

    async fn read_secret_values(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, SyncError> {
        let secret = self
            .secrets(namespace)
            .get(name)
            .await
            .map_err(|e| not_found(e, || format!("Secret {namespace}/{name}")))?;
        secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| match String::from_utf8(value.0) {
                Ok(value) => Ok((key, value)),
                Err(_) => Err(SyncError::Decode(format!(
                    "key {key} in Secret {namespace}/{name} is not valid utf-8"
                ))),
            })
            .collect()
    }

    async fn create_secret(&self, spec: &SecretSpec) -> Result<(), SyncError> {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(spec.name.clone()),
                namespace: Some(spec.namespace.clone()),
                ..ObjectMeta::default()
            },
            string_data: Some(spec.data.clone()),
            type_: Some("Opaque".to_string()),
            ..Secret::default()
        };
        self.secrets(&spec.namespace)
            .create(&PostParams::default(), &secret)
            .await?;
        info!("created Secret {} in Namespace {}", spec.name, spec.namespace);
        Ok(())
    }
}
