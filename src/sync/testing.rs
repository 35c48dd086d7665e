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
//! In-memory stand-ins for the provider, cluster and tunnel, all writing to one shared journal
//! so tests can assert on the order of calls.
use crate::error::SyncError;
use crate::kubernetes::{ClusterState, SecretSpec};
use crate::ngrok::TunnelDiscovery;
use crate::provider::{ProviderHook, WebhookProvider, WebhookTarget, require_hook};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, entry: String) {
    journal.lock().unwrap().push(entry);
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

pub struct FakeProvider {
    journal: Journal,
    pub hooks: Mutex<Vec<ProviderHook>>,
    pub tokens: Mutex<Vec<Option<String>>>,
    pub fail_create: bool,
}

impl FakeProvider {
    pub fn new(journal: &Journal, urls: &[&str]) -> Self {
        let hooks = urls
            .iter()
            .zip(1..)
            .map(|(url, id)| ProviderHook {
                id,
                url: url.to_string(),
                events: vec!["push".to_string()],
            })
            .collect();
        Self {
            journal: journal.clone(),
            hooks: Mutex::new(hooks),
            tokens: Mutex::new(Vec::new()),
            fail_create: false,
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.hooks
            .lock()
            .unwrap()
            .iter()
            .map(|hook| hook.url.clone())
            .collect()
    }
}

#[async_trait]
impl WebhookProvider for FakeProvider {
    async fn list_webhooks(
        &self,
        _owner: &str,
        _repository: &str,
    ) -> Result<Vec<ProviderHook>, SyncError> {
        Ok(self.hooks.lock().unwrap().clone())
    }

    async fn create_webhook(&self, target: &WebhookTarget) -> Result<(), SyncError> {
        record(&self.journal, format!("create {}", target.url));
        if self.fail_create {
            return Err(SyncError::Decode("create rejected".to_string()));
        }
        let mut hooks = self.hooks.lock().unwrap();
        let id = hooks.iter().map(|hook| hook.id).max().unwrap_or(0) + 1;
        hooks.push(ProviderHook {
            id,
            url: target.url.clone(),
            events: vec!["push".to_string()],
        });
        self.tokens.lock().unwrap().push(target.token.clone());
        Ok(())
    }

    async fn delete_webhook(&self, target: &WebhookTarget) -> Result<(), SyncError> {
        record(&self.journal, format!("delete {}", target.url));
        let mut hooks = self.hooks.lock().unwrap();
        let id = require_hook(&hooks, target, &target.url)?.id;
        hooks.retain(|hook| hook.id != id);
        Ok(())
    }

    async fn update_webhook(
        &self,
        target: &WebhookTarget,
        match_url: &str,
    ) -> Result<(), SyncError> {
        record(&self.journal, format!("update {match_url} -> {}", target.url));
        let mut hooks = self.hooks.lock().unwrap();
        let id = require_hook(&hooks, target, match_url)?.id;
        for hook in hooks.iter_mut().filter(|hook| hook.id == id) {
            hook.url = target.url.clone();
        }
        self.tokens.lock().unwrap().push(target.token.clone());
        Ok(())
    }
}

type Objects = Mutex<BTreeMap<(String, String), BTreeMap<String, String>>>;

#[derive(Default)]
pub struct FakeCluster {
    journal: Journal,
    config_maps: Objects,
    secrets: Objects,
    pub fail_write: bool,
}

impl FakeCluster {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            ..Self::default()
        }
    }

    pub fn with_config_value(self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.config_maps
            .lock()
            .unwrap()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_secret(self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn config_value(&self, namespace: &str, name: &str, key: &str) -> Option<String> {
        self.config_maps
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .and_then(|data| data.get(key).cloned())
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ClusterState for FakeCluster {
    async fn read_config_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, SyncError> {
        record(&self.journal, format!("read {name}/{key}"));
        self.config_value(namespace, name, key)
            .ok_or_else(|| SyncError::NotFound(format!("ConfigMap {namespace}/{name}")))
    }

    async fn write_config_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SyncError> {
        record(&self.journal, format!("write {name}/{key}"));
        if self.fail_write {
            return Err(SyncError::Config("write refused".to_string()));
        }
        let mut config_maps = self.config_maps.lock().unwrap();
        let data = config_maps
            .get_mut(&(namespace.to_string(), name.to_string()))
            .ok_or_else(|| SyncError::NotFound(format!("ConfigMap {namespace}/{name}")))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn read_secret_values(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, SyncError> {
        record(&self.journal, format!("secret {name}"));
        self.secret(namespace, name)
            .ok_or_else(|| SyncError::NotFound(format!("Secret {namespace}/{name}")))
    }

    async fn create_secret(&self, secret: &SecretSpec) -> Result<(), SyncError> {
        record(&self.journal, format!("create secret {}", secret.name));
        self.secrets.lock().unwrap().insert(
            (secret.namespace.clone(), secret.name.clone()),
            secret.data.clone(),
        );
        Ok(())
    }
}

pub struct FakeTunnel {
    journal: Journal,
    url: Option<String>,
}

impl FakeTunnel {
    pub fn new(journal: &Journal, url: Option<&str>) -> Self {
        Self {
            journal: journal.clone(),
            url: url.map(str::to_string),
        }
    }
}

#[async_trait]
impl TunnelDiscovery for FakeTunnel {
    async fn tunnel_url(&self) -> Result<String, SyncError> {
        record(&self.journal, "tunnel".to_string());
        self.url
            .clone()
            .ok_or_else(|| SyncError::NotFound("no tunnels".to_string()))
    }
}
