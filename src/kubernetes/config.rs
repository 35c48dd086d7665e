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
use crate::error::SyncError;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::PathBuf;
use tracing::debug;

/// Build a kubernetes client. When `in_cluster` is true the pod's service account is used,
/// otherwise the local kubeconfig.
pub async fn create_client(in_cluster: bool) -> Result<Client, SyncError> {
    let config = if in_cluster {
        debug!("using in-cluster kubernetes config");
        Config::incluster().map_err(|e| SyncError::KubeConfig(e.to_string()))?
    } else {
        let path = kubeconfig_path().ok_or_else(|| {
            SyncError::KubeConfig(
                "$KUBECONFIG is not set and the home directory could not be determined"
                    .to_string(),
            )
        })?;
        debug!("setting kubeconfig to: {}", path.display());
        if !path.exists() {
            return Err(SyncError::KubeConfig(format!(
                "unable to locate kubeconfig file - checked path: {}",
                path.display()
            )));
        }
        let kubeconfig =
            Kubeconfig::read_from(&path).map_err(|e| SyncError::KubeConfig(e.to_string()))?;
        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| SyncError::KubeConfig(e.to_string()))?
    };
    Ok(Client::try_from(config)?)
}

/// Where the local kubeconfig lives: $KUBECONFIG when set, otherwise ~/.kube/config
pub fn kubeconfig_path() -> Option<PathBuf> {
    resolve_kubeconfig_path(std::env::var("KUBECONFIG").ok(), dirs::home_dir())
}

fn resolve_kubeconfig_path(env: Option<String>, home: Option<PathBuf>) -> Option<PathBuf> {
    match env {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => home.map(|home| home.join(".kube").join("config")),
    }
}
