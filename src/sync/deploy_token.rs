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
//! GitLab project deploy tokens, optionally handed to the cluster as a Secret.
use crate::cli::DeployTokenArgs;
use crate::error::SyncError;
use crate::kubernetes::{ClusterState, SecretSpec};
use crate::provider::Provider;
use crate::provider::gitlab::{DeployTokenRequest, GitlabClient};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployTokenOptions {
    pub owner: String,
    pub repository: String,
    pub request: DeployTokenRequest,
    /// Namespace and name of the Secret to store a new token in
    pub secret: Option<(String, String)>,
}

impl DeployTokenOptions {
    pub fn from_args(args: &DeployTokenArgs) -> Result<Self, SyncError> {
        if args.provider != Provider::Gitlab {
            return Err(SyncError::Config(format!(
                "deploy tokens are not supported for {}",
                args.provider
            )));
        }
        let username = args
            .username
            .clone()
            .filter(|username| !username.is_empty())
            .unwrap_or_else(|| args.name.clone());
        Ok(Self {
            owner: args.owner.clone(),
            repository: args.repository.clone(),
            request: DeployTokenRequest {
                name: args.name.clone(),
                username,
                scopes: args.scopes.clone(),
            },
            secret: args
                .secret_name
                .clone()
                .filter(|name| !name.is_empty())
                .map(|name| (args.namespace.clone(), name)),
        })
    }
}

pub async fn create_deploy_token(
    client: &GitlabClient,
    cluster: Option<&dyn ClusterState>,
    options: &DeployTokenOptions,
) -> Result<(), SyncError> {
    if options.secret.is_some() && cluster.is_none() {
        return Err(SyncError::Config(
            "a cluster connection is required for --secret-name".to_string(),
        ));
    }
    let created = client
        .create_project_deploy_token(&options.owner, &options.repository, &options.request)
        .await?;
    let (Some(token), Some((namespace, name)), Some(cluster)) = (created, &options.secret, cluster)
    else {
        return Ok(());
    };
    let secret = SecretSpec {
        namespace: namespace.clone(),
        name: name.clone(),
        data: BTreeMap::from([
            ("username".to_string(), options.request.username.clone()),
            ("token".to_string(), token),
        ]),
    };
    cluster.create_secret(&secret).await?;
    info!("stored deploy token {} in Secret {namespace}/{name}", options.request.name);
    Ok(())
}

pub async fn delete_deploy_token(
    client: &GitlabClient,
    options: &DeployTokenOptions,
) -> Result<(), SyncError> {
    client
        .delete_project_deploy_token(&options.owner, &options.repository, &options.request.name)
        .await?;
    Ok(())
}
