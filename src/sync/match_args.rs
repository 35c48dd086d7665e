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
use crate::cli::{AppArgs, Command, DeployTokenCommand, SyncCommand, WebhookCommand};
use crate::config::{Config, TokenSource};
use crate::error::SyncError;
use crate::init::generate_config;
use crate::kubernetes::{ClusterState, KubeClusterState};
use crate::ngrok::NgrokClient;
use crate::provider::github::GithubClient;
use crate::provider::gitlab::GitlabClient;
use crate::provider::{Provider, WebhookProvider};
use crate::sync::atlantis::{AtlantisRequest, AtlantisSync};
use crate::sync::command::{create_webhook, delete_webhook};
use crate::sync::deploy_token::{DeployTokenOptions, create_deploy_token, delete_deploy_token};
use crate::sync::options::WebhookOptions;
use tracing::{debug, info};

/// Parse the argument that gets passed, and run their associated methods
pub async fn match_arguments(app: &AppArgs, config: Config) -> Result<(), SyncError> {
    match &app.command {
        Command::Config { force } => {
            generate_config(app.file.as_ref(), *force)?;
            Ok(())
        }
        Command::Sync {
            cmd: SyncCommand::Webhook { cmd },
        } => match_webhook(cmd, &config).await,
        Command::Sync {
            cmd: SyncCommand::DeployToken { cmd },
        } => match_deploy_token(cmd, &config).await,
    }
}

async fn match_webhook(cmd: &WebhookCommand, config: &Config) -> Result<(), SyncError> {
    match cmd {
        WebhookCommand::Create(args) => {
            let options = WebhookOptions::manual(args)?;
            let provider = provider_client(config, options.provider, TokenSource::PerProvider)?;
            let cluster = optional_cluster(options.secret.is_some(), options.kube_in_cluster)
                .await?;
            create_webhook(
                provider.as_ref(),
                cluster.as_ref().map(|c| c as &dyn ClusterState),
                &options,
            )
            .await
        }
        WebhookCommand::Delete(args) => {
            let options = WebhookOptions::manual(args)?;
            let provider = provider_client(config, options.provider, TokenSource::PerProvider)?;
            delete_webhook(provider.as_ref(), &options).await
        }
        WebhookCommand::NgrokAtlantis(args) => {
            let options = WebhookOptions::ngrok_atlantis(args)?;
            let provider = provider_client(config, options.provider, TokenSource::Shared)?;
            let cluster = KubeClusterState::new(options.kube_in_cluster).await?;
            let tunnel = NgrokClient::new(config.ngrok_api_url(), options.tunnel_proto.clone());
            let report = AtlantisSync {
                provider: provider.as_ref(),
                cluster: &cluster,
                tunnel: &tunnel,
            }
            .run(&AtlantisRequest::from_options(&options))
            .await?;
            debug!("{report:?}");
            info!(
                "webhook sync for {}/{} finished",
                options.owner, options.repository
            );
            Ok(())
        }
    }
}

async fn match_deploy_token(cmd: &DeployTokenCommand, config: &Config) -> Result<(), SyncError> {
    let args = match cmd {
        DeployTokenCommand::Create(args) | DeployTokenCommand::Delete(args) => args,
    };
    let options = DeployTokenOptions::from_args(args)?;
    let client = gitlab_client(config, TokenSource::PerProvider)?;
    match cmd {
        DeployTokenCommand::Create(_) => {
            let cluster =
                optional_cluster(options.secret.is_some(), args.use_kubeconfig_in_cluster).await?;
            create_deploy_token(
                &client,
                cluster.as_ref().map(|c| c as &dyn ClusterState),
                &options,
            )
            .await
        }
        DeployTokenCommand::Delete(_) => delete_deploy_token(&client, &options).await,
    }
}

fn provider_token(
    config: &Config,
    provider: Provider,
    source: TokenSource,
) -> Result<String, SyncError> {
    config
        .get_token(provider, source)
        .ok_or(SyncError::MissingToken(source.env_var(provider)))
}

fn gitlab_client(config: &Config, source: TokenSource) -> Result<GitlabClient, SyncError> {
    let token = provider_token(config, Provider::Gitlab, source)?;
    GitlabClient::new(&token, config.gitlab_api_url())
}

fn provider_client(
    config: &Config,
    provider: Provider,
    source: TokenSource,
) -> Result<Box<dyn WebhookProvider>, SyncError> {
    Ok(match provider {
        Provider::Github => {
            let token = provider_token(config, provider, source)?;
            Box::new(GithubClient::new(&token, config.github_api_url())?)
        }
        Provider::Gitlab => Box::new(gitlab_client(config, source)?),
    })
}

/// Only connect to the cluster when something needs it
async fn optional_cluster(
    needed: bool,
    in_cluster: bool,
) -> Result<Option<KubeClusterState>, SyncError> {
    if !needed {
        return Ok(None);
    }
    Ok(Some(KubeClusterState::new(in_cluster).await?))
}
