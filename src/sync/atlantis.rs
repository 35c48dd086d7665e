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
//! Keep the Atlantis webhook pointed at the current ngrok tunnel.
//!
//! The url the webhook was last created for lives in the `ngrok` ConfigMap. Each run deletes the
//! webhook for that url, creates one for the tunnel's current url and records it.
use crate::error::SyncError;
use crate::kubernetes::ClusterState;
use crate::ngrok::TunnelDiscovery;
use crate::provider::{Provider, WebhookProvider, WebhookTarget};
use crate::sync::options::{ATLANTIS_NAMESPACE, SecretSource, WebhookOptions};
use crate::utils::events_url;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// ConfigMap holding the url the webhook currently points at
pub const NGROK_CONFIG_MAP: &str = "ngrok";
/// ConfigMap watched by the ngrok deployment, any change restarts the tunnel
pub const NGROK_TRIGGER_CONFIG_MAP: &str = "ngrok-trigger";
pub const TUNNEL_URL_KEY: &str = "active-ngrok-tunnel-url";
pub const RELOAD_TRIGGER_KEY: &str = "trigger-ngrok-reload";
/// Value of the tunnel url before any webhook was created
pub const PLACEHOLDER: &str = "placeholder";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtlantisRequest {
    pub provider: Provider,
    pub owner: String,
    pub repository: String,
    pub token_source: SecretSource,
    pub restart: bool,
    pub cleanup: bool,
}

impl AtlantisRequest {
    pub fn from_options(options: &WebhookOptions) -> Self {
        Self {
            provider: options.provider,
            owner: options.owner.clone(),
            repository: options.repository.clone(),
            token_source: options
                .secret
                .clone()
                .unwrap_or_else(|| SecretSource::atlantis(options.provider)),
            restart: options.restart,
            cleanup: options.cleanup,
        }
    }

    fn target(&self, url: &str) -> WebhookTarget {
        WebhookTarget::new(self.provider, &self.owner, &self.repository, url)
    }
}

/// What a run changed on the provider
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub deleted: Option<String>,
    pub created: Option<String>,
}

pub struct AtlantisSync<'a> {
    pub provider: &'a dyn WebhookProvider,
    pub cluster: &'a dyn ClusterState,
    pub tunnel: &'a dyn TunnelDiscovery,
}

impl AtlantisSync<'_> {
    pub async fn run(&self, request: &AtlantisRequest) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        if request.restart {
            let trigger = Uuid::new_v4().to_string();
            info!("signalling ngrok to reload ({trigger})");
            self.cluster
                .write_config_value(
                    ATLANTIS_NAMESPACE,
                    NGROK_TRIGGER_CONFIG_MAP,
                    RELOAD_TRIGGER_KEY,
                    &trigger,
                )
                .await?;
        }

        let prior = self
            .cluster
            .read_config_value(ATLANTIS_NAMESPACE, NGROK_CONFIG_MAP, TUNNEL_URL_KEY)
            .await?;
        let prior = prior.trim();

        if prior.is_empty() || prior == PLACEHOLDER {
            info!("no webhook recorded yet, creating the initial one");
        } else {
            let target = request.target(&events_url(prior));
            match self.provider.delete_webhook(&target).await {
                Ok(()) => report.deleted = Some(target.url),
                Err(err) => warn!("could not delete webhook {}: {err}", target.describe()),
            }
        }

        if request.cleanup {
            debug!("cleanup only, not creating a new webhook");
            return Ok(report);
        }

        let tunnel_url = self.tunnel.tunnel_url().await?;
        let source = &request.token_source;
        let secret = self
            .cluster
            .read_secret_values(&source.namespace, &source.name)
            .await?;
        let token = source.token_from(&secret)?;

        let target = request
            .target(&events_url(&tunnel_url))
            .with_token(Some(token));
        self.provider.create_webhook(&target).await?;

        if let Err(err) = self
            .cluster
            .write_config_value(
                ATLANTIS_NAMESPACE,
                NGROK_CONFIG_MAP,
                TUNNEL_URL_KEY,
                &tunnel_url,
            )
            .await
        {
            error!(
                "webhook {} exists but {tunnel_url} was not recorded, the next run will not remove it",
                target.url
            );
            return Err(err);
        }
        report.created = Some(target.url);
        Ok(report)
    }
}
