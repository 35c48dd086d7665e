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
use crate::cli::{ManualWebhookArgs, NgrokAtlantisArgs, WebhookArgs};
use crate::error::SyncError;
use crate::provider::{Provider, WebhookTarget};
use crate::utils::parse_key_list;
use std::collections::BTreeMap;

/// Namespace Atlantis and its ngrok tunnel run in
pub const ATLANTIS_NAMESPACE: &str = "atlantis";
/// Secret holding the Atlantis webhook signing tokens
pub const ATLANTIS_SECRET_NAME: &str = "atlantis-secrets";

/// Where a webhook signing token is read from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretSource {
    pub name: String,
    pub namespace: String,
    /// Candidate keys, in order of preference
    pub keys: Vec<String>,
}

impl SecretSource {
    /// The Atlantis secret, keyed by the provider's webhook token
    pub fn atlantis(provider: Provider) -> Self {
        Self {
            name: ATLANTIS_SECRET_NAME.to_string(),
            namespace: ATLANTIS_NAMESPACE.to_string(),
            keys: vec![provider.atlantis_secret_key().to_string()],
        }
    }

    /// Pick the token out of the secret's values: the first configured key that is present
    pub fn token_from(&self, values: &BTreeMap<String, String>) -> Result<String, SyncError> {
        self.keys
            .iter()
            .find_map(|key| values.get(key))
            .cloned()
            .ok_or_else(|| {
                SyncError::NotFound(format!(
                    "none of [{}] in Secret {}/{}",
                    self.keys.join(", "),
                    self.namespace,
                    self.name
                ))
            })
    }
}

/// Everything one invocation needs, validated once when it is built.
///
/// `secret` is only present when `--use-secret` was passed, in which case both a secret name and
/// at least one key are guaranteed. `url` is only set for the manual create and delete commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookOptions {
    pub provider: Provider,
    pub owner: String,
    pub repository: String,
    pub url: Option<String>,
    /// When replacing a webhook, the url the existing one uses
    pub old_url: Option<String>,
    pub token: Option<String>,
    pub secret: Option<SecretSource>,
    /// Remove webhooks but don't add new ones
    pub cleanup: bool,
    /// Signal the ngrok deployment to restart before syncing
    pub restart: bool,
    pub kube_in_cluster: bool,
    /// Only consider tunnels speaking this protocol
    pub tunnel_proto: Option<String>,
}

impl WebhookOptions {
    fn from_common(args: &WebhookArgs) -> Result<Self, SyncError> {
        Ok(Self {
            provider: args.provider,
            owner: args.owner.clone(),
            repository: args.repository.clone(),
            url: None,
            old_url: None,
            token: args.token.clone().filter(|token| !token.is_empty()),
            secret: secret_source(args)?,
            cleanup: args.cleanup,
            restart: false,
            kube_in_cluster: args.use_kubeconfig_in_cluster,
            tunnel_proto: None,
        })
    }

    /// Options for `sync webhook create|delete`
    pub fn manual(args: &ManualWebhookArgs) -> Result<Self, SyncError> {
        let mut options = Self::from_common(&args.common)?;
        options.url = Some(args.url.clone());
        options.old_url = args.old_url.clone().filter(|url| !url.is_empty());
        Ok(options)
    }

    /// Options for `sync webhook ngrok-atlantis`
    pub fn ngrok_atlantis(args: &NgrokAtlantisArgs) -> Result<Self, SyncError> {
        let mut options = Self::from_common(&args.common)?;
        if options.token.is_some() {
            return Err(SyncError::Config(
                "option --token is not used by ngrok-atlantis, the token is read from a Secret"
                    .to_string(),
            ));
        }
        options.restart = args.restart;
        options.tunnel_proto = args.tunnel_proto.clone();
        Ok(options)
    }

    /// A webhook on the configured repository pointing at `url`
    pub fn target(&self, url: &str) -> WebhookTarget {
        WebhookTarget::new(self.provider, &self.owner, &self.repository, url)
    }
}

fn secret_source(args: &WebhookArgs) -> Result<Option<SecretSource>, SyncError> {
    if !args.use_secret {
        return Ok(None);
    }
    let name = args
        .secret_name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            SyncError::Config("option --secret-name is required if using --use-secret".to_string())
        })?;
    let keys = parse_key_list(args.secret_values.as_deref().unwrap_or_default());
    if keys.is_empty() {
        return Err(SyncError::Config(
            "option --secret-values is required if using --use-secret".to_string(),
        ));
    }
    Ok(Some(SecretSource {
        name,
        namespace: args.namespace.clone(),
        keys,
    }))
}
