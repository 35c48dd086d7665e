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
//! Uniform webhook management over the supported git providers.
//!
//! The reconciler only ever talks to [`WebhookProvider`], so the same flow works against
//! GitHub repositories and GitLab projects.

/// GitHub implementation, backed by octocrab
pub mod github;
/// GitLab implementation, backed by the v4 REST api
pub mod gitlab;

use crate::error::SyncError;
use async_trait::async_trait;
use clap::ValueEnum;
use std::fmt;
use tracing::{debug, warn};

/// Number of items requested per page when listing provider resources
pub const PAGE_SIZE: u8 = 10;

/// The git providers that webhooks can be managed for
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum Provider {
    Github,
    Gitlab,
}

impl Provider {
    /// The key inside the Atlantis secret that holds this provider's webhook signing token
    pub fn atlantis_secret_key(self) -> &'static str {
        match self {
            Provider::Github => "ATLANTIS_GH_WEBHOOK_SECRET",
            Provider::Gitlab => "ATLANTIS_GL_WEBHOOK_SECRET",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Github => write!(f, "github"),
            Provider::Gitlab => write!(f, "gitlab"),
        }
    }
}

/// One logical webhook: where it lives and where it points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebhookTarget {
    pub provider: Provider,
    /// Organization for GitHub, group for GitLab
    pub owner: String,
    /// Repository for GitHub, project for GitLab
    pub repository: String,
    /// The url the webhook delivers events to
    pub url: String,
    /// Signing token handed to the provider
    pub token: Option<String>,
}

impl WebhookTarget {
    pub fn new(provider: Provider, owner: &str, repository: &str, url: &str) -> Self {
        Self {
            provider,
            owner: owner.to_string(),
            repository: repository.to_string(),
            url: url.to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Short form used in log lines
    pub fn describe(&self) -> String {
        format!("{}/{}/{}", self.owner, self.repository, self.url)
    }
}

/// A webhook as reported by the provider
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderHook {
    pub id: u64,
    pub url: String,
    pub events: Vec<String>,
}

#[async_trait]
pub trait WebhookProvider: Send + Sync {
    /// Every webhook configured on the repository, across all pages
    async fn list_webhooks(
        &self,
        owner: &str,
        repository: &str,
    ) -> Result<Vec<ProviderHook>, SyncError>;

    /// Create a webhook for `target`. No check is made for an existing hook with the same url.
    async fn create_webhook(&self, target: &WebhookTarget) -> Result<(), SyncError>;

    /// Delete the webhook whose url is `target.url`
    async fn delete_webhook(&self, target: &WebhookTarget) -> Result<(), SyncError>;

    /// Find the webhook whose url is `match_url` and point it at `target`
    async fn update_webhook(&self, target: &WebhookTarget, match_url: &str)
    -> Result<(), SyncError>;
}

/// Return the first hook configured with `url`. More than one match is logged, since this tool
/// should only ever create one hook per url.
pub fn find_hook_by_url<'a>(hooks: &'a [ProviderHook], url: &str) -> Option<&'a ProviderHook> {
    let mut matches = hooks.iter().filter(|hook| hook.url == url);
    let first = matches.next()?;
    debug!(
        "hook {} subscribes to [{}]",
        first.id,
        first.events.join(", ")
    );
    let extra = matches.count();
    if extra > 0 {
        warn!(
            "found {} webhooks configured with {url}, using the first (id {})",
            extra + 1,
            first.id
        );
    }
    Some(first)
}

/// Find the hook with `url` in `hooks` or fail with a NotFound error naming the target
pub(crate) fn require_hook<'a>(
    hooks: &'a [ProviderHook],
    target: &WebhookTarget,
    url: &str,
) -> Result<&'a ProviderHook, SyncError> {
    find_hook_by_url(hooks, url).ok_or_else(|| {
        SyncError::NotFound(format!(
            "hook {}/{}/{url}",
            target.owner, target.repository
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(id: u64, url: &str) -> ProviderHook {
        ProviderHook {
            id,
            url: url.to_string(),
            events: vec!["push".to_string()],
        }
    }

    #[test]
    fn test_find_hook_prefers_first_match() {
        let hooks = vec![
            hook(1, "https://a.ngrok.io/events"),
            hook(2, "https://b.ngrok.io/events"),
            hook(3, "https://b.ngrok.io/events"),
        ];
        let found = find_hook_by_url(&hooks, "https://b.ngrok.io/events").unwrap();
        assert_eq!(found.id, 2);
        assert!(find_hook_by_url(&hooks, "https://c.ngrok.io/events").is_none());
    }

    #[test]
    fn test_require_hook_not_found() {
        let target = WebhookTarget::new(
            Provider::Github,
            "kubefirst",
            "gitops",
            "https://gone.ngrok.io/events",
        );
        let err = require_hook(&[], &target, &target.url).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn test_secret_keys() {
        assert_eq!(
            Provider::Github.atlantis_secret_key(),
            "ATLANTIS_GH_WEBHOOK_SECRET"
        );
        assert_eq!(
            Provider::Gitlab.atlantis_secret_key(),
            "ATLANTIS_GL_WEBHOOK_SECRET"
        );
        assert_eq!(Provider::Gitlab.to_string(), "gitlab");
    }
}
