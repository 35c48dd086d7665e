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
use crate::handle_api_response;
use crate::provider::{PAGE_SIZE, ProviderHook, WebhookProvider, WebhookTarget, require_hook};
use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Events every Atlantis webhook subscribes to
const DEFAULT_EVENTS: [&str; 4] = [
    "pull_request_review",
    "push",
    "issue_comment",
    "pull_request",
];

/// The parts of a repository hook we care about
#[derive(Debug, Deserialize)]
struct GithubHook {
    id: u64,
    #[serde(default)]
    events: Vec<String>,
    #[serde(default)]
    config: GithubHookConfig,
}

#[derive(Debug, Default, Deserialize)]
struct GithubHookConfig {
    url: Option<String>,
}

impl From<GithubHook> for ProviderHook {
    fn from(hook: GithubHook) -> Self {
        ProviderHook {
            id: hook.id,
            url: hook.config.url.unwrap_or_default(),
            events: hook.events,
        }
    }
}

#[derive(Serialize)]
struct ListParams {
    per_page: u8,
    page: u32,
}

/// Github api entry point
pub struct GithubClient {
    /// Octocrab client. This can be trivially cloned
    pub octocrab: Octocrab,
}

impl GithubClient {
    /// Build a client authenticated with a personal access token. `api_url` overrides the
    /// default of https://api.github.com, e.g. for GitHub Enterprise.
    pub fn new(token: &str, api_url: Option<&str>) -> Result<Self, SyncError> {
        if token.is_empty() {
            return Err(SyncError::MissingToken("github"));
        }
        let mut builder = Octocrab::builder().personal_token(token.to_string());
        if let Some(api_url) = api_url {
            builder = builder.base_uri(api_url)?;
        }
        let octocrab = builder.build()?;
        Ok(Self { octocrab })
    }

    fn hook_body(target: &WebhookTarget) -> Value {
        let mut config = json!({
            "url": target.url,
            "content_type": "json",
            "insecure_ssl": "0",
        });
        if let Some(token) = &target.token {
            config["secret"] = Value::String(token.clone());
        }
        json!({
            "name": "web",
            "active": true,
            "events": DEFAULT_EVENTS,
            "config": config,
        })
    }
}

#[async_trait]
impl WebhookProvider for GithubClient {
    async fn list_webhooks(
        &self,
        owner: &str,
        repository: &str,
    ) -> Result<Vec<ProviderHook>, SyncError> {
        let route = format!("/repos/{owner}/{repository}/hooks");
        let params = ListParams {
            per_page: PAGE_SIZE,
            page: 1,
        };
        let mut page: Page<GithubHook> = self.octocrab.get(route, Some(&params)).await?;
        let mut hooks: Vec<ProviderHook> = Vec::new();
        loop {
            hooks.extend(page.take_items().into_iter().map(ProviderHook::from));
            match self.octocrab.get_page::<GithubHook>(&page.next).await? {
                Some(next) => page = next,
                None => break,
            }
        }
        debug!("found {} hooks for {owner}/{repository}", hooks.len());
        Ok(hooks)
    }

    async fn create_webhook(&self, target: &WebhookTarget) -> Result<(), SyncError> {
        let route = format!("/repos/{}/{}/hooks", target.owner, target.repository);
        let body = Self::hook_body(target);
        let response: Result<Value, octocrab::Error> =
            self.octocrab.post(route, Some(&body)).await;

        handle_api_response!(
            response,
            format!("error when creating a webhook for {}", target.describe()),
            |_| {
                info!("created hook {}", target.describe());
                Ok(())
            },
        )
    }

    async fn delete_webhook(&self, target: &WebhookTarget) -> Result<(), SyncError> {
        let hooks = self
            .list_webhooks(&target.owner, &target.repository)
            .await?;
        let hook = require_hook(&hooks, target, &target.url)?;

        let uri = http::Uri::builder()
            .path_and_query(format!(
                "/repos/{}/{}/hooks/{}",
                target.owner, target.repository, hook.id
            ))
            .build()?;
        let response = match self.octocrab._delete(uri, None::<&()>).await {
            Ok(response) => octocrab::map_github_error(response).await,
            Err(err) => Err(err),
        };

        handle_api_response!(
            response,
            format!("error when deleting hook {}", target.describe()),
            |_| {
                info!("deleted hook {}", target.describe());
                Ok(())
            },
        )
    }

    async fn update_webhook(
        &self,
        target: &WebhookTarget,
        match_url: &str,
    ) -> Result<(), SyncError> {
        let hooks = self
            .list_webhooks(&target.owner, &target.repository)
            .await?;
        let hook = require_hook(&hooks, target, match_url)?;

        let route = format!(
            "/repos/{}/{}/hooks/{}",
            target.owner, target.repository, hook.id
        );
        let body = Self::hook_body(target);
        let response: Result<Value, octocrab::Error> =
            self.octocrab.patch(route, Some(&body)).await;

        handle_api_response!(
            response,
            format!("error when updating hook {}", target.describe()),
            |_| {
                info!("updated hook {}", target.describe());
                Ok(())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::Provider;
    use httpmock::prelude::*;

    const HOOKS_PATH: &str = "/repos/kubefirst/gitops/hooks";

    fn client(server: &MockServer) -> GithubClient {
        crate::utils::install_crypto_provider();
        GithubClient::new("test-token", Some(&server.base_url())).unwrap()
    }

    fn hooks_json(ids: std::ops::Range<u64>) -> Value {
        Value::Array(
            ids.map(|id| {
                json!({
                    "id": id,
                    "events": ["push"],
                    "config": {"url": format!("https://hook-{id}.ngrok.io/events"), "content_type": "json"}
                })
            })
            .collect(),
        )
    }

    fn target(url: &str) -> WebhookTarget {
        WebhookTarget::new(Provider::Github, "kubefirst", "gitops", url)
            .with_token(Some("s3cr3t".to_string()))
    }

    #[test]
    fn test_missing_token() {
        let err = GithubClient::new("", None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_list_webhooks_follows_every_page() {
        let server = MockServer::start_async().await;
        let next = format!(
            "<{}>; rel=\"next\"",
            server.url(format!("{HOOKS_PATH}?per_page=10&page=2"))
        );
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(HOOKS_PATH)
                    .query_param("per_page", "10")
                    .query_param("page", "1");
                then.status(200)
                    .header("content-type", "application/json")
                    .header("link", next.as_str())
                    .json_body(hooks_json(0..10));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET).path(HOOKS_PATH).query_param("page", "2");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(hooks_json(10..12));
            })
            .await;

        let hooks = client(&server)
            .list_webhooks("kubefirst", "gitops")
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(hooks.len(), 12);
        assert_eq!(hooks[11].url, "https://hook-11.ngrok.io/events");
    }

    #[tokio::test]
    async fn test_create_webhook_sends_events_and_secret() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path(HOOKS_PATH).json_body_includes(
                    json!({
                        "events": DEFAULT_EVENTS,
                        "config": {"url": "https://abc123.ngrok.io/events", "secret": "s3cr3t"}
                    })
                    .to_string(),
                );
                then.status(201)
                    .header("content-type", "application/json")
                    .json_body(json!({"id": 42, "events": DEFAULT_EVENTS, "config": {}}));
            })
            .await;

        client(&server)
            .create_webhook(&target("https://abc123.ngrok.io/events"))
            .await
            .unwrap();
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_webhook_uses_first_match() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(HOOKS_PATH);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!([
                        {"id": 3, "config": {"url": "https://other.ngrok.io/events"}},
                        {"id": 7, "config": {"url": "https://old.ngrok.io/events"}},
                        {"id": 8, "config": {"url": "https://old.ngrok.io/events"}}
                    ]));
            })
            .await;
        let delete_first = server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("{HOOKS_PATH}/7"));
                then.status(204);
            })
            .await;
        let delete_second = server
            .mock_async(|when, then| {
                when.method(DELETE).path(format!("{HOOKS_PATH}/8"));
                then.status(204);
            })
            .await;

        client(&server)
            .delete_webhook(&target("https://old.ngrok.io/events"))
            .await
            .unwrap();

        delete_first.assert_async().await;
        assert_eq!(delete_second.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_webhook_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(HOOKS_PATH);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(hooks_json(0..3));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE);
                then.status(204);
            })
            .await;

        let err = client(&server)
            .delete_webhook(&target("https://old.ngrok.io/events"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(delete.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_update_webhook_patches_matched_hook() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(HOOKS_PATH);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(hooks_json(0..2));
            })
            .await;
        let patch = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path(format!("{HOOKS_PATH}/1"))
                    .json_body_includes(
                        json!({"config": {"url": "https://new.ngrok.io/events"}}).to_string(),
                    );
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"id": 1, "config": {"url": "https://new.ngrok.io/events"}}));
            })
            .await;

        client(&server)
            .update_webhook(
                &target("https://new.ngrok.io/events"),
                "https://hook-1.ngrok.io/events",
            )
            .await
            .unwrap();
        patch.assert_async().await;
    }
}
