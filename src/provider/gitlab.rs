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
use crate::provider::{PAGE_SIZE, ProviderHook, WebhookProvider, WebhookTarget, require_hook};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, info};

/// Used when no api url is configured
pub const DEFAULT_API_URL: &str = "https://gitlab.com/api/v4";
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
/// Empty on the last page
const NEXT_PAGE_HEADER: &str = "x-next-page";

#[derive(Clone, Debug, Deserialize)]
pub struct GitlabProject {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct GitlabHook {
    id: u64,
    url: String,
    #[serde(default)]
    push_events: bool,
    #[serde(default)]
    merge_requests_events: bool,
    #[serde(default)]
    note_events: bool,
}

impl From<GitlabHook> for ProviderHook {
    fn from(hook: GitlabHook) -> Self {
        let events = [
            ("push", hook.push_events),
            ("merge_requests", hook.merge_requests_events),
            ("note", hook.note_events),
        ]
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(event, _)| event.to_string())
        .collect();
        ProviderHook {
            id: hook.id,
            url: hook.url,
            events,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DeployToken {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    /// Only present in the response to a create call
    #[serde(default)]
    pub token: Option<String>,
}

/// Parameters for a new project deploy token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployTokenRequest {
    pub name: String,
    pub username: String,
    pub scopes: Vec<String>,
}

/// Pick the project called `name` out of a group listing. Soft-deleted projects are renamed to
/// contain "deleted" and must never be matched.
pub fn matching_project<'a>(projects: &'a [GitlabProject], name: &str) -> Option<&'a GitlabProject> {
    projects.iter().find(|project| {
        !project.name.to_lowercase().contains("deleted") && project.name.eq_ignore_ascii_case(name)
    })
}

/// GitLab v4 api entry point
pub struct GitlabClient {
    client: Client,
    api_url: String,
    token: String,
}

impl GitlabClient {
    pub fn new(token: &str, api_url: &str) -> Result<Self, SyncError> {
        if token.is_empty() {
            return Err(SyncError::MissingToken("gitlab"));
        }
        Ok(Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    /// Send an authenticated request, turning any non-2xx status into an error
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response, SyncError> {
        let response = request.header(TOKEN_HEADER, &self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("{context}: HTTP {status}");
            return Err(SyncError::HttpStatus {
                context: context.to_string(),
                status,
            });
        }
        Ok(response)
    }

    /// Collect every page of a list endpoint
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
    ) -> Result<Vec<T>, SyncError> {
        let mut container: Vec<T> = Vec::new();
        let mut next_page = Some(String::from("1"));
        while let Some(page) = next_page {
            let request = self
                .client
                .get(self.url(path))
                .query(&[("per_page", PAGE_SIZE.to_string()), ("page", page)]);
            let response = self.send(request, context).await?;
            next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            let body = response.text().await?;
            let items: Vec<T> = serde_json::from_str(&body)?;
            container.extend(items);
        }
        Ok(container)
    }

    /// All projects in a group
    pub async fn list_group_projects(&self, group: &str) -> Result<Vec<GitlabProject>, SyncError> {
        let path = format!("/groups/{}/projects", urlencoding::encode(group));
        self.get_all(&path, &format!("unable to list projects for group {group}"))
            .await
    }

    /// Resolve a project name to its numeric id
    pub async fn get_project_id(&self, group: &str, project_name: &str) -> Result<u64, SyncError> {
        let projects = self.list_group_projects(group).await?;
        matching_project(&projects, project_name)
            .map(|project| project.id)
            .ok_or_else(|| {
                SyncError::NotFound(format!("could not get project ID for project {project_name}"))
            })
    }

    async fn project_hooks(&self, project_id: u64) -> Result<Vec<ProviderHook>, SyncError> {
        let hooks: Vec<GitlabHook> = self
            .get_all(
                &format!("/projects/{project_id}/hooks"),
                &format!("unable to list hooks for project {project_id}"),
            )
            .await?;
        Ok(hooks.into_iter().map(ProviderHook::from).collect())
    }

    fn hook_body(target: &WebhookTarget) -> Value {
        let mut body = json!({
            "url": target.url,
            "push_events": true,
            "merge_requests_events": true,
            "note_events": true,
            "enable_ssl_verification": true,
        });
        if let Some(token) = &target.token {
            body["token"] = Value::String(token.clone());
        }
        body
    }

    /// Every deploy token of a project
    pub async fn list_project_deploy_tokens(
        &self,
        project_id: u64,
    ) -> Result<Vec<DeployToken>, SyncError> {
        self.get_all(
            &format!("/projects/{project_id}/deploy_tokens"),
            &format!("unable to list deploy tokens for project {project_id}"),
        )
        .await
    }

    /// Create a deploy token unless one with the same name already exists. Returns the new
    /// token's secret, or None when creation was skipped.
    pub async fn create_project_deploy_token(
        &self,
        group: &str,
        project_name: &str,
        request: &DeployTokenRequest,
    ) -> Result<Option<String>, SyncError> {
        let project_id = self.get_project_id(group, project_name).await?;
        let tokens = self.list_project_deploy_tokens(project_id).await?;
        if let Some(existing) = tokens.iter().find(|token| token.name == request.name) {
            info!(
                "deploy token {} (user {}) already exists - skipping",
                existing.name,
                existing.username.as_deref().unwrap_or("unknown")
            );
            return Ok(None);
        }

        let body = json!({
            "name": request.name,
            "username": request.username,
            "scopes": request.scopes,
        });
        let context = format!("unable to create deploy token {}", request.name);
        let response = self
            .send(
                self.client
                    .post(self.url(&format!("/projects/{project_id}/deploy_tokens")))
                    .json(&body),
                &context,
            )
            .await?;
        let created: DeployToken = serde_json::from_str(&response.text().await?)?;
        info!("created deploy token {}", created.name);
        created
            .token
            .map(Some)
            .ok_or_else(|| SyncError::Decode(format!("{context}: response carried no token")))
    }

    /// Delete the deploy token called `token_name`. Returns false when there was nothing to delete.
    pub async fn delete_project_deploy_token(
        &self,
        group: &str,
        project_name: &str,
        token_name: &str,
    ) -> Result<bool, SyncError> {
        let project_id = self.get_project_id(group, project_name).await?;
        let tokens = self.list_project_deploy_tokens(project_id).await?;
        let Some(token) = tokens.iter().find(|token| token.name == token_name) else {
            info!("deploy token {token_name} does not exist - skipping");
            return Ok(false);
        };
        self.send(
            self.client.delete(self.url(&format!(
                "/projects/{project_id}/deploy_tokens/{}",
                token.id
            ))),
            &format!("unable to delete deploy token {token_name}"),
        )
        .await?;
        info!("deleted deploy token {token_name}");
        Ok(true)
    }
}

#[async_trait]
impl WebhookProvider for GitlabClient {
    async fn list_webhooks(
        &self,
        owner: &str,
        repository: &str,
    ) -> Result<Vec<ProviderHook>, SyncError> {
        let project_id = self.get_project_id(owner, repository).await?;
        let hooks = self.project_hooks(project_id).await?;
        debug!("found {} hooks for {owner}/{repository}", hooks.len());
        Ok(hooks)
    }

    async fn create_webhook(&self, target: &WebhookTarget) -> Result<(), SyncError> {
        let project_id = self
            .get_project_id(&target.owner, &target.repository)
            .await?;
        self.send(
            self.client
                .post(self.url(&format!("/projects/{project_id}/hooks")))
                .json(&Self::hook_body(target)),
            &format!("error when creating a webhook for {}", target.describe()),
        )
        .await?;
        info!("created hook {}", target.describe());
        Ok(())
    }

    async fn delete_webhook(&self, target: &WebhookTarget) -> Result<(), SyncError> {
        let project_id = self
            .get_project_id(&target.owner, &target.repository)
            .await?;
        let hooks = self.project_hooks(project_id).await?;
        let hook = require_hook(&hooks, target, &target.url)?;
        self.send(
            self.client
                .delete(self.url(&format!("/projects/{project_id}/hooks/{}", hook.id))),
            &format!("error when deleting hook {}", target.describe()),
        )
        .await?;
        info!("deleted hook {}", target.describe());
        Ok(())
    }

    async fn update_webhook(
        &self,
        target: &WebhookTarget,
        match_url: &str,
    ) -> Result<(), SyncError> {
        let project_id = self
            .get_project_id(&target.owner, &target.repository)
            .await?;
        let hooks = self.project_hooks(project_id).await?;
        let hook = require_hook(&hooks, target, match_url)?;
        self.send(
            self.client
                .put(self.url(&format!("/projects/{project_id}/hooks/{}", hook.id)))
                .json(&Self::hook_body(target)),
            &format!("error when updating hook {}", target.describe()),
        )
        .await?;
        info!("updated hook {}", target.describe());
        Ok(())
    }
}
