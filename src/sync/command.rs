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
use crate::kubernetes::ClusterState;
use crate::provider::WebhookProvider;
use crate::sync::options::WebhookOptions;

/// Resolve the signing token: `--token` unless `--use-secret` points at a Secret
pub async fn resolve_token(
    cluster: Option<&dyn ClusterState>,
    options: &WebhookOptions,
) -> Result<Option<String>, SyncError> {
    let Some(source) = &options.secret else {
        return Ok(options.token.clone());
    };
    let cluster = cluster.ok_or_else(|| {
        SyncError::Config("a cluster connection is required for --use-secret".to_string())
    })?;
    let values = cluster
        .read_secret_values(&source.namespace, &source.name)
        .await?;
    source.token_from(&values).map(Some)
}

fn manual_url(options: &WebhookOptions) -> Result<&str, SyncError> {
    options
        .url
        .as_deref()
        .ok_or_else(|| SyncError::Config("option --url is required".to_string()))
}

/// `sync webhook create`: create a webhook, or with `--old-url` move (or with `--cleanup`
/// remove) the existing one
pub async fn create_webhook(
    provider: &dyn WebhookProvider,
    cluster: Option<&dyn ClusterState>,
    options: &WebhookOptions,
) -> Result<(), SyncError> {
    let url = manual_url(options)?;
    match (&options.old_url, options.cleanup) {
        (None, true) => Err(SyncError::Config(
            "option --old-url is required if using --cleanup".to_string(),
        )),
        (Some(old_url), true) => {
            let target = options.target(old_url);
            provider.delete_webhook(&target).await
        }
        (Some(old_url), false) => {
            let token = resolve_token(cluster, options).await?;
            let target = options.target(url).with_token(token);
            provider.update_webhook(&target, old_url).await
        }
        (None, false) => {
            let token = resolve_token(cluster, options).await?;
            let target = options.target(url).with_token(token);
            provider.create_webhook(&target).await
        }
    }
}

/// `sync webhook delete`: remove the webhook configured with `--url`
pub async fn delete_webhook(
    provider: &dyn WebhookProvider,
    options: &WebhookOptions,
) -> Result<(), SyncError> {
    let target = options.target(manual_url(options)?);
    provider.delete_webhook(&target).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::Provider;
    use crate::sync::options::SecretSource;
    use crate::sync::testing::{FakeCluster, FakeProvider, Journal, entries};

    const OLD: &str = "https://old.ngrok.io/events";
    const NEW: &str = "https://new.ngrok.io/events";

    fn options(old_url: Option<&str>, cleanup: bool) -> WebhookOptions {
        WebhookOptions {
            provider: Provider::Github,
            owner: "kubefirst".to_string(),
            repository: "gitops".to_string(),
            url: Some(NEW.to_string()),
            old_url: old_url.map(str::to_string),
            token: Some("s3cr3t".to_string()),
            secret: None,
            cleanup,
            restart: false,
            kube_in_cluster: false,
            tunnel_proto: None,
        }
    }

    #[tokio::test]
    async fn test_create() {
        let journal = Journal::default();
        let provider = FakeProvider::new(&journal, &[]);
        create_webhook(&provider, None, &options(None, false))
            .await
            .unwrap();
        assert_eq!(provider.urls(), vec![NEW]);
        assert_eq!(
            provider.tokens.lock().unwrap().as_slice(),
            &[Some("s3cr3t".to_string())]
        );
    }

    #[tokio::test]
    async fn test_create_with_old_url_updates() {
        let journal = Journal::default();
        let provider = FakeProvider::new(&journal, &[OLD]);
        create_webhook(&provider, None, &options(Some(OLD), false))
            .await
            .unwrap();
        assert_eq!(provider.urls(), vec![NEW]);
        assert_eq!(entries(&journal), vec![format!("update {OLD} -> {NEW}")]);
    }

    #[tokio::test]
    async fn test_create_cleanup_deletes_old_only() {
        let journal = Journal::default();
        let provider = FakeProvider::new(&journal, &[OLD]);
        create_webhook(&provider, None, &options(Some(OLD), true))
            .await
            .unwrap();
        assert!(provider.urls().is_empty());
        assert_eq!(entries(&journal), vec![format!("delete {OLD}")]);
    }

    #[tokio::test]
    async fn test_cleanup_without_old_url_is_config_error() {
        let journal = Journal::default();
        let provider = FakeProvider::new(&journal, &[]);
        let err = create_webhook(&provider, None, &options(None, true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(entries(&journal).is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_hook_is_fatal() {
        let journal = Journal::default();
        let provider = FakeProvider::new(&journal, &[OLD]);
        let err = delete_webhook(&provider, &options(None, false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(provider.urls(), vec![OLD]);
    }

    #[tokio::test]
    async fn test_token_read_from_secret() {
        let journal = Journal::default();
        let provider = FakeProvider::new(&journal, &[]);
        let cluster =
            FakeCluster::new(&journal).with_secret("ci", "hooks", "WEBHOOK_TOKEN", "from-secret");
        let mut options = options(None, false);
        options.secret = Some(SecretSource {
            name: "hooks".to_string(),
            namespace: "ci".to_string(),
            keys: vec!["MISSING".to_string(), "WEBHOOK_TOKEN".to_string()],
        });

        create_webhook(&provider, Some(&cluster as &dyn ClusterState), &options)
            .await
            .unwrap();

        assert_eq!(
            provider.tokens.lock().unwrap().as_slice(),
            &[Some("from-secret".to_string())]
        );
        assert_eq!(entries(&journal), vec!["secret hooks".to_string(), format!("create {NEW}")]);
    }

    #[tokio::test]
    async fn test_secret_without_cluster_is_config_error() {
        let mut options = options(None, false);
        options.secret = Some(SecretSource::atlantis(Provider::Github));
        let err = resolve_token(None, &options).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
