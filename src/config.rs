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
use crate::ngrok::NGROK_API_ADDR;
use crate::provider::Provider;
use crate::provider::gitlab::DEFAULT_API_URL;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_NAME: &str = "git-helper.toml";

/// Token for the manual GitHub commands
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Token for the manual GitLab commands
pub const GITLAB_TOKEN_ENV: &str = "GITLAB_TOKEN";
/// Token for the tunnel sync, whichever the provider
pub const GIT_TOKEN_ENV: &str = "GIT_TOKEN";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub github: ProviderConfig,
    #[serde(default)]
    pub gitlab: ProviderConfig,
    #[serde(default)]
    pub ngrok: NgrokConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProviderConfig {
    pub token: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct NgrokConfig {
    pub api_url: Option<String>,
}

/// Which environment variable carries the api token
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenSource {
    /// `GITHUB_TOKEN` or `GITLAB_TOKEN`, matching the provider
    PerProvider,
    /// `GIT_TOKEN`
    Shared,
}

impl TokenSource {
    pub fn env_var(self, provider: Provider) -> &'static str {
        match (self, provider) {
            (TokenSource::Shared, _) => GIT_TOKEN_ENV,
            (TokenSource::PerProvider, Provider::Github) => GITHUB_TOKEN_ENV,
            (TokenSource::PerProvider, Provider::Gitlab) => GITLAB_TOKEN_ENV,
        }
    }
}

impl Config {
    /// Load config from a toml file
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        let config_str = fs::read_to_string(path)?;
        match toml::from_str(&config_str) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Toml parse error in {path:?}: {e}");
                Err(SyncError::TomlError(e))
            }
        }
    }

    /// Try to load the config from expected locations
    pub fn load() -> Self {
        if let Ok(local_config) = Config::from_file(Path::new(CONFIG_NAME)) {
            debug!("using ./{CONFIG_NAME}");
            return local_config;
        }
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(CONFIG_NAME);
            debug!("checking {user_config:?}");
            if let Ok(user_config) = Config::from_file(&user_config) {
                return user_config;
            }
        }
        debug!("unable to find {CONFIG_NAME}, using defaults");
        Config::default()
    }

    /// Load `path` when given, otherwise search the usual locations
    pub fn resolve(path: Option<&PathBuf>) -> Result<Self, SyncError> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::load()),
        }
    }

    fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Github => &self.github,
            Provider::Gitlab => &self.gitlab,
        }
    }

    /// Get the provider api token, preferring the environment over the config file
    pub fn get_token(&self, provider: Provider, source: TokenSource) -> Option<String> {
        let env_token = std::env::var(source.env_var(provider)).ok();
        self.token_or(provider, env_token)
    }

    fn token_or(&self, provider: Provider, env_token: Option<String>) -> Option<String> {
        env_token
            .filter(|token| !token.is_empty())
            .or_else(|| self.provider(provider).token.clone())
    }

    /// GitHub Enterprise api url, None for github.com
    pub fn github_api_url(&self) -> Option<&str> {
        self.github.api_url.as_deref()
    }

    pub fn gitlab_api_url(&self) -> &str {
        self.gitlab.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn ngrok_api_url(&self) -> &str {
        self.ngrok.api_url.as_deref().unwrap_or(NGROK_API_ADDR)
    }
}
