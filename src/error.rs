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
use thiserror::Error;

/// The broad category an error falls into. Every `SyncError` maps onto exactly one of these.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required option, or a combination of options, is missing or invalid
    Config,
    /// A network or API call failed
    Transport,
    /// An expected webhook, project, ConfigMap, Secret or key is absent
    NotFound,
    /// A response body could not be decoded
    Decode,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(
        "Missing {0} token. Please provide a token via the environment or in your config file."
    )]
    MissingToken(&'static str),

    #[error("Github API error: {0}")]
    GithubApiError(#[from] octocrab::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{context}: HTTP {status}")]
    HttpStatus {
        context: String,
        status: http::StatusCode,
    },

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Unable to load kubernetes config: {0}")]
    KubeConfig(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] http::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SyncError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Config(_) | SyncError::MissingToken(_) | SyncError::KubeConfig(_) => {
                ErrorKind::Config
            }
            SyncError::TomlError(_) => ErrorKind::Config,
            SyncError::NotFound(_) => ErrorKind::NotFound,
            SyncError::HttpStatus { status, .. } if *status == http::StatusCode::NOT_FOUND => {
                ErrorKind::NotFound
            }
            SyncError::JsonError(_) | SyncError::Decode(_) => ErrorKind::Decode,
            SyncError::HttpError(e) if e.is_decode() => ErrorKind::Decode,
            SyncError::KubeError(kube::Error::SerdeError(_)) => ErrorKind::Decode,
            SyncError::GithubApiError(octocrab::Error::Json { .. })
            | SyncError::GithubApiError(octocrab::Error::Serde { .. }) => ErrorKind::Decode,
            SyncError::GithubApiError(_)
            | SyncError::HttpError(_)
            | SyncError::HttpStatus { .. }
            | SyncError::KubeError(_)
            | SyncError::InvalidUri(_)
            | SyncError::IoError(_) => ErrorKind::Transport,
        }
    }
}
