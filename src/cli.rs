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
use crate::provider::Provider;
use crate::sync::options::ATLANTIS_NAMESPACE;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// `git-helper` keeps GitHub and GitLab webhooks pointed at an ngrok tunnel for Atlantis.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct AppArgs {
    /// Path to config file
    #[arg(short, long, global = true, env = "CONFIG_FILE")]
    pub file: Option<PathBuf>,

    /// The command that will get run
    #[command(subcommand)]
    pub command: Command,

    /// Only log warnings and errors
    #[arg(short, long, default_value_t = false, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(long, default_value_t = false, global = true)]
    pub verbose: bool,
}

/// Arguments shared by every webhook command
#[derive(Args, Clone, Debug)]
pub struct WebhookArgs {
    /// The git provider hosting the repository
    #[arg(long, value_enum)]
    pub provider: Provider,
    /// Organization (GitHub) or group (GitLab) owning the repository
    #[arg(long)]
    pub owner: String,
    /// Repository (GitHub) or project (GitLab) name
    #[arg(long)]
    pub repository: String,
    /// Webhook signing token, for create and delete only
    #[arg(long)]
    pub token: Option<String>,
    /// Read the signing token from a Kubernetes Secret instead of --token
    #[arg(long, default_value_t = false)]
    pub use_secret: bool,
    /// Name of the Secret holding the signing token
    #[arg(long)]
    pub secret_name: Option<String>,
    /// Namespace of the Secret holding the signing token
    #[arg(long, default_value = ATLANTIS_NAMESPACE)]
    pub namespace: String,
    /// Comma separated keys to look for in the Secret, first present wins
    #[arg(long)]
    pub secret_values: Option<String>,
    /// Remove webhooks without creating new ones
    #[arg(long, default_value_t = false)]
    pub cleanup: bool,
    /// Use in-cluster service account credentials instead of a kubeconfig
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub use_kubeconfig_in_cluster: bool,
}

/// Arguments for creating or deleting a single webhook
#[derive(Args, Clone, Debug)]
pub struct ManualWebhookArgs {
    #[command(flatten)]
    pub common: WebhookArgs,
    /// The url the webhook delivers to
    #[arg(long)]
    pub url: String,
    /// Url of an existing webhook to replace
    #[arg(long)]
    pub old_url: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct NgrokAtlantisArgs {
    #[command(flatten)]
    pub common: WebhookArgs,
    /// Restart the ngrok tunnel before syncing
    #[arg(long, default_value_t = false)]
    pub restart: bool,
    /// Only use a tunnel with this protocol, e.g. https
    #[arg(long)]
    pub tunnel_proto: Option<String>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum WebhookCommand {
    /// Create a webhook, or update the one at --old-url
    Create(ManualWebhookArgs),
    /// Delete the webhook at --url
    Delete(ManualWebhookArgs),
    /// Point the Atlantis webhook at the current ngrok tunnel
    NgrokAtlantis(NgrokAtlantisArgs),
}

/// Arguments for GitLab project deploy tokens
#[derive(Args, Clone, Debug)]
pub struct DeployTokenArgs {
    #[arg(long, value_enum, default_value = "gitlab")]
    pub provider: Provider,
    /// Group owning the project
    #[arg(long)]
    pub owner: String,
    /// Project name
    #[arg(long)]
    pub repository: String,
    /// Deploy token name
    #[arg(long)]
    pub name: String,
    /// Username for the deploy token, defaults to its name
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long, num_args = 1.., default_values_t = [String::from("read_repository")])]
    pub scopes: Vec<String>,
    /// Store a newly created token in this Secret
    #[arg(long)]
    pub secret_name: Option<String>,
    /// Namespace for --secret-name
    #[arg(long, default_value = ATLANTIS_NAMESPACE)]
    pub namespace: String,
    /// Use in-cluster service account credentials instead of a kubeconfig
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub use_kubeconfig_in_cluster: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum DeployTokenCommand {
    /// Create a deploy token unless one with the same name exists
    Create(DeployTokenArgs),
    /// Delete a deploy token by name
    Delete(DeployTokenArgs),
}

#[derive(Subcommand, Clone, Debug)]
pub enum SyncCommand {
    /// Manage repository webhooks
    #[command(arg_required_else_help = true)]
    Webhook {
        #[command(subcommand)]
        cmd: WebhookCommand,
    },
    /// Manage GitLab deploy tokens
    #[command(arg_required_else_help = true)]
    DeployToken {
        #[command(subcommand)]
        cmd: DeployTokenCommand,
    },
}

/// The top-level command enum for the CLI
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync webhooks and deploy tokens
    #[command(arg_required_else_help = true)]
    Sync {
        #[command(subcommand)]
        cmd: SyncCommand,
    },
    /// Generate a default config at --file, or in the user config directory
    Config {
        /// Overwrite existing config file if it exists
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Parse the command line arguments, printing usage and exiting when they are invalid
pub fn parse_args() -> AppArgs {
    match AppArgs::try_parse() {
        Ok(app) => app,
        Err(err) => err.exit(),
    }
}
