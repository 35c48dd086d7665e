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
mod cli;
mod config;
mod error;
mod init;
mod kubernetes;
mod ngrok;
mod provider;
mod sync;
mod utils;

use cli::{AppArgs, Command, parse_args};
use config::Config;
use error::SyncError;
use sync::match_args::match_arguments;
use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log level used when `RUST_LOG` is unset
fn default_level(args: &AppArgs) -> &'static str {
    match (args.verbose, args.quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    }
}

async fn run(args: &AppArgs) -> Result<(), SyncError> {
    // `config` writes to --file, so it must not be read first
    let config = match args.command {
        Command::Config { .. } => Config::default(),
        Command::Sync { .. } => Config::resolve(args.file.as_ref())?,
    };
    match_arguments(args, config).await
}

#[tokio::main]
async fn main() {
    let args = parse_args();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level(&args))),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    utils::install_crypto_provider();

    if let Err(err) = run(&args).await {
        error!(kind = ?err.kind(), "{err}");
        std::process::exit(1);
    }
}
