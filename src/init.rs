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
use crate::config::CONFIG_NAME;
use crate::error::SyncError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// A basic sample configuration that can be initialized
/// by using the `config` command
const SAMPLE_CONFIG: &str = r#"# git-helper configuration
# Tokens set in the environment (GITHUB_TOKEN, GITLAB_TOKEN, GIT_TOKEN)
# take precedence over the values below.
[github]
#token = "Add your github api token here"
# Only needed for GitHub Enterprise
#api_url = "https://github.example.com/api/v3"

[gitlab]
#token = "Add your gitlab api token here"
#api_url = "https://gitlab.com/api/v4"

[ngrok]
# The ngrok agent api, as seen from inside the cluster
#api_url = "http://ngrok:4040/api/tunnels"
"#;

/// Create a sample config file at `path`, or in the user config directory
pub fn generate_config(path: Option<&PathBuf>, force: bool) -> Result<PathBuf, SyncError> {
    let config_path = match path {
        Some(path) => path.clone(),
        None => dirs::config_dir()
            .map(|dir| dir.join(CONFIG_NAME))
            .ok_or_else(|| {
                SyncError::Config(
                    "No config file specified and $XDG_CONFIG_HOME or $HOME/.config could not be determined".to_string(),
                )
            })?,
    };
    write_config(&config_path, force)?;
    info!("Config file created at {}", config_path.display());
    Ok(config_path)
}

fn write_config(path: &Path, force: bool) -> Result<(), SyncError> {
    if path.exists() {
        if !force {
            return Err(SyncError::Config(format!(
                "Config file already exists at {}. Use --force to overwrite",
                path.display()
            )));
        }
        let mut backup = path.to_path_buf().into_os_string();
        backup.push(".bak");
        fs::copy(path, backup)?;
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, SAMPLE_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_sample_config_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_NAME);
        let written = generate_config(Some(&path), false).unwrap();
        assert_eq!(written, path);
        let config = Config::from_file(&path).unwrap();
        assert!(config.github.token.is_none());
    }

    #[test]
    fn test_existing_config_needs_force() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_NAME);
        fs::write(&path, "[github]\ntoken = \"keep\"\n").unwrap();

        let err = generate_config(Some(&path), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(fs::read_to_string(&path).unwrap().contains("keep"));

        generate_config(Some(&path), true).unwrap();
        let backup = dir.path().join(format!("{CONFIG_NAME}.bak"));
        assert!(fs::read_to_string(backup).unwrap().contains("keep"));
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE_CONFIG);
    }
}
