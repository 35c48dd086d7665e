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
//! Discovery of the public url of the ngrok tunnel fronting Atlantis.
use crate::error::SyncError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

/// Address of the ngrok agent api inside the cluster
pub const NGROK_API_ADDR: &str = "http://ngrok:4040/api/tunnels";

/// The response from the ngrok agent api
#[derive(Debug, Deserialize)]
pub struct TunnelResponse {
    pub tunnels: Vec<Tunnel>,
}

/// A single ngrok tunnel definition. Only the fields used to pick a tunnel are decoded.
#[derive(Clone, Debug, Deserialize)]
pub struct Tunnel {
    #[serde(default)]
    pub name: String,
    pub public_url: String,
    #[serde(default)]
    pub proto: String,
}

#[async_trait]
pub trait TunnelDiscovery: Send + Sync {
    /// The public url of the current tunnel
    async fn tunnel_url(&self) -> Result<String, SyncError>;
}

/// Pick the tunnel to use. With a protocol filter the first tunnel speaking it wins, otherwise
/// the first tunnel listed.
pub fn select_tunnel<'a>(tunnels: &'a [Tunnel], proto: Option<&str>) -> Option<&'a Tunnel> {
    match proto {
        Some(proto) => tunnels.iter().find(|tunnel| tunnel.proto == proto),
        None => tunnels.first(),
    }
}

pub struct NgrokClient {
    client: Client,
    api_url: String,
    proto: Option<String>,
}

impl NgrokClient {
    pub fn new(api_url: &str, proto: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.to_string(),
            proto,
        }
    }

    /// Fetch every tunnel the agent currently exposes
    pub async fn list_tunnels(&self) -> Result<Vec<Tunnel>, SyncError> {
        let response = self.client.get(&self.api_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("unable to query ngrok api at {}: HTTP {status}", self.api_url);
            return Err(SyncError::HttpStatus {
                context: format!("unable to query ngrok api at {}", self.api_url),
                status,
            });
        }
        let body = response.text().await?;
        let parsed: TunnelResponse = serde_json::from_str(&body)?;
        Ok(parsed.tunnels)
    }
}

#[async_trait]
impl TunnelDiscovery for NgrokClient {
    async fn tunnel_url(&self) -> Result<String, SyncError> {
        let tunnels = self.list_tunnels().await?;
        debug!("ngrok reported {} tunnels", tunnels.len());
        let tunnel = select_tunnel(&tunnels, self.proto.as_deref()).ok_or_else(|| {
            SyncError::NotFound(match &self.proto {
                Some(proto) => format!("no {proto} tunnel reported by {}", self.api_url),
                None => format!("no tunnels reported by {}", self.api_url),
            })
        })?;
        debug!("using tunnel {} ({})", tunnel.name, tunnel.public_url);
        Ok(tunnel.public_url.clone())
    }
}
