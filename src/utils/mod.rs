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
/// Macros shared by the provider adapters
pub mod macros;

/// Path appended to a tunnel URL to form the Atlantis webhook endpoint
pub const EVENTS_PATH: &str = "events";

/// Convert github http status errors to a usable status and message
pub fn get_http_status(err: &octocrab::Error) -> (Option<http::StatusCode>, Option<String>) {
    if let octocrab::Error::GitHub { source, .. } = err {
        let status = source.status_code;
        let message = source.message.clone();
        return (Some(status), Some(message));
    }
    (None, None)
}

/// Build the Atlantis events endpoint for a tunnel base url
pub fn events_url(base: &str) -> String {
    format!("{}/{EVENTS_PATH}", base.trim_end_matches('/'))
}

/// Split a comma separated list of keys, dropping blanks
pub fn parse_key_list(keys: &str) -> Vec<String> {
    keys.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Both kube and reqwest pull in rustls, each with its own crypto backend, so rustls
/// can't pick a default on its own. Calling this more than once is harmless.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
