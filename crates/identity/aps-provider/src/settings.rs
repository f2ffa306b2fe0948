//! Provider settings loadable from a host's configuration source.

use crate::provider::Provider;
use aps_auth_core::AuthResult;
use aps_oauth2::OAuth2Error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Credentials and options for building a [`Provider`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub client_key: String,
    pub secret: String,
    pub callback_url: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Values for the `prompt` authorization parameter
    #[serde(default)]
    pub prompt: Vec<String>,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

fn default_http_timeout() -> u64 {
    30
}

impl ProviderSettings {
    pub fn into_provider(self) -> AuthResult<Provider> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(self.http_timeout_seconds))
            .build()
            .map_err(OAuth2Error::from)?;

        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let prompt: Vec<&str> = self.prompt.iter().map(String::as_str).collect();

        let mut provider = Provider::new(self.client_key, self.secret, self.callback_url, &scopes)
            .with_http_client(http_client);
        provider.set_prompt(&prompt);

        Ok(provider)
    }
}
