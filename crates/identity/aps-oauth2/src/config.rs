//! OAuth2 client configuration types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// How client credentials are presented to the token endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthStyle {
    /// HTTP Basic `Authorization` header
    #[default]
    InHeader,
    /// `client_id` and `client_secret` form fields
    InParams,
}

/// Authorization server endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub auth_url: String,
    pub token_url: String,
    #[serde(default)]
    pub auth_style: AuthStyle,
}

/// OAuth2 client configuration for a single authorization server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub endpoint: Endpoint,
    /// Omitted from requests when empty
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

/// An extra parameter attached to authorization URLs and code exchanges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCodeOption {
    key: String,
    value: String,
}

impl AuthCodeOption {
    /// Set `key=value`, replacing any parameter the client would otherwise send under `key`.
    pub fn set_auth_url_param(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Config {
    /// Build the URL a user is sent to in order to grant access.
    ///
    /// Query parameters are form-encoded (spaces become `+`) and emitted sorted by name.
    /// `state` is left out when empty, as are `redirect_uri` and `scope` when unset.
    pub fn auth_code_url(&self, state: &str, options: &[AuthCodeOption]) -> String {
        let scope = self.scopes.join(" ");

        let mut params: BTreeMap<&str, &str> = BTreeMap::new();
        params.insert("response_type", "code");
        params.insert("client_id", &self.client_id);
        if !self.redirect_url.is_empty() {
            params.insert("redirect_uri", &self.redirect_url);
        }
        if !self.scopes.is_empty() {
            params.insert("scope", &scope);
        }
        if !state.is_empty() {
            params.insert("state", state);
        }
        for option in options {
            params.insert(option.key(), option.value());
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        let separator = if self.endpoint.auth_url.contains('?') {
            '&'
        } else {
            '?'
        };

        format!("{}{}{}", self.endpoint.auth_url, separator, query)
    }
}
