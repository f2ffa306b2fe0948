//! OAuth2 protocol types.

use crate::error::{OAuth2Error, OAuth2Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Credentials issued by the token endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    /// Empty when the server issued none
    pub refresh_token: String,
    /// `None` when the server did not say when the access token expires
    pub expiry: Option<DateTime<Utc>>,
    /// Remaining fields of the token response, e.g. `id_token`
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Token {
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| Utc::now() >= expiry)
    }

    /// Look up a field of the token response that has no dedicated member.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Successful token endpoint response body
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    pub token_type: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenResponse {
    pub fn into_token(self, issued_at: DateTime<Utc>) -> OAuth2Result<Token> {
        if self.access_token.is_empty() {
            return Err(OAuth2Error::MissingAccessToken);
        }

        // A lifetime past the representable range counts as no expiry.
        let expiry = self
            .expires_in
            .filter(|seconds| *seconds > 0)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime));

        Ok(Token {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_default(),
            refresh_token: self.refresh_token.unwrap_or_default(),
            expiry,
            extra: self.extra,
        })
    }
}

/// Error body returned by the token endpoint (RFC 6749 section 5.2)
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
}
