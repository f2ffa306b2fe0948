//! Login session stored by the host between requests.

use crate::provider::{PROVIDER_NAME, Provider};
use aps_auth_core::{AuthError, AuthProvider, AuthResult, AuthSession, Params};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use tracing::debug;

/// State of one "aps" login.
///
/// Only `auth_url` is set until the callback's code has been exchanged; after
/// [`Session::authorize`] the tokens are filled in. The JSON form uses the field names
/// `AuthURL`, `AccessToken`, `RefreshToken` and `ExpiresAt`, in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    #[serde(rename = "AuthURL")]
    pub auth_url: String,
    #[serde(rename = "AccessToken")]
    pub access_token: String,
    #[serde(rename = "RefreshToken")]
    pub refresh_token: String,
    #[serde(rename = "ExpiresAt", with = "expires_at")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn get_auth_url(&self) -> AuthResult<String> {
        if self.auth_url.is_empty() {
            return Err(AuthError::NoAuthUrl);
        }
        Ok(self.auth_url.clone())
    }

    /// Compact JSON form, readable by [`Provider::unmarshal_session`]
    pub fn marshal(&self) -> String {
        // Every field is a string or timestamp, which always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Exchange the `code` callback parameter for tokens and store them in the session.
    /// Returns the new access token.
    pub async fn authorize(
        &mut self,
        provider: &Provider,
        params: &dyn Params,
    ) -> AuthResult<String> {
        let code = params
            .get("code")
            .filter(|code| !code.is_empty())
            .ok_or(AuthError::MissingCode)?;

        let token = provider.exchange_code(code).await?;

        self.access_token = token.access_token;
        self.refresh_token = token.refresh_token;
        self.expires_at = token.expiry;

        debug!("Authorized session for provider {}", PROVIDER_NAME);
        Ok(self.access_token.clone())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.marshal())
    }
}

#[async_trait]
impl AuthSession for Session {
    fn get_auth_url(&self) -> AuthResult<String> {
        Session::get_auth_url(self)
    }

    fn marshal(&self) -> String {
        Session::marshal(self)
    }

    async fn authorize(
        &mut self,
        provider: &dyn AuthProvider,
        params: &dyn Params,
    ) -> AuthResult<String> {
        let aps = provider
            .as_any()
            .downcast_ref::<Provider>()
            .ok_or_else(|| AuthError::ProviderMismatch {
                expected: PROVIDER_NAME.to_string(),
                actual: provider.name().to_string(),
            })?;
        Session::authorize(self, aps, params).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// RFC3339 with millisecond precision and a `Z` suffix; `null` when unset.
mod expires_at {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            // Readers of a stored session must accept `null` here, not only RFC3339.
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|value| {
            DateTime::parse_from_rfc3339(&value)
                .map(|at| at.with_timezone(&Utc))
                .map_err(de::Error::custom)
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MARSHALED: &str = r#"{"AuthURL":"myurl","AccessToken":"token","RefreshToken":"rtoken","ExpiresAt":"2014-05-16T08:28:06.801Z"}"#;

    fn a_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2014-05-16T08:28:06.801Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn full_session() -> Session {
        Session {
            auth_url: "myurl".to_string(),
            access_token: "token".to_string(),
            refresh_token: "rtoken".to_string(),
            expires_at: Some(a_time()),
        }
    }

    #[test]
    fn test_get_auth_url_empty() {
        let session = Session::default();
        assert!(matches!(session.get_auth_url(), Err(AuthError::NoAuthUrl)));
    }

    #[test]
    fn test_get_auth_url_with_value() {
        let session = Session {
            auth_url: "myurl".to_string(),
            ..Session::default()
        };
        assert_eq!(session.get_auth_url().unwrap(), "myurl");
    }

    #[test]
    fn test_marshal() {
        assert_eq!(full_session().marshal(), MARSHALED);
    }

    #[test]
    fn test_string_matches_marshal() {
        assert_eq!(full_session().to_string(), MARSHALED);
    }

    #[test]
    fn test_marshal_pads_milliseconds() {
        let session = Session {
            expires_at: Some(Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap()),
            ..Session::default()
        };
        assert_eq!(
            session.marshal(),
            r#"{"AuthURL":"","AccessToken":"","RefreshToken":"","ExpiresAt":"2020-01-02T03:04:05.000Z"}"#
        );
    }

    #[test]
    fn test_marshal_unset_expiry() {
        assert_eq!(
            Session::default().marshal(),
            r#"{"AuthURL":"","AccessToken":"","RefreshToken":"","ExpiresAt":null}"#
        );
    }

    #[test]
    fn test_unmarshal_session() {
        let provider = Provider::new("", "", "", &[]);
        let data = r#"{
            "AuthURL": "auth",
            "AccessToken": "b",
            "RefreshToken": "a",
            "ExpiresAt": "2014-05-16T08:28:06.801Z"
        }"#;

        let session = provider.unmarshal_session(data).unwrap();
        assert_eq!(
            session,
            Session {
                auth_url: "auth".to_string(),
                access_token: "b".to_string(),
                refresh_token: "a".to_string(),
                expires_at: Some(a_time()),
            }
        );
    }

    #[test]
    fn test_unmarshal_round_trip() {
        let provider = Provider::new("", "", "", &[]);
        let session = provider.unmarshal_session(MARSHALED).unwrap();
        assert_eq!(session, full_session());
        assert_eq!(session.marshal(), MARSHALED);
    }

    #[test]
    fn test_unmarshal_partial_and_offset_timestamps() {
        let provider = Provider::new("", "", "", &[]);

        let session = provider
            .unmarshal_session(r#"{"AuthURL":"only-url"}"#)
            .unwrap();
        assert_eq!(session.auth_url, "only-url");
        assert_eq!(session.expires_at, None);

        let session = provider
            .unmarshal_session(r#"{"ExpiresAt":"2014-05-16T10:28:06.801+02:00"}"#)
            .unwrap();
        assert_eq!(session.expires_at, Some(a_time()));
    }

    #[test]
    fn test_unmarshal_rejects_bad_timestamp() {
        let provider = Provider::new("", "", "", &[]);
        let result = provider.unmarshal_session(r#"{"ExpiresAt":"yesterday"}"#);
        assert!(matches!(result, Err(AuthError::Parse(_))));
    }

    #[tokio::test]
    async fn test_authorize_requires_code() {
        let provider = Provider::new("key", "secret", "/cb", &[]);
        let mut session = provider.begin_auth("state").unwrap();
        let params: std::collections::HashMap<String, String> = Default::default();

        let result = session.authorize(&provider, &params).await;
        assert!(matches!(result, Err(AuthError::MissingCode)));
        assert!(session.access_token.is_empty());
    }
}
