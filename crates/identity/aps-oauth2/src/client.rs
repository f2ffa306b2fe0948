//! Token endpoint requests: authorization code exchange and refresh.

use crate::config::{AuthCodeOption, AuthStyle, Config};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::types::{ErrorResponse, Token, TokenResponse};
use chrono::Utc;
use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::{debug, error, info};
use url::{Url, form_urlencoded};

impl Config {
    /// Exchange an authorization code for tokens
    pub async fn exchange(
        &self,
        http_client: &Client,
        code: &str,
        options: &[AuthCodeOption],
    ) -> OAuth2Result<Token> {
        let mut form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
        ];
        if !self.redirect_url.is_empty() {
            form.push(("redirect_uri", self.redirect_url.clone()));
        }
        for option in options {
            form.push((option.key(), option.value().to_string()));
        }

        let token = self.retrieve_token(http_client, form).await?;

        info!("Successfully exchanged code for tokens");
        Ok(token)
    }

    /// Obtain a new access token using a refresh token.
    ///
    /// Servers that do not rotate refresh tokens omit one from the response; the token
    /// passed in is carried over in that case.
    pub async fn refresh(&self, http_client: &Client, refresh_token: &str) -> OAuth2Result<Token> {
        let form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];

        let mut token = self.retrieve_token(http_client, form).await?;
        if token.refresh_token.is_empty() {
            token.refresh_token = refresh_token.to_string();
        }

        debug!("Successfully refreshed access token");
        Ok(token)
    }

    async fn retrieve_token(
        &self,
        http_client: &Client,
        mut form: Vec<(&str, String)>,
    ) -> OAuth2Result<Token> {
        let token_url = Url::parse(&self.endpoint.token_url)?;

        let request = match self.endpoint.auth_style {
            AuthStyle::InHeader => http_client.post(token_url).basic_auth(
                form_escape(&self.client_id),
                Some(form_escape(&self.client_secret)),
            ),
            AuthStyle::InParams => {
                form.push(("client_id", self.client_id.clone()));
                form.push(("client_secret", self.client_secret.clone()));
                http_client.post(token_url)
            }
        };

        let response = request
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("Token request failed with status {}: {}", status, body);
            let details = serde_json::from_str::<ErrorResponse>(&body).ok();
            let (error_code, error_description) = match details {
                Some(details) => (details.error, details.error_description),
                None => (None, None),
            };
            return Err(OAuth2Error::Retrieve {
                status: status.as_u16(),
                error_code,
                error_description,
                body,
            });
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| OAuth2Error::InvalidTokenResponse(e.to_string()))?;

        token_response.into_token(Utc::now())
    }
}

/// RFC 6749 section 2.3.1 form-encodes credentials before they go into the Basic header.
fn form_escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoint;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_config(server: &MockServer, auth_style: AuthStyle) -> Config {
        Config {
            client_id: "mock_client_id".to_string(),
            client_secret: "mock_secret".to_string(),
            endpoint: Endpoint {
                auth_url: format!("{}/authorize", server.uri()),
                token_url: format!("{}/token", server.uri()),
                auth_style,
            },
            redirect_url: "http://localhost:3000/callback".to_string(),
            scopes: vec![],
        }
    }

    #[tokio::test]
    async fn test_exchange_with_basic_auth() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header(
                "Authorization",
                "Basic bW9ja19jbGllbnRfaWQ6bW9ja19zZWNyZXQ=",
            ))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the_code"))
            .and(body_string_contains(
                "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mock_access_token",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "mock_refresh_token"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = mock_config(&mock_server, AuthStyle::InHeader);
        let token = config
            .exchange(&Client::new(), "the_code", &[])
            .await
            .unwrap();

        assert_eq!(token.access_token, "mock_access_token");
        assert_eq!(token.refresh_token, "mock_refresh_token");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expiry.is_some());
    }

    #[tokio::test]
    async fn test_exchange_with_credentials_in_params() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("client_id=mock_client_id"))
            .and(body_string_contains("client_secret=mock_secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "params_token",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = mock_config(&mock_server, AuthStyle::InParams);
        let token = config
            .exchange(&Client::new(), "the_code", &[])
            .await
            .unwrap();

        assert_eq!(token.access_token, "params_token");
        assert_eq!(token.expiry, None);
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=old_refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "new_access",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&mock_server)
            .await;

        let config = mock_config(&mock_server, AuthStyle::InHeader);
        let token = config.refresh(&Client::new(), "old_refresh").await.unwrap();

        assert_eq!(token.access_token, "new_access");
        assert_eq!(token.refresh_token, "old_refresh");
    }

    #[tokio::test]
    async fn test_token_endpoint_error_is_surfaced() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "The authorization code is invalid"
            })))
            .mount(&mock_server)
            .await;

        let config = mock_config(&mock_server, AuthStyle::InHeader);
        let result = config.exchange(&Client::new(), "bad_code", &[]).await;

        match result {
            Err(OAuth2Error::Retrieve {
                status,
                error_code,
                error_description,
                ..
            }) => {
                assert_eq!(status, 400);
                assert_eq!(error_code.as_deref(), Some("invalid_grant"));
                assert_eq!(
                    error_description.as_deref(),
                    Some("The authorization code is invalid")
                );
            }
            other => panic!("Expected Retrieve error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_token_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let config = mock_config(&mock_server, AuthStyle::InHeader);
        let result = config.exchange(&Client::new(), "code", &[]).await;

        assert!(matches!(result, Err(OAuth2Error::InvalidTokenResponse(_))));
    }

    #[tokio::test]
    async fn test_invalid_token_url() {
        let config = Config {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            endpoint: Endpoint {
                auth_url: "auth".to_string(),
                token_url: "token".to_string(),
                auth_style: AuthStyle::InHeader,
            },
            redirect_url: String::new(),
            scopes: vec![],
        };

        let result = config.refresh(&Client::new(), "r").await;
        assert!(matches!(result, Err(OAuth2Error::UrlError(_))));
    }

    #[test]
    fn test_form_escape() {
        assert_eq!(form_escape("my client"), "my+client");
        assert_eq!(form_escape("s3cr/t"), "s3cr%2Ft");
    }
}
