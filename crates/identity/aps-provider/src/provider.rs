//! The "aps" provider.

use crate::session::Session;
use crate::user::user_from_profile;
use aps_auth_core::{AuthError, AuthProvider, AuthResult, AuthSession, User};
use aps_oauth2::{AuthCodeOption, AuthStyle, Config, Endpoint, OAuth2Error, Token};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::any::Any;
use tracing::{debug, error, info};

pub const PROVIDER_NAME: &str = "aps";

pub const AUTH_URL: &str = "https://developer.api.autodesk.com/authentication/v2/authorize";
pub const TOKEN_URL: &str = "https://developer.api.autodesk.com/authentication/v2/token";
pub const USER_INFO_URL: &str = "https://api.userprofile.autodesk.com/userinfo";

/// OAuth2 client configuration and login flow for the "aps" identity service.
///
/// The OAuth2 configuration is derived from `client_key`, `secret` and `callback_url`
/// when the provider is created; changing those fields afterwards does not affect it.
#[derive(Debug, Clone)]
pub struct Provider {
    pub client_key: String,
    pub secret: String,
    pub callback_url: String,
    pub(crate) http_client: Client,
    pub(crate) config: Config,
    pub(crate) prompt: Option<AuthCodeOption>,
    pub(crate) user_info_url: String,
}

impl Provider {
    pub fn new(
        client_key: impl Into<String>,
        secret: impl Into<String>,
        callback_url: impl Into<String>,
        scopes: &[&str],
    ) -> Self {
        let mut provider = Self {
            client_key: client_key.into(),
            secret: secret.into(),
            callback_url: callback_url.into(),
            http_client: Client::new(),
            config: Config::default(),
            prompt: None,
            user_info_url: USER_INFO_URL.to_string(),
        };
        provider.config = new_config(&provider, scopes);
        provider
    }

    /// Use `http_client` for token and profile requests, e.g. to set timeouts or a proxy.
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    /// Accepted for interface compatibility; has no effect.
    pub fn set_debug(&mut self, _debug: bool) {}

    pub fn refresh_token_available(&self) -> bool {
        true
    }

    /// Set the `prompt` parameter sent with every authorization URL built afterwards.
    /// Values are joined with a single space; no values clears the parameter.
    pub fn set_prompt(&mut self, values: &[&str]) {
        if values.is_empty() {
            self.prompt = None;
            return;
        }
        self.prompt = Some(AuthCodeOption::set_auth_url_param(
            "prompt",
            values.join(" "),
        ));
    }

    /// Start a login flow. The returned session only carries the authorization URL.
    pub fn begin_auth(&self, state: &str) -> AuthResult<Session> {
        let auth_url = self.config.auth_code_url(state, self.prompt.as_slice());
        debug!("Generated authorization URL for provider {}", PROVIDER_NAME);

        Ok(Session {
            auth_url,
            ..Session::default()
        })
    }

    pub fn unmarshal_session(&self, data: &str) -> AuthResult<Session> {
        Ok(serde_json::from_str(data)?)
    }

    /// Exchange an authorization code received at the callback URL for tokens
    pub async fn exchange_code(&self, code: &str) -> AuthResult<Token> {
        let token = self
            .config
            .exchange(&self.http_client, code, &[])
            .await
            .inspect_err(|e| {
                error!("Code exchange failed for provider {}: {}", PROVIDER_NAME, e);
            })?;
        Ok(token)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> AuthResult<Token> {
        let token = self
            .config
            .refresh(&self.http_client, refresh_token)
            .await
            .inspect_err(|e| {
                error!("Token refresh failed for provider {}: {}", PROVIDER_NAME, e);
            })?;
        Ok(token)
    }

    /// Fetch the profile of the user the session's access token belongs to
    pub async fn fetch_user(&self, session: &Session) -> AuthResult<User> {
        let user = User {
            provider: PROVIDER_NAME.to_string(),
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            expires_at: session.expires_at,
            ..User::default()
        };

        if user.access_token.is_empty() {
            return Err(AuthError::MissingAccessToken {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        let response = self
            .http_client
            .get(&self.user_info_url)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(OAuth2Error::from)?;

        let status = response.status();
        if status != StatusCode::OK {
            error!("User info request failed with status {}", status);
            return Err(AuthError::UserInfo {
                provider: PROVIDER_NAME.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(OAuth2Error::from)?;
        let profile = serde_json::from_str(&body)?;
        let user = user_from_profile(user, profile)?;

        info!("Fetched user {} from provider {}", user.user_id, PROVIDER_NAME);
        Ok(user)
    }
}

fn aps_endpoint() -> Endpoint {
    Endpoint {
        auth_url: AUTH_URL.to_string(),
        token_url: TOKEN_URL.to_string(),
        auth_style: AuthStyle::InHeader,
    }
}

/// OAuth2 client configuration for `provider` requesting `scopes`
pub(crate) fn new_config(provider: &Provider, scopes: &[&str]) -> Config {
    Config {
        client_id: provider.client_key.clone(),
        client_secret: provider.secret.clone(),
        endpoint: aps_endpoint(),
        redirect_url: provider.callback_url.clone(),
        scopes: scopes.iter().map(|scope| scope.to_string()).collect(),
    }
}

#[async_trait]
impl AuthProvider for Provider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn begin_auth(&self, state: &str) -> AuthResult<Box<dyn AuthSession>> {
        Ok(Box::new(Provider::begin_auth(self, state)?))
    }

    fn unmarshal_session(&self, data: &str) -> AuthResult<Box<dyn AuthSession>> {
        Ok(Box::new(Provider::unmarshal_session(self, data)?))
    }

    async fn fetch_user(&self, session: &dyn AuthSession) -> AuthResult<User> {
        let session = session
            .as_any()
            .downcast_ref::<Session>()
            .ok_or(AuthError::SessionMismatch)?;
        Provider::fetch_user(self, session).await
    }

    fn set_debug(&mut self, debug: bool) {
        Provider::set_debug(self, debug);
    }

    async fn refresh_token(&self, refresh_token: &str) -> AuthResult<Token> {
        Provider::refresh_token(self, refresh_token).await
    }

    fn refresh_token_available(&self) -> bool {
        Provider::refresh_token_available(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
