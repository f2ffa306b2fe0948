//! Core traits and types shared by OAuth2 login providers.
//!
//! A host application registers any number of [`AuthProvider`]s in a
//! [`ProviderRegistry`] and drives the login flow through them without knowing which
//! identity service is behind each one. The [`AuthSession`] a provider hands out is
//! persisted by the host between the redirect and callback legs of the flow.

use aps_oauth2::{OAuth2Error, Token};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an AuthURL has not been set")]
    NoAuthUrl,

    #[error("Invalid session data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{provider} cannot get user information without accessToken")]
    MissingAccessToken { provider: String },

    #[error("Missing authorization code")]
    MissingCode,

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider mismatch: expected {expected}, got {actual}")]
    ProviderMismatch { expected: String, actual: String },

    #[error("Session was not created by this provider")]
    SessionMismatch,

    #[error("{provider} responded with a {status} trying to fetch user information")]
    UserInfo { provider: String, status: u16 },

    /// Failure reported by the OAuth2 client, passed through as-is
    #[error(transparent)]
    OAuth2(#[from] OAuth2Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Query parameters of the callback request
pub trait Params: Send + Sync {
    fn get(&self, key: &str) -> Option<&str>;
}

impl Params for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

impl Params for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        BTreeMap::get(self, key).map(String::as_str)
    }
}

/// Profile of a signed-in user, normalized across providers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub raw_data: serde_json::Map<String, serde_json::Value>,
    pub provider: String,
    pub email: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub nick_name: String,
    pub description: String,
    pub user_id: String,
    pub avatar_url: String,
    pub location: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub id_token: String,
}

/// State carried between the redirect and callback legs of a login
#[async_trait]
pub trait AuthSession: Send + Sync {
    /// URL the user should be redirected to; fails if the flow has not begun.
    fn get_auth_url(&self) -> AuthResult<String>;

    /// Serialize for storage between requests
    fn marshal(&self) -> String;

    /// Exchange the callback's authorization code for tokens, storing them in the
    /// session. Returns the access token.
    async fn authorize(
        &mut self,
        provider: &dyn AuthProvider,
        params: &dyn Params,
    ) -> AuthResult<String>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Start a login flow; the returned session carries the authorization URL.
    fn begin_auth(&self, state: &str) -> AuthResult<Box<dyn AuthSession>>;

    /// Restore a session previously produced by [`AuthSession::marshal`]
    fn unmarshal_session(&self, data: &str) -> AuthResult<Box<dyn AuthSession>>;

    async fn fetch_user(&self, session: &dyn AuthSession) -> AuthResult<User>;

    fn set_debug(&mut self, debug: bool);

    async fn refresh_token(&self, refresh_token: &str) -> AuthResult<Token>;

    fn refresh_token_available(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Providers known to the host application, keyed by name
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AuthProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its name, returning any provider it replaces
    pub fn register(&mut self, provider: Box<dyn AuthProvider>) -> Option<Arc<dyn AuthProvider>> {
        let name = provider.name().to_string();
        debug!("Registering auth provider {}", name);
        self.providers.insert(name, Arc::from(provider))
    }

    pub fn get(&self, name: &str) -> AuthResult<Arc<dyn AuthProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::ProviderNotFound(name.to_string()))
    }

    /// Registered provider names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn AuthProvider>> {
        self.providers.remove(name)
    }

    pub fn clear(&mut self) {
        self.providers.clear();
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
