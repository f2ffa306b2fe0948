//! OAuth2 authorization code flow client.
//!
//! This crate holds the client-side half of the OAuth2 Authorization Code flow: building
//! the authorization URL a user is redirected to, exchanging the returned code for tokens
//! at the token endpoint, and refreshing tokens later. It carries no provider-specific
//! knowledge; providers build a [`Config`] with their own endpoints.

mod client;
mod config;
mod error;
mod types;

pub use config::{AuthCodeOption, AuthStyle, Config, Endpoint};
pub use error::{OAuth2Error, OAuth2Result};
pub use types::Token;
