//! OAuth2 login provider for the "aps" identity service (Autodesk Platform Services).
//!
//! [`Provider`] implements [`AuthProvider`] so it can be registered next to other
//! providers in a host's [`aps_auth_core::ProviderRegistry`]. It builds the
//! authorization URL, exchanges the callback code for tokens, refreshes tokens and
//! fetches the user's profile. [`Session`] is the value the host stores between the
//! redirect and callback requests.

mod provider;
mod session;
mod settings;
mod user;


pub use provider::{AUTH_URL, PROVIDER_NAME, Provider, TOKEN_URL, USER_INFO_URL};
pub use session::Session;
pub use settings::ProviderSettings;

// Re-export common types for convenience
pub use aps_auth_core::{AuthError, AuthProvider, AuthResult, AuthSession, Params, User};
pub use aps_oauth2::Token;
