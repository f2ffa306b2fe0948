//! OAuth2 error types.

use thiserror::Error;

pub type OAuth2Result<T> = Result<T, OAuth2Error>;

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    /// The token endpoint answered with a non-success status.
    #[error("Token request failed with status {status}: {body}")]
    Retrieve {
        status: u16,
        error_code: Option<String>,
        error_description: Option<String>,
        body: String,
    },

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Server response missing access_token")]
    MissingAccessToken,
}
