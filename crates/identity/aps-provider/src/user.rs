//! Mapping of the aps user profile onto [`User`].

use aps_auth_core::{AuthResult, User};
use serde::Deserialize;
use serde_json::{Map, Value};

/// OpenID Connect claims returned by the aps userinfo endpoint; `null` reads as absent
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserInfoClaims {
    sub: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    preferred_username: Option<String>,
    email: Option<String>,
    picture: Option<String>,
    locale: Option<String>,
}

pub(crate) fn user_from_profile(mut user: User, profile: Map<String, Value>) -> AuthResult<User> {
    let claims: UserInfoClaims = serde_json::from_value(Value::Object(profile.clone()))?;

    user.user_id = claims.sub.unwrap_or_default();
    user.name = claims.name.unwrap_or_default();
    user.first_name = claims.given_name.unwrap_or_default();
    user.last_name = claims.family_name.unwrap_or_default();
    user.nick_name = claims.preferred_username.unwrap_or_default();
    user.email = claims.email.unwrap_or_default();
    user.avatar_url = claims.picture.unwrap_or_default();
    user.location = claims.locale.unwrap_or_default();
    user.raw_data = profile;

    Ok(user)
}
