//! Example showing how to wire the aps provider into a host application
//!
//! This example demonstrates:
//! 1. Building the provider from settings and registering it
//! 2. Starting the login flow and storing the session between requests
//! 3. Restoring the session on the callback request
//!
//! The code exchange itself needs a real authorization code from aps, so it is only
//! attempted when `APS_AUTH_CODE` is set.

use aps_auth_core::ProviderRegistry;
use aps_provider::ProviderSettings;
use std::collections::HashMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let settings = ProviderSettings {
        client_key: std::env::var("APS_CLIENT_ID")
            .unwrap_or_else(|_| "your-aps-client-id".to_string()),
        secret: std::env::var("APS_CLIENT_SECRET")
            .unwrap_or_else(|_| "your-aps-client-secret".to_string()),
        callback_url: "http://localhost:3000/auth/aps/callback".to_string(),
        scopes: vec!["data:read".to_string(), "user-profile:read".to_string()],
        prompt: vec!["login".to_string()],
        http_timeout_seconds: 30,
    };

    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(settings.into_provider()?));
    println!("Registered providers: {:?}", registry.names());

    let provider = registry.get("aps")?;

    // Redirect leg
    let session = provider.begin_auth("example-state")?;
    println!("Redirect the user to: {}", session.get_auth_url()?);

    // The host keeps this string, e.g. in an encrypted cookie
    let stored = session.marshal();
    println!("Stored session: {}", stored);

    // Callback leg
    let mut session = provider.unmarshal_session(&stored)?;

    let Ok(code) = std::env::var("APS_AUTH_CODE") else {
        println!("Set APS_AUTH_CODE to exchange a real authorization code");
        return Ok(());
    };

    let mut params = HashMap::new();
    params.insert("code".to_string(), code);

    match session.authorize(&*provider, &params).await {
        Ok(_) => {
            let user = provider.fetch_user(&*session).await?;
            println!("Signed in as {} <{}>", user.name, user.email);
            println!("Updated session: {}", session.marshal());
        }
        Err(e) => {
            println!("Code exchange failed: {}", e);
        }
    }

    Ok(())
}
