use outlook_sync::components::google_calendar::token::{token_from_response, TokenManager};
use outlook_sync::config::Config;
use outlook_sync::error::{auth_error, env_error, other_error, SyncResult};
use url::Url;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const REDIRECT_URI: &str = "http://localhost:8080";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

#[tokio::main]
async fn main() -> SyncResult<()> {
    // Load configuration
    let config = Config::load()?;

    let client_id = config
        .google_client_id
        .clone()
        .ok_or_else(|| env_error("GOOGLE_CLIENT_ID"))?;
    let client_secret = config
        .google_client_secret
        .clone()
        .ok_or_else(|| env_error("GOOGLE_CLIENT_SECRET"))?;

    let client = reqwest::Client::new();
    let token_manager = TokenManager::new(
        config.token_file.clone(),
        config.settings.google.token_url.clone(),
        Some(client_id.clone()),
        Some(client_secret.clone()),
        client.clone(),
    );

    // Generate random state for security
    let state = uuid::Uuid::new_v4().to_string();

    let auth_url = Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", client_id.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("response_type", "code"),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("scope", CALENDAR_SCOPE),
            ("state", state.as_str()),
        ],
    )
    .map_err(|e| other_error(&format!("Failed to build authorization URL: {}", e)))?;

    // Open browser for authorization
    println!("Opening browser for Google Calendar authorization...");
    if webbrowser::open(auth_url.as_str()).is_err() {
        println!("Open this URL in your browser:\n{}", auth_url);
    }

    // Start local server to receive the callback
    let server = tiny_http::Server::http("127.0.0.1:8080")
        .map_err(|e| other_error(&format!("Failed to listen on {}: {}", REDIRECT_URI, e)))?;
    println!("Waiting for authorization callback...");

    let request = server.recv()?;
    let callback = Url::parse(REDIRECT_URI)
        .and_then(|base| base.join(request.url()))
        .map_err(|e| other_error(&format!("Invalid callback URL: {}", e)))?;
    let param = |name: &str| {
        callback
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if param("state").as_deref() != Some(state.as_str()) {
        return Err(auth_error("Authorization callback state does not match"));
    }
    let code = param("code").ok_or_else(|| {
        let reason = param("error").unwrap_or_else(|| "no code in callback".to_string());
        auth_error(&format!("Authorization failed: {}", reason))
    })?;

    // Exchange code for tokens
    let response = client
        .post(&config.settings.google.token_url)
        .form(&[
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        return Err(auth_error(&format!("Failed to get token: {}", error_text)));
    }

    let body: serde_json::Value = response.json().await?;
    let token = token_from_response(&body, None)?;
    if token.refresh_token.is_none() {
        println!("Warning: no refresh token was returned; you will need to authorize again when it expires.");
    }

    token_manager.set_token(token).await?;

    // Send success response to browser
    let response =
        tiny_http::Response::from_string("Authorization successful! You can close this window.");
    request.respond(response)?;

    println!("Token saved to {}", config.token_file.display());

    Ok(())
}
