use crate::error::{auth_error, SyncResult};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Seconds before expiry at which a token is refreshed
const EXPIRY_MARGIN_SECS: i64 = 60;

/// OAuth token persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp; `None` means the token never expires
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StoredToken {
    pub fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expiry) => expiry > Utc::now().timestamp() + EXPIRY_MARGIN_SECS,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Token response of the OAuth endpoint turned into a stored token
pub fn token_from_response(body: &serde_json::Value, previous_refresh: Option<&str>) -> SyncResult<StoredToken> {
    let response: TokenResponse = serde_json::from_value(body.clone())
        .map_err(|e| auth_error(&format!("Token response missing 'access_token': {}", e)))?;
    Ok(StoredToken {
        access_token: response.access_token,
        refresh_token: response.refresh_token.or_else(|| previous_refresh.map(str::to_string)),
        expires_at: Some(Utc::now().timestamp() + response.expires_in.unwrap_or(3600)),
    })
}

#[derive(Clone)]
pub struct TokenManager {
    path: PathBuf,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    client: Client,
    cached: Arc<RwLock<Option<StoredToken>>>,
}

impl TokenManager {
    pub fn new(
        path: PathBuf,
        token_url: String,
        client_id: Option<String>,
        client_secret: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            path,
            token_url,
            client_id,
            client_secret,
            client,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Current access token, refreshing it when expired
    pub async fn access_token(&self) -> SyncResult<String> {
        Ok(self.get_token().await?.access_token)
    }

    /// Get the OAuth token from the cache or token file
    pub async fn get_token(&self) -> SyncResult<StoredToken> {
        if let Some(token) = self.cached.read().await.as_ref() {
            if token.is_fresh() {
                return Ok(token.clone());
            }
        }

        let mut cached = self.cached.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if token.is_fresh() {
                return Ok(token.clone());
            }
        }

        let token = match cached.take() {
            Some(token) => token,
            None => self.load().await?,
        };
        let token = if token.is_fresh() {
            token
        } else {
            self.refresh_token(&token).await?
        };

        *cached = Some(token.clone());
        Ok(token)
    }

    async fn load(&self) -> SyncResult<StoredToken> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            auth_error(&format!(
                "No token found at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        debug!("Loaded token from {}", self.path.display());
        serde_json::from_str(&content)
            .map_err(|e| auth_error(&format!("Failed to parse token file: {}", e)))
    }

    /// Refresh an expired token and persist the result
    async fn refresh_token(&self, token: &StoredToken) -> SyncResult<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| auth_error("Token expired and no refresh token is stored"))?;
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| auth_error("GOOGLE_CLIENT_ID is required to refresh the token"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| auth_error("GOOGLE_CLIENT_SECRET is required to refresh the token"))?;

        info!("Refreshing Google Calendar access token");
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| auth_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(auth_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))?;
        let new_token = token_from_response(&body, Some(refresh_token))?;

        self.save(&new_token).await?;
        Ok(new_token)
    }

    /// Write the token file and replace the cached token
    pub async fn set_token(&self, token: StoredToken) -> SyncResult<()> {
        self.save(&token).await?;
        *self.cached.write().await = Some(token);
        Ok(())
    }

    async fn save(&self, token: &StoredToken) -> SyncResult<()> {
        let json = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.path, json).await?;
        debug!("Saved token to {}", self.path.display());
        Ok(())
    }
}
