use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use workdrive_bridge_config::ZohoSettings;

use crate::clock::Clock;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("No Zoho refresh token configured")]
    NotConfigured,
    #[error("Failed to fetch access token: {0}")]
    Refresh(String),
}

/// Token pair returned by the Zoho accounts token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub api_domain: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Upper bound applied to a provider-reported lifetime before it is turned
/// into an expiry instant.
const MAX_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Process-wide access token holder.
///
/// Implementations hold at most one token and never hand it out past its
/// recorded expiry.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a usable access token, refreshing it if needed.
    async fn get(&self) -> Result<String, TokenError>;

    /// Drops the cached token so the next `get` refreshes.
    fn invalidate(&self);

    /// Whether a non-expired token is currently cached.
    fn is_cached(&self) -> bool;

    /// Installs a freshly exchanged grant.
    fn seed(&self, grant: &TokenGrant);
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct ZohoTokenCache {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: RwLock<Option<String>>,
    cached: RwLock<Option<CachedToken>>,
    safety_margin: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl ZohoTokenCache {
    pub fn new(
        client: Client,
        zoho: &ZohoSettings,
        safety_margin_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let refresh_token = zoho
            .has_refresh_token()
            .then(|| zoho.refresh_token.clone())
            .flatten();

        Self {
            client,
            token_url: token_url(&zoho.accounts_url),
            client_id: zoho.client_id.clone(),
            client_secret: zoho.client_secret.clone(),
            refresh_token: RwLock::new(refresh_token),
            cached: RwLock::new(None),
            safety_margin: TimeDelta::seconds(safety_margin_secs),
            clock,
        }
    }

    /// Expiry instant the cached token carries, if any.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.cached.read().as_ref().map(|c| c.expires_at)
    }

    fn current(&self) -> Option<String> {
        let now = self.clock.now();
        self.cached
            .read()
            .as_ref()
            .filter(|c| now < c.expires_at)
            .map(|c| c.access_token.clone())
    }

    fn store(&self, grant: &TokenGrant) {
        let lifetime = grant.expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS);
        let expires_at = self.clock.now() + TimeDelta::seconds(lifetime) - self.safety_margin;
        *self.cached.write() = Some(CachedToken {
            access_token: grant.access_token.clone(),
            expires_at,
        });
        debug!(%expires_at, "Cached WorkDrive access token");
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, TokenError> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| TokenError::Refresh(e.to_string()))?;

        parse_grant(resp).await.map_err(TokenError::Refresh)
    }
}

#[async_trait]
impl TokenProvider for ZohoTokenCache {
    async fn get(&self) -> Result<String, TokenError> {
        if let Some(token) = self.current() {
            return Ok(token);
        }

        let refresh_token = self
            .refresh_token
            .read()
            .clone()
            .ok_or(TokenError::NotConfigured)?;

        info!("Refreshing WorkDrive access token");
        let grant = self.refresh(&refresh_token).await?;
        self.store(&grant);
        Ok(grant.access_token)
    }

    fn invalidate(&self) {
        *self.cached.write() = None;
    }

    fn is_cached(&self) -> bool {
        self.current().is_some()
    }

    fn seed(&self, grant: &TokenGrant) {
        self.store(grant);
        if let Some(rt) = grant.refresh_token.as_ref().filter(|t| !t.is_empty()) {
            let mut current = self.refresh_token.write();
            if current.is_none() {
                info!("Adopting refresh token from OAuth callback");
                *current = Some(rt.clone());
            }
        }
    }
}

pub(crate) fn token_url(accounts_url: &str) -> String {
    format!("{}/oauth/v2/token", accounts_url.trim_end_matches('/'))
}

/// Reads a token endpoint response. Zoho reports some failures (e.g. an
/// already-used code) as 200 with an `error` field.
pub(crate) async fn parse_grant(resp: reqwest::Response) -> Result<TokenGrant, String> {
    let status = resp.status();
    let json: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| format!("Failed to parse token response: {}", e))?;

    if !status.is_success() {
        return Err(format!("Token endpoint returned {}: {}", status, json));
    }
    if let Some(err) = json.get("error") {
        return Err(format!("Token endpoint error: {}", err));
    }

    serde_json::from_value(json).map_err(|e| format!("Malformed token response: {}", e))
}
