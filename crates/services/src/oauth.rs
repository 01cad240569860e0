use reqwest::Client;
use thiserror::Error;
use tracing::info;
use workdrive_bridge_config::ZohoSettings;

use crate::token::{TokenGrant, parse_grant, token_url};

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Zoho OAuth client is not configured")]
    NotConfigured,
    #[error("Token exchange failed: {0}")]
    Exchange(String),
}

/// Operator-facing authorization-code flow against Zoho accounts.
pub struct OAuthService {
    client: Client,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
}

impl OAuthService {
    pub fn new(client: Client, zoho: &ZohoSettings) -> Self {
        Self {
            client,
            accounts_url: zoho.accounts_url.trim_end_matches('/').to_string(),
            client_id: zoho.client_id.clone(),
            client_secret: zoho.client_secret.clone(),
            redirect_uri: zoho.redirect_uri.clone(),
            scope: zoho.scope.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub fn authorize_url(&self) -> String {
        format!(
            "{}/oauth/v2/auth?scope={}&client_id={}&response_type=code&access_type=offline&prompt=consent&redirect_uri={}",
            self.accounts_url,
            urlencoding::encode(&self.scope),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant, OAuthError> {
        if !self.is_configured() {
            return Err(OAuthError::NotConfigured);
        }

        let resp = self
            .client
            .post(token_url(&self.accounts_url))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        let grant = parse_grant(resp).await.map_err(OAuthError::Exchange)?;
        info!(
            has_refresh_token = grant.refresh_token.is_some(),
            "Exchanged authorization code"
        );
        Ok(grant)
    }
}
