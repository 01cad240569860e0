use axum::{Json, extract::State};
use serde_json::json;

use crate::state::AppState;

/// GET /health
/// Liveness plus a summary of which credentials are configured (never their values).
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let zoho = &state.settings.zoho;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "tokenCached": state.tokens.is_cached(),
        "env": {
            "clientId": !zoho.client_id.is_empty(),
            "clientSecret": !zoho.client_secret.is_empty(),
            "redirectUri": !zoho.redirect_uri.is_empty(),
            "refreshToken": zoho.has_refresh_token(),
            "folderId": !zoho.folder_id.is_empty(),
            "sessionDir": state.sessions.dir().display().to_string(),
        },
    }))
}
