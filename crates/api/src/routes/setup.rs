use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use tracing::info;

use super::{escape_html, page};
use crate::{error::ApiError, extractors::session::Session, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// GET /
/// Operator setup/status page.
pub async fn index(State(state): State<AppState>, session: Session) -> Html<String> {
    let zoho = &state.settings.zoho;
    let yes_no = |v: bool| if v { "yes" } else { "no" };

    let mut body = String::from("<h1>Zoho WorkDrive bridge</h1><ul>");
    body.push_str(&format!(
        "<li>OAuth client configured: {}</li>",
        yes_no(state.oauth.is_configured())
    ));
    body.push_str(&format!(
        "<li>Refresh token configured: {}</li>",
        yes_no(zoho.has_refresh_token())
    ));
    body.push_str(&format!(
        "<li>Access token cached: {}</li>",
        yes_no(state.tokens.is_cached())
    ));
    body.push_str(&format!(
        "<li>Target folder: {}</li></ul>",
        if zoho.folder_id.is_empty() {
            "<em>not set</em>".to_string()
        } else {
            escape_html(&zoho.folder_id)
        }
    ));

    if state.oauth.is_configured() {
        body.push_str(&format!(
            "<p><a href=\"{}\">Authorize with Zoho</a></p>",
            escape_html(&state.oauth.authorize_url())
        ));
    } else {
        body.push_str(
            "<p>Set WORKDRIVE__ZOHO__CLIENT_ID and WORKDRIVE__ZOHO__CLIENT_SECRET to enable authorization.</p>",
        );
    }

    if session.data().refresh_token.is_some() {
        body.push_str("<p>This browser session holds tokens from a previous authorization.</p>");
    }

    Html(page("WorkDrive setup", &body))
}

/// GET /callback?code=
/// Exchanges the authorization code and shows the tokens to the operator.
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<CallbackQuery>,
) -> Result<Html<String>, ApiError> {
    if let Some(err) = params.error {
        return Err(ApiError::BadRequest(format!("Authorization was denied: {}", err)));
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Authorization code is missing".to_string()))?;

    let grant = state.oauth.exchange_code(&code).await?;

    session.update(|data| {
        data.access_token = Some(grant.access_token.clone());
        if grant.refresh_token.is_some() {
            data.refresh_token = grant.refresh_token.clone();
        }
    });
    state.tokens.seed(&grant);
    info!(session_id = %session.id(), "Stored OAuth tokens in session");

    let refresh = grant
        .refresh_token
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| "<em>not issued (already granted offline access?)</em>".to_string());

    let body = format!(
        "<h1>Authorization complete</h1>\
         <p>Access token (expires in {} s):</p><pre>{}</pre>\
         <p>Refresh token:</p><pre>{}</pre>\
         <p>Copy the refresh token into WORKDRIVE__ZOHO__REFRESH_TOKEN so the server can mint access tokens on its own.</p>\
         <p><a href=\"/\">Back</a></p>",
        grant.expires_in,
        escape_html(&grant.access_token),
        refresh,
    );
    Ok(Html(page("Authorization complete", &body)))
}
