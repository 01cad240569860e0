use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use workdrive_bridge_services::{
    FileSessionStore,
    session::{SessionData, sign_session_id, verify_session_cookie},
};

use crate::{extractors::session::Session, state::AppState};

/// Loads (or starts) the browser session, hands it to the handler and
/// persists it afterwards. The cookie is re-issued on every response so its
/// lifetime rolls with the stored session.
pub async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let settings = &state.settings.session;

    let existing = cookie_value(req.headers(), &settings.cookie_name).and_then(|value| {
        let id = verify_session_cookie(&settings.secret, &value);
        if id.is_none() {
            warn!("Ignoring session cookie with an invalid signature");
        }
        id
    });

    let loaded = match existing {
        Some(id) => match state.sessions.load(&id).await {
            Ok(Some(data)) => Some((id, data)),
            Ok(None) => None,
            Err(e) => {
                warn!(session_id = %id, "Failed to load session: {}", e);
                None
            }
        },
        None => None,
    };
    let (id, data) = loaded.unwrap_or_else(|| (FileSessionStore::new_id(), SessionData::default()));

    let session = Session::new(id, data);
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    if let Err(e) = state.sessions.save(session.id(), &session.data()).await {
        error!(session_id = %session.id(), "Failed to persist session: {}", e);
        return response;
    }

    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        settings.cookie_name,
        sign_session_id(&settings.secret, session.id()),
        state.sessions.ttl_secs(),
    );
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        Err(e) => error!("Invalid session cookie header: {}", e),
    }

    response
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}
