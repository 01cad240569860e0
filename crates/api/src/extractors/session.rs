use axum::{extract::FromRequestParts, http::request::Parts};
use parking_lot::Mutex;
use std::sync::Arc;
use workdrive_bridge_services::session::SessionData;

use crate::error::ApiError;

/// Browser session loaded by the session middleware. Cloning shares the
/// underlying data, so handler changes are persisted after the response.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    data: Arc<Mutex<SessionData>>,
}

impl Session {
    pub fn new(id: String, data: SessionData) -> Self {
        Self {
            id,
            data: Arc::new(Mutex::new(data)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> SessionData {
        self.data.lock().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut SessionData)) {
        f(&mut self.data.lock());
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("Session layer is not installed".to_string()))
    }
}
