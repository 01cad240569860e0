use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session id")]
    InvalidId,
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Per-browser state persisted between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    data: SessionData,
    expires_at: DateTime<Utc>,
}

/// Stores one JSON file per session id. Expiry is rolling: every `save`
/// pushes it `ttl` into the future.
pub struct FileSessionStore {
    dir: PathBuf,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            ttl: TimeDelta::seconds(ttl_secs as i64),
            clock,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub async fn init(&self) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub async fn load(&self, id: &str) -> Result<Option<SessionData>, SessionError> {
        let path = self.path(id)?;
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: SessionRecord = serde_json::from_slice(&raw)?;
        if record.expires_at <= self.clock.now() {
            debug!(session_id = id, "Dropping expired session");
            self.destroy(id).await?;
            return Ok(None);
        }
        Ok(Some(record.data))
    }

    pub async fn save(&self, id: &str, data: &SessionData) -> Result<(), SessionError> {
        let path = self.path(id)?;
        let record = SessionRecord {
            data: data.clone(),
            expires_at: self.clock.now() + self.ttl,
        };
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", id, uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, serde_json::to_vec(&record)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub async fn destroy(&self, id: &str) -> Result<(), SessionError> {
        match tokio::fs::remove_file(self.path(id)?).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Deletes every expired or unreadable session file. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<usize, SessionError> {
        let now = self.clock.now();
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let expired = match tokio::fs::read(&path).await {
                Ok(raw) => serde_json::from_slice::<SessionRecord>(&raw)
                    .map(|r| r.expires_at <= now)
                    .unwrap_or(true),
                Err(_) => false,
            };
            if expired && tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn path(&self, id: &str) -> Result<PathBuf, SessionError> {
        if !is_valid_id(id) {
            return Err(SessionError::InvalidId);
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// Cookie value for a session id: `<id>.<hex hmac>`.
pub fn sign_session_id(secret: &str, id: &str) -> String {
    format!("{}.{}", id, hex::encode(mac(secret, id).finalize().into_bytes()))
}

/// Returns the session id if the cookie value carries a valid signature.
pub fn verify_session_cookie(secret: &str, value: &str) -> Option<String> {
    let (id, signature) = value.rsplit_once('.')?;
    let signature = hex::decode(signature).ok()?;
    mac(secret, id).verify_slice(&signature).ok()?;
    is_valid_id(id).then(|| id.to_string())
}

fn mac(secret: &str, id: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(id.as_bytes());
    mac
}
