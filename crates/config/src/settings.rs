use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub session: SessionSettings,
    pub zoho: ZohoSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Directory where uploads are staged before being relayed to WorkDrive.
    pub upload_dir: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    pub secret: String,
    pub dir: String,
    pub ttl_secs: u64,
    pub cookie_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZohoSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub refresh_token: Option<String>,
    /// Target WorkDrive folder for uploads and listings.
    pub folder_id: String,
    pub accounts_url: String,
    pub api_url: String,
    pub download_url: String,
    pub web_url: String,
    pub scope: String,
}

impl ZohoSettings {
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSettings {
    /// Total budget for calls whose response is read in full.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Longest pause allowed between reads, streamed transfers included.
    pub idle_timeout_secs: u64,
    /// Additional attempts after an upstream 401.
    pub max_auth_retries: u32,
    pub token_safety_margin_secs: i64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("WORKDRIVE"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("app.upload_dir", "uploads")?
            .set_default("app.max_upload_bytes", 100 * 1024 * 1024)?
            .set_default("session.secret", "default_secret_key")?
            .set_default("session.dir", "sessions")?
            .set_default("session.ttl_secs", 86400)?
            .set_default("session.cookie_name", "workdrive.sid")?
            .set_default("zoho.client_id", "")?
            .set_default("zoho.client_secret", "")?
            .set_default("zoho.redirect_uri", "http://localhost:3000/callback")?
            .set_default("zoho.refresh_token", None::<String>)?
            .set_default("zoho.folder_id", "")?
            .set_default("zoho.accounts_url", "https://accounts.zoho.com")?
            .set_default("zoho.api_url", "https://workdrive.zoho.com/api/v1")?
            .set_default(
                "zoho.download_url",
                "https://download.zoho.com/v1/workdrive/download",
            )?
            .set_default("zoho.web_url", "https://workdrive.zoho.com")?
            .set_default("zoho.scope", "WorkDrive.files.ALL,WorkDrive.workspace.ALL")?
            .set_default("http.timeout_secs", 60)?
            .set_default("http.connect_timeout_secs", 10)?
            .set_default("http.idle_timeout_secs", 30)?
            .set_default("http.max_auth_retries", 2)?
            .set_default("http.token_safety_margin_secs", 60)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
