use std::net::SocketAddr;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::net::TcpListener;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use workdrive_bridge_api::{build_router, state::AppState};
use workdrive_bridge_config::{
    AppSettings, HttpSettings, SessionSettings, Settings, ZohoSettings,
};

/// A running bridge whose Zoho endpoints all point at a local mock server.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub settings: Settings,
    pub client: reqwest::Client,
    pub zoho: MockServer,
    upload_dir: TempDir,
    session_dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_settings(|_| {}).await
    }

    /// Spawn a test server with customized settings.
    ///
    /// The `mutator` closure receives a `&mut Settings` after defaults are applied,
    /// allowing tests to tweak specific fields (e.g. drop the refresh token).
    pub async fn spawn_with_settings(mutator: impl FnOnce(&mut Settings)) -> Self {
        let zoho = MockServer::start().await;
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
        let session_dir = tempfile::tempdir().expect("Failed to create session dir");

        let mut settings = test_settings(&zoho, &upload_dir, &session_dir);
        mutator(&mut settings);

        let app_state = AppState::new(settings.clone()).expect("Failed to create AppState");
        app_state
            .sessions
            .init()
            .await
            .expect("Failed to create session dir");
        let app = build_router(app_state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            addr,
            base_url,
            settings,
            client,
            zoho,
            upload_dir,
            session_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Serves `token` from the refresh-token grant, expecting exactly `calls` refreshes.
    pub async fn mount_token_refresh(&self, token: &str, calls: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/v2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": token,
                "api_domain": "https://www.zohoapis.com",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(calls)
            .mount(&self.zoho)
            .await;
    }

    /// Files currently staged in the upload directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        list_dir(self.upload_dir.path())
    }

    /// Session files currently persisted.
    pub fn session_files(&self) -> Vec<PathBuf> {
        list_dir(self.session_dir.path())
            .into_iter()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect()
    }

    /// Number of requests the mock Zoho received for `method` + `path`.
    pub async fn zoho_calls(&self, method: &str, path: &str) -> usize {
        self.zoho
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == method && r.url.path() == path)
            .count()
    }
}

fn list_dir(dir: &std::path::Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}

fn test_settings(zoho: &MockServer, upload_dir: &TempDir, session_dir: &TempDir) -> Settings {
    Settings {
        app: AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec![],
            upload_dir: upload_dir.path().display().to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        },
        session: SessionSettings {
            secret: "test-session-secret".to_string(),
            dir: session_dir.path().display().to_string(),
            ttl_secs: 86400,
            cookie_name: "workdrive.sid".to_string(),
        },
        zoho: ZohoSettings {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            refresh_token: Some("test-refresh-token".to_string()),
            folder_id: "root-folder".to_string(),
            accounts_url: zoho.uri(),
            api_url: format!("{}/api/v1", zoho.uri()),
            download_url: format!("{}/download", zoho.uri()),
            web_url: "https://workdrive.example.test".to_string(),
            scope: "WorkDrive.files.ALL".to_string(),
        },
        http: HttpSettings {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            idle_timeout_secs: 5,
            max_auth_retries: 2,
            token_safety_margin_secs: 60,
        },
    }
}
