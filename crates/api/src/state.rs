use std::sync::Arc;
use workdrive_bridge_config::Settings;
use workdrive_bridge_services::{
    FileSessionStore, OAuthService, TokenProvider, WorkDriveService, ZohoTokenCache,
    clock::default_clock, http::build_client,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub tokens: Arc<dyn TokenProvider>,
    pub workdrive: Arc<WorkDriveService>,
    pub oauth: Arc<OAuthService>,
    pub sessions: Arc<FileSessionStore>,
}

impl AppState {
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let client = build_client(&settings.http)?;
        let tokens: Arc<dyn TokenProvider> = Arc::new(ZohoTokenCache::new(
            client.clone(),
            &settings.zoho,
            settings.http.token_safety_margin_secs,
            default_clock(),
        ));
        Ok(Self::with_token_provider(settings, client, tokens))
    }

    /// Builds the state around an externally supplied token provider.
    pub fn with_token_provider(
        settings: Settings,
        client: reqwest::Client,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let workdrive = Arc::new(WorkDriveService::new(
            client.clone(),
            Arc::clone(&tokens),
            &settings,
        ));
        let oauth = Arc::new(OAuthService::new(client, &settings.zoho));
        let sessions = Arc::new(FileSessionStore::new(
            &settings.session.dir,
            settings.session.ttl_secs,
            default_clock(),
        ));

        Self {
            settings,
            tokens,
            workdrive,
            oauth,
            sessions,
        }
    }
}
