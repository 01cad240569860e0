use reqwest::Client;
use std::time::Duration;
use workdrive_bridge_config::HttpSettings;

/// Shared outbound client.
///
/// Only connection setup and idle reads are bounded here; a total budget
/// would also cut off streamed downloads and large upload relays. Calls that
/// read a whole response set their own per-request timeout.
pub fn build_client(settings: &HttpSettings) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .read_timeout(Duration::from_secs(settings.idle_timeout_secs))
        .user_agent(concat!("workdrive-bridge/", env!("CARGO_PKG_VERSION")))
        .build()
}
