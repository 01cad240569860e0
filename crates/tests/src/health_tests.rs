use crate::fixtures::test_app::TestApp;
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn health_reports_configuration_without_secrets() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let text = resp.text().await.unwrap();
    assert!(!text.contains("test-client-secret"));
    assert!(!text.contains("test-refresh-token"));

    let json: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["tokenCached"], false);
    assert_eq!(json["env"]["clientId"], true);
    assert_eq!(json["env"]["clientSecret"], true);
    assert_eq!(json["env"]["refreshToken"], true);
    assert_eq!(json["env"]["folderId"], true);
}

#[tokio::test]
async fn health_reports_missing_credentials() {
    let app = TestApp::spawn_with_settings(|s| {
        s.zoho.refresh_token = None;
        s.zoho.folder_id = String::new();
    })
    .await;

    let json: Value = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["env"]["refreshToken"], false);
    assert_eq!(json["env"]["folderId"], false);
}

#[tokio::test]
async fn token_is_cached_after_a_successful_call() {
    let app = TestApp::spawn().await;
    app.mount_token_refresh("access-1", 1).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/root-folder/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
        .mount(&app.zoho)
        .await;

    let resp = app.client.get(app.url("/api/files")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let json: Value = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["tokenCached"], true);
}
