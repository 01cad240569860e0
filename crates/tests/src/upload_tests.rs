use crate::fixtures::test_app::TestApp;
use reqwest::multipart;
use serde_json::Value;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn hello_form() -> multipart::Form {
    let file_part = multipart::Part::bytes(b"Hello, World!".to_vec())
        .file_name("hello.txt")
        .mime_str("text/plain")
        .unwrap();
    multipart::Form::new().part("file", file_part)
}

fn upload_ok(resource_id: &str, name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "data": [{
            "attributes": {
                "resource_id": resource_id,
                "FileName": name,
                "parent_id": "root-folder",
                "Permalink": format!("https://workdrive.example.test/file/{}", resource_id)
            },
            "type": "files"
        }]
    }))
}

#[tokio::test]
async fn upload_relays_file_and_removes_staged_copy() {
    let app = TestApp::spawn().await;
    app.mount_token_refresh("access-1", 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .and(header("Authorization", "Zoho-oauthtoken access-1"))
        .and(body_string_contains("Hello, World!"))
        .and(body_string_contains("root-folder"))
        .respond_with(upload_ok("res-1", "hello.txt"))
        .expect(1)
        .mount(&app.zoho)
        .await;

    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(hello_form())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["fileId"], "res-1");
    assert_eq!(json["fileName"], "hello.txt");
    assert_eq!(json["fileSize"], 13); // "Hello, World!" = 13 bytes
    assert!(json["uploadedAt"].as_str().unwrap().len() > 0);

    assert!(app.staged_files().is_empty());
}

#[tokio::test]
async fn failed_upload_still_removes_staged_copy() {
    let app = TestApp::spawn().await;
    app.mount_token_refresh("access-1", 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "errors": [{ "id": "F000", "title": "Internal error" }]
        })))
        .expect(1)
        .mount(&app.zoho)
        .await;

    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(hello_form())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 500);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "upstream");
    assert_eq!(json["details"]["errors"][0]["title"], "Internal error");

    assert!(app.staged_files().is_empty());
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let app = TestApp::spawn().await;
    app.mount_token_refresh("access-1", 0).await;

    let form = multipart::Form::new().text("folder_id", "other-folder");
    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["message"], "No file uploaded");
}

#[tokio::test]
async fn upload_gives_up_after_repeated_401() {
    let app = TestApp::spawn().await;
    app.mount_token_refresh("rejected", 3).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&app.zoho)
        .await;

    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(hello_form())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 500);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "upstream_auth");
    assert!(app.staged_files().is_empty());

    let health: Value = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["tokenCached"], false);
}

#[tokio::test]
async fn upload_honours_folder_override() {
    let app = TestApp::spawn().await;
    app.mount_token_refresh("access-1", 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .and(body_string_contains("other-folder"))
        .respond_with(upload_ok("res-2", "hello.txt"))
        .expect(1)
        .mount(&app.zoho)
        .await;

    let resp = app
        .client
        .post(app.url("/api/upload"))
        .multipart(hello_form().text("folder_id", "other-folder"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["fileId"], "res-2");
}

#[tokio::test]
async fn uploaded_file_can_be_previewed() {
    let app = TestApp::spawn().await;
    app.mount_token_refresh("access-1", 1).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/upload"))
        .respond_with(upload_ok("res-9", "hello.txt"))
        .mount(&app.zoho)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/files/res-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "id": "res-9",
                "type": "files",
                "attributes": {
                    "name": "hello.txt",
                    "extn": "txt",
                    "permalink": "https://workdrive.example.test/file/res-9",
                    "storage_info": { "size_in_bytes": 13 }
                }
            }
        })))
        .mount(&app.zoho)
        .await;

    let uploaded: Value = app
        .client
        .post(app.url("/api/upload"))
        .multipart(hello_form())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(uploaded["success"], true);
    let file_id = uploaded["fileId"].as_str().unwrap();

    let preview: Value = app
        .client
        .get(app.url(&format!("/api/preview/{}", file_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(preview["success"], true);
    assert!(preview["preview_url"].is_string());

    let health: Value = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["tokenCached"], true);
}
