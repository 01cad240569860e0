use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use workdrive_bridge_config::Settings;

use super::{CloudFile, CloudFolder, FileInfo, Page, UploadedFile, WorkDriveError};
use crate::token::TokenProvider;

/// Trash status understood by the WorkDrive files API.
const STATUS_TRASHED: &str = "51";

pub struct WorkDriveService {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
    api_url: String,
    download_url: String,
    web_url: String,
    max_auth_retries: u32,
    /// Total budget for calls whose response is read in full. Streamed
    /// transfers are bounded only by the client's idle read timeout.
    request_timeout: Duration,
}

impl WorkDriveService {
    pub fn new(client: Client, tokens: Arc<dyn TokenProvider>, settings: &Settings) -> Self {
        Self {
            client,
            tokens,
            api_url: settings.zoho.api_url.trim_end_matches('/').to_string(),
            download_url: settings.zoho.download_url.trim_end_matches('/').to_string(),
            web_url: settings.zoho.web_url.trim_end_matches('/').to_string(),
            max_auth_retries: settings.http.max_auth_retries,
            request_timeout: Duration::from_secs(settings.http.timeout_secs),
        }
    }

    /// Browser link for a remote file.
    pub fn web_link(&self, file_id: &str) -> String {
        format!("{}/file/{}", self.web_url, file_id)
    }

    /// Issues one authorized call, re-issuing it with a fresh token while the
    /// upstream answers 401 and retries remain. 404 and other failures are
    /// returned immediately.
    pub async fn send_authorized<F>(
        &self,
        operation: &str,
        build: F,
    ) -> Result<Response, WorkDriveError>
    where
        F: Fn() -> Result<RequestBuilder, WorkDriveError>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let token = self.tokens.get().await?;
            let resp = build()?
                .header(AUTHORIZATION, format!("Zoho-oauthtoken {}", token))
                .send()
                .await?;

            let status = resp.status();
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate();
                if attempt <= self.max_auth_retries {
                    warn!(operation, attempt, "WorkDrive returned 401, retrying with a fresh token");
                    continue;
                }
                error!(operation, attempts = attempt, "WorkDrive kept rejecting the access token");
                return Err(WorkDriveError::Unauthorized { attempts: attempt });
            }
            if status == StatusCode::NOT_FOUND {
                return Err(WorkDriveError::NotFound);
            }
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
                error!(operation, status = status.as_u16(), %body, "WorkDrive call failed");
                return Err(WorkDriveError::Upstream {
                    status: status.as_u16(),
                    body,
                });
            }
            return Ok(resp);
        }
    }

    /// Relays a staged local file into `parent_id`.
    pub async fn upload(
        &self,
        staged: &Path,
        file_name: &str,
        content_type: &str,
        parent_id: &str,
    ) -> Result<UploadedFile, WorkDriveError> {
        let bytes = Bytes::from(tokio::fs::read(staged).await?);
        let size = bytes.len() as u64;
        let url = format!("{}/upload", self.api_url);

        let resp = self
            .send_authorized("upload", || {
                let part = Part::stream_with_length(bytes.clone(), size)
                    .file_name(file_name.to_string())
                    .mime_str(content_type)?;
                let form = Form::new()
                    .part("content", part)
                    .text("parent_id", parent_id.to_string())
                    .text("override-name-exist", "true");
                Ok(self.client.post(&url).multipart(form))
            })
            .await?;

        let json: Value = resp.json().await?;
        let entry = match &json["data"] {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        };
        let attrs = &entry["attributes"];
        let id = attr_str(attrs, "resource_id")
            .or_else(|| entry["id"].as_str().map(str::to_string))
            .ok_or_else(|| {
                WorkDriveError::InvalidResponse(format!("upload response without id: {}", json))
            })?;

        info!(file_id = %id, file_name, size, "Uploaded file to WorkDrive");
        Ok(UploadedFile {
            id,
            name: attr_str(attrs, "FileName").unwrap_or_else(|| file_name.to_string()),
            size,
        })
    }

    pub async fn file_info(&self, file_id: &str) -> Result<FileInfo, WorkDriveError> {
        let url = format!("{}/files/{}", self.api_url, file_id);
        let resp = self
            .send_authorized("file_info", || {
                Ok(self.client.get(&url).timeout(self.request_timeout))
            })
            .await?;

        let json: Value = resp.json().await?;
        let data = &json["data"];
        let attrs = &data["attributes"];
        Ok(FileInfo {
            id: data["id"].as_str().unwrap_or(file_id).to_string(),
            name: attr_str(attrs, "name").unwrap_or_default(),
            file_type: attr_str(attrs, "extn").or_else(|| attr_str(attrs, "type")),
            size: attr_u64(&attrs["storage_info"], "size_in_bytes"),
            permalink: attr_str(attrs, "permalink"),
            thumbnail_url: attr_str(attrs, "thumbnail_url"),
            created_time: attr_str(attrs, "created_time"),
            modified_time: attr_str(attrs, "modified_time"),
        })
    }

    /// Returns the upstream response so the caller can relay the body as a
    /// stream. No total timeout applies, so long transfers are not cut off.
    pub async fn download(&self, file_id: &str) -> Result<Response, WorkDriveError> {
        let url = format!("{}/{}", self.download_url, file_id);
        self.send_authorized("download", || Ok(self.client.get(&url)))
            .await
    }

    /// Moves a remote file to the WorkDrive trash.
    pub async fn trash(&self, file_id: &str) -> Result<(), WorkDriveError> {
        let url = format!("{}/files/{}", self.api_url, file_id);
        let body = serde_json::json!({
            "data": {
                "attributes": { "status": STATUS_TRASHED },
                "type": "files",
            }
        });
        self.send_authorized("trash", || {
            Ok(self
                .client
                .patch(&url)
                .json(&body)
                .timeout(self.request_timeout))
        })
            .await?;
        info!(file_id, "Trashed WorkDrive file");
        Ok(())
    }

    pub async fn list_files(
        &self,
        folder_id: &str,
        page: Page,
    ) -> Result<Vec<CloudFile>, WorkDriveError> {
        let url = format!("{}/files/{}/files", self.api_url, folder_id);
        let resp = self
            .send_authorized("list_files", || {
                Ok(self
                    .client
                    .get(&url)
                    .query(&[
                        ("page[limit]", page.per_page),
                        ("page[offset]", page.offset()),
                    ])
                    .timeout(self.request_timeout))
            })
            .await?;

        let json: Value = resp.json().await?;
        Ok(entries(&json).map(to_cloud_file).collect())
    }

    pub async fn list_folders(&self, folder_id: &str) -> Result<Vec<CloudFolder>, WorkDriveError> {
        let url = format!("{}/files/{}/files", self.api_url, folder_id);
        let resp = self
            .send_authorized("list_folders", || {
                Ok(self
                    .client
                    .get(&url)
                    .query(&[("filter[type]", "folder")])
                    .timeout(self.request_timeout))
            })
            .await?;

        let json: Value = resp.json().await?;
        Ok(entries(&json)
            .map(to_cloud_file)
            .filter(|f| f.is_folder)
            .map(|f| CloudFolder {
                id: f.id,
                name: f.name,
                permalink: f.permalink,
            })
            .collect())
    }
}

fn entries(json: &Value) -> impl Iterator<Item = &Value> {
    json["data"].as_array().into_iter().flatten()
}

fn to_cloud_file(entry: &Value) -> CloudFile {
    let attrs = &entry["attributes"];
    let file_type = attr_str(attrs, "type");
    let is_folder = attrs["is_folder"]
        .as_bool()
        .unwrap_or_else(|| file_type.as_deref() == Some("folder"));

    CloudFile {
        id: entry["id"].as_str().unwrap_or_default().to_string(),
        name: attr_str(attrs, "name").unwrap_or_default(),
        file_type: attr_str(attrs, "extn").or(file_type),
        is_folder,
        size: attr_u64(&attrs["storage_info"], "size_in_bytes"),
        created_time: attr_str(attrs, "created_time"),
        modified_time: attr_str(attrs, "modified_time"),
        permalink: attr_str(attrs, "permalink"),
    }
}

fn attr_str(attrs: &Value, key: &str) -> Option<String> {
    attrs[key].as_str().map(str::to_string)
}

// WorkDrive sends sizes both as numbers and as numeric strings.
fn attr_u64(attrs: &Value, key: &str) -> Option<u64> {
    match &attrs[key] {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
