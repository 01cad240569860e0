use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{Html, Response},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use workdrive_bridge_services::cloud_storage::{CloudFile, Page};

use super::{escape_html, page};
use crate::{error::ApiError, state::AppState};

const MAX_PER_PAGE: u64 = 50;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub uploaded_at: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    #[serde(rename = "fileId")]
    pub file_id: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub preview_url: String,
    pub web_url: String,
    pub download_url: String,
    pub thumbnail_url: Option<String>,
    pub file_type: Option<String>,
    pub size: Option<u64>,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub folder_id: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    MAX_PER_PAGE
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub count: usize,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub files: Vec<CloudFile>,
    pub pagination: Pagination,
}

/// A staged multipart file. The temp file is removed when this is dropped,
/// so every exit path of the upload handler cleans up.
struct StagedUpload {
    file: NamedTempFile,
    file_name: String,
    content_type: String,
}

impl StagedUpload {
    fn remove(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            warn!(path = %path.display(), "Failed to remove staged upload: {}", e);
        }
    }
}

/// POST /api/upload
/// Fields: `file` (binary), optional `folder_id` (text)
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload_dir = PathBuf::from(&state.settings.app.upload_dir);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create upload dir: {}", e)))?;

    let mut staged: Option<StagedUpload> = None;
    let mut folder_id: Option<String> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let file = tempfile::Builder::new()
                    .prefix("upload-")
                    .tempfile_in(&upload_dir)
                    .map_err(|e| ApiError::Internal(format!("Failed to stage upload: {}", e)))?;
                let upload = StagedUpload {
                    file,
                    file_name,
                    content_type,
                };

                let std_file = upload
                    .file
                    .reopen()
                    .map_err(|e| ApiError::Internal(format!("Failed to stage upload: {}", e)))?;
                let mut out = tokio::fs::File::from_std(std_file);
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                {
                    out.write_all(&chunk)
                        .await
                        .map_err(|e| ApiError::Internal(format!("Failed to write file: {}", e)))?;
                }
                out.flush()
                    .await
                    .map_err(|e| ApiError::Internal(format!("Failed to write file: {}", e)))?;

                debug!(path = %upload.file.path().display(), "Staged upload");
                staged = Some(upload);
            }
            "folder_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
                folder_id = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {}
        }
    }

    let staged = staged.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    let parent_id = folder_id.unwrap_or_else(|| state.settings.zoho.folder_id.clone());
    if parent_id.is_empty() {
        return Err(ApiError::BadRequest("No target folder configured".to_string()));
    }

    let result = state
        .workdrive
        .upload(
            staged.file.path(),
            &staged.file_name,
            &staged.content_type,
            &parent_id,
        )
        .await;
    staged.remove();
    let uploaded = result?;

    Ok(Json(UploadResponse {
        success: true,
        file_id: uploaded.id,
        file_name: uploaded.name,
        file_size: uploaded.size,
        uploaded_at: chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /api/preview/{file_id}
pub async fn preview(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let info = state.workdrive.file_info(&file_id).await?;
    let web_url = state.workdrive.web_link(&info.id);

    Ok(Json(PreviewResponse {
        success: true,
        download_url: format!(
            "/api/download/{}?filename={}",
            info.id,
            urlencoding::encode(&info.name)
        ),
        preview_url: info.permalink.unwrap_or_else(|| web_url.clone()),
        web_url,
        file_id: info.id,
        file_name: info.name,
        thumbnail_url: info.thumbnail_url,
        file_type: info.file_type,
        size: info.size,
        created_time: info.created_time,
        modified_time: info.modified_time,
    }))
}

/// GET /api/download/{file_id}?filename=
/// Relays the WorkDrive byte stream without buffering it.
pub async fn download(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(params): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let upstream = state.workdrive.download(&file_id).await?;

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| header::HeaderValue::from_static("application/octet-stream"));
    let content_length = upstream.headers().get(header::CONTENT_LENGTH).cloned();
    let filename = params
        .filename
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| file_id.clone());

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", sanitize_filename(&filename)),
        );
    if let Some(len) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// DELETE /api/file/{file_id}
pub async fn delete(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.workdrive.trash(&file_id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("File {} deleted", file_id),
    })))
}

/// GET /api/files?folder_id=&page=&per_page=
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let folder_id = params
        .folder_id
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| state.settings.zoho.folder_id.clone());
    if folder_id.is_empty() {
        return Err(ApiError::BadRequest("folder_id is required".to_string()));
    }

    let page = Page {
        page: params.page.max(1),
        per_page: params.per_page.clamp(1, MAX_PER_PAGE),
    };
    let files = state.workdrive.list_files(&folder_id, page).await?;
    let count = files.len();

    Ok(Json(ListResponse {
        success: true,
        files,
        pagination: Pagination {
            page: page.page,
            per_page: page.per_page,
            count,
            has_more: count as u64 == page.per_page,
        },
    }))
}

/// GET /api/folders
/// HTML listing of the folders inside the target folder.
pub async fn folders(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let folder_id = &state.settings.zoho.folder_id;
    if folder_id.is_empty() {
        return Err(ApiError::BadRequest("No target folder configured".to_string()));
    }

    let folders = state.workdrive.list_folders(folder_id).await?;

    let mut body = format!("<h1>Folders in {}</h1>", escape_html(folder_id));
    if folders.is_empty() {
        body.push_str("<p>No folders found.</p>");
    } else {
        body.push_str("<ul>");
        for folder in &folders {
            let link = folder
                .permalink
                .clone()
                .unwrap_or_else(|| state.workdrive.web_link(&folder.id));
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a> <code>{}</code></li>",
                escape_html(&link),
                escape_html(&folder.name),
                escape_html(&folder.id),
            ));
        }
        body.push_str("</ul>");
    }

    Ok(Html(page("WorkDrive folders", &body)))
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect()
}
