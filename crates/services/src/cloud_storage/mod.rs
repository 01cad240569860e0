pub mod workdrive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::TokenError;

pub use workdrive::WorkDriveService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudFile {
    pub id: String,
    pub name: String,
    pub file_type: Option<String>,
    pub is_folder: bool,
    pub size: Option<u64>,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudFolder {
    pub id: String,
    pub name: String,
    pub permalink: Option<String>,
}

/// Metadata for a single remote file, as needed by the preview route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    pub name: String,
    pub file_type: Option<String>,
    pub size: Option<u64>,
    pub permalink: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Page {
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1) * self.per_page
    }
}

#[derive(Debug, Error)]
pub enum WorkDriveError {
    #[error("WorkDrive rejected the access token after {attempts} attempts")]
    Unauthorized { attempts: u32 },
    #[error("WorkDrive resource not found")]
    NotFound,
    #[error("WorkDrive returned HTTP {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("WorkDrive request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected WorkDrive response: {0}")]
    InvalidResponse(String),
    #[error("Staged file error: {0}")]
    Io(#[from] std::io::Error),
}
