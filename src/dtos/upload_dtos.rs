use serde::{Deserialize, Serialize};

/// Body of `POST /upload`.
#[derive(Deserialize)]
pub struct UploadIn {
    #[serde(default)]
    pub file_name: String,
    /// base64, optionally with a `data:<type>;base64,` prefix
    pub data: Option<String>,
}

#[derive(Serialize)]
pub struct UploadOut {
    pub url: String,
    pub uploaded: bool,
}
