use actix_web::http::header;
use actix_web::{get, post, web, HttpResponse};
use log::{debug, error};

use crate::dtos::upload_dtos::{UploadIn, UploadOut};
use crate::errors::{BlogError, UploadErrorBody};
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::AppState;

/// POST /upload
/// Editor-style upload: `{url, uploaded: true}` on success, otherwise 400
/// with `{error: {message}}`.
#[post("/upload")]
pub async fn upload_file(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Json<UploadIn>,
) -> HttpResponse {
    debug!("upload from user {}: {}", user.user.id, body.file_name);

    let result = match body.data.as_deref() {
        Some(data) => state
            .uploads
            .decode_payload(data)
            .and_then(|bytes| state.uploads.store(&body.file_name, Some(bytes.as_slice()))),
        None => state.uploads.store(&body.file_name, None),
    };

    match result {
        Ok(stored) => HttpResponse::Ok().json(UploadOut {
            url: stored.url,
            uploaded: true,
        }),
        Err(e @ (BlogError::InvalidUpload(_) | BlogError::TooLarge { .. })) => {
            HttpResponse::BadRequest().json(UploadErrorBody::new(e.to_string()))
        }
        Err(e) => {
            error!("upload failed: {}", e);
            HttpResponse::BadRequest().json(UploadErrorBody::new("Failed to save file"))
        }
    }
}

/// GET /uploads/{filename}
#[get("/uploads/{filename}")]
pub async fn serve_upload(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, BlogError> {
    let (bytes, content_type) = state.uploads.retrieve(&path.into_inner())?;
    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .body(bytes))
}
