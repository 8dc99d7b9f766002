use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use thiserror::Error;

use crate::middleware::flash::redirect_with_notice;
use crate::repositories::RepoError;

#[derive(Debug, Error)]
pub enum BlogError {
    /// Unknown user and wrong password look the same from outside.
    #[error("Invalid username or password")]
    AuthenticationFailed,
    #[error("Please log in to access this page.")]
    Unauthenticated,
    #[error("You can only modify your own posts.")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidUpload(String),
    #[error("File is too large (limit is {limit} bytes)")]
    TooLarge { limit: usize },
    #[error("{0}")]
    InvalidInput(String),
    #[error("storage error: {0}")]
    Storage(RepoError),
    #[error("file storage error: {0}")]
    Blob(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for BlogError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Constraint(msg) => BlogError::InvalidInput(msg),
            other => BlogError::Storage(other),
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

/// Error body of the upload endpoint: `{"error": {"message": ...}}`.
#[derive(Serialize)]
pub struct UploadErrorBody {
    pub error: UploadErrorMessage,
}

#[derive(Serialize)]
pub struct UploadErrorMessage {
    pub message: String,
}

impl UploadErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: UploadErrorMessage { message: message.into() },
        }
    }
}

impl ResponseError for BlogError {
    fn status_code(&self) -> StatusCode {
        match self {
            BlogError::AuthenticationFailed | BlogError::Unauthenticated | BlogError::Forbidden => {
                StatusCode::SEE_OTHER
            }
            BlogError::NotFound(_) => StatusCode::NOT_FOUND,
            BlogError::InvalidUpload(_) | BlogError::TooLarge { .. } | BlogError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            BlogError::Storage(_) | BlogError::Blob(_) | BlogError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            BlogError::AuthenticationFailed | BlogError::Unauthenticated => {
                redirect_with_notice("/login", Some(&self.to_string()))
            }
            BlogError::Forbidden => redirect_with_notice("/", Some(&self.to_string())),
            BlogError::InvalidUpload(_) | BlogError::TooLarge { .. } => {
                HttpResponse::BadRequest().json(UploadErrorBody::new(self.to_string()))
            }
            BlogError::NotFound(_) | BlogError::InvalidInput(_) => {
                HttpResponse::build(self.status_code()).json(ApiResponse::error(self.to_string()))
            }
            BlogError::Storage(_) | BlogError::Blob(_) | BlogError::Internal(_) => {
                error!("request failed: {}", self);
                HttpResponse::InternalServerError()
                    .json(ApiResponse::error("Something went wrong. Please try again."))
            }
        }
    }
}
