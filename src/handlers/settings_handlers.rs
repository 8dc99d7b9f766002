use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::info;

use crate::dtos::settings_dtos::{SettingsForm, SettingsPage};
use crate::errors::BlogError;
use crate::handlers::render_page;
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::middleware::flash::{peek_notice, redirect_with_notice};
use crate::models::user::UserPublic;
use crate::services::settings_service::ImageUpload;
use crate::AppState;

/// GET /settings
#[get("/settings")]
pub async fn settings_page(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, BlogError> {
    let settings = state.settings.get().await?;
    let notice = peek_notice(&req);
    let shown = notice.is_some();
    let page = SettingsPage {
        settings,
        current_user: UserPublic::from(&user.user),
        notice,
    };
    Ok(render_page("Settings retrieved successfully", page, shown))
}

/// POST /settings
/// Upload and input problems come back to the settings page as a notice.
#[post("/settings")]
pub async fn update_settings(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Form<SettingsForm>,
) -> Result<HttpResponse, BlogError> {
    let form = body.into_inner();

    let bytes = match form.head_image_data.as_deref() {
        Some(data) if form.has_image() => match state.uploads.decode_payload(data) {
            Ok(bytes) => Some(bytes),
            Err(e) => return Ok(redirect_with_notice("/settings", Some(&e.to_string()))),
        },
        _ => None,
    };
    let image = match (bytes.as_deref(), form.head_image_name.as_deref()) {
        (Some(bytes), Some(file_name)) => Some(ImageUpload { file_name, bytes }),
        _ => None,
    };
    let result = state.settings.update(form.to_update(), image).await;

    match result {
        Ok(_) => {
            info!("user {} updated settings", user.user.id);
            Ok(redirect_with_notice("/settings", Some("Settings updated successfully")))
        }
        Err(e @ (BlogError::InvalidUpload(_) | BlogError::TooLarge { .. } | BlogError::InvalidInput(_))) => {
            Ok(redirect_with_notice("/settings", Some(&e.to_string())))
        }
        Err(e) => Err(e),
    }
}
