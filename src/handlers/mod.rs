pub mod ai_tools_handlers;
pub mod auth_handlers;
pub mod chat_handlers;
pub mod post_handlers;
pub mod settings_handlers;
pub mod upload_handlers;

use actix_web::HttpResponse;
use serde::Serialize;

use crate::errors::ApiResponse;
use crate::middleware::flash::clear_notice;

/// 200 with the page's view model. A notice that was displayed gets cleared.
pub(crate) fn render_page<T: Serialize>(message: &str, data: T, notice_shown: bool) -> HttpResponse {
    let mut builder = HttpResponse::Ok();
    if notice_shown {
        clear_notice(&mut builder);
    }
    builder.json(ApiResponse::success(message, data))
}
