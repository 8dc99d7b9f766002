use actix_web::{get, post, web, HttpResponse};

use crate::dtos::chat_dtos::{ChatIn, ChatPage};
use crate::handlers::render_page;
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::models::user::UserPublic;

/// GET /chat
#[get("/chat")]
pub async fn chat_page(user: AuthenticatedUser) -> HttpResponse {
    let page = ChatPage {
        current_user: UserPublic::from(&user.user),
        message: None,
        reply: None,
    };
    render_page("Chat", page, false)
}

/// POST /chat
/// No assistant is wired up yet, so the reply is the message itself.
#[post("/chat")]
pub async fn chat(user: AuthenticatedUser, body: web::Form<ChatIn>) -> HttpResponse {
    let message = body.into_inner().message;
    let reply = (!message.trim().is_empty()).then(|| message.clone());
    let page = ChatPage {
        current_user: UserPublic::from(&user.user),
        message: Some(message),
        reply,
    };
    render_page("Chat", page, false)
}
