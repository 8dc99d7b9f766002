use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{error, info};

use crate::dtos::auth_dtos::{LoginIn, LoginPage};
use crate::errors::BlogError;
use crate::handlers::render_page;
use crate::middleware::auth_extractor::{session_cookie, session_removal_cookie, AuthenticatedUser};
use crate::middleware::flash::{peek_notice, redirect_with_notice};
use crate::models::user::UserPublic;
use crate::AppState;

/// GET /login
#[get("/login")]
pub async fn login_page(req: HttpRequest, user: Option<AuthenticatedUser>) -> HttpResponse {
    let notice = peek_notice(&req);
    let shown = notice.is_some();
    let page = LoginPage {
        notice,
        current_user: user.as_ref().map(|u| UserPublic::from(&u.user)),
    };
    render_page("Login", page, shown)
}

/// POST /login
/// Success sets the session cookie and goes home; any failure goes back to
/// the login page with the same notice.
#[post("/login")]
pub async fn login(state: web::Data<AppState>, body: web::Form<LoginIn>) -> HttpResponse {
    match state.identity.authenticate(&body.username, &body.password).await {
        Ok(session) => HttpResponse::SeeOther()
            .insert_header((header::LOCATION, "/"))
            .cookie(session_cookie(&session.token))
            .finish(),
        Err(e @ BlogError::AuthenticationFailed) => {
            info!("failed login attempt");
            redirect_with_notice("/login", Some(&e.to_string()))
        }
        Err(e) => {
            error!("login failed: {}", e);
            redirect_with_notice("/login", Some("Login is unavailable right now. Please try again."))
        }
    }
}

/// GET /logout
#[get("/logout")]
pub async fn logout(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, BlogError> {
    state.identity.end_session(user.session_id).await?;
    info!("user {} logged out", user.user.id);
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .cookie(session_removal_cookie())
        .finish())
}
