use actix_web::cookie::{Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use log::debug;
use uuid::Uuid;

use crate::errors::BlogError;
use crate::models::user::User;
use crate::AppState;

pub const SESSION_COOKIE: &str = "session";

/// The logged-in user behind the request's session cookie. Handlers that take
/// this extractor redirect anonymous visitors to `/login`.
pub struct AuthenticatedUser {
    pub user: User,
    pub session_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
    type Error = BlogError;
    type Future = LocalBoxFuture<'static, Result<AuthenticatedUser, BlogError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = req.cookie(SESSION_COOKIE).map(|c| c.value().to_string());

        Box::pin(async move {
            let state = state.ok_or_else(|| BlogError::Internal("application state not registered".into()))?;
            let Some(token) = token else {
                debug!("no session cookie");
                return Err(BlogError::Unauthenticated);
            };

            match state.identity.current_user(&token).await? {
                Some(session) => Ok(AuthenticatedUser {
                    user: session.user,
                    session_id: session.id,
                }),
                None => Err(BlogError::Unauthenticated),
            }
        })
    }
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

pub fn session_removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}
