// Transient one-shot notices carried across a redirect in a cookie.
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, HttpResponseBuilder};

pub const NOTICE_COOKIE: &str = "notice";

/// 303 to `location`, optionally leaving a notice for the next page view.
pub fn redirect_with_notice(location: &str, notice: Option<&str>) -> HttpResponse {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location));
    if let Some(text) = notice {
        let cookie = Cookie::build(NOTICE_COOKIE, text.to_string())
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish();
        // Percent-encoded here, decoded by actix when the cookie is parsed.
        builder.append_header((header::SET_COOKIE, cookie.encoded().to_string()));
    }
    builder.finish()
}

pub fn redirect(location: &str) -> HttpResponse {
    redirect_with_notice(location, None)
}

/// Reads the pending notice. Pair with [`clear_notice`] on the response that
/// displays it.
pub fn peek_notice(req: &HttpRequest) -> Option<String> {
    let cookie = req.cookie(NOTICE_COOKIE)?;
    Some(cookie.value().to_string()).filter(|text| !text.is_empty())
}

pub fn clear_notice(builder: &mut HttpResponseBuilder) {
    let mut removal = Cookie::new(NOTICE_COOKIE, "");
    removal.set_path("/");
    removal.make_removal();
    builder.cookie(removal);
}
