use actix_web::{get, post, web, HttpRequest, HttpResponse};

use crate::dtos::post_dtos::{IndexPage, PostForm, PostFormPage, PostOut};
use crate::errors::BlogError;
use crate::handlers::render_page;
use crate::middleware::auth_extractor::AuthenticatedUser;
use crate::middleware::flash::{peek_notice, redirect, redirect_with_notice};
use crate::models::user::UserPublic;
use crate::AppState;

/// GET /
/// Every post newest-first, the top ten, and the site settings.
#[get("/")]
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, BlogError> {
    let posts = state.posts.list().await?;
    let top_posts = state.posts.top().await?;
    let settings = state.settings.get().await?;

    let notice = peek_notice(&req);
    let shown = notice.is_some();
    let page = IndexPage {
        settings,
        posts: posts.into_iter().map(PostOut::from).collect(),
        top_posts: top_posts.into_iter().map(PostOut::from).collect(),
        current_user: user.as_ref().map(|u| UserPublic::from(&u.user)),
        notice,
    };
    Ok(render_page("Posts retrieved successfully", page, shown))
}

/// GET /post/new
#[get("/post/new")]
pub async fn new_post_page(req: HttpRequest, user: AuthenticatedUser) -> HttpResponse {
    let notice = peek_notice(&req);
    let shown = notice.is_some();
    let page = PostFormPage {
        post: None,
        current_user: UserPublic::from(&user.user),
        notice,
    };
    render_page("New post", page, shown)
}

/// POST /post/new
#[post("/post/new")]
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    body: web::Form<PostForm>,
) -> Result<HttpResponse, BlogError> {
    match state.posts.create(&user.user, &body.title, &body.content).await {
        Ok(_) => Ok(redirect("/")),
        Err(e @ BlogError::InvalidInput(_)) => Ok(redirect_with_notice("/post/new", Some(&e.to_string()))),
        Err(e) => Err(e),
    }
}

/// GET /post/{id}/edit
#[get("/post/{id}/edit")]
pub async fn edit_post_page(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, BlogError> {
    let post = state.posts.get_owned(&user.user, path.into_inner()).await?;

    let notice = peek_notice(&req);
    let shown = notice.is_some();
    let page = PostFormPage {
        post: Some(PostOut::from_post(post, Some(user.user.username.clone()))),
        current_user: UserPublic::from(&user.user),
        notice,
    };
    Ok(render_page("Edit post", page, shown))
}

/// POST /post/{id}/edit
#[post("/post/{id}/edit")]
pub async fn edit_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
    body: web::Form<PostForm>,
) -> Result<HttpResponse, BlogError> {
    let post_id = path.into_inner();
    match state.posts.edit(&user.user, post_id, &body.title, &body.content).await {
        Ok(_) => Ok(redirect("/")),
        Err(e @ BlogError::InvalidInput(_)) => Ok(redirect_with_notice(
            &format!("/post/{}/edit", post_id),
            Some(&e.to_string()),
        )),
        Err(e) => Err(e),
    }
}

/// POST /post/{id}/delete
#[post("/post/{id}/delete")]
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, BlogError> {
    state.posts.delete(&user.user, path.into_inner()).await?;
    Ok(redirect_with_notice("/", Some("Post deleted.")))
}
