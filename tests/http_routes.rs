use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};

use quill_blog::config::{AppConfig, StoreKind};
use quill_blog::repositories::MemoryStore;
use quill_blog::services::clock::SystemClock;
use quill_blog::{configure, AppState};

async fn setup(dir: &tempfile::TempDir, max_upload_bytes: usize) -> (AppState, AppConfig) {
    let config = AppConfig {
        secret_key: "integration-secret".to_string(),
        max_upload_bytes,
        upload_dir: dir.path().to_path_buf(),
        store: StoreKind::Memory,
        ..AppConfig::default()
    };
    let state = AppState::build(&config, Arc::new(MemoryStore::new()), Arc::new(SystemClock)).unwrap();
    quill_blog::bootstrap::seed(&state, &config).await.unwrap();
    state.identity.ensure_account("bob", "hunter2").await.unwrap();
    (state, config)
}

macro_rules! app {
    ($state:expr, $config:expr) => {{
        let config = $config.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(move |cfg| configure(cfg, &config)),
        )
        .await
    }};
}

macro_rules! login {
    ($app:expr, $user:expr, $pass:expr) => {{
        let req = test::TestRequest::post()
            .uri("/login")
            .set_form([("username", $user), ("password", $pass)])
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/");
        resp.response()
            .cookies()
            .find(|c| c.name() == "session")
            .expect("session cookie")
            .into_owned()
    }};
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn notice<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "notice")
        .map(|c| c.value().to_string())
}

#[actix_web::test]
async fn post_lifecycle_through_index() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let session = login!(app, "admin", "admin");

    let req = test::TestRequest::post()
        .uri("/post/new")
        .cookie(session.clone())
        .set_form([("title", "Hello"), ("content", "World")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    let first = &body["data"]["posts"][0];
    assert_eq!(first["title"], "Hello");
    assert_eq!(first["author"], "admin");
    assert_eq!(first["content_html"], "<p>World</p>\n");
    assert_eq!(body["data"]["top_posts"][0]["title"], "Hello");
    assert_eq!(body["data"]["settings"]["blog_title"], "My Blog");
    let id = first["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/delete", id))
        .cookie(session)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(body["data"]["posts"], json!([]));
}

#[actix_web::test]
async fn anonymous_visitors_are_sent_to_login() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);

    for uri in ["/post/new", "/settings", "/chat", "/logout", "/post/1/edit"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&resp), "/login", "{}", uri);
        assert_eq!(notice(&resp).as_deref(), Some("Please log in to access this page."));
    }
}

#[actix_web::test]
async fn failed_login_is_uniform_and_notice_is_one_shot() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);

    let mut notices = Vec::new();
    for (user, pass) in [("admin", "wrong"), ("nobody", "admin")] {
        let req = test::TestRequest::post()
            .uri("/login")
            .set_form([("username", user), ("password", pass)])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/login");
        assert!(resp.response().cookies().all(|c| c.name() != "session"));
        notices.push(notice(&resp));
    }
    assert_eq!(notices[0].as_deref(), Some("Invalid username or password"));
    assert_eq!(notices[0], notices[1]);

    let req = test::TestRequest::get()
        .uri("/login")
        .cookie(Cookie::new("notice", "Invalid username or password"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cleared = resp.response().cookies().find(|c| c.name() == "notice").unwrap();
    assert_eq!(cleared.value(), "");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["notice"], "Invalid username or password");
}

#[actix_web::test]
async fn only_the_author_can_edit_or_delete() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let admin = login!(app, "admin", "admin");
    let bob = login!(app, "bob", "hunter2");

    let req = test::TestRequest::post()
        .uri("/post/new")
        .cookie(admin.clone())
        .set_form([("title", "Mine"), ("content", "original")])
        .to_request();
    test::call_service(&app, req).await;
    let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    let id = body["data"]["posts"][0]["id"].as_i64().unwrap();

    let edit_page = test::TestRequest::get()
        .uri(&format!("/post/{}/edit", id))
        .cookie(bob.clone())
        .to_request();
    let edit = test::TestRequest::post()
        .uri(&format!("/post/{}/edit", id))
        .cookie(bob.clone())
        .set_form([("title", "Hijacked"), ("content", "x")])
        .to_request();
    let delete = test::TestRequest::post()
        .uri(&format!("/post/{}/delete", id))
        .cookie(bob)
        .to_request();
    for req in [edit_page, edit, delete] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/");
        assert_eq!(notice(&resp).as_deref(), Some("You can only modify your own posts."));
    }

    let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(body["data"]["posts"][0]["title"], "Mine");
    assert_eq!(body["data"]["posts"][0]["content"], "original");

    let req = test::TestRequest::post()
        .uri(&format!("/post/{}/edit", id))
        .cookie(admin.clone())
        .set_form([("title", "Mine, edited"), ("content", "updated")])
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);

    let req = test::TestRequest::get()
        .uri(&format!("/post/{}/edit", id))
        .cookie(admin)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["post"]["title"], "Mine, edited");
}

#[actix_web::test]
async fn editing_a_missing_post_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let admin = login!(app, "admin", "admin");

    let req = test::TestRequest::get().uri("/post/999/edit").cookie(admin).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn upload_stores_and_serves_files() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let session = login!(app, "admin", "admin");

    let payload = json!({
        "file_name": "my photo.png",
        "data": format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(b"not really a png")),
    });
    let mut urls = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/upload")
            .cookie(session.clone())
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["uploaded"], true);
        urls.push(body["url"].as_str().unwrap().to_string());
    }
    assert_ne!(urls[0], urls[1]);
    assert!(urls[0].starts_with("/uploads/"));
    assert!(urls[0].ends_with("_my_photo.png"));

    let resp = test::call_service(&app, test::TestRequest::get().uri(&urls[0]).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(test::read_body(resp).await, &b"not really a png"[..]);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/uploads/missing.png").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn long_file_names_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let session = login!(app, "admin", "admin");
    let data = general_purpose::STANDARD.encode(b"img");

    let payload = json!({ "file_name": format!("{}.png", "b".repeat(300)), "data": data });
    let req = test::TestRequest::post()
        .uri("/upload")
        .cookie(session.clone())
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["url"].as_str().unwrap().ends_with(".png"));

    let image_name = format!("{}.png", "a".repeat(250));
    let req = test::TestRequest::post()
        .uri("/settings")
        .cookie(session.clone())
        .set_form([
            ("blog_title", "Field Notes"),
            ("head_image_name", image_name.as_str()),
            ("head_image_data", data.as_str()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(notice(&resp).as_deref(), Some("Settings updated successfully"));

    let req = test::TestRequest::get().uri("/settings").cookie(session).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let head_image = body["data"]["settings"]["head_image"].as_str().unwrap();
    assert!(head_image.len() <= 200);
    let resp = test::call_service(&app, test::TestRequest::get().uri(head_image).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn svg_uploads_are_served_as_downloads() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let session = login!(app, "admin", "admin");

    let payload = json!({
        "file_name": "logo.svg",
        "data": general_purpose::STANDARD.encode(b"<svg onload=\"alert(1)\"/>"),
    });
    let req = test::TestRequest::post()
        .uri("/upload")
        .cookie(session)
        .set_json(&payload)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let url = body["url"].as_str().unwrap();

    let resp = test::call_service(&app, test::TestRequest::get().uri(url).to_request()).await;
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "application/octet-stream");
    assert_eq!(resp.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
}

#[actix_web::test]
async fn upload_rejects_empty_name_and_oversized_blob() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 16).await;
    let app = app!(state, config);
    let session = login!(app, "admin", "admin");

    let cases = [
        (json!({ "file_name": "", "data": general_purpose::STANDARD.encode(b"abc") }), "No selected file"),
        (json!({ "file_name": "a.txt" }), "No file uploaded"),
        (
            json!({ "file_name": "big.bin", "data": general_purpose::STANDARD.encode([0u8; 17]) }),
            "File is too large (limit is 16 bytes)",
        ),
    ];
    for (payload, message) in cases {
        let req = test::TestRequest::post()
            .uri("/upload")
            .cookie(session.clone())
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["message"], message);
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[actix_web::test]
async fn settings_update_with_header_image() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let session = login!(app, "admin", "admin");

    let image = general_purpose::STANDARD.encode(b"banner-bytes");
    let req = test::TestRequest::post()
        .uri("/settings")
        .cookie(session.clone())
        .set_form([
            ("blog_title", "Field Notes"),
            ("blog_description", "Things I learned"),
            ("footer_html", "<p>footer</p>"),
            ("copyright_text", "© 2026 Field Notes"),
            ("head_image_name", "banner.jpg"),
            ("head_image_data", image.as_str()),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/settings");
    assert_eq!(notice(&resp).as_deref(), Some("Settings updated successfully"));

    let req = test::TestRequest::get().uri("/settings").cookie(session).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let settings = &body["data"]["settings"];
    assert_eq!(settings["blog_title"], "Field Notes");
    assert_eq!(settings["show_head_image"], false);
    let head_image = settings["head_image"].as_str().unwrap();
    assert!(head_image.ends_with("_banner.jpg"));

    let resp = test::call_service(&app, test::TestRequest::get().uri(head_image).to_request()).await;
    assert_eq!(test::read_body(resp).await, &b"banner-bytes"[..]);
}

#[actix_web::test]
async fn logout_revokes_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let session = login!(app, "admin", "admin");

    let req = test::TestRequest::get().uri("/logout").cookie(session.clone()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let req = test::TestRequest::get().uri("/post/new").cookie(session).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn chat_echoes_and_ai_tools_are_public() {
    let dir = tempfile::tempdir().unwrap();
    let (state, config) = setup(&dir, 1024).await;
    let app = app!(state, config);
    let session = login!(app, "admin", "admin");

    let req = test::TestRequest::post()
        .uri("/chat")
        .cookie(session)
        .set_form([("message", "ping")])
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["reply"], "ping");

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/ai-tools").to_request()).await;
    assert_eq!(body["status"], "success");
    assert!(body["data"]["total"].as_u64().unwrap() > 0);
    assert_eq!(body["data"]["tools"].as_array().unwrap().len() as u64, body["data"]["total"].as_u64().unwrap());
}
