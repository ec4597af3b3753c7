use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use serde_json::Value;

use inkwell_core::domain::Credentials;
use inkwell_core::services::MAX_IMAGE_BYTES;
use inkwell_infra::{
    Argon2PasswordService, InMemoryFileStorage, InMemoryStore, JwtConfig, JwtTokenService,
};

use super::configure_routes;
use crate::observability::{REQUEST_ID_HEADER, RequestIdMiddleware};
use crate::state::AppState;

const BOUNDARY: &str = "inkwell-test-boundary";
const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

fn test_state() -> AppState {
    test_state_with_storage(Arc::new(InMemoryFileStorage::new()))
}

fn test_state_with_storage(storage: Arc<InMemoryFileStorage>) -> AppState {
    let tokens = JwtTokenService::new(JwtConfig {
        secret: "test-secret".to_string(),
        ..JwtConfig::default()
    });
    AppState::assemble(
        Arc::new(InMemoryStore::new()),
        storage,
        Arc::new(tokens),
        Arc::new(Argon2PasswordService::new()),
    )
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

/// Register `username` directly through the service and return a bearer header value.
async fn bearer(state: &AppState, username: &str) -> String {
    let user = state
        .users
        .sign_up(Credentials::new(username, "secret"))
        .await
        .unwrap();
    let token = state.tokens.generate_token(user.id, &user.username).unwrap();
    format!("Bearer {token}")
}

struct Form {
    body: Vec<u8>,
}

impl Form {
    fn new() -> Self {
        Self { body: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn post(title: &str, content: &str, tags: &str) -> Self {
        Self::new()
            .text("title", title)
            .text("content", content)
            .text("tags", tags)
    }

    fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), self.body)
    }
}

fn multipart(req: test::TestRequest, form: Form) -> test::TestRequest {
    let (content_type, body) = form.finish();
    req.insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
}

#[actix_web::test]
async fn test_health_reports_store_kind() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}

#[actix_web::test]
async fn test_sign_up_statuses() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(serde_json::json!({"username": "alice", "password": "secret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["username"], "alice");
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(serde_json::json!({"username": "alice", "password": "other"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .set_json(serde_json::json!({"username": "bob", "password": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/signup")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_login_issues_bearer_token() {
    let state = test_state();
    let app = test_app!(state);
    bearer(&state, "alice").await;

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(serde_json::json!({"username": "alice", "password": "wrong"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(serde_json::json!({"username": "alice", "password": "secret"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 24 * 3600);

    let token = body["access_token"].as_str().unwrap();
    let req = test::TestRequest::get()
        .uri("/api/user")
        .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["username"], "alice");
}

#[actix_web::test]
async fn test_current_user_requires_token() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/api/user").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/user")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_post_requires_auth() {
    let state = test_state();
    let app = test_app!(state);

    let req = multipart(
        test::TestRequest::post().uri("/api/post"),
        Form::post("Title", "Body", "rust"),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(state.posts.list_tags().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_create_post_reconciles_tags() {
    let state = test_state();
    let app = test_app!(state);
    let auth = bearer(&state, "alice").await;

    let req = multipart(
        test::TestRequest::post()
            .uri("/api/post")
            .insert_header((header::AUTHORIZATION, auth)),
        Form::post("Hello", "First post", "Web rust RUST"),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["title"], "Hello");
    assert_eq!(body["author"]["username"], "alice");
    let names: Vec<&str> = body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["rust", "web"]);
    assert!(body.get("image").is_none());

    let req = test::TestRequest::get().uri("/api/tag").to_request();
    let tags: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tags.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_create_post_rejects_gif() {
    let state = test_state();
    let app = test_app!(state);
    let auth = bearer(&state, "alice").await;

    let req = multipart(
        test::TestRequest::post()
            .uri("/api/post")
            .insert_header((header::AUTHORIZATION, auth)),
        Form::post("Hello", "Body", "rust").file("cat.gif", "image/gif", b"GIF89a"),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "bad-image-type");
    assert!(state.posts.list_tags().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_oversized_image_is_rejected_unstored() {
    let storage = Arc::new(InMemoryFileStorage::new());
    let state = test_state_with_storage(storage.clone());
    let app = test_app!(state);
    let auth = bearer(&state, "alice").await;

    let oversized = vec![0u8; MAX_IMAGE_BYTES as usize + 1];
    let req = multipart(
        test::TestRequest::post()
            .uri("/api/post")
            .insert_header((header::AUTHORIZATION, auth)),
        Form::post("Big", "Body", "rust").file("big.png", "image/png", &oversized),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    assert!(storage.names().await.is_empty());
    assert!(state.posts.list_tags().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_uploaded_image_is_served() {
    let state = test_state();
    let app = test_app!(state);
    let auth = bearer(&state, "alice").await;

    let req = multipart(
        test::TestRequest::post()
            .uri("/api/post")
            .insert_header((header::AUTHORIZATION, auth)),
        Form::post("Pic", "With image", "").file("photo.PNG", "image/png", PNG_BYTES),
    )
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let url = body["image"].as_str().unwrap().to_string();
    assert!(url.starts_with("/api/files/"));
    assert!(url.ends_with(".png"));

    let req = test::TestRequest::get().uri(&url).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), PNG_BYTES);

    let req = test::TestRequest::get()
        .uri("/api/files/missing.png")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_only_author_may_change_post() {
    let state = test_state();
    let app = test_app!(state);
    let alice = bearer(&state, "alice").await;
    let mallory = bearer(&state, "mallory").await;

    let req = multipart(
        test::TestRequest::post()
            .uri("/api/post")
            .insert_header((header::AUTHORIZATION, alice.clone())),
        Form::post("Mine", "Body", "rust"),
    )
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/api/post/{}", body["id"]);

    let req = multipart(
        test::TestRequest::put()
            .uri(&uri)
            .insert_header((header::AUTHORIZATION, mallory.clone())),
        Form::post("Stolen", "Body", ""),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, mallory))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = multipart(
        test::TestRequest::put()
            .uri(&uri)
            .insert_header((header::AUTHORIZATION, alice.clone())),
        Form::post("Edited", "New body", "go"),
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri(&uri).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["title"], "Edited");
    assert_eq!(body["tags"][0]["name"], "go");
    assert_eq!(body["tags"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header((header::AUTHORIZATION, alice))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::get().uri(&uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(state.posts.list_tags().await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_list_posts_filters_and_pages() {
    let state = test_state();
    let app = test_app!(state);
    let auth = bearer(&state, "alice").await;

    for (title, tags) in [("one", "rust"), ("two", "go"), ("three", "rust")] {
        let req = multipart(
            test::TestRequest::post()
                .uri("/api/post")
                .insert_header((header::AUTHORIZATION, auth.clone())),
            Form::post(title, "body", tags),
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri("/api/post?page=1&pageSize=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["pages"], 2);
    assert_eq!(body["items"][0]["title"], "three");

    let req = test::TestRequest::get().uri("/api/tag").to_request();
    let tags: Value = test::call_and_read_body_json(&app, req).await;
    let rust_id = tags
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "rust")
        .map(|t| t["id"].clone())
        .unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/api/post?tagId={rust_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 2);

    let req = test::TestRequest::get()
        .uri(&format!("/api/post?page={}&pageSize=100", u64::MAX))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 3);
    assert!(body["items"].as_array().unwrap().is_empty());

    let req = test::TestRequest::get()
        .uri("/api/post?search=tw")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "two");
}

#[actix_web::test]
async fn test_password_update_statuses() {
    let state = test_state();
    let app = test_app!(state);
    let auth = bearer(&state, "alice").await;

    let cases = [
        (
            serde_json::json!({"currentPassword": "wrong", "password": "fresh"}),
            StatusCode::NOT_FOUND,
        ),
        (
            serde_json::json!({"currentPassword": "secret", "password": "secret"}),
            StatusCode::CONFLICT,
        ),
        (
            serde_json::json!({"currentPassword": "secret", "password": ""}),
            StatusCode::BAD_REQUEST,
        ),
        (
            serde_json::json!({"currentPassword": "secret", "password": "fresh"}),
            StatusCode::NO_CONTENT,
        ),
    ];

    for (body, status) in cases {
        let req = test::TestRequest::put()
            .uri("/api/user/password")
            .insert_header((header::AUTHORIZATION, auth.clone()))
            .set_json(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), status);
    }

    assert!(
        state
            .users
            .authenticate(&Credentials::new("alice", "fresh"))
            .await
            .is_ok()
    );
}

#[actix_web::test]
async fn test_username_update() {
    let state = test_state();
    let app = test_app!(state);
    let auth = bearer(&state, "alice").await;
    bearer(&state, "bob").await;

    let req = test::TestRequest::put()
        .uri("/api/user/username")
        .insert_header((header::AUTHORIZATION, auth.clone()))
        .set_json(serde_json::json!({"username": "bob"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::put()
        .uri("/api/user/username")
        .insert_header((header::AUTHORIZATION, auth.clone()))
        .set_json(serde_json::json!({"username": "alicia"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // The token still names the old username; the caller is resolved by id.
    let req = test::TestRequest::get()
        .uri("/api/user")
        .insert_header((header::AUTHORIZATION, auth))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["username"], "alicia");
}

#[actix_web::test]
async fn test_request_id_is_echoed() {
    let state = test_state();
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/health")
        .insert_header((REQUEST_ID_HEADER, "trace-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get(REQUEST_ID_HEADER).unwrap(), "trace-42");

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
}
