//! Login, registration and logout flows that stop before the database.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use tower::ServiceExt;

use yelp_hotspring_integration_tests::{TestApp, body_text, get, location, post_form};
use yelp_hotspring_web::validation::{MSG_EMAIL, MSG_PASSWORD_TOO_SHORT, MSG_USERNAME_TOO_SHORT};

#[tokio::test]
async fn test_login_page_renders() {
    let app = TestApp::new();

    let response = app.router.oneshot(get("/login", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("action=\"/login\""));
}

#[tokio::test]
async fn test_login_page_shows_login_required_notice() {
    let app = TestApp::new();

    let response = app
        .router
        .oneshot(get("/login?error=login_required", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("ログインが必要なルートです！🚧"));
}

#[tokio::test]
async fn test_login_page_ignores_unknown_notice_codes() {
    let app = TestApp::new();

    let response = app
        .router
        .oneshot(get("/login?error=%3Cscript%3E", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!body_text(response).await.contains("<script>"));
}

#[tokio::test]
async fn test_login_validation_errors_rerender_form() {
    let app = TestApp::new();

    let response = app
        .router
        .oneshot(post_form("/login", "email=not-an-email&password=abc", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(MSG_EMAIL));
    assert!(body.contains(MSG_PASSWORD_TOO_SHORT));
    assert!(body.contains("value=\"not-an-email\""));
}

#[tokio::test]
async fn test_register_validation_errors_rerender_form() {
    let app = TestApp::new();

    let response = app
        .router
        .oneshot(post_form(
            "/register",
            "username=abc&email=taro%40example.jp&password=secret1",
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(MSG_USERNAME_TOO_SHORT));
    assert!(body.contains("value=\"taro@example.jp\""));
}

#[tokio::test]
async fn test_logout_requires_login() {
    let app = TestApp::new();

    let response = app.router.oneshot(post_form("/logout", "", None)).await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), Some("/login?error=login_required"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = TestApp::new();
    let cookie = app.login_cookie(1, "onsen_taro").await;

    let response = app
        .router
        .clone()
        .oneshot(post_form("/logout", "", Some(&cookie)))
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), Some("/login"));

    // The old cookie no longer identifies anyone.
    let response = app.router.oneshot(get("/", Some(&cookie))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
