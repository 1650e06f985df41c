//! Listing routes: access control, form validation and intent dispatch.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use tower::ServiceExt;

use yelp_hotspring_integration_tests::{
    TestApp, body_text, get, location, post_form, post_multipart,
};
use yelp_hotspring_web::validation::{MSG_DESCRIPTION_TOO_SHORT, MSG_NO_IMAGES, MSG_PRICE, MSG_REQUIRED};

#[tokio::test]
async fn test_listing_routes_require_login() {
    for uri in ["/hotsprings", "/hotsprings/new", "/hotsprings/1", "/hotsprings/1/edit"] {
        let app = TestApp::new();

        let response = app.router.oneshot(get(uri, None)).await.unwrap();

        assert!(response.status().is_redirection(), "{uri}");
        assert_eq!(location(&response), Some("/login?error=login_required"), "{uri}");
    }
}

#[tokio::test]
async fn test_actions_require_login() {
    let app = TestApp::new();

    let response = app
        .router
        .oneshot(post_form("/hotsprings/1", "intent=deleteHotSpring", None))
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), Some("/login?error=login_required"));
}

#[tokio::test]
async fn test_new_listing_form_renders() {
    let app = TestApp::new();
    let cookie = app.login_cookie(1, "onsen_taro").await;

    let response = app
        .router
        .oneshot(get("/hotsprings/new", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("enctype=\"multipart/form-data\""));
    assert!(body.contains("name=\"image\""));
    assert!(body.contains("onsen_taro"));
}

#[tokio::test]
async fn test_create_listing_validation_errors_rerender_form() {
    let app = TestApp::new();
    let cookie = app.login_cookie(1, "onsen_taro").await;

    let request = post_multipart(
        "/hotsprings/new",
        &[
            ("title", ""),
            ("description", "短い"),
            ("price", "0"),
            ("location", "箱根"),
        ],
        &cookie,
    );
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(MSG_REQUIRED));
    assert!(body.contains(MSG_DESCRIPTION_TOO_SHORT));
    assert!(body.contains(MSG_PRICE));
    assert!(body.contains(MSG_NO_IMAGES));
    // Entered values survive the round trip.
    assert!(body.contains("value=\"箱根\""));
}

#[tokio::test]
async fn test_unknown_intent_is_bad_request() {
    let app = TestApp::new();
    let cookie = app.login_cookie(1, "onsen_taro").await;

    let response = app
        .router
        .oneshot(post_form("/hotsprings/1", "intent=bogus", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_intent_is_bad_request() {
    let app = TestApp::new();
    let cookie = app.login_cookie(1, "onsen_taro").await;

    let response = app
        .router
        .oneshot(post_form("/hotsprings/1", "rating=5", Some(&cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_numeric_listing_id_is_rejected() {
    let app = TestApp::new();
    let cookie = app.login_cookie(1, "onsen_taro").await;

    let response = app
        .router
        .oneshot(get("/hotsprings/abc", Some(&cookie)))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}
