//! Integration tests for YelpHotSpring.
//!
//! The tests drive the full router with `tower::ServiceExt::oneshot`. Sessions
//! live in a `MemoryStore`, and the database pool connects lazily to an
//! address nothing listens on, so a test that unexpectedly touches the
//! database fails instead of passing against stale data.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p yelp-hotspring-integration-tests
//! ```

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderValue, Request, header},
    response::Response,
};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use tower_sessions::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use tower_sessions::session::{Id, Record};
use tower_sessions::{MemoryStore, SessionStore};
use url::Url;

use yelp_hotspring_core::UserId;
use yelp_hotspring_web::config::{
    AppConfig, CloudinaryConfig, DEFAULT_CLOUDINARY_API_BASE, DEFAULT_CLOUDINARY_FOLDER,
};
use yelp_hotspring_web::middleware::{SESSION_COOKIE_NAME, session_layer};
use yelp_hotspring_web::models::{CurrentUser, session_keys};
use yelp_hotspring_web::state::AppState;

/// Nothing listens here; any query fails after the acquire timeout.
const UNREACHABLE_DATABASE_URL: &str = "postgres://yh:yh@127.0.0.1:9/yelp_hotspring_test";

/// Largest response body the helpers will read.
const BODY_LIMIT: usize = 1024 * 1024;

/// A router plus the session store backing it.
pub struct TestApp {
    pub router: Router,
    pub sessions: MemoryStore,
}

/// Configuration pointing at unreachable services.
///
/// # Panics
///
/// Panics if the hard-coded URLs fail to parse.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: SecretString::from(UNREACHABLE_DATABASE_URL),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_owned(),
        cloudinary: CloudinaryConfig {
            cloud_name: "yh-test".to_owned(),
            api_key: "000000000000000".to_owned(),
            api_secret: SecretString::from("q8Zr1vN3xK0pL7sT2mW9yB4c"),
            folder: DEFAULT_CLOUDINARY_FOLDER.to_owned(),
            api_base: Url::parse(DEFAULT_CLOUDINARY_API_BASE).unwrap(),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

impl TestApp {
    /// Build the application router.
    ///
    /// # Panics
    ///
    /// Panics if the lazy pool or the image host client can't be built.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn new() -> Self {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(1))
            .connect_lazy(UNREACHABLE_DATABASE_URL)
            .unwrap();
        let state = AppState::new(test_config(), pool).unwrap();
        let sessions = MemoryStore::default();
        let router = yelp_hotspring_web::app(state, session_layer(sessions.clone(), false));
        Self { router, sessions }
    }

    /// Store a signed-in session for the given user and return its cookie.
    ///
    /// # Panics
    ///
    /// Panics if the session can't be stored.
    #[allow(clippy::unwrap_used)]
    pub async fn login_cookie(&self, id: i32, username: &str) -> HeaderValue {
        let user = CurrentUser {
            id: UserId::new(id),
            username: username.to_owned(),
        };
        let mut record = Record {
            id: Id::default(),
            data: HashMap::from([(
                session_keys::CURRENT_USER.to_owned(),
                serde_json::to_value(&user).unwrap(),
            )]),
            expiry_date: OffsetDateTime::now_utc() + CookieDuration::days(1),
        };
        self.sessions.create(&mut record).await.unwrap();

        HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={}", record.id)).unwrap()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A GET request, optionally carrying a session cookie.
///
/// # Panics
///
/// Panics if the request can't be built.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn get(uri: &str, cookie: Option<&HeaderValue>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// A url-encoded form POST, optionally carrying a session cookie.
///
/// # Panics
///
/// Panics if the request can't be built.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn post_form(uri: &str, body: &str, cookie: Option<&HeaderValue>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

/// Boundary used by [`post_multipart`].
pub const MULTIPART_BOUNDARY: &str = "yh-test-boundary";

/// A `multipart/form-data` POST made of plain text fields.
///
/// # Panics
///
/// Panics if the request can't be built.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn post_multipart(uri: &str, fields: &[(&str, &str)], cookie: &HeaderValue) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{MULTIPART_BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

/// Read a response body as text.
///
/// # Panics
///
/// Panics if the body can't be read or isn't UTF-8.
#[allow(clippy::unwrap_used)]
pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// The `Location` header of a redirect, if any.
#[must_use]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}
