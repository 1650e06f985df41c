//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Landing page (signed-in users go to /hotsprings)
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (database)
//!
//! # Auth
//! GET  /login                   - Login page
//! POST /login                   - Login action
//! GET  /register                - Register page
//! POST /register                - Register action, then sign in
//! POST /logout                  - Logout action
//!
//! # Hot springs (requires auth)
//! GET  /hotsprings              - Listing index with rating averages
//! GET  /hotsprings/new          - Creation form
//! POST /hotsprings/new          - Create (multipart, 1-5 images)
//! GET  /hotsprings/{id}         - Detail with reviews
//! POST /hotsprings/{id}         - intent=deleteHotSpring|createReview|deleteReview
//! GET  /hotsprings/{id}/edit    - Edit form (author only)
//! POST /hotsprings/{id}/edit    - Update (multipart, optional image deletion)
//! ```

pub mod auth;
pub mod home;
pub mod hotsprings;
pub mod notice;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

pub use notice::{MessageQuery, Notice};

use crate::state::AppState;

/// Body limit for the multipart listing forms (5 images of up to 3 MiB plus fields).
pub const MULTIPART_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the hot spring routes router.
pub fn hot_spring_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(hotsprings::index))
        .route(
            "/new",
            get(hotsprings::form::new_page)
                .post(hotsprings::form::create)
                .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT)),
        )
        .route(
            "/{id}",
            get(hotsprings::detail::show).post(hotsprings::detail::action),
        )
        .route(
            "/{id}/edit",
            get(hotsprings::form::edit_page)
                .post(hotsprings::form::update)
                .layer(DefaultBodyLimit::max(MULTIPART_BODY_LIMIT)),
        )
}

/// Create all page routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(auth_routes())
        .nest("/hotsprings", hot_spring_routes())
}
