//! Authentication extractors.
//!
//! Every `/hotsprings` route takes [`RequireAuth`]; the landing page takes
//! [`OptionalAuth`] so it can send signed-in visitors straight to the index.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};

/// Where unauthenticated visitors are sent.
pub const LOGIN_REDIRECT: &str = "/login?error=login_required";

/// Extractor that requires a signed-in user.
///
/// If nobody is logged in, the request is redirected to the login page
/// before the handler runs.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("こんにちは、{}さん", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but nobody is logged in.
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// The session layer is missing from the stack.
    MissingSession,
    /// The session store could not load the record.
    SessionStore(tower_sessions::session::Error),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_REDIRECT).into_response(),
            Self::MissingSession => {
                tracing::error!("Session layer missing from the middleware stack");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            Self::SessionStore(err) => AppError::Session(err).into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        let loaded = session.get(session_keys::CURRENT_USER).await;
        required_user(loaded).map(Self)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => optional_user(session.get(session_keys::CURRENT_USER).await),
            None => None,
        };

        Ok(Self(user))
    }
}

/// An empty session means "log in first"; a store failure is a server fault.
fn required_user(
    loaded: Result<Option<CurrentUser>, tower_sessions::session::Error>,
) -> Result<CurrentUser, AuthRejection> {
    match loaded {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(AuthRejection::RedirectToLogin),
        Err(err) => Err(AuthRejection::SessionStore(err)),
    }
}

/// Pages that only personalize on sign-in degrade to anonymous when the
/// store is down, but the failure is still logged.
fn optional_user(
    loaded: Result<Option<CurrentUser>, tower_sessions::session::Error>,
) -> Option<CurrentUser> {
    loaded.unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to load session user");
        None
    })
}

/// Store the signed-in user in the session.
///
/// The session id is cycled first so a pre-login id can't be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session store cannot delete the record.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
