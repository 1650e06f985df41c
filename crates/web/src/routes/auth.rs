//! Authentication route handlers.
//!
//! Email and password login and registration backed by the `users` table.
//! Successful registration signs the new user in immediately.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::{MessageQuery, Notice};
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;
use crate::validation::{FieldErrors, LoginForm, MSG_EMAIL, RegisterForm};

/// Shown when the email is already registered.
pub const DUPLICATE_ACCOUNT_MESSAGE: &str = "すでに登録済みのユーザーです。";

/// Where users land after signing in.
const AFTER_LOGIN: &str = "/hotsprings";

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub current_user: Option<CurrentUser>,
    pub notice: Option<Notice>,
    pub email: String,
    pub errors: FieldErrors,
}

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub current_user: Option<CurrentUser>,
    pub notice: Option<Notice>,
    pub username: String,
    pub email: String,
    pub errors: FieldErrors,
    /// Form-level error shown above the fields.
    pub form_error: Option<&'static str>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        current_user: None,
        notice: Notice::from_query(&query),
        email: String::new(),
        errors: FieldErrors::default(),
    }
}

/// Handle login form submission.
///
/// # Errors
///
/// Returns `AppError` for database or session failures. Bad credentials
/// redirect back to the login page instead.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.check() {
        return Ok(LoginTemplate {
            current_user: None,
            notice: None,
            email: form.email,
            errors,
        }
        .into_response());
    }

    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            sign_in(&session, &user).await?;
            Ok(Redirect::to(AFTER_LOGIN).into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("Login failed: invalid credentials");
            Ok(Redirect::to("/login?error=credentials").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate {
        current_user: None,
        notice: Notice::from_query(&query),
        username: String::new(),
        email: String::new(),
        errors: FieldErrors::default(),
        form_error: None,
    }
}

/// Handle registration form submission.
///
/// # Errors
///
/// Returns `AppError` for database, hashing or session failures. Validation
/// failures and duplicate emails re-render the form.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let rerender = |errors: FieldErrors, form_error: Option<&'static str>| RegisterTemplate {
        current_user: None,
        notice: None,
        username: form.username.clone(),
        email: form.email.clone(),
        errors,
        form_error,
    };

    if let Err(errors) = form.check() {
        return Ok(rerender(errors, None).into_response());
    }

    match AuthService::new(state.pool())
        .register(&form.username, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            sign_in(&session, &user).await?;
            Ok(Redirect::to(AFTER_LOGIN).into_response())
        }
        Err(e) => {
            let (errors, form_error) = registration_rejection(e)?;
            tracing::info!("Registration rejected");
            Ok(rerender(errors, form_error).into_response())
        }
    }
}

/// Turn a registration failure the visitor can fix into form errors.
///
/// A duplicate email gets the form-level message; an email the account
/// store refuses goes under the email field. Anything else is a server fault.
fn registration_rejection(
    err: AuthError,
) -> Result<(FieldErrors, Option<&'static str>), AuthError> {
    match err {
        AuthError::UserAlreadyExists => Ok((FieldErrors::default(), Some(DUPLICATE_ACCOUNT_MESSAGE))),
        AuthError::InvalidEmail(_) => {
            let mut errors = FieldErrors::default();
            errors.push("email", MSG_EMAIL);
            Ok((errors, None))
        }
        other => Err(other),
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout: drop the whole session.
///
/// # Errors
///
/// Returns `AppError` if the session store fails.
pub async fn logout(
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    tracing::info!(user_id = %user.id, "User logged out");
    Ok(Redirect::to("/login"))
}

async fn sign_in(session: &Session, user: &User) -> Result<(), AppError> {
    let current = CurrentUser {
        id: user.id,
        username: user.username.clone(),
    };
    set_current_user(session, &current).await?;
    set_sentry_user(&user.id, Some(&user.username));
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use yelp_hotspring_core::Email;

    use super::*;

    #[test]
    fn test_duplicate_email_becomes_form_error() {
        let (errors, form_error) = registration_rejection(AuthError::UserAlreadyExists).unwrap();
        assert!(errors.is_empty());
        assert_eq!(form_error, Some(DUPLICATE_ACCOUNT_MESSAGE));
    }

    #[test]
    fn test_refused_email_becomes_field_error() {
        let err = Email::parse("taro@localhost").unwrap_err();
        let (errors, form_error) = registration_rejection(AuthError::InvalidEmail(err)).unwrap();
        assert_eq!(errors.first("email"), Some(MSG_EMAIL));
        assert_eq!(form_error, None);
    }

    #[test]
    fn test_other_failures_stay_errors() {
        assert!(matches!(
            registration_rejection(AuthError::PasswordHash),
            Err(AuthError::PasswordHash)
        ));
    }

    #[test]
    fn test_register_page_shows_duplicate_message() {
        let html = RegisterTemplate {
            current_user: None,
            notice: None,
            username: "onsen_taro".to_owned(),
            email: "user1@test.com".to_owned(),
            errors: FieldErrors::default(),
            form_error: Some(DUPLICATE_ACCOUNT_MESSAGE),
        }
        .render()
        .unwrap();

        assert!(html.contains(DUPLICATE_ACCOUNT_MESSAGE));
        assert!(html.contains("value=\"user1@test.com\""));
        assert!(html.contains("value=\"onsen_taro\""));
    }
}
