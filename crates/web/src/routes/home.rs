//! Landing page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::Query,
    response::{IntoResponse, Redirect, Response},
};

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::routes::{MessageQuery, Notice};

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub current_user: Option<CurrentUser>,
    pub notice: Option<Notice>,
}

/// Display the landing page, or send signed-in users to the listing index.
pub async fn home(
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/hotsprings").into_response();
    }

    HomeTemplate {
        current_user: None,
        notice: Notice::from_query(&query),
    }
    .into_response()
}
