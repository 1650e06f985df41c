//! Hot spring listing handlers.
//!
//! - `mod.rs` - listing index
//! - `detail` - detail page and its review/delete actions
//! - `form` - create and edit forms (multipart, image uploads)

pub mod detail;
pub mod form;

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use futures::{StreamExt, TryStreamExt, stream};

use yelp_hotspring_core::{HotSpringId, RatingAverage};

use crate::db::{HotSpringRepository, ReviewRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, HotSpringSummary};
use crate::routes::{MessageQuery, Notice};
use crate::state::AppState;

/// How many rating averages are computed at once on the index.
const AVERAGE_CONCURRENCY: usize = 8;

/// One card on the listing index.
#[derive(Debug, Clone)]
pub struct HotSpringCard {
    pub id: HotSpringId,
    pub title: String,
    pub location: String,
    pub cover_url: Option<String>,
    pub review_count: i64,
    pub average: RatingAverage,
}

impl HotSpringCard {
    fn new(summary: HotSpringSummary, average: RatingAverage) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            location: summary.location,
            cover_url: summary.cover_url,
            review_count: summary.review_count,
            average,
        }
    }
}

/// Listing index template.
#[derive(Template, WebTemplate)]
#[template(path = "hotsprings/index.html")]
pub struct IndexTemplate {
    pub current_user: Option<CurrentUser>,
    pub notice: Option<Notice>,
    pub hot_springs: Vec<HotSpringCard>,
}

/// Display every listing, most recently updated first, with its rating average.
///
/// # Errors
///
/// Returns `AppError::Database` if a query fails.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<IndexTemplate, AppError> {
    let summaries = HotSpringRepository::new(state.pool())
        .list_summaries()
        .await?;

    let reviews = ReviewRepository::new(state.pool());
    let reviews = &reviews;
    let mut averages: HashMap<HotSpringId, RatingAverage> =
        stream::iter(summaries.iter().map(|s| s.id).collect::<Vec<_>>())
            .map(|id| async move {
                reviews
                    .average_rating(id)
                    .await
                    .map(|average| (id, average))
            })
            .buffer_unordered(AVERAGE_CONCURRENCY)
            .try_collect()
            .await?;

    let hot_springs = summaries
        .into_iter()
        .map(|summary| {
            let average = averages
                .remove(&summary.id)
                .unwrap_or_else(|| RatingAverage::from_mean(None));
            HotSpringCard::new(summary, average)
        })
        .collect();

    Ok(IndexTemplate {
        current_user: Some(user),
        notice: Notice::from_query(&query),
        hot_springs,
    })
}
