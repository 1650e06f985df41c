//! Listing detail page and the actions posted to it.
//!
//! The detail page hosts three forms that all POST to `/hotsprings/{id}`,
//! told apart by the `intent` field. The intent is checked before anything
//! else, so an unknown intent never reaches the database.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use yelp_hotspring_core::{HotSpringId, Rating, RatingAverage, ReviewId};

use crate::db::{HotSpringRepository, ReviewRepository};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, HotSpring, HotSpringImage, Review, ReviewWithReviewer};
use crate::routes::{MessageQuery, Notice};
use crate::services::images;
use crate::state::AppState;
use crate::validation::{FieldErrors, ReviewFields};

/// Listing fields prepared for display.
#[derive(Debug, Clone)]
pub struct HotSpringView {
    pub id: HotSpringId,
    pub title: String,
    pub description: String,
    /// e.g. `50円/泊`
    pub price: String,
    pub location: String,
    pub author_username: String,
    pub images: Vec<HotSpringImage>,
    /// e.g. `2024年03月01日 21時05分`
    pub updated_at: String,
}

impl From<&HotSpring> for HotSpringView {
    fn from(listing: &HotSpring) -> Self {
        Self {
            id: listing.id,
            title: listing.title.clone(),
            description: listing.description.clone(),
            price: listing.price.to_string(),
            location: listing.location.clone(),
            author_username: listing.author_username.clone(),
            images: listing.images.clone(),
            updated_at: filters::format_timestamp(&listing.updated_at),
        }
    }
}

/// A review prepared for display.
#[derive(Debug, Clone)]
pub struct ReviewView {
    pub id: ReviewId,
    pub rating: Rating,
    pub comment: String,
    pub reviewer_username: String,
    pub updated_at: String,
    /// Whether the viewer wrote this review.
    pub can_delete: bool,
}

impl ReviewView {
    fn new(review: ReviewWithReviewer, viewer: &CurrentUser) -> Self {
        Self {
            id: review.id,
            rating: review.rating,
            can_delete: viewer.owns(review.reviewer_id),
            comment: review.comment,
            reviewer_username: review.reviewer_username,
            updated_at: filters::format_timestamp(&review.updated_at),
        }
    }
}

/// Detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "hotsprings/show.html")]
pub struct ShowTemplate {
    pub current_user: Option<CurrentUser>,
    pub notice: Option<Notice>,
    pub hot_spring: HotSpringView,
    pub average: RatingAverage,
    pub reviews: Vec<ReviewView>,
    pub is_owner: bool,
    /// Review form values, kept when re-rendering after a validation error.
    pub review: ReviewFields,
    pub errors: FieldErrors,
}

/// Action posted from the detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    DeleteHotSpring,
    CreateReview,
    DeleteReview,
}

impl Intent {
    /// Parse the `intent` form field.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for anything but the three known intents.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "deleteHotSpring" => Ok(Self::DeleteHotSpring),
            "createReview" => Ok(Self::CreateReview),
            "deleteReview" => Ok(Self::DeleteReview),
            other => Err(AppError::BadRequest(format!("Invalid intent \"{other}\""))),
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::DeleteHotSpring => "deleteHotSpring",
            Self::CreateReview => "createReview",
            Self::DeleteReview => "deleteReview",
        }
    }
}

/// Fields of every detail page form; each intent reads the ones it needs.
#[derive(Debug, Deserialize)]
pub struct ActionForm {
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "reviewId")]
    pub review_id: Option<String>,
}

/// Display a listing with its reviews and rating average.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the listing doesn't exist.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<HotSpringId>,
    Query(query): Query<MessageQuery>,
) -> Result<ShowTemplate, AppError> {
    let listing = load(&state, id).await?;
    render(
        &state,
        user,
        &listing,
        Notice::from_query(&query),
        ReviewFields::default(),
        FieldErrors::default(),
    )
    .await
}

/// Handle a detail page form post.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for an unknown intent and
/// `AppError::NotFound` for a missing listing or review.
pub async fn action(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<HotSpringId>,
    Form(form): Form<ActionForm>,
) -> Result<Response, AppError> {
    let intent = Intent::parse(&form.intent)?;
    let hot_spring_id = id.to_string();
    add_breadcrumb(
        "hotspring",
        intent.as_str(),
        Some(&[("hot_spring_id", hot_spring_id.as_str())]),
    );

    match intent {
        Intent::DeleteHotSpring => delete_hot_spring(&state, &user, id).await,
        Intent::CreateReview => create_review(&state, user, id, form).await,
        Intent::DeleteReview => delete_review(&state, &user, id, form.review_id.as_deref()).await,
    }
}

async fn delete_hot_spring(
    state: &AppState,
    user: &CurrentUser,
    id: HotSpringId,
) -> Result<Response, AppError> {
    let listing = load(state, id).await?;
    if let Some(refusal) = refuse_listing_deletion(&listing, user) {
        tracing::warn!(user_id = %user.id, hot_spring_id = %id, "Non-author tried to delete listing");
        return Ok(refusal.into_response());
    }

    let external_ids = HotSpringRepository::new(state.pool()).delete(id).await?;
    tracing::info!(hot_spring_id = %id, images = external_ids.len(), "Listing deleted");

    // The listing is gone either way; leftover remote assets are only reported.
    let report = images::destroy_all(state.images(), &external_ids).await;
    if !report.is_complete() {
        tracing::warn!(
            hot_spring_id = %id,
            failed = report.failed.len(),
            "Some remote images of a deleted listing were not removed"
        );
    }

    Ok(Redirect::to("/hotsprings?success=deleted").into_response())
}

async fn create_review(
    state: &AppState,
    user: CurrentUser,
    id: HotSpringId,
    form: ActionForm,
) -> Result<Response, AppError> {
    let listing = load(state, id).await?;
    let fields = ReviewFields {
        rating: form.rating,
        comment: form.comment,
    };

    let review = match fields.parse(user.id, id) {
        Ok(review) => review,
        Err(errors) => {
            return Ok(render(state, user, &listing, None, fields, errors)
                .await?
                .into_response());
        }
    };

    let created = ReviewRepository::new(state.pool()).create(&review).await?;
    tracing::info!(review_id = %created.id, hot_spring_id = %id, "Review created");

    Ok(Redirect::to(&format!("/hotsprings/{id}?success=review_created")).into_response())
}

async fn delete_review(
    state: &AppState,
    user: &CurrentUser,
    id: HotSpringId,
    review_id: Option<&str>,
) -> Result<Response, AppError> {
    let review_id = review_id
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .map(ReviewId::new)
        .ok_or_else(|| AppError::BadRequest("Missing reviewId".to_string()))?;

    let reviews = ReviewRepository::new(state.pool());
    let review = reviews
        .get(review_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("review {review_id}")))?;

    if let Some(refusal) = refuse_review_deletion(&review, user, id) {
        tracing::warn!(user_id = %user.id, review_id = %review_id, "Non-reviewer tried to delete review");
        return Ok(refusal.into_response());
    }

    if !reviews.delete(review_id).await? {
        return Err(AppError::NotFound(format!("review {review_id}")));
    }
    tracing::info!(review_id = %review_id, hot_spring_id = %id, "Review deleted");

    Ok(Redirect::to(&format!("/hotsprings/{id}?success=review_deleted")).into_response())
}

/// Only the author may delete a listing.
fn refuse_listing_deletion(listing: &HotSpring, user: &CurrentUser) -> Option<Redirect> {
    (!user.owns(listing.author_id))
        .then(|| Redirect::to(&format!("/hotsprings/{}?error=not_author", listing.id)))
}

/// Only the reviewer may delete a review, and only from the listing it belongs to.
fn refuse_review_deletion(review: &Review, user: &CurrentUser, id: HotSpringId) -> Option<Redirect> {
    (review.hot_spring_id != id || !user.owns(review.reviewer_id))
        .then(|| Redirect::to(&format!("/hotsprings/{id}?error=not_reviewer")))
}

async fn load(state: &AppState, id: HotSpringId) -> Result<HotSpring, AppError> {
    HotSpringRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("hot spring {id}")))
}

async fn render(
    state: &AppState,
    user: CurrentUser,
    listing: &HotSpring,
    notice: Option<Notice>,
    review: ReviewFields,
    errors: FieldErrors,
) -> Result<ShowTemplate, AppError> {
    let reviews = ReviewRepository::new(state.pool());
    let average = reviews.average_rating(listing.id).await?;
    let review_list = reviews
        .list_for_hot_spring(listing.id)
        .await?
        .into_iter()
        .map(|r| ReviewView::new(r, &user))
        .collect();

    Ok(ShowTemplate {
        is_owner: user.owns(listing.author_id),
        current_user: Some(user),
        notice,
        hot_spring: HotSpringView::from(listing),
        average,
        reviews: review_list,
        review,
        errors,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{StatusCode, header};
    use chrono::{TimeZone, Utc};
    use yelp_hotspring_core::{ExternalImageId, HotSpringImageId, NightlyPrice, UserId};

    use super::*;

    fn viewer(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            username: format!("user{id}"),
        }
    }

    fn onsen_a() -> HotSpring {
        HotSpring {
            id: HotSpringId::new(3),
            title: "Onsen A".to_owned(),
            description: "quiet onsen!".to_owned(),
            price: NightlyPrice::new(50).unwrap(),
            location: "Hakone".to_owned(),
            author_id: UserId::new(1),
            author_username: "user1".to_owned(),
            images: vec![HotSpringImage {
                id: HotSpringImageId::new(1),
                url: "https://res.cloudinary.com/demo/HotSprings/a.jpg".to_owned(),
                external_id: ExternalImageId::parse("HotSprings/a").unwrap(),
            }],
            updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 5, 0).unwrap(),
        }
    }

    fn review_by(reviewer: i32, hot_spring: i32) -> Review {
        Review {
            id: ReviewId::new(9),
            rating: Rating::new(4).unwrap(),
            comment: "good".to_owned(),
            reviewer_id: UserId::new(reviewer),
            hot_spring_id: HotSpringId::new(hot_spring),
            updated_at: Utc::now(),
        }
    }

    fn location(redirect: Redirect) -> String {
        let response = redirect.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned()
    }

    #[test]
    fn test_author_may_delete_listing() {
        assert!(refuse_listing_deletion(&onsen_a(), &viewer(1)).is_none());
    }

    #[test]
    fn test_non_author_delete_redirects_not_author() {
        let refusal = refuse_listing_deletion(&onsen_a(), &viewer(2)).unwrap();
        assert_eq!(location(refusal), "/hotsprings/3?error=not_author");
    }

    #[test]
    fn test_reviewer_may_delete_review() {
        let review = review_by(2, 3);
        assert!(refuse_review_deletion(&review, &viewer(2), HotSpringId::new(3)).is_none());
    }

    #[test]
    fn test_other_reviewer_delete_redirects_not_reviewer() {
        let review = review_by(2, 3);
        let refusal = refuse_review_deletion(&review, &viewer(1), HotSpringId::new(3)).unwrap();
        assert_eq!(location(refusal), "/hotsprings/3?error=not_reviewer");
    }

    #[test]
    fn test_review_of_another_listing_redirects_not_reviewer() {
        let review = review_by(2, 4);
        let refusal = refuse_review_deletion(&review, &viewer(2), HotSpringId::new(3)).unwrap();
        assert_eq!(location(refusal), "/hotsprings/3?error=not_reviewer");
    }

    #[test]
    fn test_show_page_without_reviews() {
        let listing = onsen_a();
        let user = viewer(1);
        let page = ShowTemplate {
            is_owner: user.owns(listing.author_id),
            current_user: Some(user),
            notice: None,
            hot_spring: HotSpringView::from(&listing),
            average: RatingAverage::from_mean(None),
            reviews: Vec::new(),
            review: ReviewFields::default(),
            errors: FieldErrors::default(),
        };

        let html = page.render().unwrap();
        assert!(html.contains("<h1>Onsen A</h1>"));
        assert!(html.contains("quiet onsen!"));
        assert!(html.contains("50円/泊"));
        assert!(html.contains("2024年03月01日 21時05分"));
        assert!(html.contains(r#"<span class="average">0.00</span>"#));
        assert!(html.contains("☆☆☆☆☆"));
        assert!(html.contains("（0件）"));
        assert!(html.contains("まだレビューはありません。"));
        assert!(html.contains("/hotsprings/3/edit"));
    }

    #[test]
    fn test_show_page_lists_reviews_with_stars() {
        let listing = onsen_a();
        let user = viewer(2);
        let review = ReviewWithReviewer {
            id: ReviewId::new(9),
            rating: Rating::new(4).unwrap(),
            comment: "good".to_owned(),
            reviewer_id: UserId::new(2),
            reviewer_username: "user2".to_owned(),
            updated_at: Utc::now(),
        };
        let page = ShowTemplate {
            is_owner: user.owns(listing.author_id),
            reviews: vec![ReviewView::new(review, &user)],
            current_user: Some(user),
            notice: None,
            hot_spring: HotSpringView::from(&listing),
            average: RatingAverage::from_ratings(&[Rating::new(4).unwrap()]),
            review: ReviewFields::default(),
            errors: FieldErrors::default(),
        };

        let html = page.render().unwrap();
        assert!(html.contains(r#"<span class="average">4.00</span>"#));
        assert!(html.contains(r#"aria-label="4">★★★★☆"#));
        assert!(html.contains(r#"name="reviewId" value="9""#));
        assert!(!html.contains("まだレビューはありません。"));
        assert!(!html.contains("/hotsprings/3/edit"));
    }

    #[test]
    fn test_intent_parse() {
        assert_eq!(Intent::parse("deleteHotSpring").unwrap(), Intent::DeleteHotSpring);
        assert_eq!(Intent::parse("createReview").unwrap(), Intent::CreateReview);
        assert_eq!(Intent::parse("deleteReview").unwrap(), Intent::DeleteReview);
    }

    #[test]
    fn test_intent_parse_unknown() {
        let err = Intent::parse("dropTable").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.to_string(), "Bad request: Invalid intent \"dropTable\"");

        assert!(Intent::parse("").is_err());
    }
}
