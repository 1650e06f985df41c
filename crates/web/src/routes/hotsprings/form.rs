//! Create and edit forms for listings.
//!
//! Both forms are multipart: text fields, any number of `image` file parts
//! and, on edit, `deleteImageId` checkboxes. The whole submission is
//! validated before the first upload. Uploads that end up unused because a
//! later step failed are destroyed again.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State, multipart::Field},
    response::{IntoResponse, Redirect, Response},
};

use yelp_hotspring_core::{ExternalImageId, HotSpringId};

use crate::db::HotSpringRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, HotSpring, HotSpringImage, NewHotSpring, NewImage};
use crate::services::{PendingUpload, images};
use crate::state::AppState;
use crate::validation::{FieldErrors, HotSpringFields, check_images};

/// Creation form template.
#[derive(Template, WebTemplate)]
#[template(path = "hotsprings/new.html")]
pub struct NewTemplate {
    pub current_user: Option<CurrentUser>,
    pub fields: HotSpringFields,
    pub errors: FieldErrors,
}

/// Edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "hotsprings/edit.html")]
pub struct EditTemplate {
    pub current_user: Option<CurrentUser>,
    pub id: HotSpringId,
    pub fields: HotSpringFields,
    pub images: Vec<HotSpringImage>,
    pub errors: FieldErrors,
}

/// Everything a listing form submitted.
#[derive(Debug, Default)]
pub struct ListingSubmission {
    pub fields: HotSpringFields,
    pub files: Vec<PendingUpload>,
    pub delete_image_ids: Vec<String>,
}

impl ListingSubmission {
    /// Read a multipart body. Empty file inputs are skipped; unknown parts are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the body is not valid multipart or
    /// exceeds the body limit.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "title" => submission.fields.title = text(field).await?,
                "description" => submission.fields.description = text(field).await?,
                "price" => submission.fields.price = text(field).await?,
                "location" => submission.fields.location = text(field).await?,
                "deleteImageId" => submission.delete_image_ids.push(text(field).await?),
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let content_type = field.content_type().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await.map_err(bad_multipart)?;
                    if bytes.is_empty() {
                        continue;
                    }
                    submission.files.push(PendingUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                _ => {}
            }
        }

        Ok(submission)
    }

    /// Validate fields and files together. `min_images` is 1 on create, 0 on edit.
    fn validate(&self, min_images: usize) -> Result<NewHotSpring, FieldErrors> {
        let mut errors = FieldErrors::default();
        let listing = self.fields.parse().map_err(|e| errors.merge(e)).ok();
        check_images(&self.files, min_images, &mut errors);

        match listing {
            Some(listing) if errors.is_empty() => Ok(listing),
            _ => Err(errors),
        }
    }

    /// Requested image deletions that parse as ids.
    fn requested_deletions(&self) -> Vec<ExternalImageId> {
        self.delete_image_ids
            .iter()
            .filter_map(|raw| ExternalImageId::parse(raw).ok())
            .collect()
    }
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(bad_multipart)
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

fn fields_of(listing: &HotSpring) -> HotSpringFields {
    HotSpringFields {
        title: listing.title.clone(),
        description: listing.description.clone(),
        price: listing.price.yen().to_string(),
        location: listing.location.clone(),
    }
}

// =============================================================================
// Create
// =============================================================================

/// Display the creation form.
pub async fn new_page(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    NewTemplate {
        current_user: Some(user),
        fields: HotSpringFields::default(),
        errors: FieldErrors::default(),
    }
}

/// Handle the creation form.
///
/// # Errors
///
/// Returns `AppError::ImageHost` if an upload fails and `AppError::Database`
/// if the listing can't be stored. Neither leaves uploaded assets behind.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let submission = ListingSubmission::read(multipart).await?;

    let listing = match submission.validate(1) {
        Ok(listing) => listing,
        Err(errors) => {
            return Ok(NewTemplate {
                current_user: Some(user),
                fields: submission.fields,
                errors,
            }
            .into_response());
        }
    };

    let uploaded = images::upload_all(state.images(), &submission.files).await?;
    let new_images: Vec<NewImage> = uploaded.iter().cloned().map(NewImage::from).collect();

    match HotSpringRepository::new(state.pool())
        .create(user.id, &listing, &new_images)
        .await
    {
        Ok(id) => {
            tracing::info!(hot_spring_id = %id, images = new_images.len(), "Listing created");
            Ok(Redirect::to("/hotsprings?success=created").into_response())
        }
        Err(e) => {
            images::discard(state.images(), &uploaded).await;
            Err(e.into())
        }
    }
}

// =============================================================================
// Edit
// =============================================================================

/// Display the edit form. Only the author gets it.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the listing doesn't exist.
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<HotSpringId>,
) -> Result<Response, AppError> {
    let listing = load_owned(&state, &user, id).await?;
    let listing = match listing {
        Ok(listing) => listing,
        Err(redirect) => return Ok(redirect),
    };

    Ok(EditTemplate {
        current_user: Some(user),
        id,
        fields: fields_of(&listing),
        images: listing.images,
        errors: FieldErrors::default(),
    }
    .into_response())
}

/// Handle the edit form: update fields, append new images, then remove the
/// images marked for deletion (remote first, then local in one batch).
///
/// # Errors
///
/// Returns `AppError::NotFound` if the listing doesn't exist,
/// `AppError::ImageHost` if an upload fails and `AppError::Database` if a
/// write fails.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<HotSpringId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let listing = match load_owned(&state, &user, id).await? {
        Ok(listing) => listing,
        Err(redirect) => return Ok(redirect),
    };

    let submission = ListingSubmission::read(multipart).await?;

    let fields = match submission.validate(0) {
        Ok(fields) => fields,
        Err(errors) => {
            return Ok(EditTemplate {
                current_user: Some(user),
                id,
                fields: submission.fields,
                images: listing.images,
                errors,
            }
            .into_response());
        }
    };

    let uploaded = images::upload_all(state.images(), &submission.files).await?;
    let new_images: Vec<NewImage> = uploaded.iter().cloned().map(NewImage::from).collect();

    if let Err(e) = HotSpringRepository::new(state.pool())
        .update(id, &fields, &new_images)
        .await
    {
        images::discard(state.images(), &uploaded).await;
        return Err(e.into());
    }

    let to_delete = listing.owned_image_ids(&submission.requested_deletions());
    let report = images::remove_images(state.images(), state.pool(), id, &to_delete).await?;

    tracing::info!(
        hot_spring_id = %id,
        added = new_images.len(),
        removed = report.destroyed.len(),
        "Listing updated"
    );

    Ok(Redirect::to(&format!("/hotsprings/{id}?success=updated")).into_response())
}

/// Load a listing and check the user wrote it. A non-author gets a redirect
/// back to the detail page with an error notice.
async fn load_owned(
    state: &AppState,
    user: &CurrentUser,
    id: HotSpringId,
) -> Result<Result<HotSpring, Response>, AppError> {
    let listing = HotSpringRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("hot spring {id}")))?;

    if !user.owns(listing.author_id) {
        tracing::warn!(user_id = %user.id, hot_spring_id = %id, "Non-author tried to edit listing");
        let redirect = Redirect::to(&format!("/hotsprings/{id}?error=not_author"));
        return Ok(Err(redirect.into_response()));
    }

    Ok(Ok(listing))
}
