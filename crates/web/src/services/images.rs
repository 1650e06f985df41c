//! Uploading listing images to the image host and removing them again.
//!
//! Every upload yields one [`UploadedImage`] carrying both the public URL and
//! the host's id, so there is nothing to line up after the fact.
//!
//! Remote and local deletion are separate steps with no shared rollback.
//! Remote failures are collected into a [`DeletionReport`], logged and sent
//! to Sentry; local records are removed regardless.

use std::future::Future;

use axum::body::Bytes;
use sqlx::PgPool;
use tracing::instrument;

use yelp_hotspring_core::{ExternalImageId, HotSpringId};

use crate::db::{HotSpringRepository, RepositoryError};
use crate::models::NewImage;

pub use super::cloudinary::ImageHostError;

/// A validated file from a listing form, not yet sent anywhere.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Result of one successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Public HTTPS URL of the stored asset.
    pub url: String,
    /// The host's identifier, needed to delete the asset later.
    pub external_id: ExternalImageId,
}

impl From<UploadedImage> for NewImage {
    fn from(image: UploadedImage) -> Self {
        Self {
            url: image.url,
            external_id: image.external_id,
        }
    }
}

/// A remote image store.
pub trait ImageHost: Send + Sync {
    /// Store one file and return where it ended up.
    fn upload(
        &self,
        file: &PendingUpload,
    ) -> impl Future<Output = Result<UploadedImage, ImageHostError>> + Send;

    /// Remove one stored asset.
    fn destroy(
        &self,
        external_id: &ExternalImageId,
    ) -> impl Future<Output = Result<(), ImageHostError>> + Send;
}

/// Outcome of a best-effort batch of remote deletions.
#[derive(Debug, Default)]
pub struct DeletionReport {
    pub destroyed: Vec<ExternalImageId>,
    pub failed: Vec<(ExternalImageId, String)>,
}

impl DeletionReport {
    /// Whether every requested asset was removed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Upload files one after another, in form order.
///
/// If any upload fails, the assets already uploaded in this call are
/// destroyed before the error is returned.
///
/// # Errors
///
/// Returns the first `ImageHostError` encountered.
#[instrument(skip_all, fields(count = files.len()))]
pub async fn upload_all<H: ImageHost>(
    host: &H,
    files: &[PendingUpload],
) -> Result<Vec<UploadedImage>, ImageHostError> {
    let mut uploaded = Vec::with_capacity(files.len());

    for file in files {
        match host.upload(file).await {
            Ok(image) => uploaded.push(image),
            Err(err) => {
                tracing::warn!(
                    file_name = %file.file_name,
                    error = %err,
                    already_uploaded = uploaded.len(),
                    "Image upload failed, discarding earlier uploads"
                );
                discard(host, &uploaded).await;
                return Err(err);
            }
        }
    }

    Ok(uploaded)
}

/// Destroy assets uploaded during a request that is being abandoned.
pub async fn discard<H: ImageHost>(host: &H, uploaded: &[UploadedImage]) -> DeletionReport {
    let ids: Vec<ExternalImageId> = uploaded.iter().map(|u| u.external_id.clone()).collect();
    destroy_all(host, &ids).await
}

/// Destroy each asset, continuing past failures.
#[instrument(skip_all, fields(count = external_ids.len()))]
pub async fn destroy_all<H: ImageHost>(
    host: &H,
    external_ids: &[ExternalImageId],
) -> DeletionReport {
    let mut report = DeletionReport::default();

    for external_id in external_ids {
        match host.destroy(external_id).await {
            Ok(()) => report.destroyed.push(external_id.clone()),
            Err(err) => {
                let event_id = sentry::capture_error(&err);
                tracing::error!(
                    external_id = %external_id,
                    error = %err,
                    sentry_event_id = %event_id,
                    "Failed to delete remote image"
                );
                report.failed.push((external_id.clone(), err.to_string()));
            }
        }
    }

    report
}

/// Remove images from a listing: remote assets first, then the local
/// records in one batch.
///
/// # Errors
///
/// Returns `RepositoryError` if the local batch delete fails. Remote
/// failures are only reported.
pub async fn remove_images<H: ImageHost>(
    host: &H,
    pool: &PgPool,
    hot_spring_id: HotSpringId,
    external_ids: &[ExternalImageId],
) -> Result<DeletionReport, RepositoryError> {
    if external_ids.is_empty() {
        return Ok(DeletionReport::default());
    }

    let report = destroy_all(host, external_ids).await;
    let removed = HotSpringRepository::new(pool)
        .delete_images(hot_spring_id, external_ids)
        .await?;

    tracing::info!(
        hot_spring_id = %hot_spring_id,
        removed,
        remote_failures = report.failed.len(),
        "Removed listing images"
    );

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// In-memory host that records calls and fails on request.
    #[derive(Default)]
    struct FakeHost {
        calls: Mutex<Vec<String>>,
        fail_upload_of: Option<&'static str>,
        fail_destroy_of: Option<&'static str>,
    }

    impl FakeHost {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ImageHost for FakeHost {
        async fn upload(&self, file: &PendingUpload) -> Result<UploadedImage, ImageHostError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upload:{}", file.file_name));

            if self.fail_upload_of == Some(file.file_name.as_str()) {
                return Err(ImageHostError::Api {
                    status: 500,
                    message: "upload rejected".to_owned(),
                });
            }

            let id = format!("HotSprings/{}", file.file_name);
            Ok(UploadedImage {
                url: format!("https://res.cloudinary.com/demo/image/upload/{id}.jpg"),
                external_id: ExternalImageId::parse(&id).unwrap(),
            })
        }

        async fn destroy(&self, external_id: &ExternalImageId) -> Result<(), ImageHostError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("destroy:{external_id}"));

            if self.fail_destroy_of == Some(external_id.as_str()) {
                return Err(ImageHostError::Api {
                    status: 404,
                    message: "not found".to_owned(),
                });
            }
            Ok(())
        }
    }

    fn file(name: &str) -> PendingUpload {
        PendingUpload {
            file_name: name.to_owned(),
            content_type: "image/jpeg".to_owned(),
            bytes: Bytes::from_static(b"\xff\xd8\xff"),
        }
    }

    fn id(s: &str) -> ExternalImageId {
        ExternalImageId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_upload_all_pairs_url_and_id_in_order() {
        let host = FakeHost::default();

        let uploaded = upload_all(&host, &[file("a"), file("b"), file("c")])
            .await
            .unwrap();

        let ids: Vec<&str> = uploaded.iter().map(|u| u.external_id.as_str()).collect();
        assert_eq!(ids, vec!["HotSprings/a", "HotSprings/b", "HotSprings/c"]);
        for image in &uploaded {
            assert!(image.url.contains(image.external_id.as_str()));
        }
    }

    #[tokio::test]
    async fn test_upload_all_discards_earlier_uploads_on_failure() {
        let host = FakeHost {
            fail_upload_of: Some("c"),
            ..FakeHost::default()
        };

        let result = upload_all(&host, &[file("a"), file("b"), file("c"), file("d")]).await;

        assert!(result.is_err());
        assert_eq!(
            host.calls(),
            vec![
                "upload:a",
                "upload:b",
                "upload:c",
                "destroy:HotSprings/a",
                "destroy:HotSprings/b",
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_all_empty_is_noop() {
        let host = FakeHost::default();
        let uploaded = upload_all(&host, &[]).await.unwrap();

        assert!(uploaded.is_empty());
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_all_continues_past_failures() {
        let host = FakeHost {
            fail_destroy_of: Some("HotSprings/b"),
            ..FakeHost::default()
        };

        let report = destroy_all(
            &host,
            &[id("HotSprings/a"), id("HotSprings/b"), id("HotSprings/c")],
        )
        .await;

        assert!(!report.is_complete());
        assert_eq!(report.destroyed, vec![id("HotSprings/a"), id("HotSprings/c")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, id("HotSprings/b"));
    }

    #[test]
    fn test_uploaded_image_into_new_image() {
        let image = UploadedImage {
            url: "https://res.cloudinary.com/demo/x.jpg".to_owned(),
            external_id: id("HotSprings/x"),
        };

        let new_image: NewImage = image.into();
        assert_eq!(new_image.url, "https://res.cloudinary.com/demo/x.jpg");
        assert_eq!(new_image.external_id, id("HotSprings/x"));
    }
}
