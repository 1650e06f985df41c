//! Cloudinary upload API client.
//!
//! Signed uploads and deletions against the REST API. A request is signed by
//! sorting its parameters by name, joining them as `k=v&k=v`, appending the
//! API secret and taking the SHA-256 hex digest. `file`, `api_key` and
//! `signature_algorithm` are sent but never signed.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use yelp_hotspring_core::ExternalImageId;

use super::images::{ImageHost, PendingUpload, UploadedImage};
use crate::config::CloudinaryConfig;

/// Request timeout for upload and destroy calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to the image host.
#[derive(Debug, Error)]
pub enum ImageHostError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Cloudinary API client.
///
/// Created once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    upload_url: String,
    destroy_url: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl CloudinaryClient {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, ImageHostError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base = config.api_base.as_str().trim_end_matches('/');
        let resource_url = format!("{base}/{}/image", config.cloud_name);

        Ok(Self {
            client,
            upload_url: format!("{resource_url}/upload"),
            destroy_url: format!("{resource_url}/destroy"),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        })
    }

    /// Sign a set of parameters with the API secret.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        sign(params, self.api_secret.expose_secret())
    }

    /// Turn a non-success response into an `Api` error, keeping Cloudinary's
    /// own message when the body has one.
    async fn api_error(response: reqwest::Response) -> ImageHostError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        ImageHostError::Api { status, message }
    }
}

impl ImageHost for CloudinaryClient {
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    async fn upload(&self, file: &PendingUpload) -> Result<UploadedImage, ImageHostError> {
        let timestamp = unix_timestamp();
        let signature = self.sign(&[
            ("folder", self.folder.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;

        let form = Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("folder", self.folder.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageHostError::Parse(e.to_string()))?;

        let external_id = ExternalImageId::parse(&uploaded.public_id)
            .map_err(|e| ImageHostError::Parse(e.to_string()))?;

        tracing::debug!(external_id = %external_id, "Image uploaded");

        Ok(UploadedImage {
            url: uploaded.secure_url,
            external_id,
        })
    }

    #[instrument(skip(self))]
    async fn destroy(&self, external_id: &ExternalImageId) -> Result<(), ImageHostError> {
        let timestamp = unix_timestamp();
        let signature = self.sign(&[
            ("public_id", external_id.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let params = [
            ("public_id", external_id.as_str()),
            ("api_key", self.api_key.as_str()),
            ("timestamp", timestamp.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self
            .client
            .post(&self.destroy_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| ImageHostError::Parse(e.to_string()))?;

        // "not found" comes back with a 200
        if destroyed.result != "ok" {
            return Err(ImageHostError::Api {
                status: 200,
                message: format!("destroy returned \"{}\"", destroyed.result),
            });
        }

        Ok(())
    }
}

/// Current Unix time in seconds, as Cloudinary expects it.
fn unix_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Build the string that gets hashed: sorted `k=v` pairs joined by `&`.
fn string_to_sign(params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);
    sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// SHA-256 hex signature of `params` under `secret`.
fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;

    use super::*;

    #[test]
    fn test_string_to_sign_sorts_params() {
        let s = string_to_sign(&[("timestamp", "1315060510"), ("folder", "HotSprings")]);
        assert_eq!(s, "folder=HotSprings&timestamp=1315060510");
    }

    #[test]
    fn test_sign_known_vector() {
        let signature = sign(
            &[("timestamp", "1315060510"), ("folder", "HotSprings")],
            "abcd",
        );
        assert_eq!(
            signature,
            "e568d21404a02299af09fd64d14fe891c5402c166d4ddfb73cee553f07d5cd49"
        );
    }

    #[test]
    fn test_sign_depends_on_secret() {
        let params = [("public_id", "HotSprings/abc"), ("timestamp", "1700000000")];
        assert_ne!(sign(&params, "first"), sign(&params, "second"));
        assert_eq!(sign(&params, "first").len(), 64);
    }

    #[test]
    fn test_client_urls() {
        let config = CloudinaryConfig {
            cloud_name: "demo-cloud".to_string(),
            api_key: "123456789012345".to_string(),
            api_secret: SecretString::from("q8Zr1vN3xK0pL7sT2mW9yB4c"),
            folder: "HotSprings".to_string(),
            api_base: Url::parse("https://api.cloudinary.com/v1_1/").unwrap(),
        };

        let client = CloudinaryClient::new(&config).unwrap();
        assert_eq!(
            client.upload_url,
            "https://api.cloudinary.com/v1_1/demo-cloud/image/upload"
        );
        assert_eq!(
            client.destroy_url,
            "https://api.cloudinary.com/v1_1/demo-cloud/image/destroy"
        );
    }
}
