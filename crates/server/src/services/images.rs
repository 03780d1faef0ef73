//! Product image hosting.
//!
//! Images are uploaded to Cloudinary with signed upload requests and
//! referenced afterwards by their `secure_url`. When no Cloudinary
//! credentials are configured every upload fails with
//! [`ImageHostError::NotConfigured`].

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

/// Folder every product image is stored under.
pub const PRODUCT_FOLDER: &str = "products";

const CLOUDINARY_API: &str = "https://api.cloudinary.com";

/// Errors from the image host.
#[derive(Debug, Error)]
pub enum ImageHostError {
    #[error("Image hosting is not configured")]
    NotConfigured,

    /// The host answered with a non-success status.
    #[error("image host returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("image host request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected image host response: {0}")]
    InvalidResponse(String),
}

/// An uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Somewhere product images can be stored.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload one image into `folder`, returning its public URL.
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String, ImageHostError>;
}

/// Image host used when no credentials are configured.
pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload(&self, _image: ImageUpload, _folder: &str) -> Result<String, ImageHostError> {
        Err(ImageHostError::NotConfigured)
    }
}

/// Client for the Cloudinary upload API.
pub struct CloudinaryClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: SecretString,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Deserialize)]
struct UploadErrorBody {
    error: UploadErrorDetail,
}

#[derive(Deserialize)]
struct UploadErrorDetail {
    message: String,
}

impl CloudinaryClient {
    /// Create a client for the configured cloud.
    #[must_use]
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self::with_api_base(config, CLOUDINARY_API)
    }

    /// Create a client against a different API base URL.
    #[must_use]
    pub fn with_api_base(config: &CloudinaryConfig, api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!(
                "{}/v1_1/{}/image/upload",
                api_base.trim_end_matches('/'),
                config.cloud_name
            ),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }
}

/// Signature over the sorted upload parameters followed by the API secret.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(key, _)| *key);
    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    #[tracing::instrument(skip(self, image), fields(file = %image.file_name, size = image.bytes.len()))]
    async fn upload(&self, image: ImageUpload, folder: &str) -> Result<String, ImageHostError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", folder), ("timestamp", timestamp.as_str())],
            self.api_secret.expose_secret(),
        );

        let mut file = reqwest::multipart::Part::bytes(image.bytes).file_name(image.file_name);
        if let Some(content_type) = image.content_type {
            file = file.mime_str(&content_type)?;
        }
        let form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_owned())
            .text("signature", signature);

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<UploadErrorBody>()
                .await
                .map_or_else(|_| "upload failed".to_owned(), |body| body.error.message);
            tracing::warn!(status = status.as_u16(), %message, "Image upload rejected");
            return Err(ImageHostError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageHostError::InvalidResponse(e.to_string()))?;
        Ok(body.secure_url)
    }
}
