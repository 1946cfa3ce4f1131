/// Cloudinary image host client
///
/// Uses signed uploads: the request parameters are sorted, joined as
/// `key=value&...`, suffixed with the API secret and hashed with SHA-256.
/// Uploads land in the `dairy-drop` folder and are limited to 800x600.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{ImageStore, ImageUpload, MediaError, UploadedImage, ALLOWED_FORMATS};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Folder all product images are stored under
pub const FOLDER: &str = "dairy-drop";

/// Incoming transformation applied on upload (fit within 800x600)
pub const TRANSFORMATION: &str = "c_limit,h_600,w_800";

/// Cloudinary account credentials
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Cloudinary-backed [`ImageStore`]
#[derive(Clone)]
pub struct CloudinaryStore {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: CloudinaryConfig,
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
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, MediaError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner { http, config }),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", API_BASE, self.inner.config.cloud_name, action)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, MediaError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error.message)
            .unwrap_or(text);

        Err(MediaError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, image: ImageUpload) -> Result<UploadedImage, MediaError> {
        let format = image
            .format()
            .ok_or_else(|| MediaError::UnsupportedFormat(image.file_name.clone()))?;
        let mime = if format == "jpg" { "image/jpeg".to_string() } else { format!("image/{format}") };

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let allowed = ALLOWED_FORMATS.join(",");
        let params = [
            ("allowed_formats", allowed.as_str()),
            ("folder", FOLDER),
            ("timestamp", timestamp.as_str()),
            ("transformation", TRANSFORMATION),
        ];
        let signature = sign(&params, &self.inner.config.api_secret);

        let file = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&mime)?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.inner.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (key, value) in params {
            form = form.text(key, value.to_string());
        }

        let response = self
            .inner
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))?;

        debug!(public_id = %body.public_id, "Image uploaded");
        Ok(UploadedImage {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), MediaError> {
        let Some(public_id) = public_id_from_url(url) else {
            return Ok(());
        };

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [("public_id", public_id.as_str()), ("timestamp", timestamp.as_str())];
        let signature = sign(&params, &self.inner.config.api_secret);

        let response = self
            .inner
            .http
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.inner.config.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await?;

        let body: DestroyResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| MediaError::Parse(e.to_string()))?;

        debug!(public_id = %public_id, result = %body.result, "Image destroy requested");
        Ok(())
    }
}

/// Signs request parameters: sorted `key=value` pairs joined by `&`, then the secret, SHA-256 hex
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extracts the public ID from a Cloudinary delivery URL
///
/// `https://res.cloudinary.com/demo/image/upload/v1712/dairy-drop/abc.jpg`
/// yields `dairy-drop/abc`. Returns None for URLs without an `/upload/` segment.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/upload/")?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);

    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(first) = segments.first() {
        let is_version = first.len() > 1
            && first.starts_with('v')
            && first[1..].chars().all(|c| c.is_ascii_digit());
        if is_version {
            segments.remove(0);
        }
    }

    let last = segments.pop()?;
    let stem = last.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(last);
    if stem.is_empty() {
        return None;
    }
    segments.push(stem);

    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_id_from_url() {
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/v1712345/dairy-drop/abc123.jpg"),
            Some("dairy-drop/abc123".to_string())
        );
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/dairy-drop/xyz.webp?x=1"),
            Some("dairy-drop/xyz".to_string())
        );
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/demo/image/upload/v99/plain"),
            Some("plain".to_string())
        );
    }

    #[test]
    fn test_public_id_from_foreign_url() {
        assert_eq!(public_id_from_url("https://example.com/images/milk.jpg"), None);
        assert_eq!(public_id_from_url("https://res.cloudinary.com/demo/image/upload/"), None);
    }

    #[test]
    fn test_sign_sorts_and_skips_empty() {
        let a = sign(&[("timestamp", "1700000000"), ("folder", "dairy-drop")], "secret");
        let b = sign(&[("folder", "dairy-drop"), ("timestamp", "1700000000"), ("eager", "")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=dairy-drop&timestamp=1700000000secret");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_sign_depends_on_secret() {
        let params = [("public_id", "dairy-drop/abc"), ("timestamp", "1")];
        assert_ne!(sign(&params, "one"), sign(&params, "two"));
    }
}
