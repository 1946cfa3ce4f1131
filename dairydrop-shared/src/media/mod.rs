/// Product image hosting
///
/// Route handlers talk to an [`ImageStore`] trait object so the image host can
/// be swapped or switched off. [`cloudinary::CloudinaryStore`] is the
/// production implementation; [`DisabledImageStore`] is used when no host is
/// configured and refuses uploads.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bytes::Bytes;
/// use dairydrop_shared::media::{upload_all, DisabledImageStore, ImageStore, ImageUpload};
///
/// # async fn example() {
/// let store: Arc<dyn ImageStore> = Arc::new(DisabledImageStore);
/// let images = vec![ImageUpload::new("milk.jpg", Some("image/jpeg"), Bytes::from_static(b"..."))];
/// assert!(upload_all(store.as_ref(), images).await.is_err());
/// # }
/// ```

pub mod cloudinary;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use tracing::{info, warn};

/// Maximum number of image files accepted per product request
pub const MAX_IMAGES: usize = 10;

/// Formats the image host accepts
pub const ALLOWED_FORMATS: [&str; 4] = ["jpeg", "jpg", "png", "webp"];

/// Error type for image hosting
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// No image host is configured
    #[error("Image uploads are not configured")]
    NotConfigured,

    /// File is not one of the allowed formats
    #[error("Unsupported image format for '{0}' (allowed: jpeg, jpg, png, webp)")]
    UnsupportedFormat(String),

    /// More files than allowed in one request
    #[error("Too many images: at most {max} allowed, got {got}")]
    TooManyFiles { max: usize, got: usize },

    /// HTTP request to the host failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Host returned an error response
    #[error("Image host error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Host response could not be understood
    #[error("Parse error: {0}")]
    Parse(String),
}

/// An image file received from a client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
        }
    }

    /// Detects the image format from the content type, then the file extension
    ///
    /// Returns None for anything outside [`ALLOWED_FORMATS`].
    pub fn format(&self) -> Option<&'static str> {
        let from_mime = match self.content_type.as_deref() {
            Some("image/jpeg") | Some("image/jpg") => Some("jpg"),
            Some("image/png") => Some("png"),
            Some("image/webp") => Some("webp"),
            _ => None,
        };

        from_mime.or_else(|| {
            let ext = self.file_name.rsplit_once('.')?.1.to_ascii_lowercase();
            ALLOWED_FORMATS.iter().copied().find(|f| *f == ext)
        })
    }
}

/// A hosted image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Public HTTPS URL
    pub url: String,

    /// Host-side identifier used for deletion
    pub public_id: String,
}

/// An image host
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads one image
    async fn upload(&self, image: ImageUpload) -> Result<UploadedImage, MediaError>;

    /// Deletes a previously uploaded image by its public URL
    ///
    /// URLs this store didn't issue are ignored.
    async fn delete_by_url(&self, url: &str) -> Result<(), MediaError>;

    /// Whether uploads can succeed at all
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Image store used when no host is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _image: ImageUpload) -> Result<UploadedImage, MediaError> {
        Err(MediaError::NotConfigured)
    }

    async fn delete_by_url(&self, _url: &str) -> Result<(), MediaError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Validates and uploads images concurrently, returning their URLs in input order
///
/// # Errors
///
/// Fails without uploading anything if there are too many files or any file
/// has an unsupported format. If any upload fails, the ones that succeeded
/// are deleted again before the first error is returned.
pub async fn upload_all(
    store: &dyn ImageStore,
    images: Vec<ImageUpload>,
) -> Result<Vec<String>, MediaError> {
    if images.len() > MAX_IMAGES {
        return Err(MediaError::TooManyFiles {
            max: MAX_IMAGES,
            got: images.len(),
        });
    }
    if let Some(bad) = images.iter().find(|i| i.format().is_none()) {
        return Err(MediaError::UnsupportedFormat(bad.file_name.clone()));
    }
    if !store.is_enabled() {
        return Err(MediaError::NotConfigured);
    }

    let count = images.len();
    let results = join_all(images.into_iter().map(|image| store.upload(image))).await;

    let mut urls = Vec::with_capacity(count);
    let mut first_error = None;
    for result in results {
        match result {
            Ok(uploaded) => urls.push(uploaded.url),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        warn!(uploaded = urls.len(), count, error = %e, "Image upload failed, removing partial uploads");
        delete_all_best_effort(store, &urls).await;
        return Err(e);
    }

    info!(count, "Uploaded product images");
    Ok(urls)
}

/// Deletes hosted images, logging and skipping failures
pub async fn delete_all_best_effort(store: &dyn ImageStore, urls: &[String]) {
    for url in urls {
        if let Err(e) = store.delete_by_url(url).await {
            warn!(url = %url, error = %e, "Failed to delete hosted image");
        }
    }
}
