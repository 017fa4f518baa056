use std::io::Cursor;

use anyhow::Context;
use bytes::Bytes;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::repo_types::ProfileImage;
use crate::error::AppError;
use crate::state::AppState;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Every stored image is re-encoded to this type.
pub const STORED_CONTENT_TYPE: &str = "image/png";

const UNSUPPORTED_IMAGE: &str = "Uploaded file is not a supported image format";
const IMAGE_TOO_LARGE: &str = "The image is too large. The maximum size is 5 MB.";
const IMAGE_NOT_DELETED: &str =
    "The image could not be deleted. Something went wrong with your request.";

/// Where an image belongs; each kind has its own key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Avatar,
    Cover,
    Project,
}

/// How an upload is scaled before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    /// Exactly `width` x `height`, cropping the overflow.
    Fill { width: u32, height: u32 },
    /// Scaled to fit within the box, aspect ratio kept.
    Inside { width: u32, height: u32 },
}

impl ImageKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ImageKind::Avatar => "avatars",
            ImageKind::Cover => "user-covers",
            ImageKind::Project => "project-images",
        }
    }

    pub fn resize(self) -> Resize {
        match self {
            ImageKind::Avatar => Resize::Fill { width: 480, height: 480 },
            ImageKind::Cover => Resize::Fill { width: 1200, height: 300 },
            ImageKind::Project => Resize::Inside { width: 1200, height: 800 },
        }
    }
}

impl From<ProfileImage> for ImageKind {
    fn from(image: ProfileImage) -> Self {
        match image {
            ProfileImage::Avatar => ImageKind::Avatar,
            ProfileImage::Cover => ImageKind::Cover,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
}

impl UploadItem {
    /// Accepts jpeg/jpg/png/webp up to [`MAX_IMAGE_BYTES`].
    pub fn new(body: Bytes, content_type: &str) -> Result<Self, AppError> {
        if !accepted_mime(content_type) {
            return Err(AppError::BadRequest(UNSUPPORTED_IMAGE.into()));
        }
        if body.len() > MAX_IMAGE_BYTES {
            return Err(AppError::BadRequest(IMAGE_TOO_LARGE.into()));
        }
        Ok(Self { body })
    }
}

fn accepted_mime(ct: &str) -> bool {
    matches!(ct, "image/jpeg" | "image/jpg" | "image/png" | "image/webp")
}

fn object_key(kind: ImageKind, owner_id: i64) -> String {
    format!("{}/{}-{}.png", kind.prefix(), owner_id, Uuid::new_v4())
}

/// Decodes the upload, scales it for `kind` and re-encodes it as PNG.
pub fn normalize(kind: ImageKind, body: &[u8]) -> Result<Vec<u8>, AppError> {
    let decoded =
        image::load_from_memory(body).map_err(|_| AppError::BadRequest(UNSUPPORTED_IMAGE.into()))?;
    let resized: DynamicImage = match kind.resize() {
        Resize::Fill { width, height } => decoded.resize_to_fill(width, height, FilterType::Lanczos3),
        Resize::Inside { width, height } => decoded.resize(width, height, FilterType::Lanczos3),
    };
    let mut out = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

/// Scales and stores the image, returning its public URL.
pub async fn upload(
    st: &AppState,
    kind: ImageKind,
    owner_id: i64,
    item: UploadItem,
) -> Result<String, AppError> {
    let body = item.body;
    let png = tokio::task::spawn_blocking(move || normalize(kind, &body))
        .await
        .context("image resize task")??;
    let key = object_key(kind, owner_id);
    st.storage
        .put_object(&key, Bytes::from(png), STORED_CONTENT_TYPE)
        .await
        .with_context(|| format!("upload image {key}"))?;
    info!(%key, "image stored");
    Ok(st.storage.public_url(&key))
}

/// Deletes the object behind `url`. URLs not served by our storage (or
/// empty) are left alone.
pub async fn remove(st: &AppState, url: &str) -> Result<(), AppError> {
    let Some(key) = st.storage.key_from_url(url) else {
        return Ok(());
    };
    st.storage.delete_object(key).await.map_err(|e| {
        warn!(error = %e, %key, "image delete failed");
        AppError::Server(IMAGE_NOT_DELETED.into())
    })?;
    info!(%key, "image deleted");
    Ok(())
}

/// Like [`remove`] but only logs failures. Used once the owning record is
/// already gone or has moved on to a new image, or when a new upload could
/// not be attached to its record.
pub async fn discard(st: &AppState, url: &str) {
    if let Err(e) = remove(st, url).await {
        warn!(error = %e, "stale image left in storage");
    }
}
