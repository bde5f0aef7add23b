use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ServerError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    // Build the full path and strip out any `..` components
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(ServerError::Validation(
                    "Path traversal detected".to_string(),
                ));
            }
            _ => {} // RootDir, CurDir, Prefix — skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ServerError::Validation(
            "Path traversal detected".to_string(),
        ));
    }
    Ok(resolved)
}

/// On-disk storage for recipe images.
///
/// Files are laid out as `recipes/<recipe_id>-<uuid>.<ext>` under the media
/// root.  Replaced images are left in place; orphan cleanup is an external
/// concern.
#[derive(Debug, Clone)]
pub struct ImageStore {
    media_root: PathBuf,
    max_size: usize,
}

impl ImageStore {
    pub async fn new(media_root: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(media_root.join("recipes"))
            .await
            .map_err(|e| {
                ServerError::Internal(format!(
                    "Failed to create media directory '{}': {}",
                    media_root.display(),
                    e
                ))
            })?;

        info!(path = %media_root.display(), "Image store initialized");

        Ok(Self {
            media_root,
            max_size,
        })
    }

    /// Validate and persist an uploaded image, returning the media-relative
    /// reference to record on the recipe.
    ///
    /// The payload must decode as an image with the enabled codecs; anything
    /// else is a validation error.
    pub async fn store_image(&self, recipe_id: i64, data: &[u8]) -> Result<String, ServerError> {
        if data.is_empty() {
            return Err(ServerError::Validation("Empty image payload".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::Validation(format!(
                "Image too large: {} bytes (max {})",
                data.len(),
                self.max_size
            )));
        }

        let format = image::guess_format(data)
            .map_err(|_| ServerError::Validation("Not a valid image".to_string()))?;
        image::load_from_memory_with_format(data, format)
            .map_err(|e| ServerError::Validation(format!("Not a valid image: {e}")))?;

        let ext = format.extensions_str().first().copied().unwrap_or("img");
        let reference = format!("recipes/{}-{}.{}", recipe_id, Uuid::new_v4(), ext);
        let path = self.safe_media_path(&reference)?;

        fs::write(&path, data).await.map_err(|e| {
            ServerError::Internal(format!("Failed to write image {reference}: {e}"))
        })?;

        debug!(recipe = recipe_id, path = %reference, size = data.len(), "Stored image");
        Ok(reference)
    }

    /// Read back a stored image by its media-relative reference.
    pub async fn get_image(&self, reference: &str) -> Result<Vec<u8>, ServerError> {
        let path = self.safe_media_path(reference)?;

        if !path.exists() {
            return Err(ServerError::NotFound);
        }

        fs::read(&path)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to read image {reference}: {e}")))
    }

    /// Safe media path that validates against traversal.
    fn safe_media_path(&self, reference: &str) -> Result<PathBuf, ServerError> {
        if reference.contains("..") || reference.contains('\\') {
            return Err(ServerError::Validation(
                "Path traversal detected".to_string(),
            ));
        }
        let target = self.media_root.join(reference);
        ensure_within(&self.media_root, &target)
    }
}
