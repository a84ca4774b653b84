//! Primary-Flagged Gallery Manager.
//!
//! Files are staged locally, filtered by MIME type and size, and sent in
//! one batch once at least [`MIN_UPLOAD_BATCH`] are staged. The persisted
//! list is always re-read after an upload or a primary toggle since the
//! backend decides the primary assignment.

use std::sync::Arc;

use trek_core::image::{primary_image, validate_single_primary, TrekImage};
use trek_core::types::DbId;
use trek_core::upload::{check_batch_size, check_candidate, StagingRejection, MIN_UPLOAD_BATCH};
use trek_core::validation::GalleryDraft;
use trek_gateway::{ImageGateway, ProgressReporter, UploadFile};

use crate::error::AuthoringError;
use crate::remote::{expect_data, expect_success};

/// Outcome of [`Gallery::stage_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Names of files added to the buffer.
    pub accepted: Vec<String>,
    /// Names of files turned away, with the reason.
    pub rejected: Vec<(String, StagingRejection)>,
}

impl StageReport {
    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}

pub struct Gallery<G: ImageGateway> {
    gateway: Arc<G>,
    trek_id: DbId,
    images: Vec<TrekImage>,
    staged: Vec<UploadFile>,
    progress: Option<ProgressReporter>,
    loaded: bool,
}

impl<G: ImageGateway> Gallery<G> {
    pub fn new(gateway: Arc<G>, trek_id: DbId) -> Self {
        Self {
            gateway,
            trek_id,
            images: Vec::new(),
            staged: Vec::new(),
            progress: None,
            loaded: false,
        }
    }

    pub fn trek_id(&self) -> DbId {
        self.trek_id
    }

    /// Persisted images as last read from the backend.
    pub fn images(&self) -> &[TrekImage] {
        &self.images
    }

    pub fn primary(&self) -> Option<&TrekImage> {
        primary_image(&self.images)
    }

    /// Files waiting for [`commit_upload`](Self::commit_upload).
    pub fn staged(&self) -> &[UploadFile] {
        &self.staged
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Upload progress is published here during [`commit_upload`](Self::commit_upload).
    pub fn set_progress_reporter(&mut self, reporter: Option<ProgressReporter>) {
        self.progress = reporter;
    }

    pub fn gallery_draft(&self) -> GalleryDraft {
        GalleryDraft {
            persisted_images: self.images.len(),
            staged_files: self.staged.len(),
        }
    }

    // -- staging buffer (local only) --

    /// Add files to the buffer, turning away non-images and oversized files.
    pub fn stage_files(&mut self, files: impl IntoIterator<Item = UploadFile>) -> StageReport {
        let mut report = StageReport::default();
        for file in files {
            match check_candidate(&file.content_type, file.size()) {
                Ok(()) => {
                    report.accepted.push(file.file_name.clone());
                    self.staged.push(file);
                }
                Err(reason) => {
                    tracing::debug!(file = %file.file_name, reason = %reason, "File not staged");
                    report.rejected.push((file.file_name, reason));
                }
            }
        }
        report
    }

    /// Drop one staged file by its position in the buffer.
    pub fn unstage(&mut self, index: usize) -> Option<UploadFile> {
        (index < self.staged.len()).then(|| self.staged.remove(index))
    }

    pub fn clear_staged(&mut self) {
        self.staged.clear();
    }

    // -- remote --

    /// Re-read the persisted gallery.
    ///
    /// A listing with more than one primary image is refused and the
    /// previous local list is kept.
    pub async fn refresh(&mut self) -> Result<(), AuthoringError> {
        let images = expect_data(
            self.gateway.list_images(self.trek_id).await,
            "Load images",
        )?;
        if let Err(e) = validate_single_primary(&images) {
            tracing::error!(trek_id = self.trek_id, error = %e, "Backend returned several primary images");
            return Err(AuthoringError::Inconsistent(e.to_string()));
        }
        tracing::debug!(trek_id = self.trek_id, count = images.len(), "Images loaded");
        self.images = images;
        self.loaded = true;
        Ok(())
    }

    pub async fn ensure_loaded(&mut self) -> Result<(), AuthoringError> {
        if self.loaded {
            return Ok(());
        }
        self.refresh().await
    }

    /// Send every staged file in one request, then re-read the gallery.
    ///
    /// Fewer than [`MIN_UPLOAD_BATCH`] staged files is a validation
    /// failure and nothing is sent. Returns the number of images uploaded.
    pub async fn commit_upload(&mut self) -> Result<usize, AuthoringError> {
        if let Err(e) = check_batch_size(self.staged.len()) {
            tracing::debug!(
                trek_id = self.trek_id,
                staged = self.staged.len(),
                required = MIN_UPLOAD_BATCH,
                "Upload refused"
            );
            return Err(AuthoringError::field("images", e.to_string()));
        }

        let uploaded = expect_data(
            self.gateway
                .upload_images(self.trek_id, &self.staged, self.progress.as_ref())
                .await,
            "Upload images",
        )?;
        let count = uploaded.len();
        self.staged.clear();
        tracing::info!(trek_id = self.trek_id, count, "Images uploaded");

        self.refresh()
            .await
            .map_err(|e| AuthoringError::PartiallyCompleted {
                completed: format!("{count} images uploaded; gallery not refreshed"),
                message: e.message(),
            })?;
        Ok(count)
    }

    /// Ask the backend to flip the primary flag of `image_id`, then re-read
    /// the gallery. A failed re-read after the flip is reported as
    /// [`AuthoringError::PartiallyCompleted`].
    pub async fn toggle_primary(&mut self, image_id: DbId) -> Result<(), AuthoringError> {
        self.find(image_id)?;
        let image = expect_data(
            self.gateway.toggle_primary(self.trek_id, image_id).await,
            "Set primary image",
        )?;
        tracing::info!(
            trek_id = self.trek_id,
            image_id,
            is_primary = image.is_primary,
            "Primary image toggled"
        );
        self.refresh()
            .await
            .map_err(|e| AuthoringError::PartiallyCompleted {
                completed: "primary image changed; gallery not refreshed".to_string(),
                message: e.message(),
            })
    }

    /// Delete a non-primary image.
    ///
    /// The primary image is refused locally without contacting the backend.
    pub async fn delete(&mut self, image_id: DbId) -> Result<(), AuthoringError> {
        if self.find(image_id)?.is_primary {
            tracing::warn!(trek_id = self.trek_id, image_id, "Refusing to delete primary image");
            return Err(AuthoringError::PrimaryImageProtected(image_id));
        }
        expect_success(
            self.gateway.delete_image(self.trek_id, image_id).await,
            "Delete image",
        )?;
        self.images.retain(|img| img.id != image_id);
        tracing::info!(trek_id = self.trek_id, image_id, "Image deleted");
        Ok(())
    }

    fn find(&self, image_id: DbId) -> Result<&TrekImage, AuthoringError> {
        self.images
            .iter()
            .find(|img| img.id == image_id)
            .ok_or(AuthoringError::NotFound {
                entity: "Image",
                id: image_id,
            })
    }
}
