//! Client-side upload rules for the trek gallery.
//!
//! Both rules are enforced before any network call. The backend is not
//! relied upon to reject undersized batches or oversized files.

use crate::error::CoreError;

/// Minimum number of files in one upload batch.
pub const MIN_UPLOAD_BATCH: usize = 4;

/// Maximum size of a single uploaded file (5 MB).
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Why a file was not accepted into the pending-upload buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StagingRejection {
    #[error("'{content_type}' is not an image type")]
    NotAnImage { content_type: String },

    #[error("file is {bytes} bytes; the limit is {MAX_IMAGE_BYTES} bytes")]
    TooLarge { bytes: u64 },
}

/// Check a single candidate file against the MIME and size rules.
pub fn check_candidate(content_type: &str, bytes: u64) -> Result<(), StagingRejection> {
    let is_image = content_type
        .trim()
        .to_ascii_lowercase()
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty());
    if !is_image {
        return Err(StagingRejection::NotAnImage {
            content_type: content_type.to_string(),
        });
    }
    if bytes > MAX_IMAGE_BYTES {
        return Err(StagingRejection::TooLarge { bytes });
    }
    Ok(())
}

/// Check that a batch is large enough to upload.
pub fn check_batch_size(count: usize) -> Result<(), CoreError> {
    if count < MIN_UPLOAD_BATCH {
        return Err(CoreError::Validation(format!(
            "At least {MIN_UPLOAD_BATCH} images are required per upload, {count} staged"
        )));
    }
    Ok(())
}
