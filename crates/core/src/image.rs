//! Trek gallery images and the single-primary rule.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// An image row as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrekImage {
    pub id: DbId,
    pub trek_id: DbId,
    /// Storage path assigned by the backend.
    pub path: String,
    pub is_primary: bool,
}

/// Number of images flagged primary.
pub fn primary_count(images: &[TrekImage]) -> usize {
    images.iter().filter(|img| img.is_primary).count()
}

/// The primary image, if any.
pub fn primary_image(images: &[TrekImage]) -> Option<&TrekImage> {
    images.iter().find(|img| img.is_primary)
}

/// Check that at most one image is primary.
pub fn validate_single_primary(images: &[TrekImage]) -> Result<(), CoreError> {
    let count = primary_count(images);
    if count > 1 {
        return Err(CoreError::Internal(format!(
            "Gallery has {count} primary images; at most one is allowed"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn img(id: DbId, is_primary: bool) -> TrekImage {
        TrekImage {
            id,
            trek_id: 1,
            path: format!("treks/1/{id}.jpg"),
            is_primary,
        }
    }

    #[test]
    fn zero_or_one_primary_is_valid() {
        assert!(validate_single_primary(&[]).is_ok());
        assert!(validate_single_primary(&[img(1, false), img(2, false)]).is_ok());
        assert!(validate_single_primary(&[img(1, true), img(2, false)]).is_ok());
    }

    #[test]
    fn two_primaries_are_rejected() {
        assert!(validate_single_primary(&[img(1, true), img(2, true)]).is_err());
    }

    #[test]
    fn primary_image_finds_flagged_entry() {
        let images = [img(1, false), img(2, true), img(3, false)];
        assert_eq!(primary_image(&images).map(|i| i.id), Some(2));
        assert_eq!(primary_count(&images), 1);
    }
}
