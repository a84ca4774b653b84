//! The JSON manifest describing one trek to author.
//!
//! ```json
//! {
//!   "basicInfo": { "title": "Mardi Himal", "price": "650", ... },
//!   "services": ["Porter", "Lunch"],
//!   "highlights": ["Sunrise over Annapurna South"],
//!   "activities": [{ "title": "Drive", "description": "...", "type": "TRANSPORTATION",
//!                    "transportType": "CAR", "transportDuration": "PT2H" }],
//!   "images": ["photos/ridge.jpg", "photos/camp.jpg", ...],
//!   "setPrimary": true
//! }
//! ```
//!
//! Set `trekId` to edit an existing trek; `basicInfo` then overrides its
//! step-1 fields and may be omitted.

use std::path::{Path, PathBuf};

use image::ImageFormat;
use serde::Deserialize;
use trek_core::activity::ActivityDraft;
use trek_core::types::DbId;
use trek_core::validation::BasicInfoDraft;
use trek_gateway::UploadFile;

use crate::error::CliError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub trek_id: Option<DbId>,
    #[serde(default)]
    pub basic_info: Option<BasicInfoDraft>,
    /// Service names, matched against the catalog ignoring case.
    #[serde(default)]
    pub services: Vec<String>,
    /// Highlight texts, matched against the catalog ignoring case.
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub activities: Vec<ActivityDraft>,
    /// Image paths, relative to the manifest file.
    #[serde(default)]
    pub images: Vec<PathBuf>,
    /// Make the first uploaded image primary when the gallery has none.
    #[serde(default)]
    pub set_primary: bool,
}

impl Manifest {
    pub fn from_json(raw: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Read every listed image, resolving paths against `base_dir`.
    pub fn read_images(&self, base_dir: &Path) -> Result<Vec<UploadFile>, CliError> {
        self.images
            .iter()
            .map(|p| read_upload(&base_dir.join(p)))
            .collect()
    }
}

/// MIME type of an image, inferred from its file extension.
pub fn image_mime(path: &Path) -> Result<&'static str, CliError> {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .map_err(|_| CliError::UnknownImageType(path.to_path_buf()))
}

/// Load one image from disk as an upload candidate.
pub fn read_upload(path: &Path) -> Result<UploadFile, CliError> {
    let content_type = image_mime(path)?;
    let data = std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadFile::new(file_name, content_type, data))
}
