//! Drives the authoring wizard through all five steps from a manifest.

use std::sync::Arc;

use trek_authoring::{AttachmentSet, AuthoringError, WizardController};
use trek_core::catalog::{CatalogEntity, HighlightFields, ServiceFields};
use trek_core::types::DbId;
use trek_core::wizard::WizardStep;
use trek_gateway::{CatalogGateway, Gateway, ProgressReporter, UploadFile};

use crate::error::CliError;
use crate::manifest::Manifest;

/// What the run left on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub trek_id: DbId,
    pub services: usize,
    pub highlights: usize,
    pub activities: usize,
    pub images: usize,
    pub primary_image: Option<DbId>,
}

/// Author one trek end to end. Stops at the first failure.
pub async fn run<G: Gateway>(
    gateway: Arc<G>,
    manifest: Manifest,
    uploads: Vec<UploadFile>,
    progress: Option<ProgressReporter>,
) -> Result<Summary, CliError> {
    let mut wizard = match manifest.trek_id {
        Some(trek_id) => WizardController::resume(gateway, trek_id).await?,
        None => WizardController::new(gateway),
    };
    if let Some(draft) = manifest.basic_info {
        *wizard.basic_info_mut() = draft;
    }

    // Step 1 -> 2
    wizard.next().await?;
    let trek_id = wizard
        .trek_id()
        .ok_or(AuthoringError::StepLocked {
            step: WizardStep::BasicInfo,
            reason: "the trek was not saved".to_string(),
        })?;
    tracing::info!(trek_id, "Basic information saved");

    // Step 2 -> 3
    let outcome = attach_all(wizard.services()?, &manifest.services, ServiceFields::new).await;
    wizard.record(outcome)?;
    wizard.next().await?;

    // Step 3 -> 4
    let outcome = attach_all(wizard.highlights()?, &manifest.highlights, HighlightFields::new).await;
    wizard.record(outcome)?;
    wizard.next().await?;

    // Step 4 -> 5
    for draft in manifest.activities {
        let outcome = wizard.activities()?.append(draft).await;
        wizard.record(outcome)?;
    }
    wizard.next().await?;

    // Step 5
    let gallery = wizard.gallery()?;
    gallery.set_progress_reporter(progress);
    let report = gallery.stage_files(uploads);
    if let Some((file, reason)) = report.rejected.into_iter().next() {
        return Err(CliError::Staging { file, reason });
    }
    if !gallery.staged().is_empty() {
        let outcome = gallery.commit_upload().await;
        wizard.record(outcome)?;
    }
    if manifest.set_primary {
        let gallery = wizard.gallery()?;
        let first = gallery.images().first().map(|img| img.id);
        if gallery.primary().is_none() {
            if let Some(image_id) = first {
                let outcome = gallery.toggle_primary(image_id).await;
                wizard.record(outcome)?;
            }
        }
    }

    wizard.complete()?;

    let services = wizard.services()?.selected().len();
    let highlights = wizard.highlights()?.selected().len();
    let activities = wizard.activities()?.len();
    let gallery = wizard.gallery()?;
    Ok(Summary {
        trek_id,
        services,
        highlights,
        activities,
        images: gallery.images().len(),
        primary_image: gallery.primary().map(|img| img.id),
    })
}

/// Attach each named entry, creating the ones the catalog lacks.
async fn attach_all<E, G>(
    set: &mut AttachmentSet<E, G>,
    names: &[String],
    fields: impl Fn(String) -> E::Fields,
) -> Result<(), AuthoringError>
where
    E: CatalogEntity,
    G: CatalogGateway<E>,
{
    for name in names {
        match set.find(name).map(CatalogEntity::id) {
            Some(id) if set.is_selected(id) => {
                tracing::debug!(kind = E::KIND.entity_name(), name = %name, "Already attached");
            }
            Some(id) => {
                set.toggle(id).await?;
            }
            None => {
                set.create_and_attach(fields(name.clone())).await?;
            }
        }
    }
    Ok(())
}
