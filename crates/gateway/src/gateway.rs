//! Gateway traits, one per backend resource.
//!
//! Managers depend on the narrowest trait they need; the wizard depends on
//! [`Gateway`], which every full backend implements.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use trek_core::activity::{Activity, ActivityDraft, CreateActivity};
use trek_core::catalog::{CatalogEntity, Highlight, Service};
use trek_core::image::TrekImage;
use trek_core::trek::{CreateTrek, Trek, UpdateTrek};
use trek_core::types::DbId;

use crate::envelope::Envelope;
use crate::error::GatewayError;

/// Envelope on any backend answer, error only for transport failures.
pub type GatewayResult<T> = Result<Envelope<T>, GatewayError>;

#[async_trait]
pub trait TrekGateway: Send + Sync {
    async fn create_trek(&self, input: &CreateTrek) -> GatewayResult<Trek>;

    async fn get_trek(&self, trek_id: DbId) -> GatewayResult<Trek>;

    async fn update_trek(&self, trek_id: DbId, input: &UpdateTrek) -> GatewayResult<Trek>;
}

#[async_trait]
pub trait ActivityGateway: Send + Sync {
    async fn create_activity(
        &self,
        trek_id: DbId,
        input: &CreateActivity,
    ) -> GatewayResult<Activity>;

    async fn list_activities(&self, trek_id: DbId) -> GatewayResult<Vec<Activity>>;

    async fn update_activity(
        &self,
        trek_id: DbId,
        activity_id: DbId,
        input: &ActivityDraft,
    ) -> GatewayResult<Activity>;

    async fn delete_activity(&self, trek_id: DbId, activity_id: DbId) -> GatewayResult<()>;

    async fn update_activity_order(
        &self,
        trek_id: DbId,
        activity_id: DbId,
        activity_order: u32,
    ) -> GatewayResult<Activity>;
}

/// A file staged for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Bytes of an upload handed to the transport so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent_bytes: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Whole percentage, 100 for an empty upload.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let pct = self.sent_bytes.min(self.total_bytes) * 100 / self.total_bytes;
        pct as u8
    }
}

/// Publishes upload progress to whoever holds the receiver.
///
/// Progress is advisory; dropping the receiver does not affect the upload.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Arc<watch::Sender<UploadProgress>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, watch::Receiver<UploadProgress>) {
        let (tx, rx) = watch::channel(UploadProgress::default());
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn report(&self, sent_bytes: u64, total_bytes: u64) {
        self.tx.send_replace(UploadProgress {
            sent_bytes,
            total_bytes,
        });
    }

    pub fn current(&self) -> UploadProgress {
        *self.tx.borrow()
    }
}

#[async_trait]
pub trait ImageGateway: Send + Sync {
    /// Upload a batch of images in one request. New images are not primary.
    async fn upload_images(
        &self,
        trek_id: DbId,
        files: &[UploadFile],
        progress: Option<&ProgressReporter>,
    ) -> GatewayResult<Vec<TrekImage>>;

    async fn list_images(&self, trek_id: DbId) -> GatewayResult<Vec<TrekImage>>;

    async fn delete_image(&self, trek_id: DbId, image_id: DbId) -> GatewayResult<()>;

    /// Flip the primary flag of `image_id`. The backend keeps at most one
    /// primary image per trek.
    async fn toggle_primary(&self, trek_id: DbId, image_id: DbId) -> GatewayResult<TrekImage>;
}

/// Operations on a global catalog and a trek's membership in it.
#[async_trait]
pub trait CatalogGateway<E: CatalogEntity>: Send + Sync {
    async fn list_catalog(&self) -> GatewayResult<Vec<E>>;

    async fn create_entry(&self, fields: &E::Fields) -> GatewayResult<E>;

    async fn update_entry(&self, entity_id: DbId, fields: &E::Fields) -> GatewayResult<E>;

    async fn delete_entry(&self, entity_id: DbId) -> GatewayResult<()>;

    async fn attach(&self, trek_id: DbId, entity_id: DbId) -> GatewayResult<()>;

    async fn detach(&self, trek_id: DbId, entity_id: DbId) -> GatewayResult<()>;
}

/// Everything the trek wizard needs from a backend.
pub trait Gateway:
    TrekGateway
    + ActivityGateway
    + ImageGateway
    + CatalogGateway<Service>
    + CatalogGateway<Highlight>
    + 'static
{
}

impl<T> Gateway for T where
    T: TrekGateway
        + ActivityGateway
        + ImageGateway
        + CatalogGateway<Service>
        + CatalogGateway<Highlight>
        + 'static
{
}
