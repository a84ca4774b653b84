//! In-process backend implementing every gateway trait.
//!
//! Behaves like the REST backend: it keeps treks, activities, images and
//! both catalogs, flips the primary image atomically and answers with
//! envelopes. Every issued call is recorded in order, and the next call of
//! a given [`Operation`] can be made to fail, either as a backend refusal
//! (`success: false`) or as a transport failure.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use trek_core::activity::{Activity, ActivityDraft, CreateActivity};
use trek_core::catalog::{CatalogEntity, CatalogKind};
use trek_core::error::CoreError;
use trek_core::image::TrekImage;
use trek_core::trek::{CreateTrek, Trek, UpdateTrek};
use trek_core::types::DbId;

use crate::envelope::Envelope;
use crate::error::GatewayError;
use crate::gateway::{
    ActivityGateway, CatalogGateway, GatewayResult, ImageGateway, ProgressReporter, TrekGateway,
    UploadFile,
};

// ---------------------------------------------------------------------------
// Call log
// ---------------------------------------------------------------------------

/// Kind of gateway call, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateTrek,
    GetTrek,
    UpdateTrek,
    CreateActivity,
    ListActivities,
    UpdateActivity,
    DeleteActivity,
    UpdateActivityOrder,
    UploadImages,
    ListImages,
    DeleteImage,
    TogglePrimary,
    ListCatalog(CatalogKind),
    CreateEntry(CatalogKind),
    UpdateEntry(CatalogKind),
    DeleteEntry(CatalogKind),
    Attach(CatalogKind),
    Detach(CatalogKind),
}

impl Operation {
    /// Whether the call changes backend state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::GetTrek | Self::ListActivities | Self::ListImages | Self::ListCatalog(_)
        )
    }
}

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub trek_id: Option<DbId>,
    /// Activity, image or catalog entry addressed by the call.
    pub target_id: Option<DbId>,
    /// Order sent with activity create / reorder calls.
    pub order: Option<u32>,
}

impl Call {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            trek_id: None,
            target_id: None,
            order: None,
        }
    }

    fn trek(mut self, trek_id: DbId) -> Self {
        self.trek_id = Some(trek_id);
        self
    }

    fn target(mut self, target_id: DbId) -> Self {
        self.target_id = Some(target_id);
        self
    }

    fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.operation)?;
        if let Some(t) = self.trek_id {
            write!(f, " trek={t}")?;
        }
        if let Some(id) = self.target_id {
            write!(f, " id={id}")?;
        }
        if let Some(o) = self.order {
            write!(f, " order={o}")?;
        }
        Ok(())
    }
}

/// How an injected failure presents itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The backend answers `success: false` with this message.
    Rejected(String),
    /// The request never produces an envelope.
    Transport,
}

#[derive(Debug)]
struct FailureRule {
    operation: Operation,
    skip: usize,
    failure: Failure,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    next_id: DbId,
    treks: BTreeMap<DbId, Trek>,
    activities: BTreeMap<DbId, Activity>,
    images: BTreeMap<DbId, TrekImage>,
    catalogs: BTreeMap<(CatalogKindKey, DbId), serde_json::Value>,
    calls: Vec<Call>,
    failures: VecDeque<FailureRule>,
}

/// `CatalogKind` as an ordered map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CatalogKindKey {
    Service,
    Highlight,
}

impl From<CatalogKind> for CatalogKindKey {
    fn from(kind: CatalogKind) -> Self {
        match kind {
            CatalogKind::Service => Self::Service,
            CatalogKind::Highlight => Self::Highlight,
        }
    }
}

impl MemoryState {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    /// Record `call` and decide whether it fails.
    fn begin(&mut self, call: Call) -> Option<Failure> {
        let operation = call.operation;
        self.calls.push(call);

        let idx = self
            .failures
            .iter()
            .position(|rule| rule.operation == operation)?;
        let rule = &mut self.failures[idx];
        if rule.skip > 0 {
            rule.skip -= 1;
            return None;
        }
        self.failures.remove(idx).map(|rule| rule.failure)
    }

    fn trek_mut(&mut self, trek_id: DbId) -> Result<&mut Trek, CoreError> {
        self.treks.get_mut(&trek_id).ok_or(CoreError::NotFound {
            entity: "trek",
            id: trek_id,
        })
    }

    fn activity_of(&mut self, trek_id: DbId, activity_id: DbId) -> Result<&mut Activity, CoreError> {
        self.activities
            .get_mut(&activity_id)
            .filter(|a| a.trek_id == trek_id)
            .ok_or(CoreError::NotFound {
                entity: "activity",
                id: activity_id,
            })
    }

    fn images_of(&self, trek_id: DbId) -> Vec<TrekImage> {
        self.images
            .values()
            .filter(|img| img.trek_id == trek_id)
            .cloned()
            .collect()
    }

    fn activities_of(&self, trek_id: DbId) -> Vec<Activity> {
        let mut list: Vec<Activity> = self
            .activities
            .values()
            .filter(|a| a.trek_id == trek_id)
            .cloned()
            .collect();
        list.sort_by_key(|a| (a.activity_order, a.id));
        list
    }

    fn catalog<E: CatalogEntity>(&self) -> Result<Vec<E>, CoreError> {
        let key = CatalogKindKey::from(E::KIND);
        self.catalogs
            .iter()
            .filter(|((kind, _), _)| *kind == key)
            .map(|(_, value)| decode_entry::<E>(value))
            .collect()
    }

    fn insert_entry<E: CatalogEntity>(&mut self, entry: &E) -> Result<(), CoreError> {
        let value = serde_json::to_value(entry)
            .map_err(|e| CoreError::Internal(format!("encode catalog entry: {e}")))?;
        self.catalogs
            .insert((CatalogKindKey::from(E::KIND), entry.id()), value);
        Ok(())
    }
}

fn decode_entry<E: CatalogEntity>(value: &serde_json::Value) -> Result<E, CoreError> {
    serde_json::from_value(value.clone())
        .map_err(|e| CoreError::Internal(format!("decode catalog entry: {e}")))
}

fn membership_mut(trek: &mut Trek, kind: CatalogKind) -> &mut Vec<DbId> {
    match kind {
        CatalogKind::Service => &mut trek.service_ids,
        CatalogKind::Highlight => &mut trek.highlight_ids,
    }
}

/// Turn an injected failure or a domain error into the gateway's answer.
fn settle<T>(
    failure: Option<Failure>,
    run: impl FnOnce() -> Result<T, CoreError>,
) -> GatewayResult<T> {
    match failure {
        Some(Failure::Transport) => Err(GatewayError::Unavailable(
            "connection reset by in-memory backend".to_string(),
        )),
        Some(Failure::Rejected(message)) => Ok(Envelope::fail(message)),
        None => Ok(match run() {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::fail(e.to_string()),
        }),
    }
}

// ---------------------------------------------------------------------------
// MemoryGateway
// ---------------------------------------------------------------------------

/// In-process backend. Cheap to construct; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail the next call of `operation`.
    pub fn fail_next(&self, operation: Operation, failure: Failure) {
        self.fail_after(operation, 0, failure);
    }

    /// Let `skip` calls of `operation` through, then fail the following one.
    pub fn fail_after(&self, operation: Operation, skip: usize, failure: Failure) {
        self.lock().failures.push_back(FailureRule {
            operation,
            skip,
            failure,
        });
    }

    /// Every call issued so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls of one operation, in order.
    pub fn calls_of(&self, operation: Operation) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    // -- seeding (not recorded) --

    pub fn seed_trek(&self, input: CreateTrek) -> Trek {
        let mut state = self.lock();
        let id = state.allocate_id();
        let trek = trek_from(id, input);
        state.treks.insert(id, trek.clone());
        trek
    }

    pub fn seed_activity(&self, trek_id: DbId, input: CreateActivity) -> Activity {
        let mut state = self.lock();
        let id = state.allocate_id();
        let activity = activity_from(id, trek_id, input);
        state.activities.insert(id, activity.clone());
        activity
    }

    pub fn seed_image(&self, trek_id: DbId, is_primary: bool) -> TrekImage {
        let mut state = self.lock();
        let id = state.allocate_id();
        if is_primary {
            for img in state.images.values_mut().filter(|i| i.trek_id == trek_id) {
                img.is_primary = false;
            }
        }
        let image = TrekImage {
            id,
            trek_id,
            path: format!("treks/{trek_id}/seed-{id}.jpg"),
            is_primary,
        };
        state.images.insert(id, image.clone());
        image
    }

    pub fn seed_entry<E: CatalogEntity>(&self, fields: E::Fields) -> E {
        let mut state = self.lock();
        let id = state.allocate_id();
        let entry = E::from_fields(id, fields);
        if let Err(e) = state.insert_entry(&entry) {
            tracing::error!(error = %e, "Failed to seed catalog entry");
        }
        entry
    }

    // -- inspection (not recorded) --

    pub fn trek(&self, trek_id: DbId) -> Option<Trek> {
        self.lock().treks.get(&trek_id).cloned()
    }

    pub fn activities(&self, trek_id: DbId) -> Vec<Activity> {
        self.lock().activities_of(trek_id)
    }

    pub fn images(&self, trek_id: DbId) -> Vec<TrekImage> {
        self.lock().images_of(trek_id)
    }

    pub fn catalog<E: CatalogEntity>(&self) -> Vec<E> {
        self.lock().catalog::<E>().unwrap_or_default()
    }
}

fn trek_from(id: DbId, input: CreateTrek) -> Trek {
    Trek {
        id,
        title: input.title,
        description: input.description,
        full_description: input.full_description,
        duration: input.duration,
        price: input.price,
        start_location: input.start_location,
        end_location: input.end_location,
        category_id: input.category_id,
        service_ids: Vec::new(),
        highlight_ids: Vec::new(),
        created_at: None,
        updated_at: None,
    }
}

fn activity_from(id: DbId, trek_id: DbId, input: CreateActivity) -> Activity {
    let fields = input.fields.normalized();
    Activity {
        id,
        trek_id,
        title: fields.title,
        description: fields.description,
        kind: fields.kind,
        is_optional: fields.is_optional,
        activity_order: input.activity_order,
        transport_type: fields.transport_type,
        transport_duration: fields.transport_duration,
    }
}

#[async_trait]
impl TrekGateway for MemoryGateway {
    async fn create_trek(&self, input: &CreateTrek) -> GatewayResult<Trek> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::CreateTrek));
        settle(failure, || {
            let id = state.allocate_id();
            let trek = trek_from(id, input.clone());
            state.treks.insert(id, trek.clone());
            Ok(trek)
        })
    }

    async fn get_trek(&self, trek_id: DbId) -> GatewayResult<Trek> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::GetTrek).trek(trek_id));
        settle(failure, || state.trek_mut(trek_id).map(|t| t.clone()))
    }

    async fn update_trek(&self, trek_id: DbId, input: &UpdateTrek) -> GatewayResult<Trek> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::UpdateTrek).trek(trek_id));
        settle(failure, || {
            let trek = state.trek_mut(trek_id)?;
            input.apply_to(trek);
            Ok(trek.clone())
        })
    }
}

#[async_trait]
impl ActivityGateway for MemoryGateway {
    async fn create_activity(
        &self,
        trek_id: DbId,
        input: &CreateActivity,
    ) -> GatewayResult<Activity> {
        let mut state = self.lock();
        let failure = state.begin(
            Call::new(Operation::CreateActivity)
                .trek(trek_id)
                .order(input.activity_order),
        );
        settle(failure, || {
            state.trek_mut(trek_id)?;
            let id = state.allocate_id();
            let activity = activity_from(id, trek_id, input.clone());
            state.activities.insert(id, activity.clone());
            Ok(activity)
        })
    }

    async fn list_activities(&self, trek_id: DbId) -> GatewayResult<Vec<Activity>> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::ListActivities).trek(trek_id));
        settle(failure, || {
            state.trek_mut(trek_id)?;
            Ok(state.activities_of(trek_id))
        })
    }

    async fn update_activity(
        &self,
        trek_id: DbId,
        activity_id: DbId,
        input: &ActivityDraft,
    ) -> GatewayResult<Activity> {
        let mut state = self.lock();
        let failure = state.begin(
            Call::new(Operation::UpdateActivity)
                .trek(trek_id)
                .target(activity_id),
        );
        settle(failure, || {
            let activity = state.activity_of(trek_id, activity_id)?;
            let fields = input.normalized();
            activity.title = fields.title;
            activity.description = fields.description;
            activity.kind = fields.kind;
            activity.is_optional = fields.is_optional;
            activity.transport_type = fields.transport_type;
            activity.transport_duration = fields.transport_duration;
            Ok(activity.clone())
        })
    }

    async fn delete_activity(&self, trek_id: DbId, activity_id: DbId) -> GatewayResult<()> {
        let mut state = self.lock();
        let failure = state.begin(
            Call::new(Operation::DeleteActivity)
                .trek(trek_id)
                .target(activity_id),
        );
        settle(failure, || {
            state.activity_of(trek_id, activity_id)?;
            state.activities.remove(&activity_id);
            Ok(())
        })
    }

    async fn update_activity_order(
        &self,
        trek_id: DbId,
        activity_id: DbId,
        activity_order: u32,
    ) -> GatewayResult<Activity> {
        let mut state = self.lock();
        let failure = state.begin(
            Call::new(Operation::UpdateActivityOrder)
                .trek(trek_id)
                .target(activity_id)
                .order(activity_order),
        );
        settle(failure, || {
            let activity = state.activity_of(trek_id, activity_id)?;
            activity.activity_order = activity_order;
            Ok(activity.clone())
        })
    }
}

#[async_trait]
impl ImageGateway for MemoryGateway {
    async fn upload_images(
        &self,
        trek_id: DbId,
        files: &[UploadFile],
        progress: Option<&ProgressReporter>,
    ) -> GatewayResult<Vec<TrekImage>> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::UploadImages).trek(trek_id));
        settle(failure, || {
            state.trek_mut(trek_id)?;
            let total: u64 = files.iter().map(UploadFile::size).sum();
            let mut created = Vec::with_capacity(files.len());
            let mut sent = 0;
            for file in files {
                let id = state.allocate_id();
                let image = TrekImage {
                    id,
                    trek_id,
                    path: format!("treks/{trek_id}/{id}-{}", file.file_name),
                    is_primary: false,
                };
                state.images.insert(id, image.clone());
                created.push(image);
                sent += file.size();
                if let Some(reporter) = progress {
                    reporter.report(sent, total);
                }
            }

            // The backend promotes the first image of a gallery without a primary.
            let has_primary = state.images_of(trek_id).iter().any(|i| i.is_primary);
            if !has_primary {
                if let Some(first) = created.first_mut() {
                    first.is_primary = true;
                    if let Some(stored) = state.images.get_mut(&first.id) {
                        stored.is_primary = true;
                    }
                }
            }
            Ok(created)
        })
    }

    async fn list_images(&self, trek_id: DbId) -> GatewayResult<Vec<TrekImage>> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::ListImages).trek(trek_id));
        settle(failure, || {
            state.trek_mut(trek_id)?;
            Ok(state.images_of(trek_id))
        })
    }

    async fn delete_image(&self, trek_id: DbId, image_id: DbId) -> GatewayResult<()> {
        let mut state = self.lock();
        let failure = state.begin(
            Call::new(Operation::DeleteImage)
                .trek(trek_id)
                .target(image_id),
        );
        settle(failure, || {
            let image = state
                .images
                .get(&image_id)
                .filter(|i| i.trek_id == trek_id)
                .ok_or(CoreError::NotFound {
                    entity: "image",
                    id: image_id,
                })?;
            if image.is_primary {
                return Err(CoreError::Validation(
                    "The primary image cannot be deleted".to_string(),
                ));
            }
            state.images.remove(&image_id);
            Ok(())
        })
    }

    async fn toggle_primary(&self, trek_id: DbId, image_id: DbId) -> GatewayResult<TrekImage> {
        let mut state = self.lock();
        let failure = state.begin(
            Call::new(Operation::TogglePrimary)
                .trek(trek_id)
                .target(image_id),
        );
        settle(failure, || {
            let was_primary = state
                .images
                .get(&image_id)
                .filter(|i| i.trek_id == trek_id)
                .map(|i| i.is_primary)
                .ok_or(CoreError::NotFound {
                    entity: "image",
                    id: image_id,
                })?;

            for img in state.images.values_mut().filter(|i| i.trek_id == trek_id) {
                img.is_primary = img.id == image_id && !was_primary;
            }
            state
                .images
                .get(&image_id)
                .cloned()
                .ok_or(CoreError::Internal("image vanished during toggle".into()))
        })
    }
}

#[async_trait]
impl<E: CatalogEntity> CatalogGateway<E> for MemoryGateway {
    async fn list_catalog(&self) -> GatewayResult<Vec<E>> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::ListCatalog(E::KIND)));
        settle(failure, || state.catalog::<E>())
    }

    async fn create_entry(&self, fields: &E::Fields) -> GatewayResult<E> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::CreateEntry(E::KIND)));
        settle(failure, || {
            let id = state.allocate_id();
            let entry = E::from_fields(id, fields.clone());
            state.insert_entry(&entry)?;
            Ok(entry)
        })
    }

    async fn update_entry(&self, entity_id: DbId, fields: &E::Fields) -> GatewayResult<E> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::UpdateEntry(E::KIND)).target(entity_id));
        settle(failure, || {
            let key = (CatalogKindKey::from(E::KIND), entity_id);
            if !state.catalogs.contains_key(&key) {
                return Err(CoreError::NotFound {
                    entity: E::KIND.entity_name(),
                    id: entity_id,
                });
            }
            let entry = E::from_fields(entity_id, fields.clone());
            state.insert_entry(&entry)?;
            Ok(entry)
        })
    }

    async fn delete_entry(&self, entity_id: DbId) -> GatewayResult<()> {
        let mut state = self.lock();
        let failure = state.begin(Call::new(Operation::DeleteEntry(E::KIND)).target(entity_id));
        settle(failure, || {
            let key = (CatalogKindKey::from(E::KIND), entity_id);
            if state.catalogs.remove(&key).is_none() {
                return Err(CoreError::NotFound {
                    entity: E::KIND.entity_name(),
                    id: entity_id,
                });
            }
            for trek in state.treks.values_mut() {
                membership_mut(trek, E::KIND).retain(|id| *id != entity_id);
            }
            Ok(())
        })
    }

    async fn attach(&self, trek_id: DbId, entity_id: DbId) -> GatewayResult<()> {
        let mut state = self.lock();
        let failure = state.begin(
            Call::new(Operation::Attach(E::KIND))
                .trek(trek_id)
                .target(entity_id),
        );
        settle(failure, || {
            let key = (CatalogKindKey::from(E::KIND), entity_id);
            if !state.catalogs.contains_key(&key) {
                return Err(CoreError::NotFound {
                    entity: E::KIND.entity_name(),
                    id: entity_id,
                });
            }
            let members = membership_mut(state.trek_mut(trek_id)?, E::KIND);
            if !members.contains(&entity_id) {
                members.push(entity_id);
            }
            Ok(())
        })
    }

    async fn detach(&self, trek_id: DbId, entity_id: DbId) -> GatewayResult<()> {
        let mut state = self.lock();
        let failure = state.begin(
            Call::new(Operation::Detach(E::KIND))
                .trek(trek_id)
                .target(entity_id),
        );
        settle(failure, || {
            membership_mut(state.trek_mut(trek_id)?, E::KIND).retain(|id| *id != entity_id);
            Ok(())
        })
    }
}
