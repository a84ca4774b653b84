//! Attachment Set Manager: a trek's membership in a global catalog.
//!
//! The catalog (all services, or all highlights) is global. The selected
//! set is the trek's membership. It changes only after the backend has
//! confirmed an attach or detach; there is no optimistic toggle.

use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use trek_core::catalog::{filter_catalog, find_by_display, CatalogEntity};
use trek_core::types::DbId;
use trek_core::validation::validate_fields;
use trek_gateway::CatalogGateway;

use crate::error::AuthoringError;
use crate::remote::{expect_data, expect_success};

/// Catalog plus the trek's selected subset of it.
pub struct AttachmentSet<E: CatalogEntity, G: CatalogGateway<E>> {
    gateway: Arc<G>,
    trek_id: DbId,
    catalog: Vec<E>,
    selected: BTreeSet<DbId>,
    loaded: bool,
    _entity: PhantomData<E>,
}

impl<E: CatalogEntity, G: CatalogGateway<E>> AttachmentSet<E, G> {
    /// `selected` is the trek's current membership as last read from the backend.
    pub fn new(gateway: Arc<G>, trek_id: DbId, selected: impl IntoIterator<Item = DbId>) -> Self {
        Self {
            gateway,
            trek_id,
            catalog: Vec::new(),
            selected: selected.into_iter().collect(),
            loaded: false,
            _entity: PhantomData,
        }
    }

    pub fn trek_id(&self) -> DbId {
        self.trek_id
    }

    pub fn catalog(&self) -> &[E] {
        &self.catalog
    }

    pub fn selected(&self) -> &BTreeSet<DbId> {
        &self.selected
    }

    pub fn is_selected(&self, entity_id: DbId) -> bool {
        self.selected.contains(&entity_id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Catalog entries currently attached to the trek.
    pub fn selected_entries(&self) -> Vec<&E> {
        self.catalog
            .iter()
            .filter(|e| self.selected.contains(&e.id()))
            .collect()
    }

    /// Local, case-insensitive search over the display field.
    pub fn filter(&self, query: &str) -> Vec<&E> {
        filter_catalog(&self.catalog, query)
    }

    pub fn find(&self, text: &str) -> Option<&E> {
        find_by_display(&self.catalog, text)
    }

    /// Fetch the full catalog. Not scoped to the trek.
    pub async fn load_catalog(&mut self) -> Result<(), AuthoringError> {
        let op = format!("Load {} catalog", E::KIND.entity_name());
        let entries = expect_data(self.gateway.list_catalog().await, &op)?;
        tracing::debug!(
            kind = E::KIND.entity_name(),
            count = entries.len(),
            "Catalog loaded"
        );
        self.catalog = entries;
        self.loaded = true;
        Ok(())
    }

    /// Load the catalog unless it already has been.
    pub async fn ensure_loaded(&mut self) -> Result<(), AuthoringError> {
        if self.loaded {
            return Ok(());
        }
        self.load_catalog().await
    }

    /// Attach `entity_id` if it is not selected, detach it otherwise.
    ///
    /// One remote call either way. Returns whether the entity is now attached.
    pub async fn toggle(&mut self, entity_id: DbId) -> Result<bool, AuthoringError> {
        let kind = E::KIND.entity_name();
        if self.selected.contains(&entity_id) {
            let result = self.gateway.detach(self.trek_id, entity_id).await;
            expect_success(result, &format!("Detach {kind}"))?;
            self.selected.remove(&entity_id);
            tracing::info!(trek_id = self.trek_id, entity_id, kind, "Detached from trek");
            Ok(false)
        } else {
            let result = self.gateway.attach(self.trek_id, entity_id).await;
            expect_success(result, &format!("Attach {kind}"))?;
            self.selected.insert(entity_id);
            tracing::info!(trek_id = self.trek_id, entity_id, kind, "Attached to trek");
            Ok(true)
        }
    }

    /// Create a catalog entry, then attach it to the trek.
    ///
    /// If creation fails nothing changes. If attaching fails the entry
    /// already exists globally: it is added to the local catalog but not
    /// to the selected set, and the error is
    /// [`AuthoringError::PartiallyCompleted`]. Retrying is a plain
    /// [`toggle`](Self::toggle) of the new entry.
    pub async fn create_and_attach(&mut self, fields: E::Fields) -> Result<E, AuthoringError> {
        validate_fields(&fields)
            .into_result()
            .map_err(AuthoringError::Validation)?;

        let kind = E::KIND.entity_name();
        let created = expect_data(
            self.gateway.create_entry(&fields).await,
            &format!("Create {kind}"),
        )?;
        self.catalog.push(created.clone());
        tracing::info!(entity_id = created.id(), kind, "Catalog entry created");

        let attach = self.gateway.attach(self.trek_id, created.id()).await;
        if let Err(e) = expect_success(attach, &format!("Attach {kind}")) {
            tracing::warn!(
                trek_id = self.trek_id,
                entity_id = created.id(),
                kind,
                "Created catalog entry but could not attach it",
            );
            return Err(AuthoringError::PartiallyCompleted {
                completed: format!("{kind} '{}' was created but not attached", created.display()),
                message: e.message(),
            });
        }

        self.selected.insert(created.id());
        tracing::info!(trek_id = self.trek_id, entity_id = created.id(), kind, "Attached to trek");
        Ok(created)
    }

    /// Edit a catalog entry. The change is global, not per trek.
    pub async fn update_entry(
        &mut self,
        entity_id: DbId,
        fields: E::Fields,
    ) -> Result<E, AuthoringError> {
        validate_fields(&fields)
            .into_result()
            .map_err(AuthoringError::Validation)?;

        let kind = E::KIND.entity_name();
        let updated = expect_data(
            self.gateway.update_entry(entity_id, &fields).await,
            &format!("Update {kind}"),
        )?;
        match self.catalog.iter_mut().find(|e| e.id() == entity_id) {
            Some(slot) => *slot = updated.clone(),
            None => self.catalog.push(updated.clone()),
        }
        tracing::info!(entity_id, kind, "Catalog entry updated");
        Ok(updated)
    }

    /// Delete a catalog entry globally; it also leaves the selected set.
    pub async fn delete_entry(&mut self, entity_id: DbId) -> Result<(), AuthoringError> {
        let kind = E::KIND.entity_name();
        expect_success(
            self.gateway.delete_entry(entity_id).await,
            &format!("Delete {kind}"),
        )?;
        self.catalog.retain(|e| e.id() != entity_id);
        self.selected.remove(&entity_id);
        tracing::info!(entity_id, kind, "Catalog entry deleted");
        Ok(())
    }
}
