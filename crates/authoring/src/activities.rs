//! Ordered Collection Manager for a trek's itinerary.
//!
//! The local list is kept in positional order. After every completed
//! mutation the stored `activity_order` values are exactly `{1..N}`;
//! when a renumber sequence is cut short the list records precisely
//! which renumber calls the backend acknowledged, and
//! [`ActivityList::reconcile_order`] resumes the sequence.

use std::sync::Arc;

use trek_core::activity::{Activity, ActivityDraft, CreateActivity};
use trek_core::ordering::{is_contiguous, next_order, renumber_plan};
use trek_core::types::DbId;
use trek_core::validation::{validate_activity, ItineraryDraft};
use trek_gateway::ActivityGateway;

use crate::error::AuthoringError;
use crate::remote::{expect_data, expect_success};

pub struct ActivityList<G: ActivityGateway> {
    gateway: Arc<G>,
    trek_id: DbId,
    items: Vec<Activity>,
    loaded: bool,
}

impl<G: ActivityGateway> ActivityList<G> {
    pub fn new(gateway: Arc<G>, trek_id: DbId) -> Self {
        Self {
            gateway,
            trek_id,
            items: Vec::new(),
            loaded: false,
        }
    }

    pub fn trek_id(&self) -> DbId {
        self.trek_id
    }

    /// Activities in positional order.
    pub fn items(&self) -> &[Activity] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, activity_id: DbId) -> Option<&Activity> {
        self.items.iter().find(|a| a.id == activity_id)
    }

    /// Stored orders in positional order.
    pub fn orders(&self) -> Vec<u32> {
        self.items.iter().map(|a| a.activity_order).collect()
    }

    pub fn is_contiguous(&self) -> bool {
        is_contiguous(self.items.iter().map(|a| a.activity_order))
    }

    /// Editor draft prefilled from an existing activity. Its type is locked.
    pub fn draft_for(&self, activity_id: DbId) -> Option<ActivityDraft> {
        self.get(activity_id).map(ActivityDraft::from_activity)
    }

    pub fn itinerary_draft(&self) -> ItineraryDraft {
        ItineraryDraft {
            activity_orders: self.orders(),
        }
    }

    /// Fetch the trek's activities, replacing the local list.
    pub async fn load(&mut self) -> Result<(), AuthoringError> {
        let mut items = expect_data(
            self.gateway.list_activities(self.trek_id).await,
            "Load activities",
        )?;
        items.sort_by_key(|a| (a.activity_order, a.id));
        if !is_contiguous(items.iter().map(|a| a.activity_order)) {
            tracing::warn!(
                trek_id = self.trek_id,
                count = items.len(),
                "Stored activity order has gaps"
            );
        }
        tracing::debug!(trek_id = self.trek_id, count = items.len(), "Activities loaded");
        self.items = items;
        self.loaded = true;
        Ok(())
    }

    pub async fn ensure_loaded(&mut self) -> Result<(), AuthoringError> {
        if self.loaded {
            return Ok(());
        }
        self.load().await
    }

    /// Create an activity at the end of the itinerary.
    ///
    /// The stored itinerary is loaded first if it has not been, and a list
    /// left stale by an interrupted renumber is reconciled, so the new
    /// entry never lands on a duplicate order.
    pub async fn append(&mut self, draft: ActivityDraft) -> Result<Activity, AuthoringError> {
        validate_activity(&draft)
            .into_result()
            .map_err(AuthoringError::Validation)?;

        self.ensure_loaded().await?;
        if !self.is_contiguous() {
            self.reconcile_order().await?;
        }

        let input = CreateActivity {
            fields: draft.normalized(),
            activity_order: next_order(self.items.len()),
        };
        let created = expect_data(
            self.gateway.create_activity(self.trek_id, &input).await,
            "Create activity",
        )?;
        tracing::info!(
            trek_id = self.trek_id,
            activity_id = created.id,
            activity_order = created.activity_order,
            kind = created.kind.as_str(),
            "Activity created"
        );
        self.items.push(created.clone());
        Ok(created)
    }

    /// Replace an activity's fields in place. Its position is unchanged.
    pub async fn update(
        &mut self,
        activity_id: DbId,
        draft: ActivityDraft,
    ) -> Result<Activity, AuthoringError> {
        let idx = self.position(activity_id)?;
        if self.items[idx].kind != draft.kind {
            return Err(AuthoringError::TypeLocked);
        }
        validate_activity(&draft)
            .into_result()
            .map_err(AuthoringError::Validation)?;

        let input = draft.normalized();
        let updated = expect_data(
            self.gateway
                .update_activity(self.trek_id, activity_id, &input)
                .await,
            "Update activity",
        )?;
        tracing::info!(trek_id = self.trek_id, activity_id, "Activity updated");
        self.items[idx] = updated.clone();
        Ok(updated)
    }

    /// Delete an activity and close the gap it leaves.
    ///
    /// Renumber calls go out one at a time in ascending position. The
    /// first failure stops the sequence and yields
    /// [`AuthoringError::PartiallyCompleted`]; the deletion itself has
    /// already been persisted by then.
    pub async fn remove(&mut self, activity_id: DbId) -> Result<(), AuthoringError> {
        let idx = self.position(activity_id)?;
        expect_success(
            self.gateway.delete_activity(self.trek_id, activity_id).await,
            "Delete activity",
        )?;
        let removed = self.items.remove(idx);
        tracing::info!(
            trek_id = self.trek_id,
            activity_id,
            activity_order = removed.activity_order,
            "Activity deleted"
        );

        match self.renumber().await {
            Ok(_) => Ok(()),
            Err((applied, total, err)) => Err(AuthoringError::PartiallyCompleted {
                completed: format!("activity removed; {applied} of {total} order updates applied"),
                message: err.message(),
            }),
        }
    }

    /// Renumber any entries whose stored order differs from their position.
    ///
    /// Returns the number of order updates issued. A no-op on a
    /// contiguous list.
    pub async fn reconcile_order(&mut self) -> Result<usize, AuthoringError> {
        match self.renumber().await {
            Ok(applied) => Ok(applied),
            Err((0, _, err)) => Err(err),
            Err((applied, total, err)) => Err(AuthoringError::PartiallyCompleted {
                completed: format!("{applied} of {total} order updates applied"),
                message: err.message(),
            }),
        }
    }

    fn position(&self, activity_id: DbId) -> Result<usize, AuthoringError> {
        self.items
            .iter()
            .position(|a| a.id == activity_id)
            .ok_or(AuthoringError::NotFound {
                entity: "Activity",
                id: activity_id,
            })
    }

    /// Issue the renumber plan sequentially. On failure returns how many
    /// calls succeeded, how many were planned, and the error.
    async fn renumber(&mut self) -> Result<usize, (usize, usize, AuthoringError)> {
        let current: Vec<(DbId, u32)> = self
            .items
            .iter()
            .map(|a| (a.id, a.activity_order))
            .collect();
        let plan = renumber_plan(&current);
        let total = plan.len();

        for (applied, step) in plan.into_iter().enumerate() {
            let result = self
                .gateway
                .update_activity_order(self.trek_id, step.id, step.to)
                .await;
            match expect_data(result, "Update activity order") {
                Ok(updated) => {
                    if let Some(slot) = self.items.iter_mut().find(|a| a.id == step.id) {
                        *slot = updated;
                    }
                    tracing::debug!(
                        trek_id = self.trek_id,
                        activity_id = step.id,
                        from = step.from,
                        to = step.to,
                        "Activity renumbered"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        trek_id = self.trek_id,
                        activity_id = step.id,
                        applied,
                        total,
                        "Renumbering halted; remaining activities keep stale orders"
                    );
                    return Err((applied, total, err));
                }
            }
        }

        if total > 0 {
            tracing::info!(trek_id = self.trek_id, updates = total, "Activity order reconciled");
        }
        Ok(total)
    }
}
