//! Wizard Controller: sequences the five authoring steps.
//!
//! Step 1 creates (or, when resuming, updates) the trek. Every later step
//! addresses its sub-resource by trek id through one manager, each created
//! once the trek exists. Moving back is a view change only: nothing
//! persisted is rolled back and nothing is re-fetched on the way forward
//! again.

use std::sync::Arc;

use trek_core::catalog::{Highlight, Service};
use trek_core::trek::{Trek, UpdateTrek};
use trek_core::types::DbId;
use trek_core::validation::{validate_step, BasicInfoDraft, FieldErrors, SelectionDraft, StepDraft};
use trek_core::wizard::{
    can_complete, ensure_in_progress, validate_step_entry, WizardStatus, WizardStep,
};
use trek_gateway::Gateway;

use crate::activities::ActivityList;
use crate::attachments::AttachmentSet;
use crate::error::AuthoringError;
use crate::gallery::Gallery;
use crate::remote::expect_data;

/// Managers for the steps that need a trek id.
struct StepManagers<G: Gateway> {
    services: AttachmentSet<Service, G>,
    highlights: AttachmentSet<Highlight, G>,
    activities: ActivityList<G>,
    gallery: Gallery<G>,
}

impl<G: Gateway> StepManagers<G> {
    fn for_trek(gateway: &Arc<G>, trek: &Trek) -> Self {
        Self {
            services: AttachmentSet::new(
                Arc::clone(gateway),
                trek.id,
                trek.service_ids.iter().copied(),
            ),
            highlights: AttachmentSet::new(
                Arc::clone(gateway),
                trek.id,
                trek.highlight_ids.iter().copied(),
            ),
            activities: ActivityList::new(Arc::clone(gateway), trek.id),
            gallery: Gallery::new(Arc::clone(gateway), trek.id),
        }
    }
}

pub struct WizardController<G: Gateway> {
    gateway: Arc<G>,
    status: WizardStatus,
    current_step: WizardStep,
    trek: Option<Trek>,
    basic_info: BasicInfoDraft,
    managers: Option<StepManagers<G>>,
    errors: FieldErrors,
    message: Option<String>,
    is_submitting: bool,
}

impl<G: Gateway> WizardController<G> {
    /// A fresh session that will create a new trek.
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            status: WizardStatus::InProgress,
            current_step: WizardStep::BasicInfo,
            trek: None,
            basic_info: BasicInfoDraft::default(),
            managers: None,
            errors: FieldErrors::new(),
            message: None,
            is_submitting: false,
        }
    }

    /// A session editing an existing trek, starting at step 1.
    pub async fn resume(gateway: Arc<G>, trek_id: DbId) -> Result<Self, AuthoringError> {
        let trek = expect_data(gateway.get_trek(trek_id).await, "Load trek")?;
        let mut controller = Self::new(gateway);
        controller.basic_info = BasicInfoDraft::from_trek(&trek);
        controller.managers = Some(StepManagers::for_trek(&controller.gateway, &trek));
        controller.trek = Some(trek);
        tracing::info!(trek_id, "Resumed trek authoring");
        Ok(controller)
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn status(&self) -> WizardStatus {
        self.status
    }

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    pub fn trek_id(&self) -> Option<DbId> {
        self.trek.as_ref().map(|t| t.id)
    }

    /// The trek as of the last step-1 save or resume.
    pub fn trek(&self) -> Option<&Trek> {
        self.trek.as_ref()
    }

    pub fn basic_info(&self) -> &BasicInfoDraft {
        &self.basic_info
    }

    pub fn basic_info_mut(&mut self) -> &mut BasicInfoDraft {
        &mut self.basic_info
    }

    /// Field errors from the last failed operation.
    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Message from the last failed operation.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// The draft of the current step, as the validator sees it.
    pub fn current_draft(&self) -> StepDraft {
        self.draft_for(self.current_step)
    }

    fn draft_for(&self, step: WizardStep) -> StepDraft {
        let managers = self.managers.as_ref();
        match step {
            WizardStep::BasicInfo => StepDraft::BasicInfo(self.basic_info.clone()),
            WizardStep::Services => StepDraft::Services(SelectionDraft {
                selected: managers
                    .map(|m| m.services.selected().iter().copied().collect())
                    .unwrap_or_default(),
            }),
            WizardStep::Highlights => StepDraft::Highlights(SelectionDraft {
                selected: managers
                    .map(|m| m.highlights.selected().iter().copied().collect())
                    .unwrap_or_default(),
            }),
            WizardStep::Activities => StepDraft::Activities(
                managers
                    .map(|m| m.activities.itinerary_draft())
                    .unwrap_or_default(),
            ),
            WizardStep::Images => StepDraft::Images(
                managers
                    .map(|m| m.gallery.gallery_draft())
                    .unwrap_or_default(),
            ),
        }
    }

    // -----------------------------------------------------------------------
    // Managers
    // -----------------------------------------------------------------------

    pub fn services(&mut self) -> Result<&mut AttachmentSet<Service, G>, AuthoringError> {
        Ok(&mut self.managers_for(WizardStep::Services)?.services)
    }

    pub fn highlights(&mut self) -> Result<&mut AttachmentSet<Highlight, G>, AuthoringError> {
        Ok(&mut self.managers_for(WizardStep::Highlights)?.highlights)
    }

    pub fn activities(&mut self) -> Result<&mut ActivityList<G>, AuthoringError> {
        Ok(&mut self.managers_for(WizardStep::Activities)?.activities)
    }

    pub fn gallery(&mut self) -> Result<&mut Gallery<G>, AuthoringError> {
        Ok(&mut self.managers_for(WizardStep::Images)?.gallery)
    }

    fn managers_for(&mut self, step: WizardStep) -> Result<&mut StepManagers<G>, AuthoringError> {
        self.managers.as_mut().ok_or_else(|| AuthoringError::StepLocked {
            step,
            reason: "save the basic information first".to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Step 1
    // -----------------------------------------------------------------------

    /// Persist the basic-info draft: create the trek the first time, update
    /// it afterwards.
    pub async fn save_basic_info(&mut self) -> Result<Trek, AuthoringError> {
        self.ensure_in_progress()?;
        let input = match self.basic_info.to_create() {
            Ok(input) => input,
            Err(errors) => return Err(self.fail(AuthoringError::Validation(errors))),
        };

        self.is_submitting = true;
        let result = match self.trek_id() {
            Some(trek_id) => {
                let update = UpdateTrek::from_create(&input);
                expect_data(self.gateway.update_trek(trek_id, &update).await, "Update trek")
            }
            None => expect_data(self.gateway.create_trek(&input).await, "Create trek"),
        };
        self.is_submitting = false;

        let trek = match result {
            Ok(trek) => trek,
            Err(e) => return Err(self.fail(e)),
        };
        if self.managers.is_none() {
            tracing::info!(trek_id = trek.id, title = %trek.title, "Trek created");
            self.managers = Some(StepManagers::for_trek(&self.gateway, &trek));
        } else {
            tracing::info!(trek_id = trek.id, "Trek updated");
        }
        self.clear_feedback();
        self.trek = Some(trek.clone());
        Ok(trek)
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Apply the outcome of the current step's persistence.
    ///
    /// On failure the wizard stays put and surfaces the message. On
    /// success it moves forward one step (capped at the last) and loads
    /// what the new step shows. The step is entered even if that load
    /// fails; [`reload`](Self::reload) retries it.
    pub async fn advance(
        &mut self,
        step_result: Result<(), AuthoringError>,
    ) -> Result<WizardStep, AuthoringError> {
        self.ensure_in_progress()?;
        if let Err(e) = step_result {
            return Err(self.fail(e));
        }

        let next = self.current_step.next();
        if next == self.current_step {
            self.clear_feedback();
            return Ok(next);
        }
        if let Err(e) = validate_step_entry(next, self.trek.is_some()) {
            return Err(self.fail(AuthoringError::StepLocked {
                step: next,
                reason: e.to_string(),
            }));
        }

        let from = self.current_step;
        self.current_step = next;
        self.clear_feedback();
        tracing::info!(
            trek_id = self.trek_id(),
            from_step = from.to_number(),
            to_step = next.to_number(),
            "Wizard advanced"
        );

        self.reload().await?;
        Ok(next)
    }

    /// Validate the current step and advance past it.
    ///
    /// On step 1 this saves the trek first. Later steps persist as their
    /// managers are used, so only the validator runs, against data that
    /// must have been loaded from the backend.
    pub async fn next(&mut self) -> Result<WizardStep, AuthoringError> {
        self.ensure_in_progress()?;
        let outcome = if self.current_step == WizardStep::BasicInfo {
            self.save_basic_info().await.map(|_| ())
        } else {
            self.reload().await?;
            validate_step(&self.current_draft())
                .into_result()
                .map_err(AuthoringError::Validation)
        };
        self.advance(outcome).await
    }

    /// Step back one step. No remote call is made and nothing is discarded.
    pub fn retreat(&mut self) -> WizardStep {
        let prev = self.current_step.previous();
        if prev != self.current_step {
            tracing::info!(
                trek_id = self.trek_id(),
                from_step = self.current_step.to_number(),
                to_step = prev.to_number(),
                "Wizard went back"
            );
        }
        self.current_step = prev;
        self.clear_feedback();
        prev
    }

    /// Load whatever the current step shows, once per session.
    pub async fn reload(&mut self) -> Result<(), AuthoringError> {
        let step = self.current_step;
        if step == WizardStep::BasicInfo {
            return Ok(());
        }

        self.is_submitting = true;
        let result = match self.managers_for(step) {
            Ok(managers) => match step {
                WizardStep::BasicInfo => Ok(()),
                WizardStep::Services => managers.services.ensure_loaded().await,
                WizardStep::Highlights => managers.highlights.ensure_loaded().await,
                WizardStep::Activities => managers.activities.ensure_loaded().await,
                WizardStep::Images => managers.gallery.ensure_loaded().await,
            },
            Err(e) => Err(e),
        };
        self.is_submitting = false;
        result.map_err(|e| self.fail(e))
    }

    /// Finish the session. Only possible from the last step with a complete
    /// gallery.
    pub fn complete(&mut self) -> Result<(), AuthoringError> {
        self.ensure_in_progress()?;
        if let Err(e) = can_complete(self.current_step) {
            return Err(self.fail(AuthoringError::StepLocked {
                step: self.current_step,
                reason: e.to_string(),
            }));
        }
        if let Err(errors) = validate_step(&self.draft_for(WizardStep::Images)).into_result() {
            return Err(self.fail(AuthoringError::Validation(errors)));
        }

        self.status = WizardStatus::Completed;
        self.clear_feedback();
        tracing::info!(trek_id = self.trek_id(), "Trek authoring completed");
        Ok(())
    }

    /// Leave the session. Persisted steps stay as they are.
    pub fn abandon(&mut self) {
        if self.status == WizardStatus::InProgress {
            tracing::info!(
                trek_id = self.trek_id(),
                step = self.current_step.to_number(),
                "Trek authoring abandoned"
            );
            self.status = WizardStatus::Abandoned;
        }
    }

    /// Surface the outcome of a manager operation on the wizard.
    pub fn record<T>(&mut self, result: Result<T, AuthoringError>) -> Result<T, AuthoringError> {
        match result {
            Ok(value) => {
                self.clear_feedback();
                Ok(value)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn ensure_in_progress(&self) -> Result<(), AuthoringError> {
        ensure_in_progress(self.status).map_err(|e| AuthoringError::StepLocked {
            step: self.current_step,
            reason: e.to_string(),
        })
    }

    fn fail(&mut self, err: AuthoringError) -> AuthoringError {
        self.errors = err.field_errors().cloned().unwrap_or_default();
        self.message = Some(err.message());
        tracing::debug!(
            step = self.current_step.to_number(),
            message = %err,
            "Step operation failed"
        );
        err
    }

    fn clear_feedback(&mut self) {
        self.errors = FieldErrors::new();
        self.message = None;
    }
}
