//! Step validation for the trek wizard.
//!
//! Each wizard step has a draft type. [`validate_step`] maps a draft to a
//! field -> message map; a step may advance only when the map is empty.
//! Validation is local and never touches the network.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::activity::{ActivityDraft, ActivityKind};
use crate::duration::TrekDuration;
use crate::trek::{CreateTrek, Trek};
use crate::types::DbId;
use crate::upload::MIN_UPLOAD_BATCH;
use crate::wizard::WizardStep;

// ---------------------------------------------------------------------------
// Field errors
// ---------------------------------------------------------------------------

/// Field name -> human-readable message. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Record a message for `field`. The first message for a field wins.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.insert(field, message);
        }
    }

    /// `Ok(())` when empty, otherwise the errors themselves.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<&ValidationErrors> for FieldErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            if let Some(err) = errs.first() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                out.insert(field.to_string(), message);
            }
        }
        out
    }
}

/// Run the derived validator and collect its field errors.
pub fn validate_fields<T: Validate>(value: &T) -> FieldErrors {
    match value.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errors) => FieldErrors::from(&errors),
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

/// Rejects empty and whitespace-only text.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Parse a price entered as text. Must be a number strictly above zero.
pub fn parse_price(raw: &str) -> Result<Decimal, ValidationError> {
    let price = Decimal::from_str(raw.trim()).map_err(|_| {
        let mut err = ValidationError::new("price_not_a_number");
        err.message = Some(Cow::Borrowed("Price must be a number"));
        err
    })?;
    if price <= Decimal::ZERO {
        let mut err = ValidationError::new("price_not_positive");
        err.message = Some(Cow::Borrowed("Price must be greater than zero"));
        return Err(err);
    }
    Ok(price)
}

fn positive_price(raw: &str) -> Result<(), ValidationError> {
    parse_price(raw).map(|_| ())
}

// ---------------------------------------------------------------------------
// Step drafts
// ---------------------------------------------------------------------------

/// Step 1: the trek's own attributes, as typed into the editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfoDraft {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Description is required"))]
    pub description: String,
    #[validate(custom(function = "not_blank", message = "Full description is required"))]
    pub full_description: String,
    pub duration_hours: u32,
    pub duration_minutes: u32,
    #[validate(custom(function = "positive_price"))]
    pub price: String,
    #[validate(custom(function = "not_blank", message = "Start location is required"))]
    pub start_location: String,
    #[validate(custom(function = "not_blank", message = "End location is required"))]
    pub end_location: String,
    #[validate(required(message = "Category is required"))]
    pub category_id: Option<DbId>,
}

impl BasicInfoDraft {
    pub fn duration(&self) -> TrekDuration {
        TrekDuration::from_parts(self.duration_hours, self.duration_minutes)
    }

    /// Editable draft for an existing trek.
    pub fn from_trek(trek: &Trek) -> Self {
        Self {
            title: trek.title.clone(),
            description: trek.description.clone(),
            full_description: trek.full_description.clone(),
            duration_hours: trek.duration.hours(),
            duration_minutes: trek.duration.minutes(),
            price: trek.price.normalize().to_string(),
            start_location: trek.start_location.clone(),
            end_location: trek.end_location.clone(),
            category_id: Some(trek.category_id),
        }
    }

    /// Validate and convert to the create payload.
    pub fn to_create(&self) -> Result<CreateTrek, FieldErrors> {
        validate_basic_info(self).into_result()?;

        let mut errors = FieldErrors::new();
        let price = parse_price(&self.price).unwrap_or_else(|_| {
            errors.insert("price", "Price must be a number");
            Decimal::ZERO
        });
        let category_id = self.category_id.unwrap_or_else(|| {
            errors.insert("category_id", "Category is required");
            0
        });
        errors.into_result()?;

        Ok(CreateTrek {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            full_description: self.full_description.trim().to_string(),
            duration: self.duration(),
            price,
            start_location: self.start_location.trim().to_string(),
            end_location: self.end_location.trim().to_string(),
            category_id,
        })
    }
}

/// Steps 2 and 3: the trek's membership in a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDraft {
    pub selected: Vec<DbId>,
}

/// Step 4: the itinerary as persisted so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryDraft {
    pub activity_orders: Vec<u32>,
}

/// Step 5: the gallery as persisted so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryDraft {
    pub persisted_images: usize,
    pub staged_files: usize,
}

/// The draft for whichever step is current.
#[derive(Debug, Clone, PartialEq)]
pub enum StepDraft {
    BasicInfo(BasicInfoDraft),
    Services(SelectionDraft),
    Highlights(SelectionDraft),
    Activities(ItineraryDraft),
    Images(GalleryDraft),
}

impl StepDraft {
    pub fn step(&self) -> WizardStep {
        match self {
            Self::BasicInfo(_) => WizardStep::BasicInfo,
            Self::Services(_) => WizardStep::Services,
            Self::Highlights(_) => WizardStep::Highlights,
            Self::Activities(_) => WizardStep::Activities,
            Self::Images(_) => WizardStep::Images,
        }
    }
}

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Validate step 1. Duration must be non-zero in addition to the derived rules.
pub fn validate_basic_info(draft: &BasicInfoDraft) -> FieldErrors {
    let mut errors = validate_fields(draft);
    if draft.duration().is_zero() {
        errors.insert("duration", "Duration is required");
    }
    errors
}

/// Validate an activity draft. Transport fields are required for
/// transportation legs.
pub fn validate_activity(draft: &ActivityDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if draft.title.trim().is_empty() {
        errors.insert("title", "Title is required");
    }
    if draft.description.trim().is_empty() {
        errors.insert("description", "Description is required");
    }
    if draft.kind == ActivityKind::Transportation {
        if draft.transport_type.is_none() {
            errors.insert("transport_type", "Transport type is required");
        }
        match draft.transport_duration {
            None => errors.insert("transport_duration", "Transport duration is required"),
            Some(d) if d.is_zero() => {
                errors.insert("transport_duration", "Transport duration is required")
            }
            Some(_) => {}
        }
    }
    errors
}

/// Validate the draft of any step.
pub fn validate_step(draft: &StepDraft) -> FieldErrors {
    match draft {
        StepDraft::BasicInfo(d) => validate_basic_info(d),
        StepDraft::Services(_) | StepDraft::Highlights(_) => FieldErrors::new(),
        StepDraft::Activities(d) => {
            let mut errors = FieldErrors::new();
            if !crate::ordering::is_contiguous(d.activity_orders.iter().copied()) {
                errors.insert(
                    "activities",
                    "Activity order is out of sync; reconcile before continuing",
                );
            }
            errors
        }
        StepDraft::Images(d) => {
            let mut errors = FieldErrors::new();
            if d.staged_files > 0 {
                errors.insert("images", "Upload or clear the staged files first");
            } else if d.persisted_images < MIN_UPLOAD_BATCH {
                errors.insert(
                    "images",
                    format!("At least {MIN_UPLOAD_BATCH} images are required"),
                );
            }
            errors
        }
    }
}
