use trek_core::types::DbId;
use trek_core::validation::FieldErrors;
use trek_core::wizard::WizardStep;

/// Outcome of a failed authoring operation.
///
/// Every variant renders as a message fit to show the operator. Retrying
/// means re-invoking the same operation; nothing here retries on its own.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthoringError {
    /// Local, field-scoped problems. No network call was made.
    #[error("Please correct the highlighted fields: {0}")]
    Validation(FieldErrors),

    /// The backend answered with `success: false`.
    #[error("{0}")]
    Rejected(String),

    /// The backend could not be reached or answered garbage.
    #[error("Could not reach the server: {0}")]
    Transport(String),

    /// The primary image must be demoted before it can be deleted.
    #[error("Image {0} is the primary image; choose another primary before deleting it")]
    PrimaryImageProtected(DbId),

    /// The activity type is fixed once the activity exists.
    #[error("The type of an existing activity cannot be changed")]
    TypeLocked,

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// The wizard refused a step transition.
    #[error("Step {} ({}): {reason}", .step.to_number(), .step.label())]
    StepLocked { step: WizardStep, reason: String },

    /// A multi-call operation stopped part way. `completed` says which
    /// part reached the backend.
    #[error("{message} ({completed})")]
    PartiallyCompleted { completed: String, message: String },

    /// The backend returned data that breaks a gallery or ordering rule.
    #[error("Inconsistent server state: {0}")]
    Inconsistent(String),
}

impl AuthoringError {
    /// The message surfaced to the operator.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Validation failure on a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field, message);
        Self::Validation(errors)
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartiallyCompleted { .. })
    }
}
