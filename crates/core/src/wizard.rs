//! Trek authoring wizard steps and transition rules.
//!
//! Defines the five ordered steps and the validation helpers the wizard
//! controller uses before moving between them.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle of one authoring session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStatus {
    #[default]
    InProgress,
    Completed,
    /// Left part way. Whatever was persisted stays persisted.
    Abandoned,
}

impl WizardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

// ---------------------------------------------------------------------------
// Wizard steps
// ---------------------------------------------------------------------------

/// The five steps in the trek authoring wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    BasicInfo,
    Services,
    Highlights,
    Activities,
    Images,
}

/// Total number of steps in the wizard.
pub const TOTAL_STEPS: u8 = 5;

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 5;

impl WizardStep {
    /// Convert a 1-based step number to a `WizardStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::BasicInfo),
            2 => Ok(Self::Services),
            3 => Ok(Self::Highlights),
            4 => Ok(Self::Activities),
            5 => Ok(Self::Images),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::BasicInfo => 1,
            Self::Services => 2,
            Self::Highlights => 3,
            Self::Activities => 4,
            Self::Images => 5,
        }
    }

    /// Human-readable label for the step.
    pub fn label(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic Info",
            Self::Services => "Services",
            Self::Highlights => "Highlights",
            Self::Activities => "Activities",
            Self::Images => "Images",
        }
    }

    /// The following step, capped at the last one.
    pub fn next(self) -> Self {
        Self::from_number(self.to_number() + 1).unwrap_or(Self::Images)
    }

    /// The preceding step, floored at the first one.
    pub fn previous(self) -> Self {
        Self::from_number(self.to_number().saturating_sub(1)).unwrap_or(Self::BasicInfo)
    }

    /// Every step except the first addresses its remote calls by trek id.
    pub fn requires_trek(self) -> bool {
        self != Self::BasicInfo
    }

    pub fn is_last(self) -> bool {
        self == Self::Images
    }
}

/// Check that `next` may be entered given whether the trek exists yet.
pub fn validate_step_entry(next: WizardStep, has_trek: bool) -> Result<(), CoreError> {
    if next.requires_trek() && !has_trek {
        return Err(CoreError::Validation(format!(
            "Cannot enter step {} ({}) before the trek has been created",
            next.to_number(),
            next.label()
        )));
    }
    Ok(())
}

/// Check that the session still accepts edits and navigation.
pub fn ensure_in_progress(status: WizardStatus) -> Result<(), CoreError> {
    if status != WizardStatus::InProgress {
        return Err(CoreError::Validation(format!(
            "Session is {}; start a new one to make changes",
            status.as_str()
        )));
    }
    Ok(())
}

/// Check that the workflow can be completed from `current`.
pub fn can_complete(current: WizardStep) -> Result<(), CoreError> {
    if !current.is_last() {
        return Err(CoreError::Validation(format!(
            "Cannot complete: must be on step {MAX_STEP} (Images), currently on step {}",
            current.to_number()
        )));
    }
    Ok(())
}
