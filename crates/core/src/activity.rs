//! Itinerary activities, including transportation legs.

use serde::{Deserialize, Serialize};

use crate::duration::TrekDuration;
use crate::types::DbId;

/// Whether an itinerary entry is a general activity or a transport leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    #[default]
    Activity,
    Transportation,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activity => "ACTIVITY",
            Self::Transportation => "TRANSPORTATION",
        }
    }
}

/// Vehicle used by a transportation leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportType {
    Van,
    Bus,
    Car,
    Train,
    Boat,
    Other,
}

/// An activity row as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: DbId,
    pub trek_id: DbId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub is_optional: bool,
    /// 1-based position within the trek.
    pub activity_order: u32,
    #[serde(default)]
    pub transport_type: Option<TransportType>,
    #[serde(default)]
    pub transport_duration: Option<TrekDuration>,
}

/// Editable fields of an activity.
///
/// Transport fields are only meaningful when `kind` is
/// [`ActivityKind::Transportation`]; see [`ActivityDraft::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDraft {
    pub title: String,
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_type: Option<TransportType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_duration: Option<TrekDuration>,
}

impl ActivityDraft {
    pub fn activity(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn transportation(
        title: impl Into<String>,
        description: impl Into<String>,
        transport_type: TransportType,
        transport_duration: TrekDuration,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: ActivityKind::Transportation,
            is_optional: false,
            transport_type: Some(transport_type),
            transport_duration: Some(transport_duration),
        }
    }

    /// Copy of the draft with transport fields cleared for plain activities.
    pub fn normalized(&self) -> Self {
        let mut out = self.clone();
        if out.kind == ActivityKind::Activity {
            out.transport_type = None;
            out.transport_duration = None;
        }
        out
    }

    /// Editable fields of an existing activity.
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            title: activity.title.clone(),
            description: activity.description.clone(),
            kind: activity.kind,
            is_optional: activity.is_optional,
            transport_type: activity.transport_type,
            transport_duration: activity.transport_duration,
        }
    }
}

/// Payload for creating an activity at a given position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    #[serde(flatten)]
    pub fields: ActivityDraft,
    pub activity_order: u32,
}
