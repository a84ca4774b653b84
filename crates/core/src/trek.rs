//! The trek aggregate root and its create/update DTOs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::duration::TrekDuration;
use crate::types::{DbId, Timestamp};

/// A trek as returned by the backend.
///
/// `service_ids` and `highlight_ids` are the trek's memberships in the
/// global catalogs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trek {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub full_description: String,
    pub duration: TrekDuration,
    pub price: Decimal,
    pub start_location: String,
    pub end_location: String,
    pub category_id: DbId,
    #[serde(default)]
    pub service_ids: Vec<DbId>,
    #[serde(default)]
    pub highlight_ids: Vec<DbId>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

/// DTO for creating a trek (wizard step 1, first save).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrek {
    pub title: String,
    pub description: String,
    pub full_description: String,
    pub duration: TrekDuration,
    pub price: Decimal,
    pub start_location: String,
    pub end_location: String,
    pub category_id: DbId,
}

/// DTO for a partial trek update. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTrek {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<TrekDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<DbId>,
}

impl UpdateTrek {
    /// Every field of `input`, as a full overwrite.
    pub fn from_create(input: &CreateTrek) -> Self {
        Self {
            title: Some(input.title.clone()),
            description: Some(input.description.clone()),
            full_description: Some(input.full_description.clone()),
            duration: Some(input.duration),
            price: Some(input.price),
            start_location: Some(input.start_location.clone()),
            end_location: Some(input.end_location.clone()),
            category_id: Some(input.category_id),
        }
    }

    /// Apply the present fields to `trek`.
    pub fn apply_to(&self, trek: &mut Trek) {
        if let Some(v) = &self.title {
            trek.title = v.clone();
        }
        if let Some(v) = &self.description {
            trek.description = v.clone();
        }
        if let Some(v) = &self.full_description {
            trek.full_description = v.clone();
        }
        if let Some(v) = self.duration {
            trek.duration = v;
        }
        if let Some(v) = self.price {
            trek.price = v;
        }
        if let Some(v) = &self.start_location {
            trek.start_location = v.clone();
        }
        if let Some(v) = &self.end_location {
            trek.end_location = v.clone();
        }
        if let Some(v) = self.category_id {
            trek.category_id = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trek_decodes_camel_case_and_defaults_memberships() {
        let trek: Trek = serde_json::from_value(json!({
            "id": 7,
            "title": "Annapurna Base Camp",
            "description": "Classic",
            "fullDescription": "Ten days in the sanctuary",
            "duration": "PT10H30M",
            "price": 1250.5,
            "startLocation": "Pokhara",
            "endLocation": "Nayapul",
            "categoryId": 2
        }))
        .unwrap();

        assert_eq!(trek.id, 7);
        assert_eq!(trek.duration, TrekDuration::from_parts(10, 30));
        assert_eq!(trek.price, Decimal::new(12505, 1));
        assert!(trek.service_ids.is_empty());
        assert!(trek.highlight_ids.is_empty());
    }

    #[test]
    fn update_skips_absent_fields() {
        let update = UpdateTrek {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, json!({ "title": "Renamed" }));
    }
}
