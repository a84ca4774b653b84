//! Global catalogs (services, highlights) that treks attach to.
//!
//! Catalog entries are not owned by any trek. A trek holds a membership
//! set into each catalog; [`CatalogEntity`] abstracts over both kinds so
//! the attachment manager and the gateways are written once.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::DbId;
use crate::validation::not_blank;

/// Which catalog an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Service,
    Highlight,
}

impl CatalogKind {
    /// URL path segment for the catalog collection.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Service => "services",
            Self::Highlight => "highlights",
        }
    }

    /// Singular entity name used in logs and messages.
    pub fn entity_name(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Highlight => "highlight",
        }
    }
}

/// A catalog entry type.
pub trait CatalogEntity:
    Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// User-entered fields for create/update.
    type Fields: Debug + Clone + Serialize + DeserializeOwned + Validate + Send + Sync + 'static;

    const KIND: CatalogKind;

    fn id(&self) -> DbId;

    /// The field searched and shown in lists (`name` or `content`).
    fn display(&self) -> &str;

    fn fields_display(fields: &Self::Fields) -> &str;

    /// Assemble an entry from its id and fields.
    fn from_fields(id: DbId, fields: Self::Fields) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: DbId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ServiceFields {
    #[validate(custom(function = "not_blank", message = "Name is required"))]
    pub name: String,
}

impl ServiceFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CatalogEntity for Service {
    type Fields = ServiceFields;

    const KIND: CatalogKind = CatalogKind::Service;

    fn id(&self) -> DbId {
        self.id
    }

    fn display(&self) -> &str {
        &self.name
    }

    fn fields_display(fields: &ServiceFields) -> &str {
        &fields.name
    }

    fn from_fields(id: DbId, fields: ServiceFields) -> Self {
        Self {
            id,
            name: fields.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: DbId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct HighlightFields {
    #[validate(custom(function = "not_blank", message = "Content is required"))]
    pub content: String,
}

impl HighlightFields {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

impl CatalogEntity for Highlight {
    type Fields = HighlightFields;

    const KIND: CatalogKind = CatalogKind::Highlight;

    fn id(&self) -> DbId {
        self.id
    }

    fn display(&self) -> &str {
        &self.content
    }

    fn fields_display(fields: &HighlightFields) -> &str {
        &fields.content
    }

    fn from_fields(id: DbId, fields: HighlightFields) -> Self {
        Self {
            id,
            content: fields.content,
        }
    }
}

/// Case-insensitive substring filter over the display field.
///
/// An empty or whitespace-only query returns every entry.
pub fn filter_catalog<'a, E: CatalogEntity>(entries: &'a [E], query: &str) -> Vec<&'a E> {
    let needle = query.trim().to_lowercase();
    entries
        .iter()
        .filter(|e| needle.is_empty() || e.display().to_lowercase().contains(&needle))
        .collect()
}

/// Find an entry whose display matches `text` ignoring case and padding.
pub fn find_by_display<'a, E: CatalogEntity>(entries: &'a [E], text: &str) -> Option<&'a E> {
    let wanted = text.trim().to_lowercase();
    entries
        .iter()
        .find(|e| e.display().trim().to_lowercase() == wanted)
}
