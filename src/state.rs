//! Application state persisted by the gateway
//!
//! The gateway checks these shapes on load but never interprets them: ids are
//! weak references and nothing here enforces that they resolve.

use serde::{Deserialize, Deserializer, Serialize};

/// A named group of items (a "field" on the wire)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    /// Unix timestamp (ms) when created. Must be finite to survive a save.
    #[serde(rename = "createdAt")]
    pub created_at: f64,
    /// Ids of the items in this entity, in display order
    #[serde(rename = "imageIds")]
    pub member_ids: Vec<String>,
}

/// A single item (an "image" on the wire)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    /// Id of the owning entity
    #[serde(rename = "fieldId")]
    pub owner_id: String,
    /// Data URI or blob reference
    #[serde(rename = "src")]
    pub payload: String,
    /// Unix timestamp (ms) when created. Must be finite to survive a save.
    #[serde(rename = "createdAt")]
    pub created_at: f64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_note"
    )]
    pub note: Option<String>,
}

/// Everything the host keeps in memory and wants back after a reload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppState {
    #[serde(rename = "fields")]
    pub entities: Vec<Entity>,
    #[serde(rename = "images")]
    pub items: Vec<Item>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamps that JSON cannot carry (NaN, ±inf). They serialize as
    /// `null`, so a state containing any of them will not load back.
    pub fn non_finite_timestamps(&self) -> usize {
        let entities = self.entities.iter().map(|e| e.created_at);
        let items = self.items.iter().map(|i| i.created_at);
        entities.chain(items).filter(|t| !t.is_finite()).count()
    }
}

// A missing note is `None`, but an explicit `null` is not a string and must not
// slip through as one.
fn present_note<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}
