//! Location models and DTOs.
//!
//! A location is a map point of interest with narrative metadata. Its story
//! events are embedded in the row as a JSON column: they have no identity
//! outside the parent, and a single-row UPDATE keeps the whole document
//! atomic.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What a point of interest means to the chronicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Power,
    Mission,
    Refuge,
    Danger,
}

impl Default for LocationKind {
    fn default() -> Self {
        Self::Power
    }
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Power => write!(f, "power"),
            Self::Mission => write!(f, "mission"),
            Self::Refuge => write!(f, "refuge"),
            Self::Danger => write!(f, "danger"),
        }
    }
}

impl std::str::FromStr for LocationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "power" => Ok(Self::Power),
            "mission" => Ok(Self::Mission),
            "refuge" => Ok(Self::Refuge),
            "danger" => Ok(Self::Danger),
            _ => Err(format!("Unknown location type: {}", s)),
        }
    }
}

impl From<String> for LocationKind {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// An event embedded in a location's timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoryEvent {
    pub id: String,
    pub content: String,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct LocationRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub narration: String,
    pub sphere: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub kind: String,
    pub visible: bool,
    /// JSON array of image URLs
    pub images: Option<String>,
    /// JSON array of StoryEvent objects
    pub events: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl LocationRow {
    /// Parse embedded events from the JSON column
    pub fn get_events(&self) -> Vec<StoryEvent> {
        self.events
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }

    /// Parse image URLs from the JSON column
    pub fn get_images(&self) -> Vec<String> {
        self.images
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default()
    }
}

/// Helper to serialize a string list for a JSON column
pub fn serialize_string_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_string(items).ok()
    }
}

/// Helper to serialize embedded events for a JSON column
pub fn serialize_events(events: &[StoryEvent]) -> Option<String> {
    if events.is_empty() {
        None
    } else {
        serde_json::to_string(events).ok()
    }
}

/// Response DTO with the JSON columns parsed into real arrays.
#[derive(Debug, Clone, Serialize)]
pub struct LocationResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub narration: String,
    pub sphere: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub visible: bool,
    pub images: Vec<String>,
    pub events: Vec<StoryEvent>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<LocationRow> for LocationResponse {
    fn from(row: LocationRow) -> Self {
        let events = row.get_events();
        let images = row.get_images();
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            narration: row.narration,
            sphere: row.sphere,
            address: row.address,
            lat: row.lat,
            lng: row.lng,
            kind: LocationKind::from(row.kind),
            visible: row.visible,
            images,
            events,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// DTOs for API

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateLocationRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<LocationKind>,
    pub visible: Option<bool>,
    #[serde(default)]
    pub sphere: String,
    #[serde(default)]
    pub narration: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<LocationKind>,
    pub visible: Option<bool>,
    pub sphere: Option<String>,
    pub narration: Option<String>,
    pub address: Option<String>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventRequest {
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(events: Option<String>, images: Option<String>) -> LocationRow {
        LocationRow {
            id: "loc1".to_string(),
            name: "Lighthouse".to_string(),
            description: String::new(),
            narration: String::new(),
            sphere: String::new(),
            address: String::new(),
            lat: -33.1,
            lng: -64.3,
            kind: "refuge".to_string(),
            visible: true,
            images,
            events,
            created_by: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("danger".parse::<LocationKind>(), Ok(LocationKind::Danger));
        assert!("volcano".parse::<LocationKind>().is_err());
        // DB reads are lenient: unknown values fall back to the default
        assert_eq!(LocationKind::from("volcano".to_string()), LocationKind::Power);
    }

    #[test]
    fn test_kind_serializes_as_type() {
        let response = LocationResponse::from(row_with(None, None));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "refuge");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_events_round_trip_through_column() {
        let event = StoryEvent {
            id: "ev1".to_string(),
            content: "The tide went out and did not return".to_string(),
            created_by: "gm".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };
        let column = serialize_events(std::slice::from_ref(&event));
        let row = row_with(column, None);
        assert_eq!(row.get_events(), vec![event]);
    }

    #[test]
    fn test_missing_columns_parse_empty() {
        let row = row_with(None, None);
        assert!(row.get_events().is_empty());
        assert!(row.get_images().is_empty());
        assert!(serialize_events(&[]).is_none());
        assert!(serialize_string_list(&[]).is_none());
    }

    #[test]
    fn test_unknown_request_fields_are_rejected() {
        let err = serde_json::from_str::<CreateLocationRequest>(
            r#"{"name": "Docks", "lat": 1.0, "lng": 2.0, "secret": true}"#,
        );
        assert!(err.is_err());
    }
}
