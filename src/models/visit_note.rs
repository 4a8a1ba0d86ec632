//! Site-visit notes and maintenance updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a note was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSource {
    Visit,
    Chat,
    MaintenanceUpdate,
}

/// Visit note or maintenance update. Stored newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteVisitNote {
    pub id: String,
    pub property_id: String,
    #[serde(default)]
    pub unit_id: Option<String>,
    #[serde(default)]
    pub maintenance_request_id: Option<String>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub video_urls: Vec<String>,
    pub source: NoteSource,
    #[serde(default)]
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
