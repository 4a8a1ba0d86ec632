//! Maintenance request models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    New,
    InProgress,
    Done,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::New => "new",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Done => "done",
        }
    }

    /// Next status in the board order, wrapping around.
    pub fn next(&self) -> Self {
        match self {
            MaintenanceStatus::New => MaintenanceStatus::InProgress,
            MaintenanceStatus::InProgress => MaintenanceStatus::Done,
            MaintenanceStatus::Done => MaintenanceStatus::New,
        }
    }
}

impl std::str::FromStr for MaintenanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "new" => Ok(MaintenanceStatus::New),
            "in_progress" | "inprogress" => Ok(MaintenanceStatus::InProgress),
            "done" => Ok(MaintenanceStatus::Done),
            other => Err(format!(
                "Unknown maintenance status '{}' (expected new, in-progress or done)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Maintenance request mirrored from the records system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRequest {
    pub id: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub property_id: String,
    #[serde(default)]
    pub unit_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub status: MaintenanceStatus,
    pub priority: Priority,
    /// Deep link into the external records system
    #[serde(default)]
    pub external_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("new".parse::<MaintenanceStatus>(), Ok(MaintenanceStatus::New));
        assert_eq!(
            "in-progress".parse::<MaintenanceStatus>(),
            Ok(MaintenanceStatus::InProgress)
        );
        assert_eq!("DONE".parse::<MaintenanceStatus>(), Ok(MaintenanceStatus::Done));
        assert!("closed".parse::<MaintenanceStatus>().is_err());
    }

    #[test]
    fn test_status_cycle() {
        let s = MaintenanceStatus::New;
        assert_eq!(s.next().next().next(), MaintenanceStatus::New);
    }

    #[test]
    fn test_status_wire_name() {
        let json = serde_json::to_string(&MaintenanceStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
