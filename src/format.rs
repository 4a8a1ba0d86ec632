//! Display formatting shared by the CLI and the TUI

use chrono::{DateTime, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::models::{ConversationStatus, MaintenanceStatus, NoteSource, Priority, Role, SenderType};

/// "just now", "5m ago", "3h ago", "2d ago", then a short date.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 60 {
        return "just now".to_string();
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m ago", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{}d ago", days);
    }
    then.format("%b %-d").to_string()
}

/// e.g. "May 1, 2024 12:05"
pub fn short_datetime(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y %H:%M").to_string()
}

/// Whole-dollar grouping with cents: `123456` -> `$1,234.56`.
#[allow(dead_code)]
pub fn currency(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let dollars = (abs / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{:02}", sign, grouped, abs % 100)
}

/// Cut `text` to at most `max_width` terminal columns, ending with an ellipsis
/// when anything was dropped.
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let budget = max_width - 1;
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

pub fn conversation_status_label(status: ConversationStatus) -> &'static str {
    match status {
        ConversationStatus::New => "New",
        ConversationStatus::Assigned => "Assigned",
        ConversationStatus::WaitingReply => "Waiting reply",
        ConversationStatus::Closed => "Closed",
    }
}

pub fn maintenance_status_label(status: MaintenanceStatus) -> &'static str {
    match status {
        MaintenanceStatus::New => "New",
        MaintenanceStatus::InProgress => "In progress",
        MaintenanceStatus::Done => "Done",
    }
}

pub fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
    }
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Manager => "Property manager",
        Role::Supervisor => "Supervisor",
        Role::Tenant => "Tenant",
        Role::Landlord => "Landlord",
    }
}

pub fn sender_label(sender: SenderType) -> &'static str {
    match sender {
        SenderType::Visitor => "Resident",
        SenderType::Manager => "Staff",
        SenderType::Bot => "Assistant",
        SenderType::System => "System",
    }
}

pub fn note_source_label(source: NoteSource) -> &'static str {
    match source {
        NoteSource::Visit => "Site visit",
        NoteSource::Chat => "From chat",
        NoteSource::MaintenanceUpdate => "Update",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_relative_time() {
        let now = now();
        assert_eq!(relative_time(now - Duration::seconds(20), now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3h ago");
        assert_eq!(relative_time(now - Duration::days(2), now), "2d ago");
        assert_eq!(relative_time(now - Duration::days(30), now), "Apr 10");
        // Clock skew from the server shows as "just now".
        assert_eq!(relative_time(now + Duration::minutes(2), now), "just now");
    }

    #[test]
    fn test_short_datetime() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap();
        assert_eq!(short_datetime(at), "May 1, 2024 09:05");
    }

    #[test]
    fn test_currency() {
        assert_eq!(currency(0), "$0.00");
        assert_eq!(currency(5), "$0.05");
        assert_eq!(currency(123456), "$1,234.56");
        assert_eq!(currency(100_000_000), "$1,000,000.00");
        assert_eq!(currency(-2550), "-$25.50");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Leaking faucet in 4B", 10), "Leaking f…");
        assert_eq!(truncate("anything", 0), "");
        // Wide characters count double.
        assert_eq!(truncate("漢字漢字", 5), "漢字…");
    }

    #[test]
    fn test_labels() {
        assert_eq!(conversation_status_label(ConversationStatus::WaitingReply), "Waiting reply");
        assert_eq!(maintenance_status_label(MaintenanceStatus::InProgress), "In progress");
        assert_eq!(priority_label(Priority::High), "High");
        assert_eq!(role_label(Role::Manager), "Property manager");
    }
}
