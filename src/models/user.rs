//! User-related models

use serde::{Deserialize, Serialize};

/// Workspace role, as issued by the backend on sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Supervisor,
    Tenant,
    Landlord,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Supervisor => "supervisor",
            Role::Tenant => "tenant",
            Role::Landlord => "landlord",
        }
    }

    /// Property staff (as opposed to residents and owners).
    fn is_staff(&self) -> bool {
        matches!(self, Role::Manager | Role::Supervisor)
    }
}

/// Actions a screen may offer depending on who is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Assign, reply as staff, and close conversations.
    ManageConversations,
    /// Move maintenance requests between statuses.
    UpdateMaintenance,
    /// Open a live socket for a conversation.
    UseRealtimeChat,
}

impl Capability {
    /// Verb phrase used in permission errors.
    pub fn action(&self) -> &'static str {
        match self {
            Capability::ManageConversations => "manage conversations",
            Capability::UpdateMaintenance => "change maintenance status",
            Capability::UseRealtimeChat => "open live chat",
        }
    }
}

/// Notification channels the user opted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPrefs {
    #[serde(default = "default_true")]
    pub push: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub sms: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            push: true,
            email: false,
            sms: false,
        }
    }
}

/// Signed-in user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub notification_prefs: NotificationPrefs,
}

impl User {
    /// Single permission question asked by screens and the store.
    ///
    /// This is a UX gate only; the backend re-validates every request.
    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageConversations
            | Capability::UpdateMaintenance
            | Capability::UseRealtimeChat => self.role.is_staff(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "u1".into(),
            name: "Pat".into(),
            email: "pat@example.com".into(),
            role,
            phone: None,
            company: None,
            notification_prefs: NotificationPrefs::default(),
        }
    }

    #[test]
    fn test_staff_capabilities() {
        for role in [Role::Manager, Role::Supervisor] {
            let u = user(role);
            assert!(u.can(Capability::ManageConversations));
            assert!(u.can(Capability::UpdateMaintenance));
            assert!(u.can(Capability::UseRealtimeChat));
        }
    }

    #[test]
    fn test_resident_capabilities() {
        for role in [Role::Tenant, Role::Landlord] {
            let u = user(role);
            assert!(!u.can(Capability::ManageConversations));
            assert!(!u.can(Capability::UpdateMaintenance));
            assert!(!u.can(Capability::UseRealtimeChat));
        }
    }

    #[test]
    fn test_user_deserialize_defaults() {
        let json = r#"{"id":"u9","name":"Kim","email":"kim@example.com","role":"supervisor"}"#;
        let u: User = serde_json::from_str(json).unwrap();
        assert_eq!(u.role, Role::Supervisor);
        assert!(u.notification_prefs.push);
        assert!(!u.notification_prefs.email);
        assert!(u.phone.is_none());
    }
}
