//! Bearer token with expiry bookkeeping

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Treat tokens this close to expiry as already expired.
const EXPIRY_MARGIN_SECS: u64 = 300;

/// Stored bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    /// Unix seconds; `None` means the backend gave no lifetime.
    pub expires_at: Option<u64>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl StoredToken {
    pub fn new(token: String, expires_in_secs: Option<u64>) -> Self {
        let expires_at = expires_in_secs.map(|secs| now_secs() + secs);
        Self { token, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => now_secs() + EXPIRY_MARGIN_SECS >= exp,
            None => false,
        }
    }

    /// Seconds of validity left, if the token has a lifetime.
    pub fn remaining_secs(&self) -> Option<u64> {
        self.expires_at.map(|exp| exp.saturating_sub(now_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_margin() {
        assert!(!StoredToken::new("a".into(), None).is_expired());
        assert!(!StoredToken::new("a".into(), Some(3600)).is_expired());
        assert!(StoredToken::new("a".into(), Some(60)).is_expired());
    }

    #[test]
    fn test_remaining_secs() {
        let t = StoredToken::new("a".into(), Some(3600));
        let left = t.remaining_secs().unwrap();
        assert!(left <= 3600 && left > 3500);
        assert_eq!(StoredToken::new("a".into(), None).remaining_secs(), None);
    }
}
