//! Store operation errors

use crate::api::ApiError;
use crate::realtime::RealtimeError;

/// Why a store operation did not happen.
///
/// Validation, permission and lookup failures are raised before any
/// network call; `Remote` and `Realtime` carry the transport error verbatim.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("A {role} account cannot {action}")]
    PermissionDenied {
        role: &'static str,
        action: &'static str,
    },

    #[error("Conversation {0} is closed")]
    ConversationClosed(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Remote(#[from] ApiError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),
}

impl StoreError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        StoreError::Validation(msg.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
