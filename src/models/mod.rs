//! Data models for workspace entities

mod conversation;
mod maintenance;
mod message;
mod user;
mod visit_note;

pub use conversation::*;
pub use maintenance::*;
pub use message::*;
pub use user::*;
pub use visit_note::*;
