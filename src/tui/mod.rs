//! Terminal user interface using Ratatui.
//!
//! The UI loop never touches the network; a single store task does, see
//! `backend`.

mod app;
mod backend;
mod conversation;
mod inbox;
mod input;
mod log_capture;
mod maintenance;
mod profile;
mod signin;
mod ui;
mod visit;

pub use app::run;
pub use log_capture::LogBuffer;
