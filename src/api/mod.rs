//! Backend-for-frontend API client
//!
//! `client` is the authenticated JSON transport, `remote` maps each
//! backend endpoint onto the [`RemoteApi`] trait the store depends on.

pub mod client;
mod error;
#[cfg(test)]
pub mod fake;
mod remote;
pub mod wire;

pub use client::BffClient;
pub use error::{ApiError, ApiResult};
pub use remote::RemoteApi;
