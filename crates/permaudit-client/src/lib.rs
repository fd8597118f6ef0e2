//! permaudit client - REST fetchers for the remote content-management service
//!
//! [`RestClient`] signs in with a personal access token and implements
//! [`permaudit_core::PermissionFetcher`] and
//! [`permaudit_core::DirectoryFetcher`] over the JSON flavour of the REST
//! API. Responses are mapped onto [`permaudit_core::AuditError`] so callers
//! can tell fatal failures (authentication, transport) from per-resource
//! ones.

#![forbid(unsafe_code)]

pub mod client;
pub mod config;
mod wire;

pub use client::RestClient;
pub use config::{Credentials, ServerConfig};
