//! permaudit CLI library
//!
//! Configuration loading and the export orchestrator behind the `permaudit`
//! binary. The orchestrator is generic over the fetcher traits so it runs
//! against the REST client in production and in-memory fetchers in tests.

#![forbid(unsafe_code)]

pub mod config;
pub mod export;

pub use config::{default_config_path, AppConfig, AuthConfig, ExportConfig};
pub use export::{ExportOptions, ExportSummary, Exporter, Identities, Selection};

use permaudit_core::AuditError;

/// CLI error types
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// No project or resource was selected
    #[error("Nothing to export: pass --project, --all-projects or a resource id")]
    EmptySelection,

    /// A command-line value could not be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure from the engine, client or orchestrator
    #[error(transparent)]
    Audit(#[from] AuditError),
}
