//! permaudit core - permission aggregation and export engine
//!
//! Collapses the access-control data of a content-management site into one
//! auditable row per grantee and resource.
//!
//! # Components
//!
//! - [`Catalog`]: capability names, canonical column order, display names and
//!   synonyms per content kind
//! - [`TemplateTable`]: administrative template capabilities and what they
//!   expand to across every nested content kind
//! - [`merge_project`]: order-sensitive fold of a project's own rules and its
//!   default-permission rules into one [`MergedPermissionRecord`] per grantee
//! - [`CsvProjector`]: stable column schema and CSV output for a batch of
//!   [`ExportRow`]s of one content kind
//! - [`PermissionFetcher`] / [`DirectoryFetcher`]: the boundary to the remote
//!   service
//!
//! The engine is synchronous and keeps no state between calls; the policy
//! tables are built once and passed in read-only.

#![forbid(unsafe_code)]

pub mod capability;
pub mod catalog;
pub mod errors;
pub mod kind;
pub mod merge;
pub mod policy;
pub mod projection;
pub mod source;
pub mod template;

pub use capability::{
    Capability, CapabilityKey, CapabilityMode, CapabilitySet, Grantee, GranteeKind, PermissionRule,
};
pub use catalog::{Catalog, SynonymRule};
pub use errors::{AuditError, Result};
pub use kind::ContentKind;
pub use merge::{
    merge_project, ordered_sources, MergedPermissionRecord, ProjectMerge, RuleSource, SourceRules,
};
pub use policy::PolicyTables;
pub use projection::{
    bom_csv_writer, Column, CsvProjector, ExportRow, ExportSchema, FixedField, ResourceContext,
    NO_PERMISSIONS_SET, NO_SETTING,
};
pub use source::{
    AssetSummary, DirectoryFetcher, GroupMember, PermissionFetcher, ProjectSummary, ViewSummary,
};
pub use template::{Template, TemplateExpansion, TemplateTable};
