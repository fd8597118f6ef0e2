//! Fetcher interfaces
//!
//! The engine never talks to the network. These traits describe what it needs
//! from the remote service; `permaudit-client` implements them over REST and
//! tests implement them in memory.

use crate::{ContentKind, PermissionRule, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A project as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Project id
    pub id: String,
    /// Project name
    pub name: String,
    /// Parent project id, for nested projects
    pub parent_project_id: Option<String>,
    /// Content-permission setting (locked / managed by owner)
    pub content_permissions: Option<String>,
}

/// A workbook, data source or flow as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    /// Asset id
    pub id: String,
    /// Asset name
    pub name: String,
    /// Owning project id
    pub project_id: Option<String>,
    /// Owning project name
    pub project_name: Option<String>,
}

/// A view as listed by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSummary {
    /// View id
    pub id: String,
    /// View name
    pub name: String,
    /// Owning workbook id
    pub workbook_id: Option<String>,
}

/// A user belonging to a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    /// User id
    pub id: String,
    /// User name
    pub name: String,
    /// Email, when the site exposes it
    pub email: String,
}

/// Permission rule retrieval
#[async_trait]
pub trait PermissionFetcher: Send + Sync {
    /// Rules set on the project itself
    async fn project_permissions(&self, project_id: &str) -> Result<Vec<PermissionRule>>;

    /// Default-permission rules of a project under one resource path
    /// (see [`ContentKind::default_permission_paths`]). Unsupported paths
    /// fail with a not-found error.
    async fn default_permissions(&self, project_id: &str, path: &str) -> Result<Vec<PermissionRule>>;

    /// Rules set on a single workbook, data source, view or flow
    async fn resource_permissions(&self, kind: ContentKind, id: &str) -> Result<Vec<PermissionRule>>;
}

/// Site listings and identity tables
#[async_trait]
pub trait DirectoryFetcher: Send + Sync {
    /// All projects
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>>;

    /// All workbooks, data sources or flows
    async fn list_assets(&self, kind: ContentKind) -> Result<Vec<AssetSummary>>;

    /// All views
    async fn list_views(&self) -> Result<Vec<ViewSummary>>;

    /// User id to user name
    async fn users(&self) -> Result<HashMap<String, String>>;

    /// Group id to group name
    async fn groups(&self) -> Result<HashMap<String, String>>;

    /// Members of one group
    async fn group_members(&self, group_id: &str) -> Result<Vec<GroupMember>>;
}
