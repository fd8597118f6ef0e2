//! Content kinds exposed by the remote service

use crate::{AuditError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of resource a permission applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Project (folder) holding other content
    Project,
    /// Workbook
    Workbook,
    /// Published data source
    Datasource,
    /// Prep flow
    Flow,
    /// View (sheet) inside a workbook
    View,
    /// Virtual connection
    VirtualConnection,
    /// External database asset
    Database,
    /// External table asset
    Table,
}

impl ContentKind {
    /// Every kind, in declaration order
    pub const ALL: [ContentKind; 8] = [
        ContentKind::Project,
        ContentKind::Workbook,
        ContentKind::Datasource,
        ContentKind::Flow,
        ContentKind::View,
        ContentKind::VirtualConnection,
        ContentKind::Database,
        ContentKind::Table,
    ];

    /// Kinds carrying project default permissions, in merge order
    pub const NESTED: [ContentKind; 6] = [
        ContentKind::Workbook,
        ContentKind::Datasource,
        ContentKind::Flow,
        ContentKind::VirtualConnection,
        ContentKind::Database,
        ContentKind::Table,
    ];

    /// Identifier used in exported rows and namespaced capability names
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Project => "project",
            ContentKind::Workbook => "workbook",
            ContentKind::Datasource => "datasource",
            ContentKind::Flow => "flow",
            ContentKind::View => "view",
            ContentKind::VirtualConnection => "virtualconnection",
            ContentKind::Database => "database",
            ContentKind::Table => "table",
        }
    }

    /// Label of the permission tab this kind occupies in project exports
    pub fn tab_label(&self) -> &'static str {
        match self {
            ContentKind::Project => "Projects Tab",
            ContentKind::Workbook => "Workbooks Tab",
            ContentKind::Datasource => "Data Sources Tab",
            ContentKind::Flow => "Flows Tab",
            ContentKind::View => "Views Tab",
            ContentKind::VirtualConnection => "Virtual Connections Tab",
            ContentKind::Database => "Databases Tab",
            ContentKind::Table => "Tables Tab",
        }
    }

    /// Resource path segments for the project default-permission endpoint.
    ///
    /// Virtual connections are exposed under several historical paths; they
    /// are tried in this order until one yields rules.
    pub fn default_permission_paths(&self) -> &'static [&'static str] {
        match self {
            ContentKind::Workbook => &["workbooks"],
            ContentKind::Datasource => &["datasources"],
            ContentKind::Flow => &["flows"],
            ContentKind::VirtualConnection => &["virtualconnections", "lenses", "virtual-connections"],
            ContentKind::Database => &["databases"],
            ContentKind::Table => &["tables"],
            ContentKind::Project | ContentKind::View => &[],
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        ContentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AuditError::invalid(format!("unknown content kind '{s}'")))
    }
}
