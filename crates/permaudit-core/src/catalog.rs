//! Capability catalog
//!
//! Static knowledge of which capability names exist per content kind, their
//! canonical column order, their display names, and which names the remote
//! API uses interchangeably. The raw tables are `const` data; [`Catalog`]
//! indexes them once and is then shared read-only.

use crate::{CapabilityKey, ContentKind};
use std::collections::HashMap;

const WORKBOOK_ORDER: &[&str] = &[
    "Read",
    "Filter",
    "ViewComments",
    "AddComment",
    "ExportImage",
    "ExportData",
    "ShareView",
    "ViewUnderlyingData",
    "WebAuthoring",
    "RunExplainData",
    "ExportXml",
    "Write",
    "ChangeHierarchy",
    "Delete",
    "ChangePermissions",
    "ExtractRefresh",
];

const DATASOURCE_ORDER: &[&str] = &[
    "Read",
    "Connect",
    "ExportXml",
    "Write",
    "SaveAs",
    "VizqlDataApiAccess",
    "PulseMetricDefine",
    "ChangeHierarchy",
    "Delete",
    "ChangePermissions",
    "ExtractRefresh",
];

const VIEW_ORDER: &[&str] = &[
    "Read",
    "Filter",
    "ViewComments",
    "AddComment",
    "ExportImage",
    "ExportData",
    "ShareView",
    "ViewUnderlyingData",
    "WebAuthoring",
    "Delete",
    "ChangePermissions",
];

const FLOW_ORDER: &[&str] = &[
    "Read",
    "ExportXml",
    "Execute",
    "Write",
    "WebAuthoringForFlows",
    "ChangeHierarchy",
    "Delete",
    "ChangePermissions",
];

const VIRTUAL_CONNECTION_ORDER: &[&str] = &[
    "Read",
    "Connect",
    "Write",
    "ChangeHierarchy",
    "Delete",
    "ChangePermissions",
];

const DATABASE_ORDER: &[&str] = &["Read", "Write", "ChangeHierarchy", "ChangePermissions"];

const TABLE_ORDER: &[&str] = &["Read", "Write", "ChangeHierarchy", "ChangePermissions"];

/// Capabilities a project grants on itself (the Projects tab)
const PROJECT_OWN_ORDER: &[&str] = &["Read", "Write"];

const COMMON_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("Read", "View"),
    ("ExportImage", "Download Image/PDF"),
    ("ExportData", "Download Summary Data"),
    ("ShareView", "Share Customised"),
    ("ViewUnderlyingData", "Download Full Data"),
    ("WebAuthoring", "Web Edit"),
    ("Write", "Overwrite"),
    ("ChangeHierarchy", "Move"),
    ("ChangePermissions", "Set Permissions"),
    ("CreateRefreshMetrics", "Extract Refresh"),
    ("ExtractRefresh", "Extract Refresh"),
    ("SaveAs", "Save As"),
    ("InheritedProjectLeader", "Publish"),
    ("VizqlDataApiAccess", "API Access"),
    ("PulseMetricDefine", "Create Metric Definitions"),
    ("Connect", "Connect"),
    ("Filter", "Filter"),
    ("ViewComments", "View Comments"),
    ("AddComment", "Add Comments"),
    ("RunExplainData", "Run Explain Data"),
    ("Delete", "Delete"),
    ("ProjectLeader", "Project Leader"),
    ("Execute", "Run Flow"),
    ("WebAuthoringForFlows", "Web Edit"),
    ("CreateVirtualConnection", "Publish"),
    ("CreateDatabase", "Publish"),
    ("CreateTable", "Publish"),
];

const DISPLAY_NAME_OVERRIDES: &[(ContentKind, &str, &str)] = &[
    (ContentKind::Workbook, "ExportXml", "Download/Save a Copy"),
    (ContentKind::Datasource, "ExportXml", "Download Data Source"),
    (ContentKind::View, "ExportXml", "Download/Save a Copy"),
    (ContentKind::Flow, "ExportXml", "Download Flow"),
    (ContentKind::Project, "Write", "Publish"),
];

const SYNONYMS: &[SynonymRule] = &[
    SynonymRule {
        alias: "CreateRefreshMetrics",
        preferred: "ExtractRefresh",
        kinds: &[ContentKind::Workbook, ContentKind::Datasource],
        carries_mode: true,
    },
    SynonymRule {
        alias: "InheritedProjectLeader",
        preferred: "VizqlDataApiAccess",
        kinds: &[ContentKind::Datasource],
        carries_mode: false,
    },
];

/// Two spellings the remote API uses for the same capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynonymRule {
    /// Spelling folded away
    pub alias: &'static str,
    /// Spelling kept as the column
    pub preferred: &'static str,
    /// Content kinds the rule applies to
    pub kinds: &'static [ContentKind],
    /// Whether a row holding only the alias shows its mode under the
    /// preferred column. False when the two spellings are distinct grants
    /// that merely share a column.
    pub carries_mode: bool,
}

impl SynonymRule {
    /// Whether `key`, exported in a batch of `batch_kind`, is this rule's alias
    pub fn matches_alias(&self, key: &CapabilityKey, batch_kind: ContentKind) -> bool {
        key.name == self.alias && self.kinds.contains(&key.namespace.unwrap_or(batch_kind))
    }
}

/// Indexed, read-only view of the capability tables
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    orderings: HashMap<ContentKind, Vec<CapabilityKey>>,
    common_names: HashMap<&'static str, &'static str>,
    overrides: HashMap<(ContentKind, &'static str), &'static str>,
    synonyms: Vec<SynonymRule>,
}

impl Catalog {
    /// Catalog built from the built-in tables
    pub fn builtin() -> Self {
        let mut orderings: HashMap<ContentKind, Vec<CapabilityKey>> = HashMap::new();
        for (kind, names) in [
            (ContentKind::Workbook, WORKBOOK_ORDER),
            (ContentKind::Datasource, DATASOURCE_ORDER),
            (ContentKind::View, VIEW_ORDER),
            (ContentKind::Flow, FLOW_ORDER),
            (ContentKind::VirtualConnection, VIRTUAL_CONNECTION_ORDER),
            (ContentKind::Database, DATABASE_ORDER),
            (ContentKind::Table, TABLE_ORDER),
        ] {
            orderings.insert(kind, names.iter().map(|n| CapabilityKey::plain(*n)).collect());
        }

        // The project schema is its own tab followed by every nested tab.
        let mut project: Vec<CapabilityKey> = PROJECT_OWN_ORDER
            .iter()
            .map(|n| CapabilityKey::plain(*n))
            .collect();
        for kind in ContentKind::NESTED {
            if let Some(keys) = orderings.get(&kind) {
                project.extend(keys.iter().map(|k| CapabilityKey::namespaced(kind, k.name.clone())));
            }
        }
        orderings.insert(ContentKind::Project, project);

        Self {
            orderings,
            common_names: COMMON_DISPLAY_NAMES.iter().copied().collect(),
            overrides: DISPLAY_NAME_OVERRIDES
                .iter()
                .map(|(kind, api, gui)| ((*kind, *api), *gui))
                .collect(),
            synonyms: SYNONYMS.to_vec(),
        }
    }

    /// Canonical column order for a kind; empty when the kind has none
    pub fn ordering(&self, kind: ContentKind) -> &[CapabilityKey] {
        self.orderings.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `key` is a column of the canonical schema of `kind`
    pub fn is_known(&self, kind: ContentKind, key: &CapabilityKey) -> bool {
        self.ordering(kind).contains(key)
    }

    /// Display name for an API capability name as shown for `kind`.
    ///
    /// Kind-specific names take precedence over the common table.
    pub fn display_name(&self, kind: ContentKind, api_name: &str) -> Option<&'static str> {
        self.overrides
            .get(&(kind, api_name))
            .or_else(|| self.common_names.get(api_name))
            .copied()
    }

    /// Synonym rules, in priority order
    pub fn synonyms(&self) -> &[SynonymRule] {
        &self.synonyms
    }

    /// Preferred spelling for `key` if it is an alias within `batch_kind`
    pub fn preferred_for(&self, key: &CapabilityKey, batch_kind: ContentKind) -> Option<CapabilityKey> {
        self.synonyms
            .iter()
            .find(|rule| rule.matches_alias(key, batch_kind))
            .map(|rule| key.with_name(rule.preferred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_ordering_spans_every_tab() {
        let catalog = Catalog::builtin();
        let project = catalog.ordering(ContentKind::Project);

        assert_eq!(project[0], CapabilityKey::plain("Read"));
        assert_eq!(project[1], CapabilityKey::plain("Write"));
        assert_eq!(project[2], CapabilityKey::namespaced(ContentKind::Workbook, "Read"));
        assert!(project.contains(&CapabilityKey::virtual_connection_write()));
        assert_eq!(
            project.last(),
            Some(&CapabilityKey::namespaced(ContentKind::Table, "ChangePermissions"))
        );
        assert_eq!(project.len(), 2 + 16 + 11 + 8 + 6 + 4 + 4);
    }

    #[test]
    fn test_display_name_overrides_win() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.display_name(ContentKind::Datasource, "ExportXml"),
            Some("Download Data Source")
        );
        assert_eq!(catalog.display_name(ContentKind::Project, "Write"), Some("Publish"));
        assert_eq!(catalog.display_name(ContentKind::Workbook, "Write"), Some("Overwrite"));
        assert_eq!(catalog.display_name(ContentKind::Table, "ExportXml"), None);
    }

    #[test]
    fn test_synonyms_respect_kind() {
        let catalog = Catalog::builtin();
        let alias = CapabilityKey::plain("CreateRefreshMetrics");
        assert_eq!(
            catalog.preferred_for(&alias, ContentKind::Workbook),
            Some(CapabilityKey::plain("ExtractRefresh"))
        );
        assert_eq!(catalog.preferred_for(&alias, ContentKind::Flow), None);

        let namespaced = CapabilityKey::namespaced(ContentKind::Datasource, "InheritedProjectLeader");
        assert_eq!(
            catalog.preferred_for(&namespaced, ContentKind::Project),
            Some(CapabilityKey::namespaced(ContentKind::Datasource, "VizqlDataApiAccess"))
        );
    }

    #[test]
    fn test_empty_catalog_has_no_ordering() {
        assert!(Catalog::default().ordering(ContentKind::Workbook).is_empty());
    }
}
