//! Template expansion
//!
//! Some capability names are not capabilities at all but administrative
//! templates: granting one at project level implies a fixed set of concrete
//! capabilities on the project and on every kind of content nested under it.
//! The expansions are policy data kept in this one table, shared by every
//! content kind's merge path.

use crate::{AuditError, CapabilityKey, CapabilityMode, CapabilitySet, Catalog, ContentKind, Result};
use tracing::debug;

use CapabilityMode::{Allow, NoApiEndpoint};

type ExpansionRow = (&'static str, ContentKind, &'static [(&'static str, CapabilityMode)]);

const TEMPLATE_EXPANSIONS: &[ExpansionRow] = &[
    (
        "InheritedProjectLeader",
        ContentKind::Project,
        &[("Read", Allow), ("Write", Allow)],
    ),
    (
        "InheritedProjectLeader",
        ContentKind::Workbook,
        &[
            ("Read", Allow),
            ("Filter", Allow),
            ("ViewComments", Allow),
            ("AddComment", Allow),
            ("ExportImage", Allow),
            ("ExportData", Allow),
            ("ShareView", Allow),
            ("ViewUnderlyingData", Allow),
            ("WebAuthoring", Allow),
            ("RunExplainData", Allow),
            ("ExportXml", Allow),
            ("Write", Allow),
            ("ChangeHierarchy", Allow),
            ("Delete", Allow),
            ("ChangePermissions", Allow),
            ("ExtractRefresh", Allow),
        ],
    ),
    (
        "InheritedProjectLeader",
        ContentKind::Datasource,
        &[
            ("Read", Allow),
            ("Connect", Allow),
            ("ExportXml", Allow),
            ("Write", Allow),
            ("SaveAs", Allow),
            ("VizqlDataApiAccess", Allow),
            ("PulseMetricDefine", Allow),
            ("ChangeHierarchy", Allow),
            ("Delete", Allow),
            ("ChangePermissions", Allow),
            ("ExtractRefresh", Allow),
        ],
    ),
    (
        "InheritedProjectLeader",
        ContentKind::Flow,
        &[
            ("Read", Allow),
            ("ExportXml", Allow),
            ("Execute", Allow),
            ("Write", Allow),
            ("WebAuthoringForFlows", Allow),
            ("ChangeHierarchy", Allow),
            ("Delete", Allow),
            ("ChangePermissions", Allow),
        ],
    ),
    (
        "InheritedProjectLeader",
        ContentKind::VirtualConnection,
        &[
            ("Read", Allow),
            ("Connect", Allow),
            ("Write", NoApiEndpoint),
            ("ChangeHierarchy", Allow),
            ("Delete", Allow),
            ("ChangePermissions", Allow),
        ],
    ),
    (
        "InheritedProjectLeader",
        ContentKind::Database,
        &[
            ("Read", Allow),
            ("Write", Allow),
            ("ChangeHierarchy", Allow),
            ("ChangePermissions", Allow),
        ],
    ),
    (
        "InheritedProjectLeader",
        ContentKind::Table,
        &[
            ("Read", Allow),
            ("Write", Allow),
            ("ChangeHierarchy", Allow),
            ("ChangePermissions", Allow),
        ],
    ),
];

/// Fixed capabilities a template injects for one target kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateExpansion {
    /// Kind the capabilities apply to
    pub target: ContentKind,
    /// Keys are plain for the project itself and namespaced for nested kinds
    pub capabilities: CapabilitySet,
}

/// A named template and its expansions, in project-then-nested order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Pseudo-capability name that triggers the template
    pub name: &'static str,
    /// Expansions per target kind
    pub expansions: Vec<TemplateExpansion>,
}

impl Template {
    /// Expansion for one target kind
    pub fn expansion_for(&self, kind: ContentKind) -> Option<&TemplateExpansion> {
        self.expansions.iter().find(|e| e.target == kind)
    }
}

/// Read-only table of templates
#[derive(Debug, Clone, Default)]
pub struct TemplateTable {
    templates: Vec<Template>,
}

impl TemplateTable {
    /// Build the built-in table, checking every expansion key against the
    /// catalog's project schema so a misspelt name fails at start-up.
    pub fn builtin(catalog: &Catalog) -> Result<Self> {
        let mut templates: Vec<Template> = Vec::new();

        for (name, target, caps) in TEMPLATE_EXPANSIONS {
            let namespace = (*target != ContentKind::Project).then_some(*target);
            let mut capabilities = CapabilitySet::new();
            for (cap, mode) in caps.iter() {
                let key = CapabilityKey {
                    namespace,
                    name: (*cap).to_string(),
                };
                if !catalog.is_known(ContentKind::Project, &key) {
                    return Err(AuditError::invalid(format!(
                        "template {name} expands to unknown capability {key}"
                    )));
                }
                capabilities.insert(key, *mode);
            }

            let expansion = TemplateExpansion {
                target: *target,
                capabilities,
            };
            match templates.iter_mut().find(|t| t.name == *name) {
                Some(template) => template.expansions.push(expansion),
                None => templates.push(Template {
                    name: *name,
                    expansions: vec![expansion],
                }),
            }
        }

        debug!(count = templates.len(), "loaded capability templates");
        Ok(Self { templates })
    }

    /// Template triggered by `name` when it appears in a `kind` rule set
    pub fn lookup(&self, name: &str, kind: ContentKind) -> Option<&Template> {
        self.templates
            .iter()
            .find(|t| t.name == name && t.expansion_for(kind).is_some())
    }
}
