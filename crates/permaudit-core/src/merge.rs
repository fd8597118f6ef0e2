//! Grantee merge engine
//!
//! Folds the rule sets of one project (its own rules, then the default
//! permissions of every nested content kind) into a single record per
//! grantee. The fold is explicit and order-sensitive: once a template has
//! been expanded for a grantee, later raw grants for that grantee are
//! dropped, while a template found later still overwrites everything.

use crate::{
    CapabilityKey, CapabilityMode, CapabilitySet, ContentKind, Grantee, PermissionRule, PolicyTables,
};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Where a rule set was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleSource {
    /// The project's own permissions
    Project,
    /// The project's default permissions for a nested kind
    Defaults(ContentKind),
}

impl RuleSource {
    /// Content kind the rules are expressed in
    pub fn kind(&self) -> ContentKind {
        match self {
            RuleSource::Project => ContentKind::Project,
            RuleSource::Defaults(kind) => *kind,
        }
    }

    /// Namespace raw capabilities from this source are stored under
    pub fn namespace(&self) -> Option<ContentKind> {
        match self {
            RuleSource::Project => None,
            RuleSource::Defaults(kind) => Some(*kind),
        }
    }
}

/// Rules fetched from one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRules {
    /// Origin of the rules
    pub source: RuleSource,
    /// Fetched rules; empty when the fetch failed or found nothing
    pub rules: Vec<PermissionRule>,
}

impl SourceRules {
    /// Rules for a source
    pub fn new(source: RuleSource, rules: Vec<PermissionRule>) -> Self {
        Self { source, rules }
    }
}

/// Arrange a project's rule sets in merge order: project rules first, then
/// default permissions in [`ContentKind::NESTED`] order, whatever order the
/// fetches completed in. Kinds absent from `defaults` contribute nothing.
pub fn ordered_sources(
    project_rules: Vec<PermissionRule>,
    mut defaults: Vec<(ContentKind, Vec<PermissionRule>)>,
) -> Vec<SourceRules> {
    let mut ordered = vec![SourceRules::new(RuleSource::Project, project_rules)];
    for kind in ContentKind::NESTED {
        let rules = defaults
            .iter()
            .position(|(k, _)| *k == kind)
            .map(|idx| defaults.swap_remove(idx).1)
            .unwrap_or_default();
        ordered.push(SourceRules::new(RuleSource::Defaults(kind), rules));
    }
    ordered
}

/// All capabilities one grantee holds across a project's sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPermissionRecord {
    /// Grantee the record belongs to
    pub grantee: Grantee,
    /// Namespaced capabilities
    pub capabilities: CapabilitySet,
}

impl MergedPermissionRecord {
    /// Whether any virtual-connection capability is present
    pub fn touches_virtual_connection(&self) -> bool {
        self.capabilities
            .keys()
            .any(|key| key.namespace == Some(ContentKind::VirtualConnection))
    }
}

/// Merge result for one project, in first-sighting order of grantees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectMerge {
    records: Vec<MergedPermissionRecord>,
}

impl ProjectMerge {
    /// No grantee appeared in any source
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of grantees
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in first-sighting order
    pub fn records(&self) -> &[MergedPermissionRecord] {
        &self.records
    }

    /// Record for one grantee
    pub fn get(&self, grantee: &Grantee) -> Option<&MergedPermissionRecord> {
        self.records.iter().find(|r| &r.grantee == grantee)
    }

    /// Consume into records
    pub fn into_records(self) -> Vec<MergedPermissionRecord> {
        self.records
    }
}

/// Accumulator carried through the fold
#[derive(Debug, Default)]
struct MergeState {
    records: IndexMap<Grantee, CapabilitySet>,
    templated: HashSet<Grantee>,
    saw_virtual_connection: HashSet<Grantee>,
}

impl MergeState {
    fn absorb(mut self, tables: &PolicyTables, source: &SourceRules) -> Self {
        let kind = source.source.kind();
        trace!(%kind, rules = source.rules.len(), "merging rule source");

        for rule in &source.rules {
            let grantee = &rule.grantee;
            if kind == ContentKind::VirtualConnection {
                self.saw_virtual_connection.insert(grantee.clone());
            }
            let record = self.records.entry(grantee.clone()).or_default();

            for cap in &rule.capabilities {
                if let Some(template) = tables.templates.lookup(&cap.name, kind) {
                    debug!(
                        grantee = %grantee.id,
                        template = template.name,
                        %kind,
                        "expanding template"
                    );
                    self.templated.insert(grantee.clone());
                    for expansion in &template.expansions {
                        for (key, mode) in &expansion.capabilities {
                            record.insert(key.clone(), *mode);
                        }
                    }
                } else if self.templated.contains(grantee) {
                    trace!(grantee = %grantee.id, capability = %cap.name, "dropped after template");
                } else {
                    let key = CapabilityKey {
                        namespace: source.source.namespace(),
                        name: cap.name.clone(),
                    };
                    record.entry(key).or_insert(cap.mode);
                }
            }
        }
        self
    }

    fn finish(self) -> ProjectMerge {
        let MergeState {
            records,
            saw_virtual_connection,
            ..
        } = self;

        let records = records
            .into_iter()
            .map(|(grantee, capabilities)| {
                let mut record = MergedPermissionRecord {
                    grantee,
                    capabilities,
                };
                if saw_virtual_connection.contains(&record.grantee)
                    || record.touches_virtual_connection()
                {
                    record
                        .capabilities
                        .entry(CapabilityKey::virtual_connection_write())
                        .or_insert(CapabilityMode::NoApiEndpoint);
                }
                record
            })
            .collect();

        ProjectMerge { records }
    }
}

/// Merge one project's ordered rule sets into one record per grantee.
///
/// Every call starts from empty state, so merging the same input twice gives
/// identical results.
pub fn merge_project(tables: &PolicyTables, sources: &[SourceRules]) -> ProjectMerge {
    let merged = sources
        .iter()
        .fold(MergeState::default(), |state, source| {
            state.absorb(tables, source)
        })
        .finish();
    debug!(grantees = merged.len(), "project merge complete");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Capability;

    fn tables() -> std::sync::Arc<PolicyTables> {
        PolicyTables::builtin().unwrap()
    }

    fn rule(grantee: Grantee, caps: &[(&str, CapabilityMode)]) -> PermissionRule {
        PermissionRule::new(
            grantee,
            caps.iter().map(|(n, m)| Capability::new(*n, *m)).collect(),
        )
    }

    #[test]
    fn test_project_rules_are_unnamespaced() {
        let sources = ordered_sources(
            vec![rule(Grantee::group("g"), &[("Read", CapabilityMode::Allow)])],
            vec![],
        );
        let merged = merge_project(&tables(), &sources);
        let record = merged.get(&Grantee::group("g")).unwrap();
        assert_eq!(
            record.capabilities.get(&CapabilityKey::plain("Read")),
            Some(&CapabilityMode::Allow)
        );
        assert_eq!(record.capabilities.len(), 1);
    }

    #[test]
    fn test_defaults_are_namespaced() {
        let sources = ordered_sources(
            vec![],
            vec![(
                ContentKind::Flow,
                vec![rule(Grantee::user("u"), &[("Execute", CapabilityMode::Deny)])],
            )],
        );
        let merged = merge_project(&tables(), &sources);
        let record = merged.get(&Grantee::user("u")).unwrap();
        assert_eq!(
            record
                .capabilities
                .get(&CapabilityKey::namespaced(ContentKind::Flow, "Execute")),
            Some(&CapabilityMode::Deny)
        );
    }

    #[test]
    fn test_template_locks_out_later_raw_grants() {
        let g = Grantee::group("leaders");
        let sources = ordered_sources(
            vec![rule(g.clone(), &[("InheritedProjectLeader", CapabilityMode::Allow)])],
            vec![(
                ContentKind::Workbook,
                vec![rule(g.clone(), &[("Read", CapabilityMode::Deny), ("Bogus", CapabilityMode::Deny)])],
            )],
        );
        let merged = merge_project(&tables(), &sources);
        let record = merged.get(&g).unwrap();
        assert_eq!(
            record
                .capabilities
                .get(&CapabilityKey::namespaced(ContentKind::Workbook, "Read")),
            Some(&CapabilityMode::Allow)
        );
        assert!(!record
            .capabilities
            .contains_key(&CapabilityKey::namespaced(ContentKind::Workbook, "Bogus")));
    }

    #[test]
    fn test_late_template_overwrites_earlier_grants() {
        let g = Grantee::user("late");
        let sources = ordered_sources(
            vec![rule(g.clone(), &[("Write", CapabilityMode::Deny)])],
            vec![(
                ContentKind::Table,
                vec![rule(g.clone(), &[("InheritedProjectLeader", CapabilityMode::Allow)])],
            )],
        );
        let merged = merge_project(&tables(), &sources);
        let record = merged.get(&g).unwrap();
        assert_eq!(
            record.capabilities.get(&CapabilityKey::plain("Write")),
            Some(&CapabilityMode::Allow)
        );
    }

    #[test]
    fn test_virtual_connection_write_sentinel_added() {
        let g = Grantee::group("vc");
        let sources = ordered_sources(
            vec![],
            vec![(
                ContentKind::VirtualConnection,
                vec![rule(g.clone(), &[("Connect", CapabilityMode::Allow)])],
            )],
        );
        let merged = merge_project(&tables(), &sources);
        assert_eq!(
            merged
                .get(&g)
                .unwrap()
                .capabilities
                .get(&CapabilityKey::virtual_connection_write()),
            Some(&CapabilityMode::NoApiEndpoint)
        );
    }

    #[test]
    fn test_empty_virtual_connection_rule_still_gets_sentinel() {
        let g = Grantee::group("empty-vc");
        let sources = ordered_sources(
            vec![],
            vec![(ContentKind::VirtualConnection, vec![rule(g.clone(), &[])])],
        );
        let merged = merge_project(&tables(), &sources);
        assert_eq!(merged.get(&g).unwrap().capabilities.len(), 1);
    }

    #[test]
    fn test_no_rules_yields_empty_merge() {
        let merged = merge_project(&tables(), &ordered_sources(vec![], vec![]));
        assert!(merged.is_empty());
    }

    #[test]
    fn test_ordered_sources_ignores_arrival_order() {
        let sources = ordered_sources(
            vec![],
            vec![
                (ContentKind::Table, vec![]),
                (ContentKind::Workbook, vec![]),
            ],
        );
        let kinds: Vec<_> = sources.iter().map(|s| s.source).collect();
        assert_eq!(kinds[0], RuleSource::Project);
        assert_eq!(kinds[1], RuleSource::Defaults(ContentKind::Workbook));
        assert_eq!(kinds[6], RuleSource::Defaults(ContentKind::Table));
    }
}
