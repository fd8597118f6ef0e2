//! Project exports: project rules plus every nested default-permission set

use super::{Exporter, Identities};
use futures::future::join_all;
use permaudit_core::{
    merge_project, ordered_sources, ContentKind, DirectoryFetcher, ExportRow, PermissionFetcher,
    PermissionRule, ProjectSummary, ResourceContext, Result,
};
use std::collections::HashMap;
use tracing::{debug, warn};

fn project_context(id: &str, summary: Option<&ProjectSummary>) -> ResourceContext {
    let name = summary.map(|p| p.name.clone()).unwrap_or_default();
    let mut context = ResourceContext::new(ContentKind::Project, id, name.clone());
    context.project_name = Some(name);
    context.asset_permissions = Some(
        summary
            .and_then(|p| p.content_permissions.clone())
            .unwrap_or_default(),
    );
    context.parent_project_id = summary.and_then(|p| p.parent_project_id.clone());
    context
}

impl<F> Exporter<'_, F>
where
    F: PermissionFetcher + DirectoryFetcher + ?Sized,
{
    pub(super) async fn project_batch(
        &self,
        ids: &[String],
        identities: &Identities,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<ExportRow>> {
        let listing = self.timed("project listing", self.fetcher.list_projects()).await;
        let projects: HashMap<String, ProjectSummary> = self
            .recover("project listing", listing, Vec::new(), warnings)?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        for id in ids.iter().filter(|id| !projects.contains_key(*id)) {
            debug!(project = %id, "project not in listing, exporting without name");
        }

        let tasks = ids
            .iter()
            .map(|id| self.project_rows(id, projects.get(id), identities));
        self.drain(tasks, warnings).await
    }

    async fn project_rows(
        &self,
        id: &str,
        summary: Option<&ProjectSummary>,
        identities: &Identities,
    ) -> (String, Result<Vec<ExportRow>>) {
        let label = match summary {
            Some(p) => format!("project {id} ({})", p.name),
            None => format!("project {id}"),
        };
        let outcome = self.merged_rows(&label, id, summary, identities).await;
        (label, outcome)
    }

    async fn merged_rows(
        &self,
        label: &str,
        id: &str,
        summary: Option<&ProjectSummary>,
        identities: &Identities,
    ) -> Result<Vec<ExportRow>> {
        let project_rules = self
            .timed(label, self.fetcher.project_permissions(id))
            .await?;

        let defaults = join_all(
            ContentKind::NESTED
                .iter()
                .map(|kind| self.default_rules(id, *kind)),
        )
        .await
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        let merged = merge_project(&self.tables, &ordered_sources(project_rules, defaults));
        let context = project_context(id, summary);
        if merged.is_empty() {
            return Ok(vec![ExportRow::placeholder(&context)]);
        }
        Ok(merged
            .into_records()
            .into_iter()
            .map(|record| {
                let name = identities.name_of(&record.grantee);
                ExportRow::for_grantee(&context, &record.grantee, name, record.capabilities)
            })
            .collect())
    }

    /// Default-permission rules of one nested kind. Each resource path is
    /// tried in turn until one answers with rules; failures count as no
    /// rules unless they are fatal.
    async fn default_rules(
        &self,
        project_id: &str,
        kind: ContentKind,
    ) -> Result<(ContentKind, Vec<PermissionRule>)> {
        for path in kind.default_permission_paths() {
            let fetched = self
                .timed(
                    path,
                    self.fetcher.default_permissions(project_id, path),
                )
                .await;
            match fetched {
                Ok(rules) if !rules.is_empty() => return Ok((kind, rules)),
                Ok(_) => debug!(project = %project_id, %path, "no default rules"),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) if err.is_not_found() => {
                    debug!(project = %project_id, %path, "default permissions unsupported");
                }
                Err(err) => {
                    warn!(project = %project_id, %path, error = %err, "default permissions unavailable");
                }
            }
        }
        Ok((kind, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_context_from_listing() {
        let summary = ProjectSummary {
            id: "p-1".to_string(),
            name: "Finance".to_string(),
            parent_project_id: Some("p-0".to_string()),
            content_permissions: Some("LockedToProject".to_string()),
        };
        let context = project_context("p-1", Some(&summary));
        assert_eq!(context.name, "Finance");
        assert_eq!(context.project_name.as_deref(), Some("Finance"));
        assert_eq!(context.parent_project_id.as_deref(), Some("p-0"));
        assert_eq!(context.asset_permissions.as_deref(), Some("LockedToProject"));
    }

    #[test]
    fn test_project_context_without_listing() {
        let context = project_context("p-9", None);
        assert_eq!(context.id, "p-9");
        assert_eq!(context.name, "");
        assert_eq!(context.asset_permissions.as_deref(), Some(""));
        assert!(context.parent_project_id.is_none());
    }
}
