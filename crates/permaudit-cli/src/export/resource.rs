//! Single-resource exports: workbooks, data sources, views and flows

use super::{Exporter, Identities};
use permaudit_core::{
    AssetSummary, ContentKind, DirectoryFetcher, ExportRow, PermissionFetcher, ResourceContext,
    Result, ViewSummary,
};
use std::collections::HashMap;
use tracing::debug;

/// Context for a workbook, data source or flow
fn asset_context(kind: ContentKind, id: &str, asset: Option<&AssetSummary>) -> ResourceContext {
    let mut context = ResourceContext::new(
        kind,
        id,
        asset.map(|a| a.name.clone()).unwrap_or_default(),
    );
    context.project_name = asset.and_then(|a| a.project_name.clone());
    context
}

/// Context for a view; names come from the owning workbook
fn view_context(
    id: &str,
    view: Option<&ViewSummary>,
    workbooks: &HashMap<String, AssetSummary>,
) -> ResourceContext {
    let workbook = view
        .and_then(|v| v.workbook_id.as_ref())
        .and_then(|wid| workbooks.get(wid));
    let mut context = ResourceContext::new(
        ContentKind::View,
        id,
        view.map(|v| v.name.clone()).unwrap_or_default(),
    );
    context.workbook_name = workbook.map(|w| w.name.clone());
    context.project_name = workbook.and_then(|w| w.project_name.clone());
    context
}

fn by_id<T>(items: Vec<T>, id: impl Fn(&T) -> &str) -> HashMap<String, T> {
    items
        .into_iter()
        .map(|item| (id(&item).to_string(), item))
        .collect()
}

impl<F> Exporter<'_, F>
where
    F: PermissionFetcher + DirectoryFetcher + ?Sized,
{
    pub(super) async fn resource_batch(
        &self,
        kind: ContentKind,
        ids: &[String],
        identities: &Identities,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<ExportRow>> {
        let contexts = self.resource_contexts(kind, ids, warnings).await?;
        let tasks = contexts
            .iter()
            .map(|context| self.resource_rows(context, identities));
        self.drain(tasks, warnings).await
    }

    /// Resolve names for the selected ids from the site listings
    async fn resource_contexts(
        &self,
        kind: ContentKind,
        ids: &[String],
        warnings: &mut Vec<String>,
    ) -> Result<Vec<ResourceContext>> {
        let workbooks = if matches!(kind, ContentKind::View | ContentKind::Workbook) {
            let listing = self
                .timed("workbook listing", self.fetcher.list_assets(ContentKind::Workbook))
                .await;
            by_id(
                self.recover("workbook listing", listing, Vec::new(), warnings)?,
                |a| a.id.as_str(),
            )
        } else {
            HashMap::new()
        };

        let contexts = match kind {
            ContentKind::View => {
                let listing = self.timed("view listing", self.fetcher.list_views()).await;
                let views = by_id(
                    self.recover("view listing", listing, Vec::new(), warnings)?,
                    |v| v.id.as_str(),
                );
                ids.iter()
                    .map(|id| view_context(id, views.get(id), &workbooks))
                    .collect()
            }
            ContentKind::Workbook => ids
                .iter()
                .map(|id| asset_context(kind, id, workbooks.get(id)))
                .collect(),
            _ => {
                let what = format!("{kind} listing");
                let listing = self.timed(&what, self.fetcher.list_assets(kind)).await;
                let assets = by_id(
                    self.recover(&what, listing, Vec::new(), warnings)?,
                    |a| a.id.as_str(),
                );
                ids.iter()
                    .map(|id| asset_context(kind, id, assets.get(id)))
                    .collect()
            }
        };
        Ok(contexts)
    }

    /// One row per rule, capabilities as the service reported them
    async fn resource_rows(
        &self,
        context: &ResourceContext,
        identities: &Identities,
    ) -> (String, Result<Vec<ExportRow>>) {
        let label = if context.name.is_empty() {
            format!("{} {}", context.kind, context.id)
        } else {
            format!("{} {} ({})", context.kind, context.id, context.name)
        };
        let outcome = self
            .timed(
                &label,
                self.fetcher.resource_permissions(context.kind, &context.id),
            )
            .await
            .map(|rules| {
                debug!(resource = %label, rules = rules.len(), "fetched permissions");
                if rules.is_empty() {
                    return vec![ExportRow::placeholder(context)];
                }
                rules
                    .into_iter()
                    .map(|rule| {
                        let name = identities.name_of(&rule.grantee);
                        let capabilities = rule.to_capability_set();
                        ExportRow::for_grantee(context, &rule.grantee, name, capabilities)
                    })
                    .collect()
            });
        (label, outcome)
    }
}
