//! Export orchestration
//!
//! Drives the fetchers for a selection of projects and individual resources,
//! folds each project through the merge engine, and writes one CSV per
//! content kind. Per-resource failures become warnings; authentication and
//! transport failures abort the run before any file is written.

mod members;
mod project;
mod resource;

use crate::config::ExportConfig;
use futures::stream::{self, StreamExt};
use futures::Future;
use permaudit_core::{
    AuditError, ContentKind, CsvProjector, DirectoryFetcher, ExportRow, Grantee, GranteeKind,
    PermissionFetcher, PolicyTables, Result,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use members::GROUP_MEMBER_COLUMNS;

/// Kinds exported one resource at a time, in output order
const RESOURCE_KINDS: [ContentKind; 4] = [
    ContentKind::Workbook,
    ContentKind::Datasource,
    ContentKind::View,
    ContentKind::Flow,
];

/// Resource ids chosen for export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Project ids
    pub projects: Vec<String>,
    /// Workbook ids
    pub workbooks: Vec<String>,
    /// Data source ids
    pub datasources: Vec<String>,
    /// View ids
    pub views: Vec<String>,
    /// Flow ids
    pub flows: Vec<String>,
}

impl Selection {
    /// Nothing selected at all
    pub fn is_empty(&self) -> bool {
        ContentKind::ALL.iter().all(|kind| self.ids(*kind).is_empty())
    }

    /// Selected ids of one kind
    pub fn ids(&self, kind: ContentKind) -> &[String] {
        match kind {
            ContentKind::Project => &self.projects,
            ContentKind::Workbook => &self.workbooks,
            ContentKind::Datasource => &self.datasources,
            ContentKind::View => &self.views,
            ContentKind::Flow => &self.flows,
            _ => &[],
        }
    }
}

/// How an export run behaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Output directory, created when missing
    pub output_dir: PathBuf,
    /// Resources in flight at once
    pub concurrency: usize,
    /// Timeout around each fetch
    pub fetch_timeout: Duration,
    /// Also write the group membership file
    pub include_group_members: bool,
    /// Suffix shared by every file of the run
    pub timestamp: String,
}

impl ExportOptions {
    /// Options with the current local time as file suffix
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            concurrency: 4,
            fetch_timeout: Duration::from_secs(60),
            include_group_members: false,
            timestamp: chrono::Local::now().format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    /// Options taken from the `[export]` section
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            fetch_timeout: config.fetch_timeout(),
            include_group_members: config.include_group_members,
            ..Self::new(&config.output_dir)
        }
    }

    /// Path of the permission file for one kind
    pub fn permissions_path(&self, kind: ContentKind) -> PathBuf {
        self.output_dir
            .join(format!("{kind}_permissions_{}.csv", self.timestamp))
    }

    /// Path of the group membership file
    pub fn members_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("group_members_{}.csv", self.timestamp))
    }
}

/// Outcome of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Files written, in write order
    pub files: Vec<PathBuf>,
    /// Resources skipped and why
    pub warnings: Vec<String>,
}

/// User and group names by id, fetched once per run
#[derive(Debug, Clone, Default)]
pub struct Identities {
    users: HashMap<String, String>,
    groups: HashMap<String, String>,
}

impl Identities {
    /// Build from id-to-name tables
    pub fn new(users: HashMap<String, String>, groups: HashMap<String, String>) -> Self {
        Self { users, groups }
    }

    /// Display name of a grantee; empty when unknown
    pub fn name_of(&self, grantee: &Grantee) -> String {
        let table = match grantee.kind {
            GranteeKind::User => &self.users,
            GranteeKind::Group => &self.groups,
        };
        table.get(&grantee.id).cloned().unwrap_or_default()
    }

    /// Groups ordered by name, then id
    pub fn groups_by_name(&self) -> Vec<(&str, &str)> {
        let mut groups: Vec<_> = self
            .groups
            .iter()
            .map(|(id, name)| (id.as_str(), name.as_str()))
            .collect();
        groups.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)));
        groups
    }
}

/// Runs exports against one set of fetchers
pub struct Exporter<'a, F: ?Sized> {
    fetcher: &'a F,
    tables: Arc<PolicyTables>,
    options: ExportOptions,
}

impl<'a, F> Exporter<'a, F>
where
    F: PermissionFetcher + DirectoryFetcher + ?Sized,
{
    /// Create an exporter
    pub fn new(fetcher: &'a F, tables: Arc<PolicyTables>, options: ExportOptions) -> Self {
        Self {
            fetcher,
            tables,
            options,
        }
    }

    /// Run options
    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export everything in `selection`
    pub async fn run(&self, selection: &Selection) -> Result<ExportSummary> {
        if selection.is_empty() {
            return Err(AuditError::invalid("nothing selected for export"));
        }

        let identities = self.identities().await?;
        let mut warnings = Vec::new();
        let mut batches: Vec<(ContentKind, Vec<ExportRow>)> = Vec::new();

        if !selection.projects.is_empty() {
            let rows = self
                .project_batch(&selection.projects, &identities, &mut warnings)
                .await?;
            batches.push((ContentKind::Project, rows));
        }
        for kind in RESOURCE_KINDS {
            let ids = selection.ids(kind);
            if ids.is_empty() {
                continue;
            }
            let rows = self
                .resource_batch(kind, ids, &identities, &mut warnings)
                .await?;
            batches.push((kind, rows));
        }

        let memberships = if self.options.include_group_members {
            self.memberships(&identities, &mut warnings).await?
        } else {
            Vec::new()
        };

        // Nothing below talks to the remote side.
        let mut files = self.write_batches(&batches)?;
        if !memberships.is_empty() {
            let path = self.options.members_path();
            members::write_memberships(&memberships, &path)?;
            files.push(path);
        }

        info!(
            files = files.len(),
            warnings = warnings.len(),
            "export finished"
        );
        Ok(ExportSummary { files, warnings })
    }

    async fn identities(&self) -> Result<Identities> {
        let (users, groups) = futures::try_join!(
            self.timed("users", self.fetcher.users()),
            self.timed("groups", self.fetcher.groups()),
        )?;
        info!(users = users.len(), groups = groups.len(), "loaded identities");
        Ok(Identities::new(users, groups))
    }

    /// Apply the per-fetch timeout
    async fn timed<T>(&self, what: &str, fetch: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.options.fetch_timeout, fetch)
            .await
            .map_err(|_| {
                AuditError::timeout(format!(
                    "{what} did not answer within {}s",
                    self.options.fetch_timeout.as_secs()
                ))
            })?
    }

    /// Poll per-resource tasks through the bounded pool, keeping task order.
    /// Recoverable failures turn into warnings; a fatal one ends the run.
    async fn drain<T, Fut>(
        &self,
        tasks: impl Iterator<Item = Fut>,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<T>>
    where
        Fut: Future<Output = (String, Result<Vec<T>>)>,
    {
        let stream = stream::iter(tasks).buffered(self.options.concurrency.max(1));
        futures::pin_mut!(stream);

        let mut collected = Vec::new();
        while let Some((label, outcome)) = stream.next().await {
            match outcome {
                Ok(items) => collected.extend(items),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(resource = %label, error = %err, "skipping");
                    warnings.push(format!("{label}: {err}"));
                }
            }
        }
        Ok(collected)
    }

    /// Recover from a non-fatal failure with a fallback value
    fn recover<T>(
        &self,
        what: &str,
        outcome: Result<T>,
        fallback: T,
        warnings: &mut Vec<String>,
    ) -> Result<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(error = %err, "{what} unavailable");
                warnings.push(format!("{what}: {err}"));
                Ok(fallback)
            }
        }
    }

    fn write_batches(&self, batches: &[(ContentKind, Vec<ExportRow>)]) -> Result<Vec<PathBuf>> {
        let projector = CsvProjector::new(&self.tables.catalog);
        let mut files = Vec::new();
        for (kind, rows) in batches {
            if rows.is_empty() {
                warn!(%kind, "no rows to write");
                continue;
            }
            std::fs::create_dir_all(&self.options.output_dir)?;
            let path = self.options.permissions_path(*kind);
            let schema = projector.write_file(rows, &path)?;
            info!(
                path = %path.display(),
                rows = rows.len(),
                columns = schema.columns.len(),
                "wrote permissions"
            );
            files.push(path);
        }
        Ok(files)
    }
}
