//! CSV projection
//!
//! Turns a batch of export rows of one content kind into a delimited file:
//! computes the column schema (canonical catalog order, widened by whatever
//! the data actually contains), resolves display headers, and fills absent
//! cells with sentinels.

use crate::{
    AuditError, CapabilityKey, CapabilityMode, CapabilitySet, Catalog, ContentKind, Grantee, Result,
};
use indexmap::{IndexMap, IndexSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Cell text for a capability the grantee has no setting for
pub const NO_SETTING: &str = "No setting";

/// Grantee name of the row emitted for a resource with no grantees
pub const NO_PERMISSIONS_SET: &str = "No permissions set";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Identity and context columns, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FixedField {
    /// Content kind of the resource
    ContentType,
    /// Resource id
    ContentId,
    /// Resource name
    ContentName,
    /// Owning workbook (views)
    WorkbookName,
    /// Owning project
    ProjectName,
    /// Parent project id
    ParentProjectId,
    /// Project content-permission setting
    AssetPermissions,
    /// `user` or `group`
    GranteeType,
    /// Grantee id
    GranteeId,
    /// Resolved grantee display name
    GranteeName,
}

impl FixedField {
    /// Every field, in output order
    pub const ALL: [FixedField; 10] = [
        FixedField::ContentType,
        FixedField::ContentId,
        FixedField::ContentName,
        FixedField::WorkbookName,
        FixedField::ProjectName,
        FixedField::ParentProjectId,
        FixedField::AssetPermissions,
        FixedField::GranteeType,
        FixedField::GranteeId,
        FixedField::GranteeName,
    ];

    /// Header text
    pub fn as_str(&self) -> &'static str {
        match self {
            FixedField::ContentType => "content_type",
            FixedField::ContentId => "content_id",
            FixedField::ContentName => "content_name",
            FixedField::WorkbookName => "workbook_name",
            FixedField::ProjectName => "project_name",
            FixedField::ParentProjectId => "parent_project_id",
            FixedField::AssetPermissions => "asset_permissions",
            FixedField::GranteeType => "grantee_type",
            FixedField::GranteeId => "grantee_id",
            FixedField::GranteeName => "grantee_name",
        }
    }
}

/// What is known about the resource a row describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContext {
    /// Content kind
    pub kind: ContentKind,
    /// Resource id
    pub id: String,
    /// Resource name
    pub name: String,
    /// Owning project name
    pub project_name: Option<String>,
    /// Owning workbook name, for views
    pub workbook_name: Option<String>,
    /// Parent project id
    pub parent_project_id: Option<String>,
    /// Project content-permission setting
    pub asset_permissions: Option<String>,
}

impl ResourceContext {
    /// Context with only the mandatory fields
    pub fn new(kind: ContentKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            project_name: None,
            workbook_name: None,
            parent_project_id: None,
            asset_permissions: None,
        }
    }
}

/// One flattened output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    /// Content kind of the row
    pub kind: ContentKind,
    /// Identity/context cells; absent fields are not set
    pub fields: IndexMap<FixedField, String>,
    /// Capability cells
    pub capabilities: CapabilitySet,
}

impl ExportRow {
    /// Row carrying the resource context but no grantee yet
    pub fn for_resource(context: &ResourceContext) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(FixedField::ContentType, context.kind.as_str().to_string());
        fields.insert(FixedField::ContentId, context.id.clone());
        fields.insert(FixedField::ContentName, context.name.clone());
        for (field, value) in [
            (FixedField::WorkbookName, &context.workbook_name),
            (FixedField::ProjectName, &context.project_name),
            (FixedField::ParentProjectId, &context.parent_project_id),
            (FixedField::AssetPermissions, &context.asset_permissions),
        ] {
            if let Some(value) = value {
                fields.insert(field, value.clone());
            }
        }
        Self {
            kind: context.kind,
            fields,
            capabilities: CapabilitySet::new(),
        }
    }

    /// Row for one grantee of a resource
    pub fn for_grantee(
        context: &ResourceContext,
        grantee: &Grantee,
        grantee_name: impl Into<String>,
        capabilities: CapabilitySet,
    ) -> Self {
        let mut row = Self::for_resource(context);
        row.set(FixedField::GranteeType, grantee.kind.as_str());
        row.set(FixedField::GranteeId, grantee.id.clone());
        row.set(FixedField::GranteeName, grantee_name);
        row.capabilities = capabilities;
        row
    }

    /// Row standing in for a resource with no grantees
    pub fn placeholder(context: &ResourceContext) -> Self {
        let mut row = Self::for_resource(context);
        if context.kind == ContentKind::Project {
            row.set(FixedField::AssetPermissions, "");
            row.set(FixedField::GranteeType, "");
            row.set(FixedField::GranteeId, "");
        }
        row.set(FixedField::GranteeName, NO_PERMISSIONS_SET);
        row
    }

    /// Set a fixed field
    pub fn set(&mut self, field: FixedField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// Value of a fixed field
    pub fn field(&self, field: FixedField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }
}

/// One capability column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Capability the column holds
    pub key: CapabilityKey,
    /// Display header
    pub header: String,
}

/// Column layout of one export file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSchema {
    /// Content kind the batch was projected as
    pub kind: ContentKind,
    /// Identity/context columns present in the batch
    pub fixed: Vec<FixedField>,
    /// Capability columns
    pub columns: Vec<Column>,
}

impl ExportSchema {
    /// Full header row
    pub fn header_row(&self) -> Vec<String> {
        self.fixed
            .iter()
            .map(|f| f.as_str().to_string())
            .chain(self.columns.iter().map(|c| c.header.clone()))
            .collect()
    }

    /// Position of a capability column
    pub fn column_index(&self, key: &CapabilityKey) -> Option<usize> {
        self.columns.iter().position(|c| &c.key == key)
    }
}

/// Projects export rows onto CSV
#[derive(Debug, Clone, Copy)]
pub struct CsvProjector<'a> {
    catalog: &'a Catalog,
}

impl<'a> CsvProjector<'a> {
    /// Projector over a catalog
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Content kind of a batch: the only kind present, otherwise workbook if
    /// present, otherwise the first kind seen.
    pub fn detect_kind(rows: &[ExportRow]) -> Result<ContentKind> {
        let mut kinds = IndexSet::new();
        for row in rows {
            kinds.insert(row.kind);
        }
        match kinds.len() {
            0 => Err(AuditError::invalid("cannot project an empty batch")),
            1 => Ok(kinds[0]),
            _ if kinds.contains(&ContentKind::Workbook) => Ok(ContentKind::Workbook),
            _ => Ok(kinds[0]),
        }
    }

    /// Compute the schema of a batch
    pub fn schema(&self, rows: &[ExportRow]) -> Result<ExportSchema> {
        let kind = Self::detect_kind(rows)?;
        let canonical = self.catalog.ordering(kind);

        let mut observed: IndexSet<&CapabilityKey> = IndexSet::new();
        for row in rows {
            observed.extend(row.capabilities.keys());
        }

        let mut extras: Vec<CapabilityKey> = observed
            .iter()
            .filter(|key| !canonical.contains(key))
            // An alias keeps its own column unless the preferred spelling
            // also occurs in this batch.
            .filter(|key| match self.catalog.preferred_for(key, kind) {
                Some(preferred) => !observed.contains(&preferred),
                None => true,
            })
            .map(|key| (*key).clone())
            .collect();
        extras.sort_by_cached_key(ToString::to_string);

        let columns: Vec<Column> = canonical
            .iter()
            .cloned()
            .chain(extras)
            .map(|key| Column {
                header: self.header(kind, &key),
                key,
            })
            .collect();

        let fixed = FixedField::ALL
            .into_iter()
            .filter(|field| rows.iter().any(|row| row.fields.contains_key(field)))
            .collect();

        debug!(%kind, rows = rows.len(), columns = columns.len(), "computed export schema");
        Ok(ExportSchema {
            kind,
            fixed,
            columns,
        })
    }

    /// Display header for a capability column
    pub fn header(&self, kind: ContentKind, key: &CapabilityKey) -> String {
        if kind == ContentKind::Project {
            let tab_kind = key.namespace.unwrap_or(ContentKind::Project);
            let tab = tab_kind.tab_label();
            if *key == CapabilityKey::virtual_connection_write() {
                return format!("{tab} - Overwrite(API Endpoints:No API Endpoints)");
            }
            return match self.catalog.display_name(tab_kind, &key.name) {
                Some(gui) => format!("{tab} - {gui}(API Endpoints:{})", key.name),
                None => format!("{tab} - {}", key.name),
            };
        }

        let display_kind = key.namespace.unwrap_or(kind);
        match self.catalog.display_name(display_kind, &key.name) {
            Some(gui) => format!("{gui}(API Endpoints:{key})"),
            None => key.to_string(),
        }
    }

    /// Cell values of one row under a schema
    pub fn render_row(&self, schema: &ExportSchema, row: &ExportRow) -> Vec<String> {
        let fixed = schema
            .fixed
            .iter()
            .map(|field| row.field(*field).unwrap_or_default().to_string());

        let capabilities = schema.columns.iter().map(|column| {
            match self.lookup(schema, row, &column.key) {
                Some(mode) => mode.as_str().to_string(),
                None if column.key == CapabilityKey::virtual_connection_write() => {
                    CapabilityMode::NoApiEndpoint.as_str().to_string()
                }
                None => NO_SETTING.to_string(),
            }
        });

        fixed.chain(capabilities).collect()
    }

    /// Mode of `key` in `row`. A renamed alias without a column of its own
    /// is read through its preferred column.
    fn lookup(&self, schema: &ExportSchema, row: &ExportRow, key: &CapabilityKey) -> Option<CapabilityMode> {
        if let Some(mode) = row.capabilities.get(key) {
            return Some(*mode);
        }
        let key_kind = key.namespace.unwrap_or(schema.kind);
        self.catalog
            .synonyms()
            .iter()
            .filter(|rule| {
                rule.carries_mode && rule.preferred == key.name && rule.kinds.contains(&key_kind)
            })
            .map(|rule| key.with_name(rule.alias))
            .filter(|alias| schema.column_index(alias).is_none())
            .find_map(|alias| row.capabilities.get(&alias).copied())
    }

    /// Write a batch as UTF-8 CSV with a byte-order mark
    pub fn write<W: Write>(&self, rows: &[ExportRow], writer: W) -> Result<ExportSchema> {
        let schema = self.schema(rows)?;
        let mut csv = bom_csv_writer(writer)?;
        csv.write_record(schema.header_row())?;
        for row in rows {
            csv.write_record(self.render_row(&schema, row))?;
        }
        csv.flush()?;
        Ok(schema)
    }

    /// Write a batch to a file
    pub fn write_file(&self, rows: &[ExportRow], path: &Path) -> Result<ExportSchema> {
        let file = File::create(path)
            .map_err(|e| AuditError::io(format!("cannot create {}: {e}", path.display())))?;
        self.write(rows, BufWriter::new(file))
    }
}

/// CSV writer that has already emitted a UTF-8 byte-order mark
pub fn bom_csv_writer<W: Write>(mut writer: W) -> Result<csv::Writer<W>> {
    writer.write_all(UTF8_BOM)?;
    Ok(csv::WriterBuilder::new().from_writer(writer))
}
