//! Read-only policy tables handed to the merge engine and the projector

use crate::{Catalog, Result, TemplateTable};
use std::sync::Arc;

/// Catalog and templates, built once at start-up
#[derive(Debug, Clone)]
pub struct PolicyTables {
    /// Capability catalog
    pub catalog: Catalog,
    /// Template expansions, validated against `catalog`
    pub templates: TemplateTable,
}

impl PolicyTables {
    /// Build and validate the built-in tables
    pub fn builtin() -> Result<Arc<Self>> {
        let catalog = Catalog::builtin();
        let templates = TemplateTable::builtin(&catalog)?;
        Ok(Arc::new(Self { catalog, templates }))
    }
}
