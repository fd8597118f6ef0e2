//! CSV projection scenarios.

use permaudit_core::{
    merge_project, ordered_sources, Capability, CapabilityKey, CapabilityMode, CapabilitySet,
    ContentKind, CsvProjector, ExportRow, FixedField, Grantee, PermissionRule, PolicyTables,
    ResourceContext, NO_PERMISSIONS_SET, NO_SETTING,
};

fn plain(caps: &[(&str, CapabilityMode)]) -> CapabilitySet {
    caps.iter()
        .map(|(n, m)| (CapabilityKey::plain(*n), *m))
        .collect()
}

fn datasource(id: &str) -> ResourceContext {
    ResourceContext::new(ContentKind::Datasource, id, format!("ds {id}"))
}

#[test]
fn test_empty_project_renders_placeholder_row() {
    let tables = PolicyTables::builtin().unwrap();
    let projector = CsvProjector::new(&tables.catalog);

    let merged = merge_project(&tables, &ordered_sources(vec![], vec![]));
    assert!(merged.is_empty());

    let ctx = ResourceContext::new(ContentKind::Project, "p-1", "Finance");
    let rows = vec![ExportRow::placeholder(&ctx)];
    let schema = projector.schema(&rows).unwrap();
    let cells = projector.render_row(&schema, &rows[0]);

    let name_idx = schema
        .fixed
        .iter()
        .position(|f| *f == FixedField::GranteeName)
        .unwrap();
    assert_eq!(cells[name_idx], NO_PERMISSIONS_SET);
    assert_eq!(
        schema.columns.len(),
        tables.catalog.ordering(ContentKind::Project).len()
    );
    let vc_write = schema
        .column_index(&CapabilityKey::virtual_connection_write())
        .unwrap();
    for (idx, cell) in cells[schema.fixed.len()..].iter().enumerate() {
        if idx == vc_write {
            assert_eq!(cell, "No API Endpoint");
        } else {
            assert_eq!(cell, NO_SETTING);
        }
    }
}

#[test]
fn test_synonymous_spellings_share_one_column() {
    let tables = PolicyTables::builtin().unwrap();
    let projector = CsvProjector::new(&tables.catalog);

    let rows = vec![
        ExportRow::for_grantee(
            &datasource("a"),
            &Grantee::group("g"),
            "Group",
            plain(&[("CreateRefreshMetrics", CapabilityMode::Allow)]),
        ),
        ExportRow::for_grantee(
            &datasource("b"),
            &Grantee::user("u"),
            "User",
            plain(&[("ExtractRefresh", CapabilityMode::Deny)]),
        ),
    ];
    let schema = projector.schema(&rows).unwrap();

    let refresh_columns: Vec<_> = schema
        .columns
        .iter()
        .filter(|c| c.key.name.contains("Refresh"))
        .collect();
    assert_eq!(refresh_columns.len(), 1);
    assert_eq!(refresh_columns[0].key, CapabilityKey::plain("ExtractRefresh"));

    let idx = schema.fixed.len()
        + schema
            .column_index(&CapabilityKey::plain("ExtractRefresh"))
            .unwrap();
    assert_eq!(projector.render_row(&schema, &rows[0])[idx], "Allow");
    assert_eq!(projector.render_row(&schema, &rows[1])[idx], "Deny");
}

#[test]
fn test_leader_spelling_alone_keeps_its_own_column() {
    let tables = PolicyTables::builtin().unwrap();
    let projector = CsvProjector::new(&tables.catalog);

    let rows = vec![ExportRow::for_grantee(
        &datasource("a"),
        &Grantee::group("g"),
        "Group",
        plain(&[("InheritedProjectLeader", CapabilityMode::Allow)]),
    )];
    let schema = projector.schema(&rows).unwrap();
    let cells = projector.render_row(&schema, &rows[0]);

    let leader = schema
        .column_index(&CapabilityKey::plain("InheritedProjectLeader"))
        .expect("leader column kept");
    assert_eq!(
        schema.columns[leader].header,
        "Publish(API Endpoints:InheritedProjectLeader)"
    );
    assert_eq!(cells[schema.fixed.len() + leader], "Allow");

    let api = schema
        .column_index(&CapabilityKey::plain("VizqlDataApiAccess"))
        .unwrap();
    assert_eq!(cells[schema.fixed.len() + api], NO_SETTING);
}

#[test]
fn test_leader_spelling_dropped_when_api_access_present() {
    let tables = PolicyTables::builtin().unwrap();
    let projector = CsvProjector::new(&tables.catalog);

    let rows = vec![
        ExportRow::for_grantee(
            &datasource("a"),
            &Grantee::group("g"),
            "Group",
            plain(&[("InheritedProjectLeader", CapabilityMode::Allow)]),
        ),
        ExportRow::for_grantee(
            &datasource("b"),
            &Grantee::user("u"),
            "User",
            plain(&[("VizqlDataApiAccess", CapabilityMode::Deny)]),
        ),
    ];
    let schema = projector.schema(&rows).unwrap();
    assert!(schema
        .column_index(&CapabilityKey::plain("InheritedProjectLeader"))
        .is_none());

    let api = schema.fixed.len()
        + schema
            .column_index(&CapabilityKey::plain("VizqlDataApiAccess"))
            .unwrap();
    // Distinct grants: the leader mode is not copied into API access.
    assert_eq!(projector.render_row(&schema, &rows[0])[api], NO_SETTING);
    assert_eq!(projector.render_row(&schema, &rows[1])[api], "Deny");
}

#[test]
fn test_schema_never_narrower_than_data() {
    let tables = PolicyTables::builtin().unwrap();
    let projector = CsvProjector::new(&tables.catalog);

    let rows = vec![ExportRow::for_grantee(
        &datasource("a"),
        &Grantee::group("g"),
        "Group",
        plain(&[("BrandNewCapability", CapabilityMode::Allow)]),
    )];
    let schema = projector.schema(&rows).unwrap();

    let canonical = tables.catalog.ordering(ContentKind::Datasource);
    assert_eq!(schema.columns.len(), canonical.len() + 1);
    for (column, key) in schema.columns.iter().zip(canonical) {
        assert_eq!(&column.key, key);
    }
    assert_eq!(schema.columns.last().unwrap().header, "BrandNewCapability");
}

#[test]
fn test_merged_project_rows_project_onto_tab_headers() {
    let tables = PolicyTables::builtin().unwrap();
    let projector = CsvProjector::new(&tables.catalog);
    let leads = Grantee::group("leads");

    let merged = merge_project(
        &tables,
        &ordered_sources(
            vec![PermissionRule::new(
                leads.clone(),
                vec![Capability::allow("InheritedProjectLeader")],
            )],
            vec![],
        ),
    );
    let mut ctx = ResourceContext::new(ContentKind::Project, "p-1", "Finance");
    ctx.project_name = Some("Finance".to_string());
    ctx.asset_permissions = Some("LockedToProject".to_string());

    let rows: Vec<_> = merged
        .records()
        .iter()
        .map(|r| ExportRow::for_grantee(&ctx, &r.grantee, "Leads", r.capabilities.clone()))
        .collect();

    let mut out = Vec::new();
    let schema = projector.write(&rows, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let header = text.trim_start_matches('\u{feff}').lines().next().unwrap();

    assert!(header.starts_with(
        "content_type,content_id,content_name,project_name,asset_permissions,grantee_type,grantee_id,grantee_name,"
    ));
    assert!(header.contains("Projects Tab - View(API Endpoints:Read)"));
    assert!(header.contains("Workbooks Tab - Download/Save a Copy(API Endpoints:ExportXml)"));
    assert!(header.contains("Flows Tab - Run Flow(API Endpoints:Execute)"));

    let cells = projector.render_row(&schema, &rows[0]);
    assert!(cells[schema.fixed.len()..]
        .iter()
        .all(|c| c == "Allow" || c == "No API Endpoint"));
}

#[test]
fn test_mixed_kinds_fall_back_to_workbook_schema() {
    let tables = PolicyTables::builtin().unwrap();
    let projector = CsvProjector::new(&tables.catalog);

    let rows = vec![
        ExportRow::placeholder(&ResourceContext::new(ContentKind::Flow, "f", "F")),
        ExportRow::placeholder(&ResourceContext::new(ContentKind::Workbook, "w", "W")),
    ];
    let schema = projector.schema(&rows).unwrap();
    assert_eq!(schema.kind, ContentKind::Workbook);
}
