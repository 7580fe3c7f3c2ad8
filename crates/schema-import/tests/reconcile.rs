//! End-to-end reconciliation tests over the in-memory driver.

use indexmap::IndexMap;
use schema_import::core::schema::PrimaryKeyDef;
use schema_import::{
    ColumnSpec, DescriptorUnit, ForeignKeySpec, ImportError, Importer, ImporterOptions,
    IndexSpec, MemoryDriver, SchemaExecutor, SchemaIntrospector, SchemaProvider, SeedData,
    TableDescriptor, Value,
};

/// Programmatic descriptor unit for tests.
struct TestUnit {
    name: String,
    unit: DescriptorUnit,
}

impl TestUnit {
    fn new(name: &str, unit: DescriptorUnit) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            unit,
        })
    }
}

impl SchemaProvider for TestUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn describe_schema(&self) -> Vec<TableDescriptor> {
        self.unit.tables.clone()
    }

    fn describe_seed_data(&self) -> Vec<SeedData> {
        self.unit.data.clone()
    }

    fn describe_foreign_keys(&self) -> Vec<ForeignKeySpec> {
        self.unit.foreign_keys.clone()
    }
}

fn owner_table() -> TableDescriptor {
    TableDescriptor::new("owner")
        .column("id", ColumnSpec::integer(10).unsigned().not_null().auto_increment())
        .column("name", ColumnSpec::string(255).not_null())
        .with_options("InnoDB", "utf8mb4")
}

fn widget_table() -> TableDescriptor {
    TableDescriptor::new("widget")
        .column("id", ColumnSpec::integer(10).unsigned().not_null().auto_increment())
        .column("name", ColumnSpec::string(255).not_null())
        .column("owner_id", ColumnSpec::integer(10).unsigned())
        .index(IndexSpec::new("widget_name", vec!["name".to_string()]).unique())
        .with_options("InnoDB", "utf8mb4")
}

fn widget_fk() -> ForeignKeySpec {
    ForeignKeySpec {
        name: "fk_widget_owner".to_string(),
        table: "widget".to_string(),
        columns: vec!["owner_id".to_string()],
        ref_table: "owner".to_string(),
        ref_columns: vec!["id".to_string()],
        on_delete: Some(schema_import::ReferenceAction::Cascade),
        on_update: None,
    }
}

fn crm_unit() -> DescriptorUnit {
    DescriptorUnit {
        tables: vec![owner_table(), widget_table()],
        data: vec![],
        foreign_keys: vec![widget_fk()],
    }
}

fn importer_with(unit: DescriptorUnit) -> Importer<MemoryDriver> {
    let mut importer = Importer::new(MemoryDriver::new(), ImporterOptions::default());
    importer.register(TestUnit::new("crm", unit));
    importer
}

#[tokio::test]
async fn fresh_import_creates_everything() {
    let mut importer = importer_with(crm_unit());
    importer.import_schema().await.unwrap();
    importer.post_import().await.unwrap();

    let driver = importer.driver();
    assert!(driver.table_exists("owner").await.unwrap());
    assert!(driver.table_exists("widget").await.unwrap());

    let schema = driver.table_schema("widget").await.unwrap().unwrap();
    assert_eq!(schema.columns["name"].db_type, "varchar(255)");
    assert!(!schema.columns["name"].nullable);
    assert!(schema.columns["id"].auto_increment);

    let indexes = driver.table_indexes("widget").await.unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "widget_name");
    assert!(indexes[0].unique);

    let fks = driver.table_foreign_keys("widget").await.unwrap();
    assert_eq!(fks.len(), 1);
    assert_eq!(fks[0].ref_table, "owner");
    assert!(fks[0].maps("owner_id", "id"));

    assert_eq!(importer.log().error_count(), 0);
    let transcript = importer.log().render_text();
    assert!(transcript.contains("> start add tables"));
    assert!(transcript.contains("  > add table: widget ... done"));
    assert!(transcript.contains("  > create index: widget_name ... done"));
    assert!(transcript.contains("> start add foreign key"));
    assert!(transcript.contains("  > add: fk_widget_owner, widget ... done"));
    assert!(transcript.contains("# end add foreign key"));
}

#[tokio::test]
async fn update_schema_converges_to_noop() {
    let mut importer = importer_with(crm_unit());

    // first update run creates everything that is missing
    importer.update_schema().await.unwrap();
    importer.post_update().await.unwrap();
    assert!(!importer.driver().operations().is_empty());

    // second run against the same descriptors performs zero operations
    importer.driver().clear_operations();
    importer.update_schema().await.unwrap();
    importer.post_update().await.unwrap();
    assert_eq!(importer.driver().operations(), Vec::<String>::new());
    assert_eq!(importer.log().error_count(), 0);
}

#[tokio::test]
async fn fresh_import_then_update_is_noop() {
    let mut importer = importer_with(crm_unit());
    importer.import_schema().await.unwrap();
    importer.post_import().await.unwrap();

    importer.driver().clear_operations();
    importer.update_schema().await.unwrap();
    importer.post_update().await.unwrap();
    assert_eq!(importer.driver().operations(), Vec::<String>::new());
}

#[tokio::test]
async fn update_emits_single_alter_for_drifted_column() {
    let driver = MemoryDriver::new();
    let mut live_columns = IndexMap::new();
    live_columns.insert("id".to_string(), ColumnSpec::integer(10).not_null());
    live_columns.insert(
        "status".to_string(),
        ColumnSpec::string(20).default_value("new"),
    );
    driver
        .create_table("widget", &live_columns, None)
        .await
        .unwrap();
    driver.clear_operations();

    // descriptor tightens status to NOT NULL, everything else unchanged
    let desc = TableDescriptor::new("widget")
        .column("id", ColumnSpec::integer(10).not_null())
        .column(
            "status",
            ColumnSpec::string(20).not_null().default_value("new"),
        );
    let mut importer = Importer::new(driver, ImporterOptions::default());
    importer.register(TestUnit::new(
        "crm",
        DescriptorUnit {
            tables: vec![desc],
            ..Default::default()
        },
    ));

    importer.update_schema().await.unwrap();
    assert_eq!(
        importer.driver().operations(),
        vec!["ALTER COLUMN widget.status".to_string()]
    );
}

#[tokio::test]
async fn index_drift_rebuilds_exactly_once() {
    let driver = MemoryDriver::new();
    let mut columns = IndexMap::new();
    columns.insert("name".to_string(), ColumnSpec::string(255).not_null());
    driver.create_table("widget", &columns, None).await.unwrap();
    driver
        .create_index(
            "widget",
            &IndexSpec::new("widget_name", vec!["name".to_string()]),
        )
        .await
        .unwrap();
    driver.clear_operations();

    // descriptor now wants the index unique
    let desc = TableDescriptor::new("widget")
        .column("name", ColumnSpec::string(255).not_null())
        .index(IndexSpec::new("widget_name", vec!["name".to_string()]).unique());
    let mut importer = Importer::new(driver, ImporterOptions::default());
    importer.register(TestUnit::new(
        "crm",
        DescriptorUnit {
            tables: vec![desc],
            ..Default::default()
        },
    ));

    importer.update_schema().await.unwrap();
    assert_eq!(
        importer.driver().operations(),
        vec![
            "DROP INDEX widget_name ON widget".to_string(),
            "CREATE INDEX widget_name ON widget".to_string(),
        ]
    );

    let indexes = importer.driver().table_indexes("widget").await.unwrap();
    assert!(indexes[0].unique);
}

#[tokio::test]
async fn foreign_keys_are_only_ever_added() {
    let mut importer = importer_with(crm_unit());
    importer.import_schema().await.unwrap();
    importer.post_import().await.unwrap();

    // repeated post-update runs add nothing
    importer.driver().clear_operations();
    importer.post_update().await.unwrap();
    importer.post_update().await.unwrap();
    assert_eq!(importer.driver().operations(), Vec::<String>::new());
}

#[tokio::test]
async fn foreign_key_matching_ignores_constraint_name() {
    let mut importer = importer_with(crm_unit());
    importer.import_schema().await.unwrap();
    importer.post_import().await.unwrap();

    // same mapping under a different declared name is considered present
    let mut renamed = widget_fk();
    renamed.name = "fk_widget_owner_v2".to_string();
    importer.register(TestUnit::new(
        "extra",
        DescriptorUnit {
            foreign_keys: vec![renamed],
            ..Default::default()
        },
    ));
    importer.driver().clear_operations();
    importer.post_update().await.unwrap();
    assert_eq!(importer.driver().operations(), Vec::<String>::new());
}

#[tokio::test]
async fn die_on_error_aborts_remaining_batch() {
    let driver = MemoryDriver::new();
    // alpha already exists, so its CREATE TABLE collides
    let mut columns = IndexMap::new();
    columns.insert("id".to_string(), ColumnSpec::integer(10));
    driver.create_table("alpha", &columns, None).await.unwrap();
    driver.clear_operations();

    let unit = DescriptorUnit {
        tables: vec![
            TableDescriptor::new("alpha").column("id", ColumnSpec::integer(10)),
            TableDescriptor::new("beta").column("id", ColumnSpec::integer(10)),
        ],
        ..Default::default()
    };
    let mut importer = Importer::new(
        driver,
        ImporterOptions {
            die_on_error: true,
            ..Default::default()
        },
    );
    importer.register(TestUnit::new("crm", unit));

    let err = importer.import_schema().await.unwrap_err();
    match err {
        ImportError::Aborted { code, .. } => assert_eq!(code, 1),
        other => panic!("expected Aborted, got: {:?}", other),
    }
    // beta was never attempted
    assert!(!importer
        .driver()
        .operations()
        .iter()
        .any(|op| op.contains("beta")));
}

#[tokio::test]
async fn log_and_continue_records_single_error() {
    let driver = MemoryDriver::new();
    let mut columns = IndexMap::new();
    columns.insert("id".to_string(), ColumnSpec::integer(10));
    driver.create_table("alpha", &columns, None).await.unwrap();
    driver.clear_operations();

    let unit = DescriptorUnit {
        tables: vec![
            TableDescriptor::new("alpha").column("id", ColumnSpec::integer(10)),
            TableDescriptor::new("beta").column("id", ColumnSpec::integer(10)),
        ],
        ..Default::default()
    };
    let mut importer = Importer::new(driver, ImporterOptions::default());
    importer.register(TestUnit::new("crm", unit));

    importer.import_schema().await.unwrap();
    assert_eq!(importer.log().error_count_for(1), 1);
    assert!(importer.driver().table_exists("beta").await.unwrap());

    let transcript = importer.log().render_text();
    assert!(transcript.contains("| Error(1) ["));
    assert!(transcript.contains("  > add table: beta ... done"));
}

#[tokio::test]
async fn update_never_adds_pk_to_table_without_one() {
    let driver = MemoryDriver::new();
    let mut columns = IndexMap::new();
    columns.insert("id".to_string(), ColumnSpec::integer(10).not_null());
    driver.create_table("widget", &columns, None).await.unwrap();
    driver.clear_operations();

    let desc = TableDescriptor::new("widget")
        .column("id", ColumnSpec::integer(10).not_null())
        .primary_key("widget_pk", vec!["id".to_string()]);
    let mut importer = Importer::new(driver, ImporterOptions::default());
    importer.register(TestUnit::new(
        "crm",
        DescriptorUnit {
            tables: vec![desc],
            ..Default::default()
        },
    ));

    // the comparison loop never runs without live keys, so no key is added
    importer.update_schema().await.unwrap();
    assert_eq!(importer.driver().operations(), Vec::<String>::new());
}

#[tokio::test]
async fn update_replaces_mismatched_pk() {
    let driver = MemoryDriver::new();
    let mut columns = IndexMap::new();
    columns.insert("id".to_string(), ColumnSpec::integer(10).not_null());
    columns.insert("other".to_string(), ColumnSpec::integer(10).not_null());
    driver.create_table("widget", &columns, None).await.unwrap();
    driver.seed_primary_key(
        "widget",
        PrimaryKeyDef {
            name: "legacy_pk".to_string(),
            columns: vec!["other".to_string()],
        },
    );
    driver.clear_operations();

    let desc = TableDescriptor::new("widget")
        .column("id", ColumnSpec::integer(10).not_null())
        .column("other", ColumnSpec::integer(10).not_null())
        .primary_key("widget_pk", vec!["id".to_string()]);
    let mut importer = Importer::new(driver, ImporterOptions::default());
    importer.register(TestUnit::new(
        "crm",
        DescriptorUnit {
            tables: vec![desc],
            ..Default::default()
        },
    ));

    importer.update_schema().await.unwrap();
    // no same-named live key: the first live key found is dropped
    assert_eq!(
        importer.driver().operations(),
        vec![
            "DROP PRIMARY KEY widget.legacy_pk".to_string(),
            "ADD PRIMARY KEY widget.widget_pk".to_string(),
        ]
    );
}

#[tokio::test]
async fn seed_data_inserts_then_resets_sequence_once() {
    let unit = DescriptorUnit {
        tables: vec![
            widget_table(),
            TableDescriptor::new("settings")
                .column("key", ColumnSpec::string(64).not_null())
                .column("value", ColumnSpec::text()),
        ],
        data: vec![
            SeedData {
                table: "widget".to_string(),
                columns: vec!["id".to_string(), "name".to_string()],
                rows: vec![
                    vec![Value::Int(1), Value::Text("first".to_string())],
                    vec![Value::Int(5), Value::Text("fifth".to_string())],
                ],
            },
            SeedData {
                table: "settings".to_string(),
                columns: vec!["key".to_string(), "value".to_string()],
                rows: vec![vec![
                    Value::Text("version".to_string()),
                    Value::Text("1".to_string()),
                ]],
            },
        ],
        foreign_keys: vec![],
    };

    let mut importer = importer_with(unit);
    importer.import_schema().await.unwrap();
    importer.driver().clear_operations();
    importer.import_data().await.unwrap();

    assert_eq!(importer.driver().rows("widget").len(), 2);
    assert_eq!(importer.driver().rows("settings").len(), 1);
    // sequence reset once, to max + 1, and only for the auto table
    assert_eq!(importer.driver().sequence("widget"), Some(6));
    let resets: Vec<_> = importer
        .driver()
        .operations()
        .into_iter()
        .filter(|op| op.starts_with("RESET SEQUENCE"))
        .collect();
    assert_eq!(resets, vec!["RESET SEQUENCE widget".to_string()]);

    let transcript = importer.log().render_text();
    assert!(transcript.contains("> start add data rows"));
    assert!(transcript.contains("  > add data to table: widget ... done"));
    assert!(transcript.contains("> start reset sequence"));
    assert!(transcript.contains("  > reset sequence: widget ... done"));
}

#[tokio::test]
async fn redundant_seq_table_is_flagged() {
    let unit = DescriptorUnit {
        tables: vec![
            widget_table(),
            TableDescriptor::new("widget_seq").column("id", ColumnSpec::integer(10)),
        ],
        data: vec![
            SeedData {
                table: "widget".to_string(),
                columns: vec!["id".to_string()],
                rows: vec![vec![Value::Int(1)]],
            },
            SeedData {
                table: "widget_seq".to_string(),
                columns: vec!["id".to_string()],
                rows: vec![vec![Value::Int(1)]],
            },
        ],
        foreign_keys: vec![],
    };

    let mut importer = Importer::new(
        MemoryDriver::new(),
        ImporterOptions {
            redundant_tables: true,
            ..Default::default()
        },
    );
    importer.register(TestUnit::new("crm", unit));
    importer.import_schema().await.unwrap();
    importer.import_data().await.unwrap();

    let transcript = importer.log().render_text();
    assert!(transcript.contains("> Error: redundant table widget_seq !!!"));
}

#[tokio::test]
async fn rename_and_drop_helpers_skip_missing_targets() {
    let driver = MemoryDriver::new();
    let mut columns = IndexMap::new();
    columns.insert("status".to_string(), ColumnSpec::string(20));
    driver.create_table("old_name", &columns, None).await.unwrap();
    driver.clear_operations();

    let importer: Importer<MemoryDriver> = Importer::new(driver, ImporterOptions::default());

    importer
        .rename_tables(&[
            ("old_name".to_string(), "new_name".to_string()),
            ("missing".to_string(), "whatever".to_string()),
        ])
        .await
        .unwrap();
    assert!(importer.driver().table_exists("new_name").await.unwrap());
    assert!(!importer.driver().table_exists("old_name").await.unwrap());

    importer
        .rename_columns(&[
            (
                "new_name".to_string(),
                "status".to_string(),
                "state".to_string(),
            ),
            // old column missing: skipped
            (
                "new_name".to_string(),
                "gone".to_string(),
                "anything".to_string(),
            ),
        ])
        .await
        .unwrap();
    let schema = importer
        .driver()
        .table_schema("new_name")
        .await
        .unwrap()
        .unwrap();
    assert!(schema.columns.contains_key("state"));
    assert!(!schema.columns.contains_key("status"));

    importer
        .drop_columns(&[("new_name".to_string(), "state".to_string())])
        .await
        .unwrap();
    importer
        .drop_tables(&["new_name".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert!(!importer.driver().table_exists("new_name").await.unwrap());
}

#[tokio::test]
async fn dialect_overrides_are_applied_and_logged() {
    let mut desc = widget_table();
    desc.column_overrides.insert("mysql".to_string(), {
        let mut map = IndexMap::new();
        map.insert(
            "name".to_string(),
            ColumnSpec::text().raw_type("mediumtext"),
        );
        map
    });

    let mut importer = importer_with(DescriptorUnit {
        tables: vec![owner_table(), desc],
        data: vec![],
        foreign_keys: vec![],
    });
    importer.import_schema().await.unwrap();

    let schema = importer
        .driver()
        .table_schema("widget")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(schema.columns["name"].db_type, "mediumtext");

    let transcript = importer.log().render_text();
    assert!(transcript
        .contains("    > custom column type, name: name, driver: mysql, type: mediumtext"));
}
