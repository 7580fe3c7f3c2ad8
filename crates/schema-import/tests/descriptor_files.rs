//! Descriptor discovery from YAML unit files.

use std::fs;

use schema_import::{
    Importer, ImporterOptions, MemoryDriver, SchemaIntrospector,
};

#[tokio::test]
async fn loads_units_from_directory_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();

    // written out of order on purpose; discovery sorts by filename
    fs::write(
        dir.path().join("20_widget.yaml"),
        r#"
tables:
  - name: widget
    columns:
      id: { type: { integer: 10 }, unsigned: true, not_null: true, auto_increment: true }
      owner_id: { type: { integer: 10 }, unsigned: true }
foreign_keys:
  - name: fk_widget_owner
    table: widget
    columns: [owner_id]
    ref_table: owner
    ref_columns: [id]
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("10_owner.yaml"),
        r#"
tables:
  - name: owner
    columns:
      id: { type: { integer: 10 }, unsigned: true, not_null: true, auto_increment: true }
      name: { type: { string: 255 }, not_null: true }
data:
  - table: owner
    columns: [id, name]
    rows:
      - [1, admin]
"#,
    )
    .unwrap();
    // non-descriptor files are ignored
    fs::write(dir.path().join("README.txt"), "not a descriptor").unwrap();

    let mut importer = Importer::new(MemoryDriver::new(), ImporterOptions::default());
    let loaded = importer.load_descriptors(Some(dir.path())).unwrap();
    assert_eq!(loaded, 2);

    importer.import_schema().await.unwrap();
    importer.import_data().await.unwrap();
    importer.post_import().await.unwrap();

    let driver = importer.driver();
    assert!(driver.table_exists("owner").await.unwrap());
    assert!(driver.table_exists("widget").await.unwrap());
    assert_eq!(driver.rows("owner").len(), 1);
    let fks = driver.table_foreign_keys("widget").await.unwrap();
    assert_eq!(fks.len(), 1);

    // 10_owner sorts before 20_widget, so its tables are created first
    let ops = driver.operations();
    let owner_pos = ops.iter().position(|o| o == "CREATE TABLE owner").unwrap();
    let widget_pos = ops.iter().position(|o| o == "CREATE TABLE widget").unwrap();
    assert!(owner_pos < widget_pos);

    assert_eq!(importer.log().error_count(), 0);
}

#[tokio::test]
async fn malformed_unit_file_is_a_descriptor_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.yaml"), "tables: {not: a list}").unwrap();

    let mut importer = Importer::new(MemoryDriver::new(), ImporterOptions::default());
    let err = importer.load_descriptors(Some(dir.path())).unwrap_err();
    assert!(err.to_string().contains("Descriptor error"));
}
