//! Diff & reconciliation engine.
//!
//! Compares declarative descriptors against introspected live structure and
//! decides, per table, column, index, primary key and foreign key, whether
//! to create, alter or skip. The engine is pure: it consumes a snapshot of
//! live state and emits [`SchemaOp`]s; it never touches the database.
//!
//! Reconciliation is additive-only. Structures present in the database but
//! absent from descriptors are left alone; foreign keys in particular are
//! only ever added, never altered or dropped.

use indexmap::IndexMap;

use crate::core::descriptor::{ColumnSpec, ForeignKeySpec, IndexSpec, PrimaryKeySpec};
use crate::core::schema::{ColumnSchema, ForeignKeyRef, IndexDef, PrimaryKeyDef, TableSchema};
use crate::core::traits::Dialect;
use crate::core::value::defaults_equal;

/// A table descriptor with per-dialect overrides already applied.
#[derive(Debug, Clone)]
pub struct ResolvedTable {
    /// Table name.
    pub name: String,
    /// Columns after dialect override resolution, in declaration order.
    pub columns: IndexMap<String, ColumnSpec>,
    /// Rendered engine options fragment, if any.
    pub options: Option<String>,
    /// Indexes after dialect override resolution.
    pub indexes: Vec<IndexSpec>,
    /// Declared primary keys.
    pub primary_keys: Vec<PrimaryKeySpec>,
}

/// Snapshot of a table's live structure, taken before planning.
#[derive(Debug, Clone, Default)]
pub struct LiveTable {
    /// Column structure; `None` when the table does not exist.
    pub schema: Option<TableSchema>,
    /// Live secondary indexes.
    pub indexes: Vec<IndexDef>,
    /// Live primary key definitions.
    pub primary_keys: Vec<PrimaryKeyDef>,
}

/// One reconciliation decision, ready for the executor.
///
/// Rebuild and replace operations are single decisions that the executor
/// realizes as a drop followed by a create; engines generally disallow
/// altering index or key definitions in place.
#[derive(Debug, Clone)]
pub enum SchemaOp {
    /// Create the table with its resolved columns and options.
    CreateTable {
        table: String,
        columns: IndexMap<String, ColumnSpec>,
        options: Option<String>,
    },
    /// Add a missing column.
    AddColumn {
        table: String,
        column: String,
        spec: ColumnSpec,
    },
    /// Alter a column that is no longer equivalent to its spec.
    AlterColumn {
        table: String,
        column: String,
        spec: ColumnSpec,
    },
    /// Create a missing index.
    CreateIndex { table: String, index: IndexSpec },
    /// Drop and re-create an index whose definition drifted.
    RebuildIndex { table: String, index: IndexSpec },
    /// Add a primary key (fresh import only).
    AddPrimaryKey { table: String, key: PrimaryKeySpec },
    /// Drop `drop_name` and add the declared key in its place.
    ReplacePrimaryKey {
        table: String,
        drop_name: String,
        key: PrimaryKeySpec,
    },
    /// Add a missing foreign key.
    AddForeignKey { fk: ForeignKeySpec },
}

/// First whitespace-delimited token of a rendered type string.
///
/// "varchar(255) NOT NULL" and "int(11) unsigned" compare as
/// "varchar(255)" and "int(11)".
pub fn base_type_token(rendered: &str) -> &str {
    rendered.split_whitespace().next().unwrap_or(rendered)
}

/// The update-trigger predicate: a live column is equivalent to its spec
/// iff base type token, nullability, default and unsigned flag all match.
///
/// The unsigned flag only participates on engines that have the concept;
/// comparing it elsewhere would re-alter the column on every run.
pub fn column_equivalent(dialect: &dyn Dialect, live: &ColumnSchema, spec: &ColumnSpec) -> bool {
    let declared_type = dialect.column_type(spec);
    if base_type_token(&live.db_type) != base_type_token(&declared_type) {
        return false;
    }
    if live.nullable != !spec.not_null {
        return false;
    }
    if !defaults_equal(live.default.as_ref(), spec.default.as_ref()) {
        return false;
    }
    if dialect.supports_unsigned() && live.unsigned != spec.unsigned {
        return false;
    }
    true
}

/// Whether a live index with the same name must be dropped and re-created.
///
/// A declared column missing from the live column set (one-way set diff) or
/// a uniqueness mismatch forces the rebuild. Extra live columns alone do
/// not.
pub fn index_needs_rebuild(live: &IndexDef, spec: &IndexSpec) -> bool {
    if spec.columns.iter().any(|c| !live.columns.contains(c)) {
        return true;
    }
    spec.unique != live.unique
}

/// Whether a declared primary key disagrees with any live key definition.
///
/// The comparison loops over all live keys and any single mismatch forces
/// an update, even if another live key matches exactly. A table with no
/// live primary keys therefore never triggers an update. This mirrors the
/// long-standing behavior of the engine; regression tests pin it.
pub fn primary_key_needs_update(live: &[PrimaryKeyDef], spec: &PrimaryKeySpec) -> bool {
    let mut update = false;
    for db_key in live {
        let mismatch = if spec.columns.len() == 1 {
            !(db_key.columns.len() == 1 && spec.columns[0] == db_key.columns[0])
        } else {
            // set-based: every declared column must appear in the live key
            spec.columns.iter().any(|c| !db_key.columns.contains(c))
        };
        if mismatch {
            update = true;
        }
    }
    update
}

/// Pick the live key to drop when replacing: the same-named key if present,
/// otherwise the first live key found.
pub fn primary_key_to_drop<'a>(
    live: &'a [PrimaryKeyDef],
    spec: &PrimaryKeySpec,
) -> Option<&'a str> {
    live.iter()
        .find(|k| k.name == spec.name)
        .or_else(|| live.first())
        .map(|k| k.name.as_str())
}

/// Whether a declared foreign key is absent from the live constraint set.
///
/// A spec is present iff some live constraint references the same table and
/// maps every declared local column onto its declared referenced column.
/// Constraint names are not compared; unmatched live keys are never
/// dropped.
pub fn foreign_key_missing(live: &[ForeignKeyRef], spec: &ForeignKeySpec) -> bool {
    !live.iter().any(|db_fk| {
        db_fk.ref_table == spec.ref_table
            && spec.column_pairs().all(|(l, r)| db_fk.maps(l, r))
    })
}

/// Plan a fresh import of one table: unconditional creates for every
/// declared structure. Foreign keys are planned separately in the post-pass.
pub fn plan_table_import(desc: &ResolvedTable) -> Vec<SchemaOp> {
    let mut ops = vec![SchemaOp::CreateTable {
        table: desc.name.clone(),
        columns: desc.columns.clone(),
        options: desc.options.clone(),
    }];
    for index in &desc.indexes {
        ops.push(SchemaOp::CreateIndex {
            table: desc.name.clone(),
            index: index.clone(),
        });
    }
    for key in &desc.primary_keys {
        ops.push(SchemaOp::AddPrimaryKey {
            table: desc.name.clone(),
            key: key.clone(),
        });
    }
    ops
}

/// Plan an update of one table against its live snapshot.
///
/// Missing table: create it, then create its declared indexes. No primary
/// key is added in that path (see [`primary_key_needs_update`]). Existing
/// table: add or alter drifted columns in declaration order, reconcile
/// indexes by name, then apply the primary key comparison.
pub fn plan_table_update(
    dialect: &dyn Dialect,
    desc: &ResolvedTable,
    live: &LiveTable,
) -> Vec<SchemaOp> {
    let mut ops = Vec::new();

    match &live.schema {
        None => {
            ops.push(SchemaOp::CreateTable {
                table: desc.name.clone(),
                columns: desc.columns.clone(),
                options: desc.options.clone(),
            });
        }
        Some(schema) => {
            for (name, spec) in &desc.columns {
                match schema.columns.get(name) {
                    None => ops.push(SchemaOp::AddColumn {
                        table: desc.name.clone(),
                        column: name.clone(),
                        spec: spec.clone(),
                    }),
                    Some(live_col) => {
                        if !column_equivalent(dialect, live_col, spec) {
                            ops.push(SchemaOp::AlterColumn {
                                table: desc.name.clone(),
                                column: name.clone(),
                                spec: spec.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    for index in &desc.indexes {
        match live.indexes.iter().find(|i| i.name == index.name) {
            None => ops.push(SchemaOp::CreateIndex {
                table: desc.name.clone(),
                index: index.clone(),
            }),
            Some(live_index) => {
                if index_needs_rebuild(live_index, index) {
                    ops.push(SchemaOp::RebuildIndex {
                        table: desc.name.clone(),
                        index: index.clone(),
                    });
                }
            }
        }
    }

    for key in &desc.primary_keys {
        if primary_key_needs_update(&live.primary_keys, key) {
            if let Some(drop_name) = primary_key_to_drop(&live.primary_keys, key) {
                ops.push(SchemaOp::ReplacePrimaryKey {
                    table: desc.name.clone(),
                    drop_name: drop_name.to_string(),
                    key: key.clone(),
                });
            }
        }
    }

    ops
}

/// Plan the foreign key post-pass for one table's declared constraints.
pub fn plan_foreign_keys(live: &[ForeignKeyRef], declared: &[ForeignKeySpec]) -> Vec<SchemaOp> {
    declared
        .iter()
        .filter(|fk| foreign_key_missing(live, fk))
        .map(|fk| SchemaOp::AddForeignKey { fk: fk.clone() })
        .collect()
}
