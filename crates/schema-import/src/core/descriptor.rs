//! Declarative schema descriptors.
//!
//! Descriptors state what the database should look like: tables, columns,
//! indexes, primary keys, foreign keys and seed data. They are immutable
//! once loaded; the diff engine reconciles live structure against them.
//!
//! Descriptor units are supplied either programmatically via the
//! [`SchemaProvider`] trait or from YAML files discovered in a directory
//! (one unit per file).

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

use super::value::Value;

/// Semantic column type, resolved to an engine type by the dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Small integer, optional display width.
    SmallInt(Option<u32>),
    /// Integer, optional display width.
    Integer(Option<u32>),
    /// Big integer, optional display width.
    BigInt(Option<u32>),
    /// Boolean flag.
    Boolean,
    /// Fixed-point decimal: precision, scale.
    Decimal(u32, u32),
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Fixed-length character string.
    Char(Option<u32>),
    /// Variable-length character string (varchar).
    String(Option<u32>),
    /// Unbounded text.
    Text,
    /// Binary blob, optional length.
    Binary(Option<u32>),
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time.
    DateTime,
    /// Timestamp.
    Timestamp,
}

/// Declarative column specification.
///
/// Two specs are considered equivalent to a live column iff the base SQL
/// type token, nullability, default and unsigned flag all match; that
/// predicate lives in the diff engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Semantic type.
    #[serde(rename = "type")]
    pub col_type: ColumnType,

    /// NOT NULL constraint.
    #[serde(default)]
    pub not_null: bool,

    /// Default value.
    #[serde(default)]
    pub default: Option<Value>,

    /// Unsigned flag (MySQL family; ignored by engines without the concept).
    #[serde(default)]
    pub unsigned: bool,

    /// Auto-increment flag.
    #[serde(default)]
    pub auto_increment: bool,

    /// Raw engine-specific type string. Escape hatch: when set, the dialect
    /// uses it verbatim instead of rendering `col_type`.
    #[serde(default)]
    pub raw: Option<String>,
}

impl ColumnSpec {
    /// Create a spec with the given semantic type.
    pub fn new(col_type: ColumnType) -> Self {
        Self {
            col_type,
            not_null: false,
            default: None,
            unsigned: false,
            auto_increment: false,
            raw: None,
        }
    }

    /// Integer column with default display width.
    pub fn integer(width: u32) -> Self {
        Self::new(ColumnType::Integer(Some(width)))
    }

    /// Varchar column of the given length.
    pub fn string(len: u32) -> Self {
        Self::new(ColumnType::String(Some(len)))
    }

    /// Unbounded text column.
    pub fn text() -> Self {
        Self::new(ColumnType::Text)
    }

    /// Boolean column.
    pub fn boolean() -> Self {
        Self::new(ColumnType::Boolean)
    }

    /// Timestamp column.
    pub fn timestamp() -> Self {
        Self::new(ColumnType::Timestamp)
    }

    /// Mark NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Set the default value.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark unsigned.
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Mark auto-increment.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Use a raw engine-specific type string.
    pub fn raw_type(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// Declarative index specification.
///
/// Equality is order-sensitive on the column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Index name.
    pub name: String,

    /// Indexed column names, in key order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// Create a non-unique index spec.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
        }
    }

    /// Mark the index unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Declarative primary key specification.
///
/// Column comparison against live keys is set-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeySpec {
    /// Constraint name.
    pub name: String,

    /// Key column names.
    pub columns: Vec<String>,
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferenceAction {
    /// SQL keyword for this action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferenceAction::Cascade => "CASCADE",
            ReferenceAction::SetNull => "SET NULL",
            ReferenceAction::SetDefault => "SET DEFAULT",
            ReferenceAction::Restrict => "RESTRICT",
            ReferenceAction::NoAction => "NO ACTION",
        }
    }
}

/// Declarative foreign key constraint.
///
/// Foreign keys are additive-only: once present in the database they are
/// never altered or dropped by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    /// Constraint name.
    pub name: String,

    /// Owning table.
    pub table: String,

    /// Owning column(s).
    pub columns: Vec<String>,

    /// Referenced table.
    pub ref_table: String,

    /// Referenced column(s), positionally matched to `columns`.
    pub ref_columns: Vec<String>,

    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: Option<ReferenceAction>,

    /// ON UPDATE action.
    #[serde(default)]
    pub on_update: Option<ReferenceAction>,
}

impl ForeignKeySpec {
    /// Local/referenced column pairs.
    pub fn column_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.ref_columns.iter())
            .map(|(l, r)| (l.as_str(), r.as_str()))
    }
}

/// Engine/charset options applied at table creation (MySQL family).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Storage engine (e.g. "InnoDB").
    #[serde(default)]
    pub engine: Option<String>,

    /// Default character set (e.g. "utf8mb4").
    #[serde(default)]
    pub charset: Option<String>,
}

/// Declarative definition of one table's target structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,

    /// Column specs, in declaration order. Order is preserved for
    /// deterministic DDL generation.
    pub columns: IndexMap<String, ColumnSpec>,

    /// Per-dialect column overrides: dialect name to column-name/spec map.
    #[serde(default)]
    pub column_overrides: BTreeMap<String, IndexMap<String, ColumnSpec>>,

    /// Secondary indexes.
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,

    /// Per-dialect index overrides, replacing same-named entries.
    #[serde(default)]
    pub index_overrides: BTreeMap<String, Vec<IndexSpec>>,

    /// Primary keys.
    #[serde(default)]
    pub primary_keys: Vec<PrimaryKeySpec>,

    /// Engine/charset options.
    #[serde(default)]
    pub options: TableOptions,
}

impl TableDescriptor {
    /// Create an empty descriptor for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            column_overrides: BTreeMap::new(),
            indexes: Vec::new(),
            index_overrides: BTreeMap::new(),
            primary_keys: Vec::new(),
            options: TableOptions::default(),
        }
    }

    /// Add a column, preserving declaration order.
    pub fn column(mut self, name: impl Into<String>, spec: ColumnSpec) -> Self {
        self.columns.insert(name.into(), spec);
        self
    }

    /// Add a secondary index.
    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add a primary key.
    pub fn primary_key(mut self, name: impl Into<String>, columns: Vec<String>) -> Self {
        self.primary_keys.push(PrimaryKeySpec {
            name: name.into(),
            columns,
        });
        self
    }

    /// Set engine/charset options.
    pub fn with_options(mut self, engine: &str, charset: &str) -> Self {
        self.options = TableOptions {
            engine: Some(engine.to_string()),
            charset: Some(charset.to_string()),
        };
        self
    }
}

/// Seed data for one table: a column list zipped against positional rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedData {
    /// Target table.
    pub table: String,

    /// Column names, matched positionally against each row.
    pub columns: Vec<String>,

    /// Value rows.
    pub rows: Vec<Vec<Value>>,
}

/// A descriptor unit: everything one source contributes to a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorUnit {
    /// Table definitions.
    #[serde(default)]
    pub tables: Vec<TableDescriptor>,

    /// Seed data blocks.
    #[serde(default)]
    pub data: Vec<SeedData>,

    /// Foreign key constraints, applied in the post-pass.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySpec>,
}

/// Capability interface implemented by every descriptor source.
///
/// Replaces convention-based discovery of arbitrarily named units: each
/// provider states explicitly what it supplies. Default implementations
/// return nothing, so a provider only overrides what it has.
pub trait SchemaProvider: Send + Sync {
    /// Unit name, used in diagnostics.
    fn name(&self) -> &str;

    /// Table definitions supplied by this unit.
    fn describe_schema(&self) -> Vec<TableDescriptor> {
        Vec::new()
    }

    /// Seed data supplied by this unit.
    fn describe_seed_data(&self) -> Vec<SeedData> {
        Vec::new()
    }

    /// Foreign keys supplied by this unit.
    fn describe_foreign_keys(&self) -> Vec<ForeignKeySpec> {
        Vec::new()
    }
}

/// A descriptor unit loaded from a YAML file.
pub struct FileProvider {
    name: String,
    unit: DescriptorUnit,
}

impl FileProvider {
    /// Load one descriptor unit from a YAML file. The unit is named after
    /// the file's base name.
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let content = std::fs::read_to_string(path)?;
        let unit: DescriptorUnit = serde_yaml::from_str(&content).map_err(|e| {
            ImportError::Descriptor(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self { name, unit })
    }
}

impl SchemaProvider for FileProvider {
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

/// All descriptor units discovered for one run. Transient: built once per
/// run and discarded after.
#[derive(Default)]
pub struct ImportBatch {
    providers: Vec<Box<dyn SchemaProvider>>,
}

impl ImportBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider.
    pub fn register(&mut self, provider: Box<dyn SchemaProvider>) {
        self.providers.push(provider);
    }

    /// Load every `.yaml`/`.yml` file in `dir` as a provider.
    ///
    /// Files are loaded in sorted filename order so discovery is
    /// deterministic across platforms.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && matches!(
                        p.extension().and_then(|e| e.to_str()),
                        Some("yaml") | Some("yml")
                    )
            })
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in paths {
            self.register(Box::new(FileProvider::load(&path)?));
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Iterate over registered providers.
    pub fn providers(&self) -> impl Iterator<Item = &dyn SchemaProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
