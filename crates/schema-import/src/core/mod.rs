//! Core data model and traits.

pub mod descriptor;
pub mod schema;
pub mod traits;
pub mod value;

pub use descriptor::{
    ColumnSpec, ColumnType, DescriptorUnit, FileProvider, ForeignKeySpec, ImportBatch, IndexSpec,
    PrimaryKeySpec, ReferenceAction, SchemaProvider, SeedData, TableDescriptor, TableOptions,
};
pub use schema::{ColumnSchema, ForeignKeyRef, IndexDef, PrimaryKeyDef, TableSchema};
pub use traits::{Dialect, SchemaExecutor, SchemaIntrospector};
pub use value::Value;
