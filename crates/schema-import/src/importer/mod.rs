//! Import orchestrator.
//!
//! [`Importer`] drives a run end to end: descriptor discovery, fresh import
//! (`import_schema` / `import_data` / `post_import`), reconciliation
//! (`update_schema` / `post_update`) and the maintenance helpers. The
//! driver handle is injected at construction; descriptors are processed one
//! at a time, in discovery order, and every operation runs sequentially.
//!
//! Failure policy is controlled solely by `die_on_error`: off (default),
//! each failed operation is recorded in the run log and the batch
//! continues; on, the run aborts with [`ImportError::Aborted`] carrying the
//! operation code and cause chain. There is no retry and no rollback;
//! re-running is the recovery path, and the engine converges because
//! existing equivalent structures are detected and skipped.

use std::path::Path;

use tracing::debug;

use crate::config::ImporterOptions;
use crate::core::descriptor::{
    ForeignKeySpec, ImportBatch, SchemaProvider, SeedData, TableDescriptor,
};
use crate::core::traits::{SchemaExecutor, SchemaIntrospector};
use crate::diff::{self, LiveTable, ResolvedTable, SchemaOp};
use crate::error::{ImportError, Result};
use crate::report::{ImportLog, LogOutput, OpCode};

/// Everything one provider contributes, snapshotted for the run.
struct UnitData {
    tables: Vec<TableDescriptor>,
    data: Vec<SeedData>,
    foreign_keys: Vec<ForeignKeySpec>,
}

/// Schema import and reconciliation orchestrator.
pub struct Importer<D> {
    driver: D,
    options: ImporterOptions,
    batch: ImportBatch,
    log: ImportLog,
}

impl<D> Importer<D>
where
    D: SchemaIntrospector + SchemaExecutor,
{
    /// Create an importer over an injected driver handle.
    pub fn new(driver: D, options: ImporterOptions) -> Self {
        Self {
            driver,
            options,
            batch: ImportBatch::new(),
            log: ImportLog::new(),
        }
    }

    /// Register a descriptor provider.
    pub fn register(&mut self, provider: Box<dyn SchemaProvider>) {
        self.batch.register(provider);
    }

    /// Load every descriptor file from the configured directory, or from
    /// `path_override` when given. Returns the number of units loaded.
    pub fn load_descriptors(&mut self, path_override: Option<&Path>) -> Result<usize> {
        let path = path_override.unwrap_or(&self.options.path).to_path_buf();
        self.batch.load_dir(&path)
    }

    /// The accumulated run log.
    pub fn log(&self) -> &ImportLog {
        &self.log
    }

    /// The injected driver handle.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Flush the run log to stdout or a file.
    pub fn flush_log(&self, output: &LogOutput) -> Result<()> {
        self.log.flush(output)
    }

    /// Flush the run log to stdout when `show` is set, otherwise append it
    /// to the configured log file.
    pub fn flush_log_default(&self, show: bool) -> Result<()> {
        let output = if show {
            LogOutput::Stdout
        } else {
            LogOutput::File(self.options.log_file.clone())
        };
        self.flush_log(&output)
    }

    // ===== Fresh import =====

    /// Create every declared table, index and primary key unconditionally.
    pub async fn import_schema(&mut self) -> Result<()> {
        let units = self.collect_units();
        for unit in &units {
            self.log.section("add tables");
            for desc in &unit.tables {
                let resolved = self.resolve_table(desc);
                let ops = diff::plan_table_import(&resolved);
                for op in &ops {
                    self.apply_import_op(op).await?;
                }
            }
            self.log.end_section("add tables");
        }
        Ok(())
    }

    /// Insert all seed data, then reset auto-increment sequences once per
    /// table. The insert-all-then-reset-once ordering avoids resetting a
    /// sequence mid-insert.
    pub async fn import_data(&mut self) -> Result<()> {
        let units = self.collect_units();
        for unit in &units {
            if unit.data.is_empty() {
                continue;
            }

            self.log.section("add data rows");
            for block in &unit.data {
                let mut result = Ok(());
                for row in &block.rows {
                    if let Err(err) = self
                        .driver
                        .insert(&block.table, &block.columns, row)
                        .await
                    {
                        result = Err(err);
                        break;
                    }
                }
                self.record(OpCode::InsertData, "add data to table", &block.table, result)?;
            }
            self.log.end_section("add data rows");

            self.log.section("reset sequence");
            for block in &unit.data {
                let has_auto = self
                    .driver
                    .table_schema(&block.table)
                    .await?
                    .map(|s| s.has_auto_increment())
                    .unwrap_or(false);
                if !has_auto {
                    continue;
                }
                let result = self.driver.reset_sequence(&block.table).await;
                self.record(OpCode::ResetSequence, "reset sequence", &block.table, result)?;

                if self.options.redundant_tables {
                    let seq_name = format!("{}_seq", block.table);
                    if unit.data.iter().any(|b| b.table == seq_name) {
                        self.log
                            .warning(format!("redundant table {}", seq_name));
                        if self.options.die_on_error {
                            return Err(ImportError::aborted(
                                OpCode::ResetSequence,
                                ImportError::Driver(format!("redundant table {}", seq_name)),
                            ));
                        }
                    }
                }
            }
            self.log.end_section("reset sequence");
        }
        Ok(())
    }

    /// Foreign key post-pass for fresh imports: add every declared
    /// constraint. Runs after all tables across all descriptors exist.
    pub async fn post_import(&mut self) -> Result<()> {
        let units = self.collect_units();
        for unit in &units {
            if unit.foreign_keys.is_empty() {
                continue;
            }
            self.log.section("add foreign key");
            for fk in &unit.foreign_keys {
                let target = format!("{}, {}", fk.name, fk.table);
                let result = self.driver.add_foreign_key(fk).await;
                self.record(OpCode::AddForeignKey, "add", &target, result)?;
            }
            self.log.end_section("add foreign key");
        }
        Ok(())
    }

    // ===== Update =====

    /// Reconcile live structure against every descriptor: create missing
    /// tables, add or alter drifted columns, rebuild drifted indexes,
    /// replace drifted primary keys. Idempotent: a second run against the
    /// same descriptors performs no operations.
    pub async fn update_schema(&mut self) -> Result<()> {
        let units = self.collect_units();
        for unit in &units {
            self.log.section("update tables");
            for desc in &unit.tables {
                let resolved = self.resolve_table(desc);
                let live = LiveTable {
                    schema: self.driver.table_schema(&desc.name).await?,
                    indexes: self.driver.table_indexes(&desc.name).await?,
                    primary_keys: self.driver.table_primary_keys(&desc.name).await?,
                };
                let ops = diff::plan_table_update(self.driver.dialect(), &resolved, &live);
                self.apply_update_ops(&ops).await?;
            }
            self.log.end_section("update tables");
        }
        Ok(())
    }

    /// Foreign key post-pass for updates: add declared constraints that are
    /// missing from the live schema. Existing constraints are never altered
    /// or dropped.
    pub async fn post_update(&mut self) -> Result<()> {
        let units = self.collect_units();
        for unit in &units {
            if unit.foreign_keys.is_empty() {
                continue;
            }
            self.log.section("update foreign key");
            for fk in &unit.foreign_keys {
                let live = self.driver.table_foreign_keys(&fk.table).await?;
                for op in diff::plan_foreign_keys(&live, std::slice::from_ref(fk)) {
                    if let SchemaOp::AddForeignKey { fk } = op {
                        let target = format!("{}, {}", fk.name, fk.table);
                        let result = self.driver.add_foreign_key(&fk).await;
                        self.record(OpCode::UpdateForeignKey, "add", &target, result)?;
                    }
                }
            }
            self.log.end_section("update foreign key");
        }
        Ok(())
    }

    // ===== Maintenance helpers =====

    /// Rename tables; pairs whose old name does not exist are skipped.
    pub async fn rename_tables(&self, pairs: &[(String, String)]) -> Result<()> {
        for (old, new) in pairs {
            if self.driver.table_exists(old).await? {
                debug!(%old, %new, "renaming table");
                self.driver.rename_table(old, new).await?;
            }
        }
        Ok(())
    }

    /// Drop tables; missing tables are skipped.
    pub async fn drop_tables(&self, tables: &[String]) -> Result<()> {
        for table in tables {
            if self.driver.table_exists(table).await? {
                debug!(%table, "dropping table");
                self.driver.drop_table(table).await?;
            }
        }
        Ok(())
    }

    /// Rename columns; a triple is applied only when the old column exists
    /// and the new name is still free.
    pub async fn rename_columns(&self, columns: &[(String, String, String)]) -> Result<()> {
        for (table, old, new) in columns {
            if let Some(schema) = self.driver.table_schema(table).await? {
                if schema.columns.contains_key(old) && !schema.columns.contains_key(new) {
                    debug!(%table, %old, %new, "renaming column");
                    self.driver.rename_column(table, old, new).await?;
                }
            }
        }
        Ok(())
    }

    /// Drop columns; missing tables or columns are skipped.
    pub async fn drop_columns(&self, columns: &[(String, String)]) -> Result<()> {
        for (table, column) in columns {
            if let Some(schema) = self.driver.table_schema(table).await? {
                if schema.columns.contains_key(column) {
                    debug!(%table, %column, "dropping column");
                    self.driver.drop_column(table, column).await?;
                }
            }
        }
        Ok(())
    }

    /// Invalidate the driver's schema metadata cache. Call after a batch of
    /// changes; nothing invalidates it automatically.
    pub async fn refresh_schema(&self) -> Result<()> {
        self.driver.refresh_schema().await
    }

    // ===== Internals =====

    fn collect_units(&self) -> Vec<UnitData> {
        self.batch
            .providers()
            .map(|p| UnitData {
                tables: p.describe_schema(),
                data: p.describe_seed_data(),
                foreign_keys: p.describe_foreign_keys(),
            })
            .collect()
    }

    /// Apply per-dialect column and index overrides, logging each one.
    fn resolve_table(&mut self, desc: &TableDescriptor) -> ResolvedTable {
        let dialect = self.driver.dialect();
        let driver_name = dialect.name().to_string();

        let mut columns = desc.columns.clone();
        if let Some(overrides) = desc.column_overrides.get(&driver_name) {
            for (name, spec) in overrides {
                self.log.note(format!(
                    "custom column type, name: {}, driver: {}, type: {}",
                    name,
                    driver_name,
                    self.driver.dialect().column_type(spec)
                ));
                columns.insert(name.clone(), spec.clone());
            }
        }

        let mut indexes = desc.indexes.clone();
        if let Some(overrides) = desc.index_overrides.get(&driver_name) {
            for custom in overrides {
                for index in indexes.iter_mut() {
                    if index.name == custom.name {
                        self.log.note(format!(
                            "custom index, driver: {}, type: {}",
                            driver_name, custom.name
                        ));
                        *index = custom.clone();
                    }
                }
            }
        }

        ResolvedTable {
            name: desc.name.clone(),
            options: self.driver.dialect().table_options(&desc.options),
            columns,
            indexes,
            primary_keys: desc.primary_keys.clone(),
        }
    }

    /// Record one operation outcome. Returns whether the operation
    /// succeeded; a failure with `die_on_error` unset is logged and
    /// swallowed, with it set the run aborts.
    fn record(
        &mut self,
        op: OpCode,
        action: &str,
        target: &str,
        result: Result<()>,
    ) -> Result<bool> {
        match result {
            Ok(()) => {
                self.log.done(op, action, target);
                Ok(true)
            }
            Err(err) => {
                self.log.failed(op, action, target, &err.to_string());
                if self.options.die_on_error {
                    Err(ImportError::aborted(op, categorize(op, target, err)))
                } else {
                    Ok(false)
                }
            }
        }
    }

    async fn apply_import_op(&mut self, op: &SchemaOp) -> Result<bool> {
        match op {
            SchemaOp::CreateTable {
                table,
                columns,
                options,
            } => {
                let result = self
                    .driver
                    .create_table(table, columns, options.as_deref())
                    .await;
                self.record(OpCode::CreateTable, "add table", table, result)
            }
            SchemaOp::CreateIndex { table, index } => {
                let result = self.driver.create_index(table, index).await;
                self.record(OpCode::CreateIndex, "create index", &index.name, result)
            }
            SchemaOp::AddPrimaryKey { table, key } => {
                let result = self
                    .driver
                    .add_primary_key(table, &key.name, &key.columns)
                    .await;
                self.record(OpCode::AddPrimaryKey, "add primary key", &key.name, result)
            }
            // fresh import plans no other operation kinds
            _ => Ok(true),
        }
    }

    async fn apply_update_ops(&mut self, ops: &[SchemaOp]) -> Result<()> {
        // The table/column block shares one error scope: the first failure
        // skips the rest of the block but not the index or key phases.
        let mut column_phase_failed = false;
        for op in ops {
            match op {
                SchemaOp::CreateTable {
                    table,
                    columns,
                    options,
                } if !column_phase_failed => {
                    let result = self
                        .driver
                        .create_table(table, columns, options.as_deref())
                        .await;
                    if !self.record(OpCode::UpdateTable, "add table", table, result)? {
                        column_phase_failed = true;
                    }
                }
                SchemaOp::AddColumn {
                    table,
                    column,
                    spec,
                } if !column_phase_failed => {
                    let target = format!("{}:{}", table, column);
                    let result = self.driver.add_column(table, column, spec).await;
                    if !self.record(OpCode::UpdateTable, "add column", &target, result)? {
                        column_phase_failed = true;
                    }
                }
                SchemaOp::AlterColumn {
                    table,
                    column,
                    spec,
                } if !column_phase_failed => {
                    let target = format!("{}:{}", table, column);
                    let result = self.driver.alter_column(table, column, spec).await;
                    if !self.record(OpCode::UpdateTable, "alter column", &target, result)? {
                        column_phase_failed = true;
                    }
                }
                SchemaOp::CreateTable { .. }
                | SchemaOp::AddColumn { .. }
                | SchemaOp::AlterColumn { .. } => {}
                SchemaOp::CreateIndex { table, index } => {
                    let result = self.driver.create_index(table, index).await;
                    self.record(OpCode::UpdateIndex, "create index", &index.name, result)?;
                }
                SchemaOp::RebuildIndex { table, index } => {
                    // no in-place index alter: drop then re-create
                    let result = match self.driver.drop_index(table, &index.name).await {
                        Ok(()) => self.driver.create_index(table, index).await,
                        Err(err) => Err(err),
                    };
                    self.record(OpCode::UpdateIndex, "update index", &index.name, result)?;
                }
                SchemaOp::ReplacePrimaryKey {
                    table,
                    drop_name,
                    key,
                } => {
                    let result = match self.driver.drop_primary_key(table, drop_name).await {
                        Ok(()) => {
                            self.driver
                                .add_primary_key(table, &key.name, &key.columns)
                                .await
                        }
                        Err(err) => Err(err),
                    };
                    self.record(
                        OpCode::UpdatePrimaryKey,
                        "update primary key",
                        &key.name,
                        result,
                    )?;
                }
                SchemaOp::AddPrimaryKey { .. } | SchemaOp::AddForeignKey { .. } => {
                    // never planned in update mode; foreign keys run in the
                    // dedicated post-pass
                }
            }
        }
        Ok(())
    }
}

/// Wrap a raw driver error into its operation-category error.
fn categorize(op: OpCode, target: &str, err: ImportError) -> ImportError {
    let source = Box::new(err);
    match op {
        OpCode::InsertData => ImportError::DataInsert {
            table: target.to_string(),
            source,
        },
        OpCode::ResetSequence => ImportError::SequenceReset {
            table: target.to_string(),
            source,
        },
        OpCode::AddForeignKey | OpCode::UpdateForeignKey => ImportError::ForeignKey {
            name: target.to_string(),
            source,
        },
        _ => ImportError::SchemaOperation {
            op,
            target: target.to_string(),
            source,
        },
    }
}
