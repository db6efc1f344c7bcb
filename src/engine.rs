//! Engine Module
//!
//! The storage engine façade: the only entry point for callers.
//!
//! ## Responsibilities
//! - Validate tables, row shapes and foreign keys before any write
//! - Route records to shards and keep buffer, index and cache in step
//! - Enforce relation policies on delete
//! - Flush buffered records on threshold, on request and on close

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::cache::{CacheStats, RecordCache};
use crate::catalog::{Catalog, Table};
use crate::config::Config;
use crate::error::{ElementalError, Result};
use crate::record::{Record, RecordId, Row, Value};
use crate::relation::{DeletePolicy, Relation, RowSource};
use crate::storage::{ShardId, StorageManager};

/// What a successful delete removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// (table, id) of every removed row, the requested row first
    pub removed: Vec<(String, RecordId)>,
}

impl DeleteOutcome {
    /// Rows removed by cascade, excluding the requested row
    pub fn cascaded(&self) -> &[(String, RecordId)] {
        self.removed.get(1..).unwrap_or(&[])
    }
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Writes** (create/add/update/delete/relate/flush): serialized by
///   `write_lock`, then take the catalog, one shard at a time, then the cache
/// - **Reads** (get/get_all): no write lock; probe the cache, then lock the
///   table's shard and fill the cache while still holding it, so a
///   concurrent delete cannot be shadowed by a stale cache fill
/// - No call ever holds two shard locks at once
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Table definitions and relations
    catalog: RwLock<Catalog>,

    /// Shard files with their buffers and indexes
    storage: StorageManager,

    /// (table, id) → record
    cache: Mutex<RecordCache>,

    /// Serializes write operations
    write_lock: Mutex<()>,

    /// Set once every shard has been flushed for shutdown
    closed: AtomicBool,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const CATALOG_FILENAME: &'static str = "catalog.db";
    const SHARD_DIR: &'static str = "shards";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Load (or create) the catalog
    /// 3. Lay out shards; each loads lazily on first access
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let catalog = Catalog::open(
            &config.data_dir.join(Self::CATALOG_FILENAME),
            config.shard_count,
            config.sync_writes,
        )?;
        let storage = StorageManager::open(&config.data_dir.join(Self::SHARD_DIR), &config)?;
        let cache = RecordCache::new(config.cache_capacity);

        tracing::info!(
            "Opened ElementalDB at {} ({} tables, {} shards)",
            config.data_dir.display(),
            catalog.names().len(),
            storage.shard_count()
        );

        Ok(Self {
            config,
            catalog: RwLock::new(catalog),
            storage,
            cache: Mutex::new(cache),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Schema
    // =========================================================================

    /// Declare a new table; fails `AlreadyExists` if the name is taken
    pub fn create_table(&self, table: Table) -> Result<Table> {
        let _write_guard = self.write_lock.lock();

        self.catalog.write().create(table.clone())?;
        tracing::info!("Created table {} {:?}", table.name, table.column_names());
        Ok(table)
    }

    /// Declare a table, discarding any existing table of the same name
    /// together with its records and the relations involving it
    pub fn replace_table(&self, table: Table) -> Result<Table> {
        let _write_guard = self.write_lock.lock();

        table.validate()?;
        let mut catalog = self.catalog.write();
        let (tables, relations) = (catalog.tables().clone(), catalog.relations().clone());
        let previous = catalog.replace(table.clone())?;

        let name = table.name.as_str();
        let dropped = {
            let mut shard = self.storage.lock_table(name);
            shard.load().and_then(|_| shard.drop_table(name))
        };
        if let Err(e) = dropped {
            if let Err(restore_err) = catalog.restore(tables, relations) {
                tracing::error!(
                    "Failed to restore catalog after replacing {}: {}",
                    name,
                    restore_err
                );
            }
            return Err(e);
        }
        drop(catalog);
        self.cache.lock().retain(|(t, _)| t != name);

        tracing::info!(
            "Replaced table {} (existed before: {})",
            table.name,
            previous.is_some()
        );
        Ok(table)
    }

    /// Definition of `table`
    pub fn schema(&self, table: &str) -> Result<Table> {
        self.catalog.read().get(table).cloned()
    }

    /// Declared table names, sorted
    pub fn tables(&self) -> Vec<String> {
        self.catalog.read().names()
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Insert a row naming every column of `table`; returns the new id
    pub fn add(&self, table: &str, row: Row) -> Result<RecordId> {
        let _write_guard = self.write_lock.lock();

        let schema = self.schema(table)?;
        Self::check_full_row(&schema, &row)?;
        self.insert(&schema, row)
    }

    /// Insert a row given as values in column order; returns the new id
    pub fn add_values(&self, table: &str, values: Vec<Value>) -> Result<RecordId> {
        let _write_guard = self.write_lock.lock();

        let schema = self.schema(table)?;
        if values.len() != schema.columns.len() {
            return Err(ElementalError::schema(format!(
                "table {} has {} columns, got {} values",
                schema.name,
                schema.columns.len(),
                values.len()
            )));
        }
        let row: Row = schema
            .columns
            .iter()
            .map(|c| c.name.clone())
            .zip(values)
            .collect();
        self.insert(&schema, row)
    }

    /// Fetch a record
    ///
    /// Lookup order:
    /// 1. Cache
    /// 2. Index existence check
    /// 3. Shard (buffer, then persisted records)
    pub fn get(&self, table: &str, id: RecordId) -> Result<Record> {
        let key = (table.to_string(), id);
        if let Some(record) = self.cache.lock().get(&key) {
            return Ok(record);
        }

        if !self.catalog.read().contains(table) {
            return Err(ElementalError::not_found(format!("table {}", table)));
        }

        let mut shard = self.storage.lock_table(table);
        shard.load()?;
        match shard.find(table, id) {
            Some(record) => {
                self.cache.lock().insert(key, record.clone());
                Ok(record)
            }
            None => Err(Self::missing_record(table, id)),
        }
    }

    /// Every record of `table`, ascending by id
    pub fn get_all(&self, table: &str) -> Result<Vec<Record>> {
        if !self.catalog.read().contains(table) {
            return Err(ElementalError::not_found(format!("table {}", table)));
        }

        let mut shard = self.storage.lock_table(table);
        shard.load()?;
        Ok(shard.scan(table))
    }

    /// Replace some field values of a record; returns the updated record
    pub fn update(&self, table: &str, id: RecordId, changes: Row) -> Result<Record> {
        let _write_guard = self.write_lock.lock();

        let schema = self.schema(table)?;
        if changes.is_empty() {
            return Err(ElementalError::schema("update needs at least one column"));
        }
        if let Some(column) = changes.keys().find(|c| !schema.has_column(c)) {
            return Err(ElementalError::schema(format!(
                "table {} has no column {}",
                schema.name, column
            )));
        }
        self.check_foreign_keys(&schema, &changes)?;

        let mut shard = self.storage.lock_table(table);
        shard.load()?;
        match shard.update(table, id, &changes)? {
            Some(record) => {
                self.cache.lock().remove(&(table.to_string(), id));
                tracing::debug!("Updated {}#{}", table, id);
                Ok(record)
            }
            None => Err(Self::missing_record(table, id)),
        }
    }

    /// Delete a record, applying the relation policy of its table
    ///
    /// The full set of rows to remove is planned first; a `restrict`
    /// relation anywhere in the cascade fails the call with
    /// `ForeignKeyViolation` before anything is removed.
    pub fn delete(&self, table: &str, id: RecordId) -> Result<DeleteOutcome> {
        let _write_guard = self.write_lock.lock();

        let catalog = self.catalog.read();
        catalog.get(table)?;
        {
            let mut shard = self.storage.lock_table(table);
            shard.load()?;
            if !shard.contains(table, id) {
                return Err(Self::missing_record(table, id));
            }
        }

        let mut rows = ShardRows {
            storage: &self.storage,
        };
        let plan = catalog
            .relations()
            .plan_delete(catalog.tables(), table, id, &mut rows)?;
        drop(catalog);

        let mut by_table: BTreeMap<&str, Vec<RecordId>> = BTreeMap::new();
        for (t, row_id) in &plan {
            by_table.entry(t.as_str()).or_default().push(*row_id);
        }

        for (t, ids) in by_table {
            let mut shard = self.storage.lock_table(t);
            shard.load()?;
            shard.remove(t, &ids)?;
            let mut cache = self.cache.lock();
            for row_id in &ids {
                cache.remove(&(t.to_string(), *row_id));
            }
        }

        tracing::debug!("Deleted {}#{} ({} rows removed)", table, id, plan.len());
        Ok(DeleteOutcome { removed: plan })
    }

    // =========================================================================
    // Relations
    // =========================================================================

    /// Declare that rows of `to` reference rows of `from`
    ///
    /// Replaces any earlier relation whose source is `from`.
    pub fn declare_relation(&self, from: &str, to: &str, on_delete: DeletePolicy) -> Result<Relation> {
        let _write_guard = self.write_lock.lock();

        let relation = Relation::new(from, to, on_delete);
        if let Some(previous) = self.catalog.write().declare_relation(relation.clone())? {
            tracing::info!("Relation {} replaced by {}", previous, relation);
        } else {
            tracing::info!("Declared relation {}", relation);
        }
        Ok(relation)
    }

    /// Outgoing relation of `from`, if declared
    pub fn relation(&self, from: &str) -> Option<Relation> {
        self.catalog.read().relations().get(from).cloned()
    }

    // =========================================================================
    // Durability
    // =========================================================================

    /// Flush every shard's buffer to disk; returns records written
    pub fn flush(&self) -> Result<usize> {
        let _write_guard = self.write_lock.lock();

        let flushed = self.storage.flush_all()?;
        if flushed > 0 {
            tracing::info!("Flushed {} buffered records", flushed);
        }
        Ok(flushed)
    }

    /// Flush a single shard
    pub fn flush_shard(&self, id: ShardId) -> Result<usize> {
        let _write_guard = self.write_lock.lock();
        self.storage.flush_shard(id)
    }

    /// Create a shard's container file if it does not exist yet
    pub fn ensure_shard(&self, id: ShardId) -> Result<()> {
        self.storage.ensure_shard(id)
    }

    /// Close the engine gracefully
    ///
    /// Flushes every shard and re-persists the catalog. Buffered records
    /// not flushed here are lost.
    pub fn close(self) -> Result<()> {
        self.shutdown()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the shard directory path
    pub fn shard_dir(&self) -> PathBuf {
        self.storage.shard_dir().to_path_buf()
    }

    pub fn shard_count(&self) -> usize {
        self.storage.shard_count()
    }

    /// Shard `table` routes to
    pub fn shard_for(&self, table: &str) -> ShardId {
        self.storage.shard_for(table)
    }

    /// Records accepted but not yet flushed
    pub fn buffered_len(&self) -> usize {
        self.storage.buffered_len()
    }

    /// Records currently cached
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Corrupt shards reset since open
    pub fn shard_recoveries(&self) -> u64 {
        self.storage.recoveries()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Assign an id and buffer the record (caller holds the write lock)
    fn insert(&self, schema: &Table, row: Row) -> Result<RecordId> {
        self.check_foreign_keys(schema, &row)?;

        let table = schema.name.as_str();
        let mut shard = self.storage.lock_table(table);
        shard.load()?;

        let id = shard.allocate_id(table);
        let record = Record::new(id, row);
        let full = shard.push(table, record.clone());
        self.cache.lock().insert((table.to_string(), id), record);
        tracing::debug!("Added {}#{}", table, id);

        if full {
            // The record is accepted either way; a failed batch stays
            // buffered for the next flush
            match shard.flush() {
                Ok(flushed) => tracing::debug!("Batch flush of {}: {} records", shard.id(), flushed),
                Err(e) => tracing::error!("Batch flush of {} failed: {}", shard.id(), e),
            }
        }

        Ok(id)
    }

    /// Row must name exactly the declared columns
    fn check_full_row(schema: &Table, row: &Row) -> Result<()> {
        if row.contains_key("id") {
            return Err(ElementalError::schema("id is assigned by the engine"));
        }
        if let Some(column) = row.keys().find(|c| !schema.has_column(c)) {
            return Err(ElementalError::schema(format!(
                "table {} has no column {}",
                schema.name, column
            )));
        }
        let missing: Vec<&str> = schema
            .column_names()
            .into_iter()
            .filter(|c| !row.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            return Err(ElementalError::schema(format!(
                "table {} row is missing columns {:?}",
                schema.name, missing
            )));
        }
        Ok(())
    }

    /// Every non-null foreign-key value in `fields` must name a live row
    fn check_foreign_keys(&self, schema: &Table, fields: &Row) -> Result<()> {
        for (column, target) in &schema.foreign_keys {
            let Some(value) = fields.get(column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let Some(ref_id) = value.as_id() else {
                return Err(ElementalError::ForeignKeyViolation(format!(
                    "{}.{} = {} is not a record id",
                    schema.name, column, value
                )));
            };
            if !self.catalog.read().contains(target) {
                return Err(ElementalError::not_found(format!(
                    "table {} referenced by {}.{}",
                    target, schema.name, column
                )));
            }

            let mut shard = self.storage.lock_table(target);
            shard.load()?;
            if !shard.contains(target, ref_id) {
                return Err(ElementalError::ForeignKeyViolation(format!(
                    "{}.{} = {} does not exist in {}",
                    schema.name, column, ref_id, target
                )));
            }
        }
        Ok(())
    }

    fn missing_record(table: &str, id: RecordId) -> ElementalError {
        ElementalError::not_found(format!("record {}#{}", table, id))
    }

    fn shutdown(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let _write_guard = self.write_lock.lock();

        let flushed = self.storage.flush_all()?;
        self.catalog.read().persist()?;
        self.closed.store(true, Ordering::SeqCst);

        tracing::info!(
            "Closed ElementalDB at {} ({} records flushed)",
            self.config.data_dir.display(),
            flushed
        );
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("Flush on drop failed, buffered records may be lost: {}", e);
        }
    }
}

/// Scans shards for rows referencing a deleted row
struct ShardRows<'a> {
    storage: &'a StorageManager,
}

impl RowSource for ShardRows<'_> {
    fn referencing_rows(
        &mut self,
        table: &str,
        columns: &[String],
        id: RecordId,
    ) -> Result<Vec<RecordId>> {
        let mut shard = self.storage.lock_table(table);
        shard.load()?;
        Ok(shard
            .scan(table)
            .into_iter()
            .filter(|r| r.references(columns, id))
            .map(|r| r.id)
            .collect())
    }
}
