//! Catalog implementation

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ElementalError, Result};
use crate::relation::{Relation, RelationManager};
use crate::storage::{decode_frame, encode_frame, write_atomic, CATALOG_MAGIC};

use super::Table;

/// On-disk catalog body
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    shard_count: usize,
    tables: BTreeMap<String, Table>,
    relations: Vec<Relation>,
}

/// Table definitions and relations, mirrored to `catalog.db`
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
    sync_writes: bool,
    shard_count: usize,
    tables: BTreeMap<String, Table>,
    relations: RelationManager,
}

impl Catalog {
    /// Load the catalog at `path`, or create an empty one
    ///
    /// Fails with `Config` if the directory was created with a different
    /// shard count: tables would route to the wrong files.
    pub fn open(path: &Path, shard_count: usize, sync_writes: bool) -> Result<Self> {
        if !path.exists() {
            let catalog = Self {
                path: path.to_path_buf(),
                sync_writes,
                shard_count,
                tables: BTreeMap::new(),
                relations: RelationManager::new(),
            };
            catalog.persist()?;
            return Ok(catalog);
        }

        let bytes = fs::read(path)?;
        let body = decode_frame(CATALOG_MAGIC, &bytes).map_err(|reason| {
            ElementalError::Serialization(format!("corrupt catalog {}: {}", path.display(), reason))
        })?;
        let file: CatalogFile = bincode::deserialize(body)
            .map_err(|e| ElementalError::Serialization(format!("catalog decode: {}", e)))?;

        if file.shard_count != shard_count {
            return Err(ElementalError::Config(format!(
                "data directory uses {} shards, configured {}",
                file.shard_count, shard_count
            )));
        }

        tracing::debug!(
            "Loaded catalog: {} tables, {} relations",
            file.tables.len(),
            file.relations.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            sync_writes,
            shard_count,
            tables: file.tables,
            relations: RelationManager::from_relations(file.relations),
        })
    }

    /// Add a new table; fails `AlreadyExists` if the name is taken
    pub fn create(&mut self, table: Table) -> Result<()> {
        table.validate()?;
        if self.tables.contains_key(&table.name) {
            return Err(ElementalError::AlreadyExists(table.name));
        }

        let mut tables = self.tables.clone();
        tables.insert(table.name.clone(), table);
        self.commit(tables, self.relations.clone())
    }

    /// Add or overwrite a table, dropping relations that involve it
    ///
    /// Returns the definition it replaced.
    pub fn replace(&mut self, table: Table) -> Result<Option<Table>> {
        table.validate()?;

        let mut tables = self.tables.clone();
        let mut relations = self.relations.clone();
        relations.remove_involving(&table.name);
        let previous = tables.insert(table.name.clone(), table);

        self.commit(tables, relations)?;
        Ok(previous)
    }

    /// Declare `relation`, replacing any relation of the same source
    ///
    /// Fails `NotFound` if either table is undeclared and `SchemaMismatch`
    /// if `relation.to` has no foreign key referencing `relation.from`.
    pub fn declare_relation(&mut self, relation: Relation) -> Result<Option<Relation>> {
        self.get(&relation.from)?;
        let child = self.get(&relation.to)?;
        if child.columns_referencing(&relation.from).is_empty() {
            return Err(ElementalError::schema(format!(
                "table {} has no foreign key referencing {}",
                relation.to, relation.from
            )));
        }

        let mut relations = self.relations.clone();
        let previous = relations.declare(relation);
        self.commit(self.tables.clone(), relations)?;
        Ok(previous)
    }

    /// Definition of `name`
    pub fn get(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| ElementalError::not_found(format!("table {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names, sorted
    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    pub fn relations(&self) -> &RelationManager {
        &self.relations
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Write the whole catalog to disk
    pub fn persist(&self) -> Result<()> {
        Self::write(&self.path, self.shard_count, &self.tables, &self.relations, self.sync_writes)
    }

    /// Put back a previously captured state, on disk and in memory
    pub(crate) fn restore(
        &mut self,
        tables: BTreeMap<String, Table>,
        relations: RelationManager,
    ) -> Result<()> {
        self.commit(tables, relations)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Persist the next state, then adopt it
    fn commit(&mut self, tables: BTreeMap<String, Table>, relations: RelationManager) -> Result<()> {
        Self::write(&self.path, self.shard_count, &tables, &relations, self.sync_writes)?;
        self.tables = tables;
        self.relations = relations;
        Ok(())
    }

    fn write(
        path: &Path,
        shard_count: usize,
        tables: &BTreeMap<String, Table>,
        relations: &RelationManager,
        sync: bool,
    ) -> Result<()> {
        let file = CatalogFile {
            shard_count,
            tables: tables.clone(),
            relations: relations.all(),
        };
        let body = bincode::serialize(&file)
            .map_err(|e| ElementalError::Serialization(format!("catalog encode: {}", e)))?;
        write_atomic(path, &encode_frame(CATALOG_MAGIC, &body), sync)
    }
}
