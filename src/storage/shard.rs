//! Shard
//!
//! One shard file plus the in-memory state derived from it: the loaded
//! persisted content, the write buffer, the per-table primary-key indexes
//! and the per-table id counters.
//!
//! ## Lifecycle
//! - Created unloaded; the first operation loads (or creates) the file
//! - A file that fails to decode is reset to empty, persisted, and logged
//! - Every persisted mutation builds the next content, writes it
//!   atomically, and only then swaps it in, so a failed write leaves the
//!   shard exactly as it was

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::buffer::WriteBuffer;
use crate::error::{ElementalError, Result};
use crate::index::BTreeIndex;
use crate::record::{Record, RecordId, Row};

use super::codec::{decode_shard, encode_shard, ShardData};
use super::file::write_atomic;
use super::ShardId;

/// A shard and its derived state
#[derive(Debug)]
pub struct Shard {
    id: ShardId,
    path: PathBuf,
    sync_writes: bool,
    index_degree: usize,

    /// Persisted content, valid once `loaded`
    data: ShardData,
    loaded: bool,

    /// Accepted, not yet flushed
    buffer: WriteBuffer,

    /// Built lazily per table, never persisted
    indexes: HashMap<String, BTreeIndex>,

    /// Next id per table, seeded on first allocation
    next_ids: HashMap<String, RecordId>,

    /// Times this shard was reset after a decode failure
    recoveries: u64,
}

impl Shard {
    pub fn new(
        id: ShardId,
        path: impl Into<PathBuf>,
        batch_size: usize,
        index_degree: usize,
        sync_writes: bool,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            sync_writes,
            index_degree,
            data: ShardData::default(),
            loaded: false,
            buffer: WriteBuffer::new(batch_size),
            indexes: HashMap::new(),
            next_ids: HashMap::new(),
            recoveries: 0,
        }
    }

    /// Load the shard file, creating an empty one on first use
    ///
    /// A file that fails to decode is reset to an empty shard. Nothing is
    /// buffered before the first load, so the reset can never drop
    /// buffered records.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        if !self.path.exists() {
            self.data = ShardData::default();
            self.write(&self.data)?;
            tracing::debug!("Created empty {} at {}", self.id, self.path.display());
        } else {
            let bytes = fs::read(&self.path)?;
            match decode_shard(self.id, &bytes) {
                Ok(data) => {
                    tracing::debug!(
                        "Loaded {} ({} tables, {} bytes)",
                        self.id,
                        data.tables.len(),
                        bytes.len()
                    );
                    self.data = data;
                }
                Err(ElementalError::CorruptShard { reason, .. }) => {
                    tracing::warn!(
                        "{} is corrupt ({}); resetting to empty, its persisted records are lost",
                        self.id,
                        reason
                    );
                    self.data = ShardData::default();
                    self.write(&self.data)?;
                    self.recoveries += 1;
                }
                Err(e) => return Err(e),
            }
        }

        self.indexes.clear();
        self.next_ids.clear();
        self.loaded = true;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Whether `id` is a live record of `table`
    ///
    /// The index answers first; a positive answer is re-checked against the
    /// buffer and persisted records because deletes leave dangling ids in
    /// the index.
    pub fn contains(&mut self, table: &str, id: RecordId) -> bool {
        self.index_mut(table).search(id) && self.lookup(table, id).is_some()
    }

    /// Fetch a live record
    pub fn find(&mut self, table: &str, id: RecordId) -> Option<Record> {
        if !self.index_mut(table).search(id) {
            return None;
        }
        self.lookup(table, id).cloned()
    }

    /// All live records of `table`, ascending by id
    pub fn scan(&self, table: &str) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .data
            .tables
            .get(table)
            .map(|t| t.records.clone())
            .unwrap_or_default();
        records.extend(self.buffer.records_for(table).cloned());
        records.sort_by_key(|r| r.id);
        records
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Reserve the next id of `table`
    pub fn allocate_id(&mut self, table: &str) -> RecordId {
        let data = &self.data;
        let buffer = &self.buffer;
        let next = self
            .next_ids
            .entry(table.to_string())
            .or_insert_with(|| Self::seed_next_id(data, buffer, table));
        let id = *next;
        *next += 1;
        id
    }

    /// Buffer a new record; returns true once the batch threshold is reached
    pub fn push(&mut self, table: &str, record: Record) -> bool {
        self.index_mut(table).insert(record.id);
        self.buffer.push(table, record);
        self.buffer.should_flush()
    }

    /// Replace field values of a live record
    ///
    /// Buffered records are edited in place; persisted ones are rewritten
    /// to disk immediately. Returns `None` if the record does not exist.
    pub fn update(&mut self, table: &str, id: RecordId, changes: &Row) -> Result<Option<Record>> {
        if !self.index_mut(table).search(id) {
            return Ok(None);
        }

        if let Some(record) = self.buffer.get_mut(table, id) {
            apply_changes(record, changes);
            return Ok(Some(record.clone()));
        }

        let mut next = self.data.clone();
        let updated = match next.tables.get_mut(table) {
            Some(t) => match t.position(id) {
                Some(pos) => {
                    apply_changes(&mut t.records[pos], changes);
                    t.records[pos].clone()
                }
                None => return Ok(None),
            },
            None => return Ok(None),
        };

        self.commit(next)?;
        Ok(Some(updated))
    }

    /// Remove records of `table` from the buffer and the shard file
    ///
    /// Returns how many of `ids` were live.
    pub fn remove(&mut self, table: &str, ids: &[RecordId]) -> Result<usize> {
        let mut next = self.data.clone();
        let mut persisted_removed = 0;
        if let Some(t) = next.tables.get_mut(table) {
            let before = t.records.len();
            t.records.retain(|r| !ids.contains(&r.id));
            persisted_removed = before - t.records.len();
        }

        if persisted_removed > 0 {
            self.commit(next)?;
        }

        let buffered_removed = ids
            .iter()
            .filter(|id| self.buffer.remove(table, **id))
            .count();

        Ok(persisted_removed + buffered_removed)
    }

    /// Discard a table's records, index and id counter
    pub fn drop_table(&mut self, table: &str) -> Result<()> {
        // Forget the counter first so commit does not stamp it back
        let counter = self.next_ids.remove(table);
        if self.data.tables.contains_key(table) {
            let mut next = self.data.clone();
            next.tables.remove(table);
            if let Err(e) = self.commit(next) {
                if let Some(next_id) = counter {
                    self.next_ids.insert(table.to_string(), next_id);
                }
                return Err(e);
            }
        }
        self.indexes.remove(table);
        let dropped = self.buffer.remove_table(table);
        tracing::debug!("Dropped table {} from {} ({} buffered)", table, self.id, dropped);
        Ok(())
    }

    /// Merge the buffer into the persisted sequences and write the shard
    ///
    /// Records are merged in insertion order by insertion sort on id. The
    /// buffer is cleared only after the write succeeded. An empty buffer
    /// writes nothing unless an id counter moved past its persisted value
    /// (ids allocated to records deleted before they were flushed), in which
    /// case the counters alone are persisted. Returns the number of records
    /// flushed.
    pub fn flush(&mut self) -> Result<usize> {
        self.load()?;
        if self.buffer.is_empty() {
            if self.counters_ahead() {
                self.commit(self.data.clone())?;
                tracing::debug!("Persisted id counters of {}", self.id);
            }
            return Ok(0);
        }

        let mut next = self.data.clone();
        for entry in self.buffer.iter() {
            next.tables
                .entry(entry.table.clone())
                .or_default()
                .insert_sorted(entry.record.clone());
        }

        self.commit(next)?;

        let flushed = self.buffer.len();
        self.buffer.clear();
        tracing::debug!("Flushed {} records to {}", flushed, self.id);
        Ok(flushed)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> ShardId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Records waiting for the next flush
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }

    /// Persisted content (empty until loaded)
    pub fn persisted(&self) -> &ShardData {
        &self.data
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Index of `table`, rebuilt from persisted and buffered ids on first use
    fn index_mut(&mut self, table: &str) -> &mut BTreeIndex {
        let degree = self.index_degree;
        let data = &self.data;
        let buffer = &self.buffer;
        self.indexes.entry(table.to_string()).or_insert_with(|| {
            let persisted = data
                .tables
                .get(table)
                .into_iter()
                .flat_map(|t| t.records.iter().map(|r| r.id));
            let buffered = buffer.records_for(table).map(|r| r.id);
            let index = BTreeIndex::rebuild(degree, persisted.chain(buffered));
            tracing::trace!("Rebuilt index for {} ({} ids)", table, index.len());
            index
        })
    }

    fn lookup(&self, table: &str, id: RecordId) -> Option<&Record> {
        if let Some(record) = self.buffer.get(table, id) {
            return Some(record);
        }
        let t = self.data.tables.get(table)?;
        t.position(id).map(|pos| &t.records[pos])
    }

    fn seed_next_id(data: &ShardData, buffer: &WriteBuffer, table: &str) -> RecordId {
        let persisted = data
            .tables
            .get(table)
            .map(|t| {
                let after_last = t.records.last().map_or(1, |r| r.id + 1);
                t.next_id.max(after_last)
            })
            .unwrap_or(1);
        let buffered = buffer
            .records_for(table)
            .map(|r| r.id + 1)
            .max()
            .unwrap_or(1);
        persisted.max(buffered)
    }

    /// Whether any table's id counter is ahead of the persisted one
    fn counters_ahead(&self) -> bool {
        self.next_ids.iter().any(|(table, next_id)| {
            self.data
                .tables
                .get(table)
                .map_or(true, |t| t.next_id < *next_id)
        })
    }

    /// Stamp id counters into `next`, write it, then adopt it
    fn commit(&mut self, mut next: ShardData) -> Result<()> {
        for (table, next_id) in &self.next_ids {
            let t = next.tables.entry(table.clone()).or_default();
            t.next_id = t.next_id.max(*next_id);
        }
        self.write(&next)?;
        self.data = next;
        Ok(())
    }

    fn write(&self, data: &ShardData) -> Result<()> {
        let bytes = encode_shard(data)?;
        write_atomic(&self.path, &bytes, self.sync_writes)
    }
}

fn apply_changes(record: &mut Record, changes: &Row) {
    for (column, value) in changes {
        record.fields.insert(column.clone(), value.clone());
    }
}
