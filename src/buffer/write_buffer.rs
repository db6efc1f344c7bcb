//! Write buffer implementation
//!
//! Vec-backed queue; a shard's buffer rarely exceeds the batch size so
//! linear lookups are cheap.

use crate::record::{Record, RecordId};

/// A record waiting to be flushed
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedRecord {
    pub table: String,
    pub record: Record,
}

/// Pending records for one shard
#[derive(Debug)]
pub struct WriteBuffer {
    entries: Vec<BufferedRecord>,
    threshold: usize,
}

impl WriteBuffer {
    /// Create an empty buffer that reports full at `threshold` records
    pub fn new(threshold: usize) -> Self {
        Self {
            entries: Vec::new(),
            threshold: threshold.max(1),
        }
    }

    /// Append a record (insertion order is preserved)
    pub fn push(&mut self, table: &str, record: Record) {
        self.entries.push(BufferedRecord {
            table: table.to_string(),
            record,
        });
    }

    pub fn get(&self, table: &str, id: RecordId) -> Option<&Record> {
        self.entries
            .iter()
            .find(|e| e.table == table && e.record.id == id)
            .map(|e| &e.record)
    }

    pub fn get_mut(&mut self, table: &str, id: RecordId) -> Option<&mut Record> {
        self.entries
            .iter_mut()
            .find(|e| e.table == table && e.record.id == id)
            .map(|e| &mut e.record)
    }

    /// Remove a buffered record; returns whether it was present
    pub fn remove(&mut self, table: &str, id: RecordId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.table == table && e.record.id == id));
        self.entries.len() != before
    }

    /// Drop every buffered record of `table`
    pub fn remove_table(&mut self, table: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.table != table);
        before - self.entries.len()
    }

    /// Buffered records of `table`, in insertion order
    pub fn records_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Record> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.table == table)
            .map(|e| &e.record)
    }

    /// All buffered records, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &BufferedRecord> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the batch threshold is reached
    pub fn should_flush(&self) -> bool {
        self.entries.len() >= self.threshold
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Clear all entries (after a successful flush)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
