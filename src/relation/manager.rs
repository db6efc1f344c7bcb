//! Relation Manager
//!
//! Holds the declared relations and plans what a delete must remove.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::catalog::Table;
use crate::error::{ElementalError, Result};
use crate::record::RecordId;

use super::{DeletePolicy, Relation};

/// Read access to rows, needed to find referencing rows while planning
pub trait RowSource {
    /// Ids of rows in `table` where any of `columns` references `id`
    fn referencing_rows(
        &mut self,
        table: &str,
        columns: &[String],
        id: RecordId,
    ) -> Result<Vec<RecordId>>;
}

/// Declared relations, keyed by source table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationManager {
    by_source: BTreeMap<String, Relation>,
}

impl RelationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted relations
    pub fn from_relations(relations: impl IntoIterator<Item = Relation>) -> Self {
        let mut manager = Self::new();
        for relation in relations {
            manager.declare(relation);
        }
        manager
    }

    /// Record `relation`, returning the one it replaced
    pub fn declare(&mut self, relation: Relation) -> Option<Relation> {
        self.by_source.insert(relation.from.clone(), relation)
    }

    /// Outgoing relation of `from`
    pub fn get(&self, from: &str) -> Option<&Relation> {
        self.by_source.get(from)
    }

    /// Forget every relation touching `table`
    pub fn remove_involving(&mut self, table: &str) -> usize {
        let before = self.by_source.len();
        self.by_source
            .retain(|_, r| r.from != table && r.to != table);
        before - self.by_source.len()
    }

    pub fn all(&self) -> Vec<Relation> {
        self.by_source.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    /// Every (table, id) deleting `table`/`id` must remove, target first
    ///
    /// Walks relations breadth-first. Nothing is mutated: a `Restrict`
    /// relation with referencing rows anywhere in the chain fails the whole
    /// plan with `ForeignKeyViolation`. Rows already in the plan are not
    /// revisited, so cyclic relations terminate and a row referencing
    /// itself does not block its own delete.
    pub fn plan_delete<S: RowSource>(
        &self,
        tables: &BTreeMap<String, Table>,
        table: &str,
        id: RecordId,
        source: &mut S,
    ) -> Result<Vec<(String, RecordId)>> {
        let mut plan = vec![(table.to_string(), id)];
        let mut visited: HashSet<(String, RecordId)> = plan.iter().cloned().collect();
        let mut queue: VecDeque<(String, RecordId)> = plan.iter().cloned().collect();

        while let Some((parent, parent_id)) = queue.pop_front() {
            let Some(relation) = self.by_source.get(&parent) else {
                continue;
            };
            let Some(child) = tables.get(&relation.to) else {
                continue;
            };
            let columns = child.columns_referencing(&parent);
            if columns.is_empty() {
                continue;
            }

            let children: Vec<RecordId> = source
                .referencing_rows(&relation.to, &columns, parent_id)?
                .into_iter()
                .filter(|c| !visited.contains(&(relation.to.clone(), *c)))
                .collect();
            if children.is_empty() {
                continue;
            }

            match relation.on_delete {
                DeletePolicy::Restrict => {
                    return Err(ElementalError::ForeignKeyViolation(format!(
                        "cannot delete {}#{}: referenced by {} row(s) of {} (restrict)",
                        parent,
                        parent_id,
                        children.len(),
                        relation.to
                    )));
                }
                DeletePolicy::Cascade => {
                    for child_id in children {
                        let key = (relation.to.clone(), child_id);
                        if visited.insert(key.clone()) {
                            plan.push(key.clone());
                            queue.push_back(key);
                        }
                    }
                }
            }
        }

        Ok(plan)
    }
}
