//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and throwaway servers.
//!
//! Each table is a [`BTreeMap`] keyed by primary key, so filtering returns
//! records in ascending pk order without sorting. Primary keys come from a
//! per-table counter and are never reused, even after deletes.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use portfolio::{
    models::CATALOG, FieldKind, FieldValue, Predicate, Record, RecordSchema, Row, PRIMARY_KEY,
};

use super::{Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Table {
    rows: BTreeMap<i64, Row>,
    last_pk: i64,
}

struct Inner {
    tables: HashMap<&'static str, Table>,
}

impl Inner {
    fn contains(&self, table: &str, pk: i64) -> bool {
        self.tables
            .get(table)
            .is_some_and(|t| t.rows.contains_key(&pk))
    }

    /// Remove `pk` from `table` along with everything that references it.
    fn remove_cascading(
        &mut self,
        catalog: &[&'static RecordSchema],
        table: &str,
        pk: i64,
    ) -> bool {
        let removed = self
            .tables
            .get_mut(table)
            .and_then(|t| t.rows.remove(&pk))
            .is_some();
        if !removed {
            return false;
        }

        for schema in catalog {
            for field in schema.references_to(table) {
                let target = FieldValue::Integer(pk);
                let dependents: Vec<i64> = self
                    .tables
                    .get(schema.table)
                    .map(|t| {
                        t.rows
                            .iter()
                            .filter(|(_, row)| row.get(field.name) == Some(&target))
                            .map(|(pk, _)| *pk)
                            .collect()
                    })
                    .unwrap_or_default();
                for dependent in dependents {
                    self.remove_cascading(catalog, schema.table, dependent);
                }
            }
        }
        true
    }
}

fn matches(pk: i64, row: &Row, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| {
        if p.column == PRIMARY_KEY {
            p.value == FieldValue::Integer(pk)
        } else {
            row.get(p.column) == Some(&p.value)
        }
    })
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
    catalog: &'static [&'static RecordSchema],
}

impl MemoryStorage {
    /// Storage for the portfolio's record types.
    pub fn new() -> Self {
        Self::with_catalog(CATALOG)
    }

    /// Storage for an arbitrary set of record types. The catalog is what
    /// delete cascades walk.
    pub fn with_catalog(catalog: &'static [&'static RecordSchema]) -> Self {
        Self {
            inner: RwLock::new(Inner {
                tables: HashMap::new(),
            }),
            catalog,
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    async fn create(
        &self,
        schema: &'static RecordSchema,
        row: Row,
    ) -> Result<Record, StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        for field in schema.fields {
            if field.required && row.get(field.name).map_or(true, FieldValue::is_null) {
                return Err(StorageError::Validation(format!(
                    "{}.{} may not be null",
                    schema.name, field.name
                )));
            }
            let FieldKind::ForeignKey(target) = field.kind else {
                continue;
            };
            if let Some(FieldValue::Integer(pk)) = row.get(field.name) {
                if !inner.contains(target, *pk) {
                    return Err(StorageError::Validation(format!(
                        "{}.{} references {target} {pk}, which does not exist",
                        schema.name, field.name
                    )));
                }
            }
        }

        let table = inner.tables.entry(schema.table).or_default();
        table.last_pk += 1;
        let pk = table.last_pk;
        table.rows.insert(pk, row.clone());
        Ok(Record::new(pk, row))
    }

    async fn get(
        &self,
        schema: &'static RecordSchema,
        pk: i64,
    ) -> Result<Option<Record>, StorageError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .tables
            .get(schema.table)
            .and_then(|t| t.rows.get(&pk))
            .map(|row| Record::new(pk, row.clone())))
    }

    async fn filter(
        &self,
        schema: &'static RecordSchema,
        predicates: &[Predicate],
    ) -> Result<Vec<Record>, StorageError> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let Some(table) = inner.tables.get(schema.table) else {
            return Ok(Vec::new());
        };
        Ok(table
            .rows
            .iter()
            .filter(|(pk, row)| matches(**pk, row, predicates))
            .map(|(pk, row)| Record::new(*pk, row.clone()))
            .collect())
    }

    async fn delete(&self, schema: &'static RecordSchema, pk: i64) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.remove_cascading(self.catalog, schema.table, pk))
    }

    async fn delete_matching(
        &self,
        schema: &'static RecordSchema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let doomed: Vec<i64> = inner
            .tables
            .get(schema.table)
            .map(|t| {
                t.rows
                    .iter()
                    .filter(|(pk, row)| matches(**pk, row, predicates))
                    .map(|(pk, _)| *pk)
                    .collect()
            })
            .unwrap_or_default();

        let mut count = 0;
        for pk in doomed {
            // An earlier cascade may already have taken this row.
            if inner.remove_cascading(self.catalog, schema.table, pk) {
                count += 1;
            }
        }
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
