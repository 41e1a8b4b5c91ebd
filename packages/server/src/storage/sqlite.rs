//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! One table per record type in the catalog, generated from its
//! [`RecordSchema`]: an `INTEGER PRIMARY KEY AUTOINCREMENT` column named `pk`
//! followed by one column per field. Required fields are `NOT NULL`; foreign
//! keys are declared `REFERENCES <table>(pk) ON DELETE CASCADE` and enforced
//! with `PRAGMA foreign_keys = ON`.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use portfolio::{
    models::CATALOG, types::DATETIME_FORMAT, FieldKind, FieldValue, Predicate, Record,
    RecordSchema, Row, PRIMARY_KEY,
};
use rusqlite::{params, Connection, ErrorCode};

use super::{Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn column_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text | FieldKind::DateTime => "TEXT",
        FieldKind::Integer | FieldKind::Boolean | FieldKind::ForeignKey(_) => "INTEGER",
        FieldKind::Float => "REAL",
    }
}

/// `CREATE TABLE IF NOT EXISTS` statements for every schema in `catalog`.
fn schema_sql(catalog: &[&RecordSchema]) -> String {
    let mut sql = String::from("PRAGMA foreign_keys = ON;\n");
    for schema in catalog {
        let mut columns = vec![format!("\"{PRIMARY_KEY}\" INTEGER PRIMARY KEY AUTOINCREMENT")];
        for field in schema.fields {
            let mut column = format!("\"{}\" {}", field.name, column_type(field.kind));
            if field.required {
                column.push_str(" NOT NULL");
            }
            if let FieldKind::ForeignKey(target) = field.kind {
                column.push_str(&format!(
                    " REFERENCES \"{target}\"(\"{PRIMARY_KEY}\") ON DELETE CASCADE"
                ));
            }
            columns.push(column);
        }
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n);\n",
            schema.table,
            columns.join(",\n    ")
        ));
    }
    sql
}

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(&schema_sql(CATALOG))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Error conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
            StorageError::Validation(msg.unwrap_or_else(|| err.to_string()))
        }
        other => StorageError::Internal(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

/// Borrowed [`FieldValue`] bound as a statement parameter.
struct SqlParam<'a>(&'a FieldValue);

impl rusqlite::ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value};
        let value = match self.0 {
            FieldValue::Null => Value::Null,
            FieldValue::Text(s) => Value::Text(s.clone()),
            FieldValue::Integer(i) => Value::Integer(*i),
            FieldValue::Boolean(b) => Value::Integer(i64::from(*b)),
            FieldValue::Float(f) => Value::Real(*f),
            FieldValue::DateTime(d) => Value::Text(d.format(DATETIME_FORMAT).to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

fn read_value(row: &rusqlite::Row<'_>, idx: usize, kind: FieldKind) -> rusqlite::Result<FieldValue> {
    let value = match kind {
        FieldKind::Text => row.get::<_, Option<String>>(idx)?.map(FieldValue::Text),
        FieldKind::Integer | FieldKind::ForeignKey(_) => {
            row.get::<_, Option<i64>>(idx)?.map(FieldValue::Integer)
        }
        FieldKind::Boolean => row.get::<_, Option<bool>>(idx)?.map(FieldValue::Boolean),
        FieldKind::Float => row.get::<_, Option<f64>>(idx)?.map(FieldValue::Float),
        FieldKind::DateTime => match row.get::<_, Option<String>>(idx)? {
            Some(s) => Some(FieldValue::DateTime(
                NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        idx,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
            )),
            None => None,
        },
    };
    Ok(value.unwrap_or(FieldValue::Null))
}

/// Read `pk` followed by every schema field, in schema order.
fn read_record(schema: &RecordSchema, row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let pk: i64 = row.get(0)?;
    let mut values = Row::new();
    for (i, field) in schema.fields.iter().enumerate() {
        values.insert(field.name.to_string(), read_value(row, i + 1, field.kind)?);
    }
    Ok(Record::new(pk, values))
}

fn select_sql(schema: &RecordSchema) -> String {
    let mut columns = vec![format!("\"{PRIMARY_KEY}\"")];
    columns.extend(schema.fields.iter().map(|f| format!("\"{}\"", f.name)));
    format!("SELECT {} FROM \"{}\"", columns.join(", "), schema.table)
}

/// ` WHERE "a" = ?1 AND "b" = ?2`, or nothing when there are no predicates.
fn where_sql(predicates: &[Predicate]) -> String {
    if predicates.is_empty() {
        return String::new();
    }
    let clauses: Vec<String> = predicates
        .iter()
        .enumerate()
        .map(|(i, p)| format!("\"{}\" = ?{}", p.column, i + 1))
        .collect();
    format!(" WHERE {}", clauses.join(" AND "))
}

fn bind(predicates: &[Predicate]) -> Vec<SqlParam<'_>> {
    predicates.iter().map(|p| SqlParam(&p.value)).collect()
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    async fn create(
        &self,
        schema: &'static RecordSchema,
        row: Row,
    ) -> Result<Record, StorageError> {
        self.with_conn(move |conn| {
            let values: Vec<FieldValue> = schema
                .fields
                .iter()
                .map(|f| row.get(f.name).cloned().unwrap_or(FieldValue::Null))
                .collect();

            let sql = if values.is_empty() {
                format!("INSERT INTO \"{}\" DEFAULT VALUES", schema.table)
            } else {
                let columns: Vec<String> =
                    schema.fields.iter().map(|f| format!("\"{}\"", f.name)).collect();
                let placeholders: Vec<String> =
                    (1..=values.len()).map(|i| format!("?{i}")).collect();
                format!(
                    "INSERT INTO \"{}\" ({}) VALUES ({})",
                    schema.table,
                    columns.join(", "),
                    placeholders.join(", ")
                )
            };

            let bound: Vec<SqlParam<'_>> = values.iter().map(SqlParam).collect();
            conn.execute(&sql, rusqlite::params_from_iter(bound.iter()))
                .map_err(map_err)?;
            let pk = conn.last_insert_rowid();

            let stored = schema
                .fields
                .iter()
                .zip(values)
                .map(|(f, v)| (f.name.to_string(), v))
                .collect();
            Ok(Record::new(pk, stored))
        })
        .await
    }

    async fn get(
        &self,
        schema: &'static RecordSchema,
        pk: i64,
    ) -> Result<Option<Record>, StorageError> {
        self.with_conn(move |conn| {
            let sql = format!("{} WHERE \"{PRIMARY_KEY}\" = ?1", select_sql(schema));
            let result = conn.query_row(&sql, params![pk], |row| read_record(schema, row));
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(map_err(e)),
            }
        })
        .await
    }

    async fn filter(
        &self,
        schema: &'static RecordSchema,
        predicates: &[Predicate],
    ) -> Result<Vec<Record>, StorageError> {
        let predicates = predicates.to_vec();

        self.with_conn(move |conn| {
            let sql = format!(
                "{}{} ORDER BY \"{PRIMARY_KEY}\" ASC",
                select_sql(schema),
                where_sql(&predicates)
            );
            let mut stmt = conn.prepare(&sql).map_err(map_err)?;
            let records = stmt
                .query_map(rusqlite::params_from_iter(bind(&predicates).iter()), |row| {
                    read_record(schema, row)
                })
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(records)
        })
        .await
    }

    async fn delete(&self, schema: &'static RecordSchema, pk: i64) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let sql = format!("DELETE FROM \"{}\" WHERE \"{PRIMARY_KEY}\" = ?1", schema.table);
            let affected = conn.execute(&sql, params![pk]).map_err(map_err)?;
            Ok(affected > 0)
        })
        .await
    }

    async fn delete_matching(
        &self,
        schema: &'static RecordSchema,
        predicates: &[Predicate],
    ) -> Result<u64, StorageError> {
        let predicates = predicates.to_vec();

        self.with_conn(move |conn| {
            // The affected count leaves out rows removed by ON DELETE CASCADE.
            let sql = format!("DELETE FROM \"{}\"{}", schema.table, where_sql(&predicates));
            let affected = conn
                .execute(&sql, rusqlite::params_from_iter(bind(&predicates).iter()))
                .map_err(map_err)?;
            Ok(affected as u64)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use portfolio::models::{ADDRESS, COUNTRY, REGION};

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.into())
    }

    fn row(pairs: &[(&str, FieldValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn generated_schema_declares_constraints() {
        let sql = schema_sql(&[&REGION]);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"region\""));
        assert!(sql.contains("\"name\" TEXT NOT NULL"));
        assert!(sql.contains(
            "\"country\" INTEGER NOT NULL REFERENCES \"country\"(\"pk\") ON DELETE CASCADE"
        ));
    }

    #[tokio::test]
    async fn create_and_get() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let created = s.create(&COUNTRY, row(&[("name", text("Canada"))])).await.unwrap();
        assert_eq!(created.pk, 1);

        let got = s.get(&COUNTRY, created.pk).await.unwrap().unwrap();
        assert_eq!(got, created);
        assert!(s.get(&COUNTRY, 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dangling_foreign_key_is_a_validation_error() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let err = s
            .create(
                &REGION,
                row(&[
                    ("name", text("Ontario")),
                    ("region_type", text("PR")),
                    ("country", FieldValue::Integer(7)),
                ]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn missing_required_column_is_a_validation_error() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let err = s
            .create(&ADDRESS, row(&[("building_number", FieldValue::Integer(1))]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn filter_and_delete_matching() {
        let s = SqliteStorage::open_in_memory().unwrap();
        for n in ["Canada", "Mexico", "Canada"] {
            s.create(&COUNTRY, row(&[("name", text(n))])).await.unwrap();
        }
        let canada = [Predicate {
            column: "name",
            value: text("Canada"),
        }];

        let found = s.filter(&COUNTRY, &canada).await.unwrap();
        assert_eq!(found.iter().map(|r| r.pk).collect::<Vec<_>>(), vec![1, 3]);

        assert_eq!(s.delete_matching(&COUNTRY, &canada).await.unwrap(), 2);
        let rest = s.filter(&COUNTRY, &[]).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].get("name"), Some(&text("Mexico")));
    }

    #[tokio::test]
    async fn delete_cascades_to_referencing_rows() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let country = s.create(&COUNTRY, row(&[("name", text("Peru"))])).await.unwrap();
        s.create(
            &REGION,
            row(&[
                ("name", text("Cusco")),
                ("region_type", text("RE")),
                ("country", FieldValue::Integer(country.pk)),
            ]),
        )
        .await
        .unwrap();

        assert!(s.delete(&COUNTRY, country.pk).await.unwrap());
        assert!(!s.delete(&COUNTRY, country.pk).await.unwrap());
        assert!(s.filter(&REGION, &[]).await.unwrap().is_empty());
    }
}
