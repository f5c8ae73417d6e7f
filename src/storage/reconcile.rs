//! Reconciliation - make a table match an in-memory snapshot
//!
//! Two passes, always in this order:
//! 1. upsert every snapshot record through one prepared statement
//! 2. delete every table row whose `[id]` is not in the snapshot
//!
//! Upserting first means a reader between the passes never misses a record
//! that is present in memory; it may still see rows about to be deleted.
//! Nothing is wrapped in a transaction, so a failure in either pass can leave
//! the table partially updated.

use std::collections::HashSet;
use rusqlite::{Connection, ToSql, named_params};
use serde::Serialize;
use tracing::debug;
use crate::{Error, Result};
use crate::key::derive_key;
use crate::record::{encode, KeySource, Record, Schema};
use crate::validate::validate_all;
use crate::value::Scalar;
use super::sql;

/// Outcome of one reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub upserted: usize,
    pub deleted: usize,
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} upserted, {} deleted", self.upserted, self.deleted)
    }
}

/// Reconcile `table` with `snapshot`.
///
/// An empty snapshot is a no-op: nothing is validated and no statement is
/// prepared. The caller owns the collection and is expected to clear it when
/// this returns an error.
pub fn reconcile<R: Record>(
    conn: &Connection,
    table: &str,
    schema: &Schema,
    key_source: KeySource,
    snapshot: &[&R],
) -> Result<ReconcileReport> {
    if snapshot.is_empty() {
        return Ok(ReconcileReport::default());
    }

    validate_all(snapshot.iter().copied(), schema)?;

    let upserted = upsert_all(conn, table, snapshot)?;
    let deleted = delete_removed(conn, table, key_source, snapshot)?;
    Ok(ReconcileReport { upserted, deleted })
}

fn upsert_all<R: Record>(conn: &Connection, table: &str, snapshot: &[&R]) -> Result<usize> {
    let Some(first) = snapshot.first() else {
        return Ok(0);
    };
    let first = encode(*first);
    let columns: Vec<&str> = first.iter().map(|c| c.column).collect();
    let text = sql::upsert(table, &columns);
    debug!(sql = %text, "preparing upsert");

    let mut stmt = conn.prepare(&text).map_err(Error::statement)?;
    for item in snapshot {
        let encoded = encode(*item);
        let names: Vec<String> = encoded.iter().map(|c| format!(":{}", c.column)).collect();
        let params: Vec<(&str, &dyn ToSql)> = names
            .iter()
            .zip(&encoded)
            .map(|(name, c)| (name.as_str(), &c.value as &dyn ToSql))
            .collect();
        stmt.execute(params.as_slice()).map_err(Error::statement)?;
    }
    Ok(snapshot.len())
}

/// The value compared against the table's `[id]` column
fn persisted_id<R: Record>(item: &R, key_source: KeySource) -> Result<String> {
    match item.attribute("id") {
        Some(id) => Ok(id.to_string()),
        None => derive_key(item, key_source),
    }
}

fn delete_removed<R: Record>(
    conn: &Connection,
    table: &str,
    key_source: KeySource,
    snapshot: &[&R],
) -> Result<usize> {
    let kept = snapshot
        .iter()
        .map(|item| persisted_id(*item, key_source))
        .collect::<Result<HashSet<String>>>()?;

    let mut stmt = conn.prepare(&sql::select_ids(table)).map_err(Error::statement)?;
    let table_ids = stmt
        .query_map([], |row| row.get::<_, Scalar>(0))
        .map_err(Error::statement)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Error::statement)?;

    let removed: Vec<Scalar> = table_ids
        .into_iter()
        .filter(|id| !kept.contains(&id.to_string()))
        .collect();
    if removed.is_empty() {
        return Ok(0);
    }

    // NULL never matches IN, so NULL ids get their own clause
    let with_null = removed.iter().any(Scalar::is_null);
    let removed: Vec<Scalar> = removed.into_iter().filter(|id| !id.is_null()).collect();
    let ids = serde_json::to_string(&removed).map_err(|e| Error::Statement {
        message: e.to_string(),
        code: 0,
    })?;
    debug!(count = removed.len(), with_null, "deleting rows absent from memory");
    conn.execute(&sql::delete_ids(table, with_null), named_params! { ":ids": ids })
        .map_err(Error::statement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::*;
    use crate::record::TypedRecord;

    fn athletes_table() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE "athletes" ([id] TEXT, [name] TEXT, [age] INTEGER, [height] REAL, PRIMARY KEY([id]));
            INSERT INTO "athletes" VALUES ('id1', 'name1', 25, 5.9), ('id2', 'name2', 30, 6.1);
            "#,
        )
        .unwrap();
        conn
    }

    fn ids(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("SELECT [id] FROM \"athletes\" ORDER BY [id]").unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap().map(|r| r.unwrap()).collect();
        rows
    }

    #[test]
    fn test_upsert_updates_and_inserts() {
        let conn = athletes_table();
        let a = athlete("id1", "renamed", 26, 5.9);
        let b = athlete("id2", "name2", 30, 6.1);
        let c = athlete("id3", "name3", 20, 5.5);
        let report = reconcile(&conn, "athletes", &Athlete::schema(), KeySource::IdAttribute, &[&a, &b, &c]).unwrap();

        assert_eq!(report, ReconcileReport { upserted: 3, deleted: 0 });
        assert_eq!(ids(&conn), ["id1", "id2", "id3"]);
        let (name, age): (String, i64) = conn
            .query_row("SELECT name, age FROM athletes WHERE id = 'id1'", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!((name.as_str(), age), ("renamed", 26));
    }

    #[test]
    fn test_rows_absent_from_snapshot_are_deleted() {
        let conn = athletes_table();
        let b = athlete("id2", "name2", 30, 6.1);
        let report = reconcile(&conn, "athletes", &Athlete::schema(), KeySource::IdAttribute, &[&b]).unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(ids(&conn), ["id2"]);
    }

    #[test]
    fn test_integer_ids_are_deleted() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"t\" ([id] INTEGER PRIMARY KEY, [name] TEXT);
             INSERT INTO \"t\" VALUES (1, 'a'), (2, 'b'), (3, 'c');",
        )
        .unwrap();
        let schema = Schema::from_table(&conn, "t").unwrap();
        let keep = crate::DynamicRecord::new("t", vec![("id".into(), Scalar::Integer(2)), ("name".into(), "b".into())]);
        let report = reconcile(&conn, "t", &schema, KeySource::IdAttribute, &[&keep]).unwrap();

        assert_eq!(report.deleted, 2);
        let left: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(left, 1);
    }

    #[test]
    fn test_empty_snapshot_touches_nothing() {
        // No table exists: any prepared statement would fail
        let conn = Connection::open_in_memory().unwrap();
        let snapshot: [&Athlete; 0] = [];
        let report = reconcile(&conn, "missing", &Athlete::schema(), KeySource::IdAttribute, &snapshot).unwrap();
        assert_eq!(report, ReconcileReport::default());
    }

    #[test]
    fn test_prepare_failure_carries_backend_message() {
        let conn = Connection::open_in_memory().unwrap();
        let a = athlete("id1", "name1", 25, 5.9);
        let err = reconcile(&conn, "missing", &Athlete::schema(), KeySource::IdAttribute, &[&a]).unwrap_err();
        assert!(matches!(err, Error::Statement { .. }));
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_execute_failure_is_statement_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE \"athletes\" ([id] TEXT PRIMARY KEY, [name] TEXT, [age] INTEGER CHECK (age < 100), [height] REAL);",
        )
        .unwrap();
        let a = athlete("id1", "name1", 120, 5.9);
        let err = reconcile(&conn, "athletes", &Athlete::schema(), KeySource::IdAttribute, &[&a]).unwrap_err();
        assert!(matches!(err, Error::Statement { .. }));
        assert!(err.to_string().contains("CHECK constraint failed"));
    }

    #[test]
    fn test_duplicate_ids_last_write_wins() {
        let conn = athletes_table();
        let first = athlete("id1", "first", 1, 1.0);
        let second = athlete("id1", "second", 2, 2.0);
        reconcile(&conn, "athletes", &Athlete::schema(), KeySource::IdAttribute, &[&first, &second]).unwrap();
        let name: String = conn
            .query_row("SELECT name FROM athletes WHERE id = 'id1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "second");
    }

    #[test]
    fn test_null_id_rows_are_deleted() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE "people" ([id] TEXT, [name] TEXT, PRIMARY KEY([id]));
            INSERT INTO "people" VALUES ('id1', 'a'), (NULL, 'ghost');
            "#,
        )
        .unwrap();
        let keep = Person::new("id1", "a");
        let report = reconcile(&conn, "people", &Person::schema(), KeySource::Accessor, &[&keep]).unwrap();

        assert_eq!(report, ReconcileReport { upserted: 1, deleted: 1 });
        let left: i64 = conn.query_row("SELECT COUNT(*) FROM people", [], |r| r.get(0)).unwrap();
        assert_eq!(left, 1);
    }

    #[test]
    fn test_persisted_id_prefers_id_attribute() {
        let ticket = Ticket { id: 7, title: "t".into() };
        assert_eq!(persisted_id(&ticket, KeySource::Accessor).unwrap(), "7");

        let badge = Badge { code: "gold".into() };
        assert_eq!(persisted_id(&badge, KeySource::Accessor).unwrap(), "gold");
    }
}
