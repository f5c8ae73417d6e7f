//! SQLite-backed table mirrors

use std::ops::{Deref, DerefMut};
use std::path::Path;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};
use crate::{Error, Result};
use crate::collection::Collection;
use crate::key::derive_key;
use crate::record::{DynamicRecord, KeySource, Record, Row, Schema, TypedRecord};
use super::lifecycle::{Closable, Loader, Persister};
use super::reconcile::{reconcile, ReconcileReport};
use super::sql;

/// State shared by both store variants: the connection, the mirrored table
/// and the in-memory records
struct Mirror<R> {
    conn: Connection,
    table: String,
    schema: Schema,
    key_source: KeySource,
    items: Collection<R>,
}

impl<R: Record> Mirror<R> {
    fn new(conn: Connection, table: String, schema: Schema) -> Result<Self> {
        let key_source = schema.validate()?;
        Ok(Self {
            conn,
            table,
            schema,
            key_source,
            items: Collection::new(),
        })
    }

    fn load(&mut self) -> Result<usize> {
        match self.fetch() {
            Ok(rows) => {
                let count = rows.len();
                for (key, item) in rows {
                    self.items.save(key, item);
                }
                info!(table = %self.table, rows = count, "loaded table");
                Ok(count)
            }
            Err(e) => {
                self.items.clear();
                Err(e)
            }
        }
    }

    fn fetch(&self) -> Result<Vec<(String, R)>> {
        let text = sql::select_all(&self.table);
        debug!(sql = %text, "loading rows");
        let mut stmt = self.conn.prepare(&text).map_err(Error::query)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query([]).map_err(Error::query)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().map_err(Error::query)? {
            let raw = Row::from_sqlite(row, &names).map_err(Error::query)?;
            let item = R::from_row(&raw, &self.schema)?;
            let key = derive_key(&item, self.key_source)?;
            items.push((key, item));
        }
        Ok(items)
    }
}

fn open_connection(path: &Path, flags: OpenFlags) -> Result<Connection> {
    Connection::open_with_flags(path, flags).map_err(Error::query)
}

/// Read-write mirror: persisting reconciles the table with memory
pub struct SqlStore<R> {
    mirror: Mirror<R>,
}

impl<R: Record> SqlStore<R> {
    /// Bind a store to a connection, table and record schema.
    ///
    /// Fails when the schema describes no record or offers no way to obtain
    /// a primary key. No query is issued.
    pub fn new(conn: Connection, table: impl Into<String>, schema: Schema) -> Result<Self> {
        Ok(Self {
            mirror: Mirror::new(conn, table.into(), schema)?,
        })
    }

    /// Open (creating if needed) a database file
    pub fn open(path: &Path, table: impl Into<String>, schema: Schema) -> Result<Self> {
        Self::new(open_connection(path, OpenFlags::default())?, table, schema)
    }

    pub fn table(&self) -> &str {
        &self.mirror.table
    }

    pub fn schema(&self) -> &Schema {
        &self.mirror.schema
    }

    pub fn connection(&self) -> &Connection {
        &self.mirror.conn
    }

    pub fn load(&mut self) -> Result<usize> {
        self.mirror.load()
    }

    /// Upsert every in-memory record, then delete rows no longer in memory.
    ///
    /// On any failure the in-memory collection is cleared before the error
    /// is returned.
    pub fn persist(&mut self) -> Result<ReconcileReport> {
        let mirror = &mut self.mirror;
        let snapshot: Vec<&R> = mirror.items.values().collect();
        let outcome = reconcile(&mirror.conn, &mirror.table, &mirror.schema, mirror.key_source, &snapshot);
        match outcome {
            Ok(report) => {
                if report != ReconcileReport::default() {
                    info!(table = %mirror.table, %report, "persisted table");
                }
                Ok(report)
            }
            Err(e) => {
                mirror.items.clear();
                Err(e)
            }
        }
    }

    /// Hint the query planner, then release the connection
    pub fn close(self) -> Result<()> {
        let Mirror { conn, table, .. } = self.mirror;
        if let Err(e) = conn.execute_batch(sql::OPTIMIZE) {
            warn!(table = %table, error = %e, "optimize before close failed");
        }
        conn.close().map_err(|(_, e)| Error::statement(e))
    }
}

impl<R: TypedRecord> SqlStore<R> {
    pub fn for_record(conn: Connection, table: impl Into<String>) -> Result<Self> {
        Self::new(conn, table, R::schema())
    }
}

impl SqlStore<DynamicRecord> {
    /// Mirror a table whose shape is read from the database itself
    pub fn open_table(path: &Path, table: &str) -> Result<Self> {
        let conn = open_connection(path, OpenFlags::default())?;
        let schema = Schema::from_table(&conn, table)?;
        Self::new(conn, table, schema)
    }
}

/// Read-only mirror: persisting never touches the table
pub struct ReadOnlySqlStore<R> {
    mirror: Mirror<R>,
}

impl<R: Record> ReadOnlySqlStore<R> {
    pub fn new(conn: Connection, table: impl Into<String>, schema: Schema) -> Result<Self> {
        Ok(Self {
            mirror: Mirror::new(conn, table.into(), schema)?,
        })
    }

    /// Open a database file with a read-only connection
    pub fn open(path: &Path, table: impl Into<String>, schema: Schema) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::new(open_connection(path, flags)?, table, schema)
    }

    pub fn table(&self) -> &str {
        &self.mirror.table
    }

    pub fn schema(&self) -> &Schema {
        &self.mirror.schema
    }

    pub fn connection(&self) -> &Connection {
        &self.mirror.conn
    }

    pub fn load(&mut self) -> Result<usize> {
        self.mirror.load()
    }

    pub fn persist(&mut self) -> Result<ReconcileReport> {
        Ok(ReconcileReport::default())
    }

    pub fn close(self) -> Result<()> {
        self.mirror.conn.close().map_err(|(_, e)| Error::statement(e))
    }
}

impl<R: TypedRecord> ReadOnlySqlStore<R> {
    pub fn for_record(conn: Connection, table: impl Into<String>) -> Result<Self> {
        Self::new(conn, table, R::schema())
    }
}

impl ReadOnlySqlStore<DynamicRecord> {
    pub fn open_table(path: &Path, table: &str) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = open_connection(path, flags)?;
        let schema = Schema::from_table(&conn, table)?;
        Self::new(conn, table, schema)
    }
}

macro_rules! mirror_facets {
    ($store:ident) => {
        impl<R> Deref for $store<R> {
            type Target = Collection<R>;

            fn deref(&self) -> &Collection<R> {
                &self.mirror.items
            }
        }

        impl<R> DerefMut for $store<R> {
            fn deref_mut(&mut self) -> &mut Collection<R> {
                &mut self.mirror.items
            }
        }

        impl<R: Record> Loader for $store<R> {
            fn load(&mut self) -> Result<usize> {
                $store::load(self)
            }
        }

        impl<R: Record> Persister for $store<R> {
            fn persist(&mut self) -> Result<ReconcileReport> {
                $store::persist(self)
            }
        }

        impl<R: Record> Closable for $store<R> {
            fn close(self) -> Result<()> {
                $store::close(self)
            }
        }
    };
}

mirror_facets!(SqlStore);
mirror_facets!(ReadOnlySqlStore);
