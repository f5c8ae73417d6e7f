//! Explicit store lifecycle
//!
//! A store is split into three facets. [`Lifecycle`] drives them: opening
//! loads the table, finishing persists and closes. Dropping a lifecycle that
//! was never finished persists nothing.

use std::ops::{Deref, DerefMut};
use tracing::warn;
use crate::Result;
use super::reconcile::ReconcileReport;

/// Fills the in-memory collection from the table
pub trait Loader {
    fn load(&mut self) -> Result<usize>;
}

/// Writes the in-memory collection back to the table
pub trait Persister {
    fn persist(&mut self) -> Result<ReconcileReport>;
}

/// Releases the backend connection
pub trait Closable: Sized {
    fn close(self) -> Result<()>;
}

/// Scoped ownership of a store between `open` and `finish`
pub struct Lifecycle<S: Loader + Persister + Closable> {
    store: Option<S>,
}

impl<S: Loader + Persister + Closable> Lifecycle<S> {
    /// Take ownership of `store` and run the init hook
    pub fn open(mut store: S) -> Result<Self> {
        Self::on_init(&mut store)?;
        Ok(Self { store: Some(store) })
    }

    fn on_init(store: &mut S) -> Result<usize> {
        store.load()
    }

    fn on_destroy(mut store: S) -> Result<ReconcileReport> {
        let report = store.persist()?;
        store.close()?;
        Ok(report)
    }

    /// Run the destroy hook: persist, then close
    pub fn finish(mut self) -> Result<ReconcileReport> {
        match self.store.take() {
            Some(store) => Self::on_destroy(store),
            None => Ok(ReconcileReport::default()),
        }
    }
}

impl<S: Loader + Persister + Closable> Deref for Lifecycle<S> {
    type Target = S;

    fn deref(&self) -> &S {
        // Only `finish` takes the store, and it consumes `self`
        self.store.as_ref().expect("store is held until finish")
    }
}

impl<S: Loader + Persister + Closable> DerefMut for Lifecycle<S> {
    fn deref_mut(&mut self) -> &mut S {
        // Only `finish` takes the store, and it consumes `self`
        self.store.as_mut().expect("store is held until finish")
    }
}

impl<S: Loader + Persister + Closable> Drop for Lifecycle<S> {
    fn drop(&mut self) {
        if self.store.is_some() {
            warn!("store dropped without finish; in-memory changes were not persisted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use rusqlite::Connection;
    use crate::record::fixtures::*;
    use crate::record::TypedRecord;
    use crate::storage::{ReadOnlySqlStore, SqlStore};

    /// Records the order in which hooks are invoked
    struct Recorder {
        calls: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Loader for Recorder {
        fn load(&mut self) -> Result<usize> {
            self.calls.borrow_mut().push("load");
            Ok(0)
        }
    }

    impl Persister for Recorder {
        fn persist(&mut self) -> Result<ReconcileReport> {
            self.calls.borrow_mut().push("persist");
            Ok(ReconcileReport::default())
        }
    }

    impl Closable for Recorder {
        fn close(self) -> Result<()> {
            self.calls.borrow_mut().push("close");
            Ok(())
        }
    }

    #[test]
    fn test_hook_order() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let lifecycle = Lifecycle::open(Recorder { calls: calls.clone() }).unwrap();
        assert_eq!(*calls.borrow(), ["load"]);
        lifecycle.finish().unwrap();
        assert_eq!(*calls.borrow(), ["load", "persist", "close"]);
    }

    #[test]
    fn test_drop_without_finish_does_not_persist() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        drop(Lifecycle::open(Recorder { calls: calls.clone() }).unwrap());
        assert_eq!(*calls.borrow(), ["load"]);
    }

    #[test]
    fn test_read_write_lifecycle_against_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE \"people\" ([id] TEXT, [name] TEXT, PRIMARY KEY([id] ASC));
                 INSERT INTO \"people\" VALUES ('id1', 'name1'), ('id2', 'name2'), ('id3', 'name3');",
            )
            .unwrap();

        let store = SqlStore::<Person>::open(&path, "people", Person::schema()).unwrap();
        let mut lifecycle = Lifecycle::open(store).unwrap();
        assert_eq!(lifecycle.count(), 3);
        lifecycle.remove("id3");
        lifecycle.replace("id1", Person::new("id1", "changed"));
        let report = lifecycle.finish().unwrap();
        assert_eq!(report, ReconcileReport { upserted: 2, deleted: 1 });

        let mut reader = ReadOnlySqlStore::<Person>::open(&path, "people", Person::schema()).unwrap();
        reader.load().unwrap();
        assert_eq!(reader.count(), 2);
        assert_eq!(reader.find("id1").unwrap().name, "changed");
    }

    #[test]
    fn test_read_only_lifecycle_on_read_only_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE \"people\" ([id] TEXT, [name] TEXT, PRIMARY KEY([id] ASC));
                 INSERT INTO \"people\" VALUES ('id1', 'name1');",
            )
            .unwrap();

        let store = ReadOnlySqlStore::<Person>::open(&path, "people", Person::schema()).unwrap();
        let mut lifecycle = Lifecycle::open(store).unwrap();
        lifecycle.replace("id1", Person::new("id1", "replacement_name"));
        lifecycle.finish().unwrap();

        let conn = Connection::open(&path).unwrap();
        let name: String = conn
            .query_row("SELECT [name] FROM \"people\" WHERE [id] = 'id1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "name1");
    }
}
