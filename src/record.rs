//! Records - typed in-memory mirrors of table rows
//!
//! A record type describes its shape with a [`Schema`] (ordered columns, a
//! type name and how its primary key is obtained) and converts itself from a
//! [`Row`] and back into an ordered list of `(column, value, type)` triples.

use crate::{Error, Result};
use crate::value::{Scalar, SqlType};
use rusqlite::Connection;

/// A raw table row: column name to scalar, in the order SQLite returned them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, Scalar)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful in tests
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Read a row returned by SQLite, using the statement's column names
    pub fn from_sqlite(row: &rusqlite::Row<'_>, names: &[String]) -> rusqlite::Result<Self> {
        let mut values = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            values.push((name.clone(), row.get::<_, Scalar>(idx)?));
        }
        Ok(Self { values })
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.values.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.values.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, column: &str) -> Result<&Scalar> {
        self.get(column).ok_or_else(|| Error::Decode {
            column: column.to_string(),
            reason: "missing from row".to_string(),
        })
    }

    pub fn text(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            Scalar::Text(s) => Ok(s.clone()),
            // Integer keys are common for TEXT-declared id columns
            Scalar::Integer(i) => Ok(i.to_string()),
            other => Err(mismatch(column, "text", other)),
        }
    }

    pub fn integer(&self, column: &str) -> Result<i64> {
        let value = self.require(column)?;
        value.as_i64().ok_or_else(|| mismatch(column, "integer", value))
    }

    pub fn float(&self, column: &str) -> Result<f64> {
        let value = self.require(column)?;
        value.as_f64().ok_or_else(|| mismatch(column, "float", value))
    }

    pub fn optional_text(&self, column: &str) -> Result<Option<String>> {
        match self.require(column)? {
            Scalar::Null => Ok(None),
            _ => self.text(column).map(Some),
        }
    }
}

fn mismatch(column: &str, expected: &str, found: &Scalar) -> Error {
    Error::Decode {
        column: column.to_string(),
        reason: format!("expected {}, found {:?}", expected, found),
    }
}

/// A named, typed column of a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
}

/// How the in-memory key of a record is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// The record type implements [`Record::primary_key`]
    Accessor,
    /// The record's `id` attribute is used
    IdAttribute,
}

/// Shape descriptor of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    type_name: String,
    columns: Vec<Column>,
    accessor: bool,
}

impl Schema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            columns: Vec::new(),
            accessor: false,
        }
    }

    pub fn column(mut self, name: impl Into<String>, sql_type: SqlType) -> Self {
        self.columns.push(Column { name: name.into(), sql_type });
        self
    }

    /// Declare that records of this type provide their own primary key
    pub fn with_primary_key_accessor(mut self) -> Self {
        self.accessor = true;
        self
    }

    /// Describe a table's rows by reading its declared columns.
    ///
    /// The table name doubles as the type name. A table without columns
    /// (i.e. one that does not exist) is reported as a non-existent type.
    pub fn from_table(conn: &Connection, table: &str) -> Result<Self> {
        let mut stmt = conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(Error::query)?;
        let columns = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let decl: String = row.get(1)?;
                Ok(Column { name, sql_type: SqlType::from_declared(&decl) })
            })
            .map_err(Error::query)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::query)?;

        if columns.is_empty() {
            return Err(Error::NonExistentClass(table.to_string()));
        }
        Ok(Self {
            type_name: table.to_string(),
            columns,
            accessor: false,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check that the schema describes a usable record type and resolve its key source
    pub fn validate(&self) -> Result<KeySource> {
        if self.type_name.is_empty() || self.columns.is_empty() {
            return Err(Error::NonExistentClass(self.type_name.clone()));
        }
        if self.accessor {
            Ok(KeySource::Accessor)
        } else if self.find_column("id").is_some() {
            Ok(KeySource::IdAttribute)
        } else {
            Err(Error::NonExistentPrimaryKeyAccessor(self.type_name.clone()))
        }
    }
}

/// A record mirrored to one table row
pub trait Record: Sized {
    /// Build a record from a row whose columns match the record's attributes
    fn from_row(row: &Row, schema: &Schema) -> Result<Self>;

    /// Name of the record's type, compared against the store's schema
    fn type_name(&self) -> &str;

    /// Attributes in a stable declaration order
    fn attributes(&self) -> Vec<(&str, Scalar)>;

    /// Primary key, for types whose schema declares an accessor
    fn primary_key(&self) -> Option<String> {
        None
    }

    fn attribute(&self, name: &str) -> Option<Scalar> {
        self.attributes()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }
}

/// A record type whose schema is known at compile time
pub trait TypedRecord: Record {
    fn schema() -> Schema;
}

/// One attribute prepared for binding
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedColumn<'a> {
    pub column: &'a str,
    pub value: Scalar,
    pub sql_type: SqlType,
}

/// Enumerate a record's attributes with their SQL type tags
pub fn encode<R: Record>(item: &R) -> Vec<EncodedColumn<'_>> {
    item.attributes()
        .into_iter()
        .map(|(column, value)| EncodedColumn {
            column,
            sql_type: value.sql_type(),
            value,
        })
        .collect()
}

/// A record whose shape is discovered from the table at runtime
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    type_name: String,
    fields: Vec<(String, Scalar)>,
}

impl DynamicRecord {
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, Scalar)>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Overwrite an existing attribute, returning its previous value
    pub fn set(&mut self, name: &str, value: Scalar) -> Result<Scalar> {
        let slot = self
            .fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Decode {
                column: name.to_string(),
                reason: format!("not an attribute of {}", self.type_name),
            })?;
        Ok(std::mem::replace(slot, value))
    }

    pub fn fields(&self) -> &[(String, Scalar)] {
        &self.fields
    }
}

impl Record for DynamicRecord {
    fn from_row(row: &Row, schema: &Schema) -> Result<Self> {
        let mut fields = Vec::with_capacity(schema.columns().len());
        for column in schema.columns() {
            let value = row.get(&column.name).cloned().ok_or_else(|| Error::Decode {
                column: column.name.clone(),
                reason: "missing from row".to_string(),
            })?;
            fields.push((column.name.clone(), value));
        }
        Ok(Self::new(schema.type_name(), fields))
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attributes(&self) -> Vec<(&str, Scalar)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.clone())).collect()
    }
}
