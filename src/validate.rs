//! Record-shape validation ahead of SQL synthesis
//!
//! Attribute names are interpolated into generated statements, so they must
//! pass [`is_valid_column_name`] before any statement text is built.

use crate::{Error, Result};
use crate::record::{Record, Schema};
use regex::Regex;
use std::sync::OnceLock;

static COLUMN_NAME: OnceLock<Regex> = OnceLock::new();

fn column_name_pattern() -> &'static Regex {
    COLUMN_NAME.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid column name pattern"))
}

pub fn is_valid_column_name(name: &str) -> bool {
    column_name_pattern().is_match(name)
}

/// Check one record against the store's schema
pub fn validate<R: Record>(item: &R, schema: &Schema) -> Result<()> {
    let attributes = item.attributes();
    if attributes.is_empty() {
        return Err(Error::ItemNotObject);
    }
    if item.type_name() != schema.type_name() {
        return Err(Error::ItemClass(schema.type_name().to_string()));
    }
    if !attributes.iter().all(|(name, _)| is_valid_column_name(name)) {
        return Err(Error::InvalidColumnNames);
    }
    let same_shape = attributes.len() == schema.columns().len()
        && attributes.iter().zip(schema.column_names()).all(|((a, _), b)| *a == b);
    if !same_shape {
        return Err(Error::ItemClass(schema.type_name().to_string()));
    }
    Ok(())
}

/// Check every record of a snapshot, stopping at the first failure
pub fn validate_all<'a, R: Record + 'a>(items: impl IntoIterator<Item = &'a R>, schema: &Schema) -> Result<()> {
    for item in items {
        validate(item, schema)?;
    }
    Ok(())
}
