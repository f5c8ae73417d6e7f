//! Primary-key derivation for in-memory records

use crate::{Error, Result};
use crate::record::{KeySource, Record};

/// Derive the collection key of a record.
///
/// The accessor is preferred when the schema declares one; otherwise (or if
/// the accessor yields nothing) the `id` attribute is stringified.
pub fn derive_key<R: Record>(item: &R, source: KeySource) -> Result<String> {
    if source == KeySource::Accessor {
        if let Some(key) = item.primary_key() {
            return Ok(key);
        }
    }
    item.attribute("id")
        .map(|id| id.to_string())
        .ok_or_else(|| Error::NonExistentPrimaryKeyAccessor(item.type_name().to_string()))
}
