//! Statement text synthesis
//!
//! Table names are trusted and interpolated verbatim inside double quotes.
//! Column names are bracket-quoted and must already have passed
//! [`crate::validate::is_valid_column_name`].

/// Issued on a writable connection right before it is closed
pub const OPTIMIZE: &str = "PRAGMA optimize";

pub fn select_all(table: &str) -> String {
    format!("SELECT * FROM \"{}\"", table)
}

pub fn select_ids(table: &str) -> String {
    format!("SELECT [id] FROM \"{}\"", table)
}

/// Insert-or-update keyed on `[id]`; one `:column` placeholder per column
pub fn upsert(table: &str, columns: &[&str]) -> String {
    let names = columns
        .iter()
        .map(|c| format!("[{}]", c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = columns
        .iter()
        .map(|c| format!(":{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let assignments = columns
        .iter()
        .map(|c| format!("[{c}]=excluded.[{c}]"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({}) ON CONFLICT([id]) DO UPDATE SET {}",
        table, names, placeholders, assignments
    )
}

/// Delete the rows whose `[id]` appears in the JSON array bound to `:ids`,
/// plus the rows with a NULL `[id]` when `with_null` is set
pub fn delete_ids(table: &str, with_null: bool) -> String {
    let null_clause = if with_null { " OR [id] IS NULL" } else { "" };
    format!(
        "DELETE FROM \"{}\" WHERE [id] IN (SELECT value FROM json_each(:ids)){}",
        table, null_clause
    )
}
