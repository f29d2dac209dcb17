//! Mapping between [`Person`] and `persons` rows.
//!
//! Every column is plain text except `id`, which is the SQLite rowid.

use roster_core::{Person, PersonId};

/// Column list shared by every `SELECT` so [`person_from_row`] can rely on
/// positions.
pub const PERSON_COLUMNS: &str =
  "id, full_name, document_id, phone, address, district, civil_status";

pub fn person_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Person> {
  Ok(Person {
    id:           PersonId::new(row.get(0)?),
    full_name:    row.get(1)?,
    document_id:  row.get(2)?,
    phone:        row.get(3)?,
    address:      row.get(4)?,
    district:     row.get(5)?,
    civil_status: row.get(6)?,
  })
}

/// `NULL` for an unset id so SQLite assigns the next one.
pub fn encode_id(id: PersonId) -> Option<i64> {
  (!id.is_unset()).then_some(id.get())
}

/// Wrap a search term in `%` for `LIKE`. Wildcards inside `query` are passed
/// through unescaped.
pub fn like_pattern(query: &str) -> String { format!("%{query}%") }
