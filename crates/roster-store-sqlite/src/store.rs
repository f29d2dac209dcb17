//! [`SqliteStore`] — the SQLite implementation of [`PersonStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tokio::sync::watch;

use roster_core::{ChangeFeed, LiveQuery, Person, PersonId, PersonStore};

use crate::{
  Error, Result,
  encode::{PERSON_COLUMNS, encode_id, like_pattern, person_from_row},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A person store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and change feed are
/// reference-counted, and every clone wakes the same live queries.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  feed: ChangeFeed,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, feed: ChangeFeed::new() };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened person store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, feed: ChangeFeed::new() };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Subscribe to the write counter that drives this store's live queries.
  pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
    self.feed.subscribe()
  }

  /// One snapshot of every person, ascending by name.
  pub async fn list_all(&self) -> Result<Vec<Person>> {
    let persons = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons ORDER BY full_name ASC"
        ))?;
        let rows = stmt
          .query_map([], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(persons)
  }

  /// One snapshot of the persons matching `query`, ascending by name.
  pub async fn search_once(&self, query: &str) -> Result<Vec<Person>> {
    let pattern = like_pattern(query);

    let persons = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS} FROM persons
           WHERE full_name LIKE ?1 OR document_id LIKE ?1
           ORDER BY full_name ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern], person_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(persons)
  }

  /// Write a person with `INSERT OR IGNORE` or `INSERT OR REPLACE`,
  /// returning the id SQLite settled on, or `None` if the row was ignored.
  async fn write_person(&self, person: &Person, replace: bool) -> Result<Option<PersonId>> {
    let verb = if replace { "INSERT OR REPLACE" } else { "INSERT OR IGNORE" };
    let sql = format!(
      "{verb} INTO persons (
         id, full_name, document_id, phone, address, district, civil_status
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    );

    let id           = encode_id(person.id);
    let full_name    = person.full_name.clone();
    let document_id  = person.document_id.clone();
    let phone        = person.phone.clone();
    let address      = person.address.clone();
    let district     = person.district.clone();
    let civil_status = person.civil_status.clone();

    let written = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          &sql,
          rusqlite::params![
            id,
            full_name,
            document_id,
            phone,
            address,
            district,
            civil_status,
          ],
        )?;
        Ok((changed > 0).then(|| conn.last_insert_rowid()))
      })
      .await?;

    if written.is_some() {
      self.feed.notify();
    }
    tracing::trace!(replace, written = written.is_some(), "write person");
    Ok(written.map(PersonId::new))
  }

  async fn count(&self, document_id: &str, excluding: Option<PersonId>) -> Result<u64> {
    let document_id = document_id.to_owned();
    let excluding   = excluding.map(PersonId::get);

    let count: i64 = self
      .conn
      .call(move |conn| {
        let count = match excluding {
          Some(id) => conn.query_row(
            "SELECT COUNT(*) FROM persons WHERE document_id = ?1 AND id != ?2",
            rusqlite::params![document_id, id],
            |r| r.get(0),
          )?,
          None => conn.query_row(
            "SELECT COUNT(*) FROM persons WHERE document_id = ?1",
            rusqlite::params![document_id],
            |r| r.get(0),
          )?,
        };
        Ok(count)
      })
      .await?;

    Ok(count.max(0) as u64)
  }
}

// ─── PersonStore impl ────────────────────────────────────────────────────────

impl PersonStore for SqliteStore {
  type Error = Error;

  // ── Live reads ────────────────────────────────────────────────────────────

  fn get_all(&self) -> LiveQuery<Error> {
    let store = self.clone();
    LiveQuery::new(self.feed.subscribe(), move || {
      let store = store.clone();
      async move { store.list_all().await }
    })
  }

  fn search(&self, query: &str) -> LiveQuery<Error> {
    let store = self.clone();
    let query = query.to_owned();
    LiveQuery::new(self.feed.subscribe(), move || {
      let store = store.clone();
      let query = query.clone();
      async move { store.search_once(&query).await }
    })
  }

  // ── Point reads ───────────────────────────────────────────────────────────

  async fn get_by_id(&self, id: PersonId) -> Result<Option<Person>> {
    let raw_id = id.get();

    let person = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1"),
            rusqlite::params![raw_id],
            person_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(person)
  }

  async fn get_by_document_id(&self, document_id: &str) -> Result<Option<Person>> {
    let document_id = document_id.to_owned();

    let person = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PERSON_COLUMNS} FROM persons WHERE document_id = ?1 LIMIT 1"
            ),
            rusqlite::params![document_id],
            person_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(person)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn insert(&self, person: Person) -> Result<Person> {
    match self.write_person(&person, false).await? {
      Some(id) => Ok(person.with_id(id)),
      None => Err(Error::IdTaken(person.id)),
    }
  }

  async fn upsert(&self, person: Person) -> Result<Person> {
    // REPLACE always writes a row, so the id is always present.
    let id = self.write_person(&person, true).await?.unwrap_or(person.id);
    Ok(person.with_id(id))
  }

  async fn update(&self, person: Person) -> Result<()> {
    let id           = person.id.get();
    let full_name    = person.full_name;
    let document_id  = person.document_id;
    let phone        = person.phone;
    let address      = person.address;
    let district     = person.district;
    let civil_status = person.civil_status;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE persons SET
             full_name = ?2, document_id = ?3, phone = ?4,
             address = ?5, district = ?6, civil_status = ?7
           WHERE id = ?1",
          rusqlite::params![
            id,
            full_name,
            document_id,
            phone,
            address,
            district,
            civil_status,
          ],
        )?)
      })
      .await?;

    tracing::trace!(id, changed, "update");
    self.feed.notify();
    Ok(())
  }

  async fn delete(&self, person: &Person) -> Result<()> {
    let id = person.id.get();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM persons WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    tracing::trace!(id, changed, "delete");
    self.feed.notify();
    Ok(())
  }

  // ── Uniqueness checks ─────────────────────────────────────────────────────

  async fn count_with_document_id(&self, document_id: &str) -> Result<u64> {
    self.count(document_id, None).await
  }

  async fn count_with_document_id_excluding(
    &self,
    document_id: &str,
    excluding: PersonId,
  ) -> Result<u64> {
    self.count(document_id, Some(excluding)).await
  }
}
