//! The `PersonStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! The query controller in `roster-query` depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  live::LiveQuery,
  person::{Person, PersonId},
};

/// Abstraction over a durable person store.
///
/// Every mutation wakes every open [`LiveQuery`] produced by this store once
/// the write is durable. Uniqueness of `document_id` is not enforced here;
/// callers check with the count queries before writing.
///
/// All methods return `Send` futures so the trait can be used from tasks
/// spawned on a multi-threaded runtime.
pub trait PersonStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Live reads ────────────────────────────────────────────────────────

  /// Every person, ascending by `full_name`, re-emitted after each write.
  fn get_all(&self) -> LiveQuery<Self::Error>;

  /// Every person whose `full_name` or `document_id` contains `query`
  /// (case-sensitive; `%` and `_` inside `query` act as SQL `LIKE` wildcards),
  /// ascending by `full_name`, re-emitted after each write.
  fn search(&self, query: &str) -> LiveQuery<Self::Error>;

  // ── Point reads ───────────────────────────────────────────────────────

  fn get_by_id(
    &self,
    id: PersonId,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Look a person up by document id. If duplicates slipped in, any one of
  /// them is returned.
  fn get_by_document_id<'a>(
    &'a self,
    document_id: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Create a person and return it with its assigned id.
  ///
  /// An unset id gets a fresh one. A caller-supplied id that is already taken
  /// is an error; use [`upsert`](Self::upsert) to replace instead.
  fn insert(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Create a person, replacing any existing row with the same id.
  fn upsert(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Overwrite the row with `person.id`. A missing id is a silent no-op.
  fn update(
    &self,
    person: Person,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove the row with `person.id`. A missing id is a silent no-op.
  fn delete<'a>(
    &'a self,
    person: &'a Person,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Uniqueness checks ─────────────────────────────────────────────────

  /// Number of persons holding `document_id`.
  fn count_with_document_id<'a>(
    &'a self,
    document_id: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Number of persons other than `excluding` holding `document_id`.
  fn count_with_document_id_excluding<'a>(
    &'a self,
    document_id: &'a str,
    excluding: PersonId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;
}
