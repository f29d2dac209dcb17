//! Person — the single entity held by the roster.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── PersonId ────────────────────────────────────────────────────────────────

/// Surrogate key assigned by the store on creation.
///
/// [`PersonId::UNSET`] (`0`) marks a person that has not been persisted yet.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(i64);

impl PersonId {
  pub const UNSET: Self = Self(0);

  pub const fn new(raw: i64) -> Self { Self(raw) }

  pub const fn get(self) -> i64 { self.0 }

  pub const fn is_unset(self) -> bool { self.0 == 0 }
}

impl From<i64> for PersonId {
  fn from(raw: i64) -> Self { Self(raw) }
}

impl fmt::Display for PersonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.0, f)
  }
}

// ─── Person ──────────────────────────────────────────────────────────────────

/// A person record.
///
/// Field content is never validated here; required-field and district checks
/// belong to whoever builds the record. `document_id` is expected to be unique
/// across the store, but only callers enforce that (see
/// [`crate::store::PersonStore::count_with_document_id`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:           PersonId,
  pub full_name:    String,
  pub document_id:  String,
  pub phone:        String,
  pub address:      String,
  /// One of the configured district names.
  pub district:     String,
  /// `None` means "not specified".
  pub civil_status: Option<String>,
}

impl Person {
  /// Build an unpersisted person with no civil status.
  pub fn new(
    full_name: impl Into<String>,
    document_id: impl Into<String>,
    phone: impl Into<String>,
    address: impl Into<String>,
    district: impl Into<String>,
  ) -> Self {
    Self {
      id:           PersonId::UNSET,
      full_name:    full_name.into(),
      document_id:  document_id.into(),
      phone:        phone.into(),
      address:      address.into(),
      district:     district.into(),
      civil_status: None,
    }
  }

  pub fn with_civil_status(mut self, status: impl Into<String>) -> Self {
    self.civil_status = Some(status.into());
    self
  }

  pub fn with_id(mut self, id: PersonId) -> Self {
    self.id = id;
    self
  }

  pub fn is_persisted(&self) -> bool { !self.id.is_unset() }
}
