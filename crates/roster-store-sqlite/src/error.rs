//! Error type for `roster-store-sqlite`.

use roster_core::PersonId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The database could not be opened, read or written. Not retried.
  #[error("storage failure: {0}")]
  Storage(#[from] tokio_rusqlite::Error),

  /// A strict insert named an id that is already present.
  #[error("person id {0} is already taken")]
  IdTaken(PersonId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
