//! Core types and trait definitions for the roster person store.
//!
//! This crate is deliberately free of database and CLI dependencies. The
//! storage backend (`roster-store-sqlite`) and the query controller
//! (`roster-query`) both depend on it.

pub mod district;
pub mod live;
pub mod person;
pub mod store;

pub use live::{ChangeFeed, LiveQuery};
pub use person::{Person, PersonId};
pub use store::PersonStore;
