//! The query controller for the roster person store.
//!
//! [`PersonController`] sits between a [`roster_core::PersonStore`] and a
//! presentation layer. It mirrors the store's full record list, keeps a
//! filtered view in sync with the current search text, and passes writes
//! straight through.

mod controller;
mod publish;

pub use controller::{PersonController, Snapshot};

#[cfg(test)]
mod tests;
