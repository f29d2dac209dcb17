//! Live queries — lazily evaluated, continuously updated result sequences.
//!
//! A store owns one [`ChangeFeed`] and bumps it after every committed write.
//! Each [`LiveQuery`] holds its own subscription to that feed plus a closure
//! that re-runs the underlying query. Nothing runs until the first
//! [`LiveQuery::next`] call.

use std::{future::Future, sync::Arc};

use futures::{Stream, future::BoxFuture, stream};
use tokio::sync::watch;

use crate::person::Person;

// ─── ChangeFeed ──────────────────────────────────────────────────────────────

/// A monotonic write counter shared between a store and its live queries.
///
/// Cloning is cheap; all clones notify the same subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
  tx: Arc<watch::Sender<u64>>,
}

impl ChangeFeed {
  pub fn new() -> Self {
    let (tx, _) = watch::channel(0);
    Self { tx: Arc::new(tx) }
  }

  /// Record that the underlying table changed. Must be called only after the
  /// write is durable, so a query woken by it observes the write.
  pub fn notify(&self) {
    // `send_modify` succeeds even with no live receivers.
    self.tx.send_modify(|version| *version = version.wrapping_add(1));
  }

  /// Number of notifications so far.
  pub fn version(&self) -> u64 { *self.tx.borrow() }

  pub fn subscribe(&self) -> watch::Receiver<u64> { self.tx.subscribe() }
}

impl Default for ChangeFeed {
  fn default() -> Self { Self::new() }
}

// ─── LiveQuery ───────────────────────────────────────────────────────────────

type Fetch<E> =
  Box<dyn FnMut() -> BoxFuture<'static, Result<Vec<Person>, E>> + Send>;

/// An infinite sequence of result snapshots.
///
/// The first [`next`](Self::next) runs the query immediately; each later call
/// waits for a change notification and re-runs it. Notifications that arrive
/// while a query is running collapse into one re-run, so snapshots are never
/// delivered out of order but may skip intermediate states.
pub struct LiveQuery<E> {
  changes: watch::Receiver<u64>,
  fetch:   Fetch<E>,
  primed:  bool,
}

impl<E> LiveQuery<E> {
  /// Build a live query from a change subscription and a closure producing a
  /// fresh snapshot.
  pub fn new<F, Fut>(changes: watch::Receiver<u64>, mut fetch: F) -> Self
  where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<Person>, E>> + Send + 'static,
    E: 'static,
  {
    Self {
      changes,
      fetch: Box::new(move || -> BoxFuture<'static, Result<Vec<Person>, E>> {
        Box::pin(fetch())
      }),
      primed: false,
    }
  }

  /// Wait for the next snapshot.
  ///
  /// Returns `None` only if every handle to the change feed is gone.
  pub async fn next(&mut self) -> Option<Result<Vec<Person>, E>> {
    if self.primed {
      self.changes.changed().await.ok()?;
    } else {
      self.primed = true;
    }
    // Mark the current version seen before querying: any write that lands
    // after this point triggers another round.
    self.changes.borrow_and_update();
    Some((self.fetch)().await)
  }

  /// Adapt into a [`futures::Stream`].
  pub fn into_stream(self) -> impl Stream<Item = Result<Vec<Person>, E>>
  where
    E: Send + 'static,
  {
    stream::unfold(self, |mut query| async move {
      let item = query.next().await?;
      Some((item, query))
    })
  }
}

impl<E> std::fmt::Debug for LiveQuery<E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LiveQuery")
      .field("version", &*self.changes.borrow())
      .field("primed", &self.primed)
      .finish_non_exhaustive()
  }
}
