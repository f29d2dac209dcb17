//! Generation-tagged publishing for the filtered view.
//!
//! Every search text change opens a new text generation, and every time the
//! driver re-evaluates the filter it restarts the current one. Searches
//! started for an older generation may still finish, but their results are
//! dropped: the generation check and the send happen under the same lock, so
//! once [`Publisher::begin_text`] returns no older result can land.

use std::sync::Mutex;

use tokio::sync::watch;

#[derive(Debug, Default)]
struct Generations {
  /// Generation opened by the latest search text change.
  text:    u64,
  /// Generation allowed to publish.
  current: u64,
}

pub(crate) struct Publisher<T> {
  generations: Mutex<Generations>,
  tx:          watch::Sender<T>,
}

impl<T> Publisher<T> {
  pub(crate) fn new(tx: watch::Sender<T>) -> Self {
    Self { generations: Mutex::default(), tx }
  }

  /// Record a search text change, superseding every earlier generation.
  /// Returns the text generation to hand to the driver.
  pub(crate) fn begin_text(&self) -> u64 {
    let mut generations = self.lock();
    generations.current += 1;
    generations.text = generations.current;
    generations.text
  }

  /// Open a fresh generation for a re-evaluation of text generation `text`.
  ///
  /// Returns `None` if a newer search text has been set since, in which case
  /// the caller is about to be woken for it anyway.
  pub(crate) fn restart(&self, text: u64) -> Option<u64> {
    let mut generations = self.lock();
    if generations.text != text {
      return None;
    }
    generations.current += 1;
    Some(generations.current)
  }

  /// Publish `value` if `generation` is still current. Returns whether it was
  /// published.
  pub(crate) fn publish(&self, generation: u64, value: T) -> bool {
    let generations = self.lock();
    if generations.current != generation {
      return false;
    }
    self.tx.send_replace(value);
    true
  }

  pub(crate) fn subscribe(&self) -> watch::Receiver<T> { self.tx.subscribe() }

  fn lock(&self) -> std::sync::MutexGuard<'_, Generations> {
    // Plain counters; a panic elsewhere cannot leave them inconsistent.
    self.generations.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
