//! [`PersonController`] — search state, live views and write pass-through.

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};

use roster_core::{LiveQuery, Person, PersonId, PersonStore};

use crate::publish::Publisher;

/// An immutable list of persons shared between observers.
///
/// When the search text is blank the filtered view publishes the very same
/// `Arc` as the full view, so observers can tell with [`Arc::ptr_eq`].
pub type Snapshot = Arc<Vec<Person>>;

type Failure<E> = Arc<watch::Sender<Option<Arc<E>>>>;

/// A search text together with the generation opened when it was set.
#[derive(Debug, Clone, Default)]
struct SearchRequest {
  generation: u64,
  text:       String,
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// Mediates between a store's live queries and a single search string.
///
/// Two background tasks run for the controller's lifetime: one mirrors
/// [`PersonStore::get_all`] into [`all_records`](Self::all_records), the other
/// re-evaluates [`filtered_records`](Self::filtered_records) whenever the
/// search text or the full list changes. Dropping the controller stops both,
/// along with any search subscription in flight.
///
/// Must be created inside a tokio runtime.
pub struct PersonController<S: PersonStore> {
  store:       Arc<S>,
  search_text: watch::Sender<String>,
  requests:    watch::Sender<SearchRequest>,
  all:         Arc<watch::Sender<Snapshot>>,
  filtered:    Arc<Publisher<Snapshot>>,
  failure:     Failure<S::Error>,
  _tasks:      [AbortOnDrop; 2],
}

impl<S> PersonController<S>
where
  S: PersonStore + 'static,
{
  pub fn new(store: Arc<S>) -> Self {
    let empty = Snapshot::default();
    let (all_tx, _) = watch::channel(empty.clone());
    let (filtered_tx, _) = watch::channel(empty);
    let (text_tx, _) = watch::channel(String::new());
    let (requests_tx, requests_rx) = watch::channel(SearchRequest::default());
    let (failure_tx, _) = watch::channel(None);

    let all = Arc::new(all_tx);
    let filtered = Arc::new(Publisher::new(filtered_tx));
    let failure = Arc::new(failure_tx);

    let mirror = tokio::spawn(mirror_all(store.get_all(), all.clone(), failure.clone()));
    let driver = tokio::spawn(drive_filter(
      store.clone(),
      requests_rx,
      all.subscribe(),
      filtered.clone(),
      failure.clone(),
    ));

    Self {
      store,
      search_text: text_tx,
      requests: requests_tx,
      all,
      filtered,
      failure,
      _tasks: [AbortOnDrop(mirror), AbortOnDrop(driver)],
    }
  }

  // ── Observables ───────────────────────────────────────────────────────────

  pub fn search_text(&self) -> watch::Receiver<String> { self.search_text.subscribe() }

  /// Every person, ascending by name. Starts empty until the store's first
  /// snapshot arrives.
  pub fn all_records(&self) -> watch::Receiver<Snapshot> { self.all.subscribe() }

  /// The persons matching the current search text, ascending by name.
  pub fn filtered_records(&self) -> watch::Receiver<Snapshot> { self.filtered.subscribe() }

  /// The error that stopped a live subscription, if any.
  pub fn storage_failure(&self) -> watch::Receiver<Option<Arc<S::Error>>> {
    self.failure.subscribe()
  }

  // ── Search ────────────────────────────────────────────────────────────────

  /// Replace the search text. The effect shows up on
  /// [`filtered_records`](Self::filtered_records).
  ///
  /// Once this returns, no result of a search for an earlier text can be
  /// published, even one whose query already finished.
  pub fn set_search_text(&self, text: impl Into<String>) {
    let text = text.into();
    self.requests.send_modify(|request| {
      request.generation = self.filtered.begin_text();
      request.text.clone_from(&text);
    });
    self.search_text.send_replace(text);
  }

  // ── Pass-through operations ───────────────────────────────────────────────

  /// Persist a new person. Does not check document-id uniqueness; call
  /// [`is_document_id_unique`](Self::is_document_id_unique) first.
  pub async fn create(&self, person: Person) -> Result<Person, S::Error> {
    self.store.insert(person).await
  }

  /// Overwrite an existing person. Same caveat as [`create`](Self::create).
  pub async fn update(&self, person: Person) -> Result<(), S::Error> {
    self.store.update(person).await
  }

  pub async fn delete(&self, person: &Person) -> Result<(), S::Error> {
    self.store.delete(person).await
  }

  pub async fn get_by_id(&self, id: PersonId) -> Result<Option<Person>, S::Error> {
    self.store.get_by_id(id).await
  }

  /// `true` if no other person holds `document_id`.
  ///
  /// Pass the id of the person being edited as `excluding` so an unchanged
  /// document id does not collide with itself. The answer can go stale before
  /// the following write; the store has no uniqueness constraint.
  pub async fn is_document_id_unique(
    &self,
    document_id: &str,
    excluding: Option<PersonId>,
  ) -> Result<bool, S::Error> {
    let count = match excluding {
      Some(id) => self.store.count_with_document_id_excluding(document_id, id).await?,
      None => self.store.count_with_document_id(document_id).await?,
    };
    Ok(count == 0)
  }
}

// ─── Background tasks ────────────────────────────────────────────────────────

/// Aborts the task when dropped, including when the owning task is itself
/// aborted.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
  fn drop(&mut self) { self.0.abort(); }
}

/// Copy every snapshot of the full list into `all`.
async fn mirror_all<E>(
  mut live: LiveQuery<E>,
  all: Arc<watch::Sender<Snapshot>>,
  failure: Failure<E>,
) where
  E: std::error::Error + Send + Sync + 'static,
{
  while let Some(result) = live.next().await {
    match result {
      Ok(persons) => {
        all.send_replace(Arc::new(persons));
      }
      Err(e) => {
        tracing::error!(error = %e, "record list subscription failed");
        failure.send_replace(Some(Arc::new(e)));
        return;
      }
    }
  }
}

/// Re-evaluate the filtered view on every change to the search text or the
/// full list.
async fn drive_filter<S>(
  store: Arc<S>,
  mut requests: watch::Receiver<SearchRequest>,
  mut all: watch::Receiver<Snapshot>,
  filtered: Arc<Publisher<Snapshot>>,
  failure: Failure<S::Error>,
) where
  S: PersonStore + 'static,
{
  let mut search: Option<AbortOnDrop> = None;

  loop {
    let request = requests.borrow_and_update().clone();
    let current = all.borrow_and_update().clone();

    drop(search.take());

    // `None` means a newer text is already queued behind this one.
    if let Some(generation) = filtered.restart(request.generation) {
      if request.text.trim().is_empty() {
        filtered.publish(generation, current);
      } else {
        tracing::debug!(generation, query = %request.text, "re-issuing search");
        search = Some(AbortOnDrop(tokio::spawn(pump_search(
          store.search(&request.text),
          generation,
          filtered.clone(),
          failure.clone(),
        ))));
      }
    }

    tokio::select! {
      changed = requests.changed() => {
        if changed.is_err() {
          break;
        }
      }
      changed = all.changed() => {
        if changed.is_err() {
          break;
        }
      }
    }
  }
}

/// Feed one search subscription into the filtered view until a newer
/// generation supersedes it.
async fn pump_search<E>(
  mut live: LiveQuery<E>,
  generation: u64,
  filtered: Arc<Publisher<Snapshot>>,
  failure: Failure<E>,
) where
  E: std::error::Error + Send + Sync + 'static,
{
  while let Some(result) = live.next().await {
    match result {
      Ok(persons) => {
        if !filtered.publish(generation, Arc::new(persons)) {
          tracing::trace!(generation, "dropping superseded search result");
          return;
        }
      }
      Err(e) => {
        tracing::error!(error = %e, "search subscription failed");
        failure.send_replace(Some(Arc::new(e)));
        return;
      }
    }
  }
}
