//! Tests for `PersonController` over an in-memory SQLite store.

use std::{
  collections::{HashMap, HashSet},
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use roster_core::{LiveQuery, Person, PersonId, PersonStore};
use roster_store_sqlite::{Error, SqliteStore};
use tokio::sync::{Notify, watch};

use crate::{PersonController, Snapshot, publish::Publisher};

// ─── Instrumented store ──────────────────────────────────────────────────────

/// Delegates to a [`SqliteStore`], but counts search subscriptions and can
/// hold back, gate or fail the results of chosen queries.
#[derive(Clone)]
struct InstrumentedStore {
  inner:       SqliteStore,
  delays:      Arc<HashMap<String, Duration>>,
  gates:       Arc<HashMap<String, Gate>>,
  failing:     Arc<HashSet<String>>,
  fail_all:    bool,
  searches:    Arc<AtomicUsize>,
  all_fetches: Arc<AtomicUsize>,
}

/// Holds a search result back after its query has run.
#[derive(Clone, Default)]
struct Gate {
  /// Signalled once the query itself has finished.
  fetched: Arc<Notify>,
  /// Lets the finished result through.
  release: Arc<Notify>,
}

fn storage_failure() -> Error { Error::Storage(tokio_rusqlite::Error::ConnectionClosed) }

impl InstrumentedStore {
  async fn new(delays: &[(&str, u64)]) -> Self {
    Self {
      inner:       SqliteStore::open_in_memory().await.expect("in-memory store"),
      delays:      Arc::new(
        delays
          .iter()
          .map(|(q, ms)| ((*q).to_owned(), Duration::from_millis(*ms)))
          .collect(),
      ),
      gates:       Arc::default(),
      failing:     Arc::default(),
      fail_all:    false,
      searches:    Arc::new(AtomicUsize::new(0)),
      all_fetches: Arc::new(AtomicUsize::new(0)),
    }
  }

  /// Gate every result of searches for `query`.
  fn gate(&mut self, query: &str) -> Gate {
    let gate = Gate::default();
    Arc::make_mut(&mut self.gates).insert(query.to_owned(), gate.clone());
    gate
  }

  /// Make searches for `query` fail with a storage error.
  fn fail_search(&mut self, query: &str) {
    Arc::make_mut(&mut self.failing).insert(query.to_owned());
  }

  fn searches(&self) -> usize { self.searches.load(Ordering::SeqCst) }

  fn all_fetches(&self) -> usize { self.all_fetches.load(Ordering::SeqCst) }
}

impl PersonStore for InstrumentedStore {
  type Error = Error;

  fn get_all(&self) -> LiveQuery<Error> {
    let inner = self.inner.clone();
    let fail = self.fail_all;
    let fetches = self.all_fetches.clone();

    LiveQuery::new(inner.subscribe_changes(), move || {
      fetches.fetch_add(1, Ordering::SeqCst);
      let inner = inner.clone();
      async move {
        if fail {
          return Err(storage_failure());
        }
        inner.list_all().await
      }
    })
  }

  fn search(&self, query: &str) -> LiveQuery<Error> {
    self.searches.fetch_add(1, Ordering::SeqCst);
    let inner = self.inner.clone();
    let query = query.to_owned();
    let delay = self.delays.get(&query).copied().unwrap_or_default();
    let gate = self.gates.get(&query).cloned();
    let fail = self.failing.contains(&query);

    LiveQuery::new(inner.subscribe_changes(), move || {
      let inner = inner.clone();
      let query = query.clone();
      let gate = gate.clone();
      async move {
        tokio::time::sleep(delay).await;
        if fail {
          return Err(storage_failure());
        }
        let result = inner.search_once(&query).await;
        if let Some(gate) = gate {
          gate.fetched.notify_one();
          gate.release.notified().await;
        }
        result
      }
    })
  }

  async fn get_by_id(&self, id: PersonId) -> Result<Option<Person>, Error> {
    self.inner.get_by_id(id).await
  }

  async fn get_by_document_id(&self, document_id: &str) -> Result<Option<Person>, Error> {
    self.inner.get_by_document_id(document_id).await
  }

  async fn insert(&self, person: Person) -> Result<Person, Error> {
    self.inner.insert(person).await
  }

  async fn upsert(&self, person: Person) -> Result<Person, Error> {
    self.inner.upsert(person).await
  }

  async fn update(&self, person: Person) -> Result<(), Error> {
    self.inner.update(person).await
  }

  async fn delete(&self, person: &Person) -> Result<(), Error> {
    self.inner.delete(person).await
  }

  async fn count_with_document_id(&self, document_id: &str) -> Result<u64, Error> {
    self.inner.count_with_document_id(document_id).await
  }

  async fn count_with_document_id_excluding(
    &self,
    document_id: &str,
    excluding: PersonId,
  ) -> Result<u64, Error> {
    self
      .inner
      .count_with_document_id_excluding(document_id, excluding)
      .await
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn person(name: &str, document_id: &str) -> Person {
  Person::new(name, document_id, "987654321", "Jr. Huallaga 450", "Lima")
}

fn names(snapshot: &[Person]) -> Vec<&str> {
  snapshot.iter().map(|p| p.full_name.as_str()).collect()
}

/// Wait until the view shows exactly `expected`, failing instead of hanging.
async fn wait_for_names(view: &mut watch::Receiver<Snapshot>, expected: &[&str]) {
  tokio::time::timeout(
    Duration::from_secs(5),
    view.wait_for(|snapshot| names(snapshot) == expected),
  )
  .await
  .unwrap_or_else(|_| panic!("view never showed {expected:?}"))
  .expect("view still open");
}

fn current_names(view: &watch::Receiver<Snapshot>) -> Vec<String> {
  view.borrow().iter().map(|p| p.full_name.clone()).collect()
}

async fn seeded(delays: &[(&str, u64)], people: &[(&str, &str)]) -> InstrumentedStore {
  let store = InstrumentedStore::new(delays).await;
  for (name, document_id) in people {
    store.insert(person(name, document_id)).await.unwrap();
  }
  store
}

// ─── Full view ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn all_records_are_sorted_by_name() {
  let store = seeded(&[], &[("Carlos", "3"), ("Ana", "1"), ("Beto", "2")]).await;
  let controller = PersonController::new(Arc::new(store));

  let mut all = controller.all_records();
  wait_for_names(&mut all, &["Ana", "Beto", "Carlos"]).await;
}

#[tokio::test]
async fn all_records_follow_writes() {
  let controller = PersonController::new(Arc::new(InstrumentedStore::new(&[]).await));
  let mut all = controller.all_records();

  let beto = controller.create(person("Beto", "2")).await.unwrap();
  wait_for_names(&mut all, &["Beto"]).await;

  controller.create(person("Ana", "1")).await.unwrap();
  wait_for_names(&mut all, &["Ana", "Beto"]).await;

  controller.delete(&beto).await.unwrap();
  wait_for_names(&mut all, &["Ana"]).await;
}

#[tokio::test]
async fn controllers_sharing_a_store_see_each_others_writes() {
  let store = Arc::new(InstrumentedStore::new(&[]).await);
  let first = PersonController::new(store.clone());
  let second = PersonController::new(store);

  first.create(person("Ana", "1")).await.unwrap();

  let mut all = second.all_records();
  wait_for_names(&mut all, &["Ana"]).await;
}

// ─── Filtered view ───────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_search_passes_all_records_through() {
  let store = seeded(&[], &[("Ana", "1"), ("Beto", "2")]).await;
  let counters = store.clone();
  let controller = PersonController::new(Arc::new(store));

  let mut all = controller.all_records();
  wait_for_names(&mut all, &["Ana", "Beto"]).await;
  let all_now = all.borrow().clone();

  let mut filtered = controller.filtered_records();
  tokio::time::timeout(
    Duration::from_secs(5),
    filtered.wait_for(|snapshot| Arc::ptr_eq(snapshot, &all_now)),
  )
  .await
  .expect("filtered view shares the full snapshot")
  .unwrap();

  controller.set_search_text("   ");
  tokio::time::sleep(Duration::from_millis(50)).await;
  assert!(Arc::ptr_eq(&filtered.borrow(), &all_now));
  assert_eq!(counters.searches(), 0);
}

#[tokio::test]
async fn search_filters_case_sensitively() {
  let store = seeded(&[], &[("Ana García", "12345678"), ("Beto Ruiz", "87654321")]).await;
  let controller = PersonController::new(Arc::new(store));
  let mut filtered = controller.filtered_records();

  controller.set_search_text("García");
  wait_for_names(&mut filtered, &["Ana García"]).await;

  controller.set_search_text("garcía");
  wait_for_names(&mut filtered, &[]).await;

  controller.set_search_text("8765");
  wait_for_names(&mut filtered, &["Beto Ruiz"]).await;
}

#[tokio::test]
async fn search_text_is_observable() {
  let controller = PersonController::new(Arc::new(InstrumentedStore::new(&[]).await));
  let text = controller.search_text();
  assert_eq!(*text.borrow(), "");

  controller.set_search_text("Ana");
  assert_eq!(*text.borrow(), "Ana");
}

#[tokio::test]
async fn filtered_view_follows_writes_while_searching() {
  let controller = PersonController::new(Arc::new(InstrumentedStore::new(&[]).await));
  let mut filtered = controller.filtered_records();

  controller.create(person("Beto", "2")).await.unwrap();
  controller.set_search_text("Ana");
  wait_for_names(&mut filtered, &[]).await;

  let ana = controller.create(person("Ana", "1")).await.unwrap();
  wait_for_names(&mut filtered, &["Ana"]).await;

  controller.delete(&ana).await.unwrap();
  wait_for_names(&mut filtered, &[]).await;
}

#[tokio::test]
async fn clearing_search_restores_full_list() {
  let store = seeded(&[], &[("Ana", "1"), ("Beto", "2")]).await;
  let controller = PersonController::new(Arc::new(store));
  let mut filtered = controller.filtered_records();

  controller.set_search_text("Beto");
  wait_for_names(&mut filtered, &["Beto"]).await;

  controller.set_search_text("");
  wait_for_names(&mut filtered, &["Ana", "Beto"]).await;
  assert!(Arc::ptr_eq(&filtered.borrow(), &controller.all_records().borrow()));
}

#[tokio::test]
async fn slow_stale_search_never_overwrites_newer_one() {
  let store = seeded(&[("x", 300)], &[("Alex", "1"), ("Tony", "2")]).await;
  let controller = PersonController::new(Arc::new(store));
  let mut all = controller.all_records();
  wait_for_names(&mut all, &["Alex", "Tony"]).await;

  let mut filtered = controller.filtered_records();
  controller.set_search_text("x");
  tokio::time::sleep(Duration::from_millis(20)).await;
  controller.set_search_text("y");
  wait_for_names(&mut filtered, &["Tony"]).await;

  // Outlast the delayed "x" query.
  tokio::time::sleep(Duration::from_millis(500)).await;
  assert_eq!(current_names(&filtered), ["Tony"]);
}

#[tokio::test]
async fn slow_newer_search_still_wins() {
  let store = seeded(&[("y", 200)], &[("Alex", "1"), ("Tony", "2")]).await;
  let controller = PersonController::new(Arc::new(store));
  let mut filtered = controller.filtered_records();

  controller.set_search_text("x");
  wait_for_names(&mut filtered, &["Alex"]).await;

  controller.set_search_text("y");
  wait_for_names(&mut filtered, &["Tony"]).await;

  tokio::time::sleep(Duration::from_millis(300)).await;
  assert_eq!(current_names(&filtered), ["Tony"]);
}

#[tokio::test]
async fn finished_stale_search_is_dropped_once_text_changes() {
  let mut store = seeded(&[], &[("Alex", "1"), ("Tony", "2")]).await;
  let gate = store.gate("x");
  let controller = PersonController::new(Arc::new(store));
  let mut all = controller.all_records();
  wait_for_names(&mut all, &["Alex", "Tony"]).await;

  let mut filtered = controller.filtered_records();
  wait_for_names(&mut filtered, &["Alex", "Tony"]).await;

  controller.set_search_text("x");
  tokio::time::timeout(Duration::from_secs(5), gate.fetched.notified())
    .await
    .expect("search for \"x\" ran");

  // The "x" result is ready to publish before the driver sees the new text.
  gate.release.notify_one();
  controller.set_search_text("y");
  tokio::task::yield_now().await;
  assert_ne!(current_names(&filtered), ["Alex"]);

  wait_for_names(&mut filtered, &["Tony"]).await;
  tokio::time::sleep(Duration::from_millis(50)).await;
  assert_eq!(current_names(&filtered), ["Tony"]);
}

// ─── Storage failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_record_list_is_reported_and_stops() {
  let mut store = InstrumentedStore::new(&[]).await;
  store.fail_all = true;
  let counters = store.clone();
  let controller = PersonController::new(Arc::new(store));

  let mut failure = controller.storage_failure();
  tokio::time::timeout(Duration::from_secs(5), failure.wait_for(Option::is_some))
    .await
    .expect("failure published")
    .unwrap();
  assert_eq!(counters.all_fetches(), 1);

  // A write would re-run a live subscription; the failed one is gone.
  controller.create(person("Ana", "1")).await.unwrap();
  tokio::time::sleep(Duration::from_millis(50)).await;
  assert_eq!(counters.all_fetches(), 1);
  assert!(controller.all_records().borrow().is_empty());
}

#[tokio::test]
async fn failing_search_is_reported_without_publishing() {
  let mut store = seeded(&[], &[("Ana", "1"), ("Beto", "2")]).await;
  store.fail_search("Ana");
  let controller = PersonController::new(Arc::new(store));

  let mut filtered = controller.filtered_records();
  wait_for_names(&mut filtered, &["Ana", "Beto"]).await;

  controller.set_search_text("Ana");
  let mut failure = controller.storage_failure();
  tokio::time::timeout(Duration::from_secs(5), failure.wait_for(Option::is_some))
    .await
    .expect("failure published")
    .unwrap();

  let failed = failure.borrow().clone().expect("failure present");
  assert!(matches!(*failed, Error::Storage(_)));
  assert_eq!(current_names(&filtered), ["Ana", "Beto"]);
}

// ─── Pass-through operations ─────────────────────────────────────────────────

#[tokio::test]
async fn document_id_uniqueness_on_create_and_edit() {
  let controller = PersonController::new(Arc::new(InstrumentedStore::new(&[]).await));
  assert!(controller.is_document_id_unique("A", None).await.unwrap());

  let p1 = controller.create(person("Ana", "A")).await.unwrap();
  let p2 = controller.create(person("Beto", "B")).await.unwrap();

  assert!(!controller.is_document_id_unique("A", None).await.unwrap());
  assert!(controller.is_document_id_unique("A", Some(p1.id)).await.unwrap());
  assert!(!controller.is_document_id_unique("A", Some(p2.id)).await.unwrap());
}

#[tokio::test]
async fn create_then_lookup_by_document_id() {
  let store = Arc::new(InstrumentedStore::new(&[]).await);
  let controller = PersonController::new(store.clone());

  let input = person("Ana García", "12345678").with_civil_status("Soltero(a)");
  let saved = controller.create(input.clone()).await.unwrap();

  let found = store.get_by_document_id("12345678").await.unwrap().unwrap();
  assert_eq!(found.id, saved.id);
  assert_eq!(found.with_id(PersonId::UNSET), input);
}

#[tokio::test]
async fn update_and_get_by_id() {
  let controller = PersonController::new(Arc::new(InstrumentedStore::new(&[]).await));
  let saved = controller.create(person("Ana", "1")).await.unwrap();

  let mut edited = saved.clone();
  edited.address = "Calle Las Begonias 441".into();
  controller.update(edited.clone()).await.unwrap();

  assert_eq!(controller.get_by_id(saved.id).await.unwrap(), Some(edited));
}

#[tokio::test]
async fn update_after_delete_is_noop() {
  let controller = PersonController::new(Arc::new(InstrumentedStore::new(&[]).await));
  let saved = controller.create(person("Ana", "1")).await.unwrap();

  controller.delete(&saved).await.unwrap();
  controller.delete(&saved).await.unwrap();
  controller.update(saved.clone()).await.unwrap();

  assert!(controller.get_by_id(saved.id).await.unwrap().is_none());
  let mut all = controller.all_records();
  wait_for_names(&mut all, &[]).await;
}

#[tokio::test]
async fn no_storage_failure_by_default() {
  let controller = PersonController::new(Arc::new(InstrumentedStore::new(&[]).await));
  assert!(controller.storage_failure().borrow().is_none());
}

#[tokio::test]
async fn dropping_controller_closes_views() {
  let controller = PersonController::new(Arc::new(InstrumentedStore::new(&[]).await));
  let mut all = controller.all_records();
  drop(controller);

  let closed = tokio::time::timeout(Duration::from_secs(5), async {
    while all.changed().await.is_ok() {}
  })
  .await;
  assert!(closed.is_ok());
}

// ─── Publisher ───────────────────────────────────────────────────────────────

#[test]
fn publisher_drops_superseded_generations() {
  let (tx, rx) = watch::channel(0u32);
  let publisher = Publisher::new(tx);

  let first = publisher.restart(0).expect("initial text is current");
  let text = publisher.begin_text();
  assert!(!publisher.publish(first, 1));

  let second = publisher.restart(text).expect("text is current");
  assert!(publisher.publish(second, 2));
  assert_eq!(*rx.borrow(), 2);
}

#[test]
fn publisher_refuses_restart_of_replaced_text() {
  let (tx, rx) = watch::channel(0u32);
  let publisher = Publisher::new(tx);

  let old_text = publisher.begin_text();
  let old = publisher.restart(old_text).expect("text is current");
  publisher.begin_text();

  assert_eq!(publisher.restart(old_text), None);
  assert!(!publisher.publish(old, 1));
  assert_eq!(*rx.borrow(), 0);
}
