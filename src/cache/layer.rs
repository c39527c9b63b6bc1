//! Stale-while-revalidate cache shared by every consumer in the process.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{AppError, ErrorHandler};
use crate::event::LifecycleEvent;
use crate::fetch::{Fetcher, ResourceKey};

use super::policy::FetchPolicy;
use super::state::{ResourceState, Subscription};

/// One cached resource.
struct Entry {
  key: ResourceKey,
  state: watch::Sender<ResourceState>,
  fetcher: Option<Arc<dyn Fetcher>>,
  policy: FetchPolicy,
  /// Sequence number of the most recently issued request
  issued_seq: u64,
  last_started_at: Option<Instant>,
  last_fetched_at: Option<Instant>,
  subscribers: usize,
  refresh_task: Option<JoinHandle<()>>,
}

impl Entry {
  fn new(key: ResourceKey, policy: FetchPolicy) -> Self {
    let (state, _) = watch::channel(ResourceState::default());
    Self {
      key,
      state,
      fetcher: None,
      policy,
      issued_seq: 0,
      last_started_at: None,
      last_fetched_at: None,
      subscribers: 0,
      refresh_task: None,
    }
  }

  fn within_dedupe_window(&self, now: Instant) -> bool {
    self
      .last_started_at
      .is_some_and(|t| now.duration_since(t) < self.policy.deduping_interval)
  }
}

pub(super) struct CacheInner {
  entries: Mutex<HashMap<String, Entry>>,
  errors: Arc<ErrorHandler>,
}

impl CacheInner {
  fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Called when a subscription is dropped.
  pub(super) fn release(&self, path: &str) {
    let mut entries = self.lock();
    if let Some(entry) = entries.get_mut(path) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
      if entry.subscribers == 0 {
        if let Some(task) = entry.refresh_task.take() {
          task.abort();
        }
      }
    }
  }

  fn revalidate_path(self: &Arc<Self>, path: &str) -> bool {
    let mut entries = self.lock();
    match entries.get_mut(path) {
      Some(entry) if entry.fetcher.is_some() => {
        start_request(self, entry);
        true
      }
      _ => false,
    }
  }

  /// Store a resolution, unless a newer request has been issued since.
  fn settle(&self, key: &ResourceKey, seq: u64, result: Result<Value, AppError>) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key.path()) else {
      tracing::debug!(key = %key, "entry pruned before response arrived");
      return;
    };

    if entry.issued_seq != seq {
      tracing::debug!(
        key = %key,
        seq,
        latest = entry.issued_seq,
        "discarding superseded response"
      );
      return;
    }

    entry.last_fetched_at = Some(Instant::now());
    entry.state.send_modify(|state| {
      state.is_validating = false;
      match result {
        Ok(data) => {
          state.data = Some(data);
          state.error = None;
        }
        // Previous data stays visible next to the error
        Err(error) => state.error = Some(error),
      }
    });
  }
}

/// Issue a new request for `entry` on a background task.
fn start_request(inner: &Arc<CacheInner>, entry: &mut Entry) {
  let Some(fetcher) = entry.fetcher.clone() else {
    return;
  };

  entry.issued_seq += 1;
  entry.last_started_at = Some(Instant::now());
  entry.state.send_modify(|state| state.is_validating = true);

  let seq = entry.issued_seq;
  let key = entry.key.clone();
  let policy = entry.policy;
  let cache = Arc::clone(inner);

  tracing::debug!(key = %key, seq, "fetching");
  tokio::spawn(async move {
    let result = cache
      .errors
      .with_retry(
        || fetcher.fetch(&key),
        policy.max_attempts(),
        policy.error_retry_interval,
        key.path(),
      )
      .await;
    cache.settle(&key, seq, result);
  });
}

fn spawn_refresh(inner: &Arc<CacheInner>, path: String, period: Duration) -> JoinHandle<()> {
  let cache = Arc::downgrade(inner);
  tokio::spawn(async move {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      let Some(inner) = cache.upgrade() else {
        break;
      };
      tracing::debug!(key = %path, "refresh interval elapsed");
      inner.revalidate_path(&path);
    }
  })
}

/// Key-addressed cache with request dedup and background revalidation.
///
/// Cloning is cheap; clones share the same entries. Subscribing spawns
/// tasks, so it must happen inside a tokio runtime.
#[derive(Clone)]
pub struct SwrCache {
  inner: Arc<CacheInner>,
}

impl SwrCache {
  pub fn new() -> Self {
    Self::with_error_handler(ErrorHandler::global())
  }

  pub fn with_error_handler(errors: Arc<ErrorHandler>) -> Self {
    Self {
      inner: Arc::new(CacheInner {
        entries: Mutex::new(HashMap::new()),
        errors,
      }),
    }
  }

  /// Subscribe to a resource.
  ///
  /// Returns the cached state right away and starts a background fetch
  /// unless one was started for this key within the policy's dedupe window.
  /// A `None` key yields an inert subscription and never fetches.
  pub fn subscribe(
    &self,
    key: Option<ResourceKey>,
    fetcher: Arc<dyn Fetcher>,
    policy: FetchPolicy,
  ) -> Subscription {
    let Some(key) = key else {
      return Subscription::inert();
    };
    let path = key.path().to_string();

    let mut entries = self.inner.lock();
    let entry = entries
      .entry(path.clone())
      .or_insert_with(|| Entry::new(key, policy));
    entry.fetcher = Some(fetcher);
    entry.policy = policy;
    entry.subscribers += 1;
    let rx = entry.state.subscribe();

    if entry.subscribers == 1 && policy.refreshes() && entry.refresh_task.is_none() {
      entry.refresh_task = Some(spawn_refresh(
        &self.inner,
        path.clone(),
        policy.refresh_interval,
      ));
    }

    if entry.within_dedupe_window(Instant::now()) {
      tracing::debug!(key = %path, "request deduplicated");
    } else {
      start_request(&self.inner, entry);
    }
    drop(entries);

    Subscription::new(path, rx, Arc::downgrade(&self.inner))
  }

  /// Force a new request for `key`, ignoring the dedupe window.
  ///
  /// Returns `false` if the key has never been subscribed.
  pub fn revalidate(&self, key: &ResourceKey) -> bool {
    self.inner.revalidate_path(key.path())
  }

  /// Revalidate every subscribed entry whose policy reacts to `event`.
  pub fn on_lifecycle(&self, event: LifecycleEvent) -> usize {
    let mut entries = self.inner.lock();
    let mut count = 0;
    for entry in entries.values_mut() {
      if entry.subscribers == 0 {
        continue;
      }
      let enabled = match event {
        LifecycleEvent::Focus => entry.policy.revalidate_on_focus,
        LifecycleEvent::Reconnect => entry.policy.revalidate_on_reconnect,
      };
      if enabled {
        start_request(&self.inner, entry);
        count += 1;
      }
    }
    tracing::debug!(?event, revalidated = count, "lifecycle event");
    count
  }

  /// Replace the cached data locally.
  ///
  /// Any request in flight for the key is superseded. With `revalidate` a
  /// fresh request is issued afterwards.
  pub fn mutate(&self, key: &ResourceKey, data: Value, revalidate: bool) {
    let mut entries = self.inner.lock();
    let entry = entries
      .entry(key.path().to_string())
      .or_insert_with(|| Entry::new(key.clone(), FetchPolicy::for_domain(key.domain())));

    entry.issued_seq += 1;
    entry.last_fetched_at = Some(Instant::now());
    entry.state.send_modify(|state| {
      state.data = Some(data);
      state.error = None;
      state.is_validating = false;
    });

    if revalidate {
      start_request(&self.inner, entry);
    }
  }

  /// Warm the cache for `key` and wait for the result.
  pub async fn prefetch(
    &self,
    key: ResourceKey,
    fetcher: Arc<dyn Fetcher>,
    policy: FetchPolicy,
  ) -> ResourceState {
    let mut subscription = self.subscribe(Some(key), fetcher, policy);
    subscription.settled().await
  }

  pub fn peek(&self, key: &ResourceKey) -> Option<ResourceState> {
    self
      .inner
      .lock()
      .get(key.path())
      .map(|e| e.state.borrow().clone())
  }

  pub fn last_fetched_at(&self, key: &ResourceKey) -> Option<Instant> {
    self.inner.lock().get(key.path()).and_then(|e| e.last_fetched_at)
  }

  pub fn subscriber_count(&self, key: &ResourceKey) -> usize {
    self
      .inner
      .lock()
      .get(key.path())
      .map_or(0, |e| e.subscribers)
  }

  /// Drop entries nobody is subscribed to and nothing is fetching.
  pub fn prune_idle(&self) -> usize {
    let mut entries = self.inner.lock();
    let before = entries.len();
    entries.retain(|_, e| e.subscribers > 0 || e.state.borrow().is_validating);
    before - entries.len()
  }

  pub fn len(&self) -> usize {
    self.inner.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.lock().is_empty()
  }
}

impl Default for SwrCache {
  fn default() -> Self {
    Self::new()
  }
}
