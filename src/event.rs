use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::cache::SwrCache;

/// Environment changes that can trigger revalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
  /// The window regained focus
  Focus,
  /// Network connectivity came back
  Reconnect,
}

/// Fan-out of lifecycle events to any number of listeners
#[derive(Clone)]
pub struct LifecycleEvents {
  tx: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleEvents {
  pub fn new() -> Self {
    let (tx, _rx) = broadcast::channel(16);
    Self { tx }
  }

  /// Publish an event. Returns the number of listeners that received it.
  pub fn emit(&self, event: LifecycleEvent) -> usize {
    self.tx.send(event).unwrap_or(0)
  }

  pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
    self.tx.subscribe()
  }

  /// Forward every event to `cache` until all senders are dropped.
  pub fn attach(&self, cache: SwrCache) -> JoinHandle<()> {
    let mut rx = self.tx.subscribe();

    tokio::spawn(async move {
      loop {
        match rx.recv().await {
          Ok(event) => {
            cache.on_lifecycle(event);
          }
          Err(broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "lifecycle listener lagged");
          }
          Err(broadcast::error::RecvError::Closed) => break,
        }
      }
    })
  }
}

impl Default for LifecycleEvents {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::FetchPolicy;
  use crate::error::{AppError, ErrorHandler};
  use crate::fetch::{fetcher_fn, ResourceKey};
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test(start_paused = true)]
  async fn test_reconnect_reaches_cache() {
    let cache = SwrCache::with_error_handler(Arc::new(ErrorHandler::new()));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let fetcher = Arc::new(fetcher_fn(move |_key: ResourceKey| {
      counter.fetch_add(1, Ordering::SeqCst);
      async { Ok::<_, AppError>(json!([])) }
    }));

    let events = LifecycleEvents::new();
    let listener = events.attach(cache.clone());

    let mut sub = cache.subscribe(
      Some(ResourceKey::attractions()),
      fetcher,
      FetchPolicy::ATTRACTIONS,
    );
    sub.settled().await;

    assert_eq!(events.emit(LifecycleEvent::Reconnect), 1);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Attractions ignore focus
    events.emit(LifecycleEvent::Focus);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    drop(events);
    listener.await.unwrap();
  }
}
