//! Subscriber-facing state and the subscription handle.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Weak;
use tokio::sync::watch;

use crate::error::AppError;

use super::layer::CacheInner;

/// What a consumer renders from: last data, last error, and whether a
/// request is in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
  pub data: Option<Value>,
  pub error: Option<AppError>,
  pub is_validating: bool,
}

impl ResourceState {
  /// Deserialize the cached data into a typed model.
  ///
  /// Returns `None` when there is no data or it has a different shape.
  pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
    self
      .data
      .as_ref()
      .and_then(|v| serde_json::from_value(v.clone()).ok())
  }
}

/// A live view of one cache entry.
///
/// Dropping the subscription releases it; when the last subscriber of a key
/// goes away its refresh timer stops.
pub struct Subscription {
  key: Option<String>,
  rx: watch::Receiver<ResourceState>,
  cache: Weak<CacheInner>,
}

impl Subscription {
  pub(super) fn new(key: String, rx: watch::Receiver<ResourceState>, cache: Weak<CacheInner>) -> Self {
    Self {
      key: Some(key),
      rx,
      cache,
    }
  }

  /// Subscription for a disabled (`None`) key: never fetches, never changes.
  pub fn inert() -> Self {
    let (_tx, rx) = watch::channel(ResourceState::default());
    Self {
      key: None,
      rx,
      cache: Weak::new(),
    }
  }

  pub fn key(&self) -> Option<&str> {
    self.key.as_deref()
  }

  pub fn is_inert(&self) -> bool {
    self.key.is_none()
  }

  pub fn state(&self) -> ResourceState {
    self.rx.borrow().clone()
  }

  pub fn data(&self) -> Option<Value> {
    self.rx.borrow().data.clone()
  }

  pub fn error(&self) -> Option<AppError> {
    self.rx.borrow().error.clone()
  }

  pub fn is_validating(&self) -> bool {
    self.rx.borrow().is_validating
  }

  /// Wait for the next state change. Returns `false` once the entry is gone.
  pub async fn changed(&mut self) -> bool {
    self.rx.changed().await.is_ok()
  }

  /// Wait until no request is in flight and return the state at that point.
  pub async fn settled(&mut self) -> ResourceState {
    let settled = self
      .rx
      .wait_for(|s| !s.is_validating)
      .await
      .map(|s| s.clone());
    settled.unwrap_or_else(|_| self.rx.borrow().clone())
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let (Some(key), Some(cache)) = (self.key.as_deref(), self.cache.upgrade()) {
      cache.release(key);
    }
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("key", &self.key)
      .field("state", &*self.rx.borrow())
      .finish_non_exhaustive()
  }
}
