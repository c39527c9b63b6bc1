//! Per-domain resource accessors with fixed fetch policies.

use std::sync::Arc;

use crate::fetch::{Fetcher, ResourceKey};

use super::layer::SwrCache;
use super::policy::FetchPolicy;
use super::state::Subscription;

/// Entry point for the site's content pages.
///
/// Every accessor picks the key and policy for its domain; accessors whose
/// input is missing return an inert subscription instead of fetching.
#[derive(Clone)]
pub struct Resources {
  cache: SwrCache,
  fetcher: Arc<dyn Fetcher>,
}

fn present(value: Option<&str>) -> Option<&str> {
  value.filter(|v| !v.is_empty())
}

impl Resources {
  pub fn new(cache: SwrCache, fetcher: Arc<dyn Fetcher>) -> Self {
    Self { cache, fetcher }
  }

  pub fn cache(&self) -> &SwrCache {
    &self.cache
  }

  fn subscribe(&self, key: Option<ResourceKey>) -> Subscription {
    let policy = key
      .as_ref()
      .map(|k| FetchPolicy::for_domain(k.domain()))
      .unwrap_or_default();
    self.cache.subscribe(key, Arc::clone(&self.fetcher), policy)
  }

  pub fn attractions(&self) -> Subscription {
    self.subscribe(Some(ResourceKey::attractions()))
  }

  pub fn accommodations(&self) -> Subscription {
    self.subscribe(Some(ResourceKey::accommodations()))
  }

  /// Disabled until a location is known.
  pub fn weather(&self, location: Option<&str>) -> Subscription {
    self.subscribe(present(location).map(ResourceKey::weather))
  }

  /// Disabled until a user is signed in.
  pub fn user_profile(&self, user_id: Option<&str>) -> Subscription {
    self.subscribe(present(user_id).map(ResourceKey::user))
  }

  pub fn gallery(&self, category: Option<&str>) -> Subscription {
    self.subscribe(Some(ResourceKey::gallery(present(category))))
  }

  /// An empty query disables the search.
  pub fn search(&self, query: &str) -> Subscription {
    self.subscribe(present(Some(query)).map(ResourceKey::search))
  }

  pub fn reviews(&self, item_id: Option<&str>, kind: &str) -> Subscription {
    self.subscribe(present(item_id).map(|id| ResourceKey::reviews(id, kind)))
  }
}
