//! Revalidation policies per data domain.

use std::time::Duration;

use crate::fetch::Domain;

/// When and how often a cached resource is refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
  /// Refetch when the window regains focus
  pub revalidate_on_focus: bool,
  /// Refetch when the network comes back
  pub revalidate_on_reconnect: bool,
  /// Subscriptions within this window share one request
  pub deduping_interval: Duration,
  /// Periodic refetch while subscribed; zero disables it
  pub refresh_interval: Duration,
  /// Retries after the first failed attempt
  pub error_retry_count: u32,
  /// Base delay between retries, doubled each time
  pub error_retry_interval: Duration,
}

const fn secs(n: u64) -> Duration {
  Duration::from_secs(n)
}

impl FetchPolicy {
  pub const DEFAULT: FetchPolicy = FetchPolicy {
    revalidate_on_focus: false,
    revalidate_on_reconnect: true,
    deduping_interval: secs(2),
    refresh_interval: Duration::ZERO,
    error_retry_count: 3,
    error_retry_interval: secs(5),
  };

  pub const ATTRACTIONS: FetchPolicy = FetchPolicy {
    deduping_interval: secs(5 * 60),
    ..FetchPolicy::DEFAULT
  };

  pub const ACCOMMODATIONS: FetchPolicy = FetchPolicy {
    deduping_interval: secs(5 * 60),
    ..FetchPolicy::DEFAULT
  };

  pub const WEATHER: FetchPolicy = FetchPolicy {
    revalidate_on_focus: true,
    deduping_interval: secs(60),
    refresh_interval: secs(10 * 60),
    ..FetchPolicy::DEFAULT
  };

  pub const PROFILE: FetchPolicy = FetchPolicy {
    revalidate_on_focus: true,
    deduping_interval: secs(30),
    ..FetchPolicy::DEFAULT
  };

  pub const GALLERY: FetchPolicy = FetchPolicy {
    deduping_interval: secs(10 * 60),
    ..FetchPolicy::DEFAULT
  };

  // One retry only: queries change on every keystroke.
  pub const SEARCH: FetchPolicy = FetchPolicy {
    deduping_interval: secs(60),
    error_retry_count: 1,
    ..FetchPolicy::DEFAULT
  };

  pub const REVIEWS: FetchPolicy = FetchPolicy {
    deduping_interval: secs(60),
    ..FetchPolicy::DEFAULT
  };

  pub fn for_domain(domain: Domain) -> FetchPolicy {
    match domain {
      Domain::Attractions => Self::ATTRACTIONS,
      Domain::Accommodations => Self::ACCOMMODATIONS,
      Domain::Weather => Self::WEATHER,
      Domain::Profile => Self::PROFILE,
      Domain::Gallery => Self::GALLERY,
      Domain::Search => Self::SEARCH,
      Domain::Reviews => Self::REVIEWS,
      Domain::Other => Self::DEFAULT,
    }
  }

  /// Total attempts per request, first one included.
  pub fn max_attempts(&self) -> u32 {
    self.error_retry_count.saturating_add(1)
  }

  pub fn refreshes(&self) -> bool {
    !self.refresh_interval.is_zero()
  }
}

impl Default for FetchPolicy {
  fn default() -> Self {
    Self::DEFAULT
  }
}
