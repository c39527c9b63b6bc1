//! Bounded in-memory log of classified errors.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::classify::AppError;

/// Entries kept before the oldest is evicted.
pub const ERROR_LOG_CAPACITY: usize = 100;

/// FIFO ring of the most recent errors, for diagnostics.
#[derive(Debug)]
pub struct ErrorLog {
  entries: Mutex<VecDeque<AppError>>,
  capacity: usize,
}

impl ErrorLog {
  pub fn new() -> Self {
    Self::with_capacity(ERROR_LOG_CAPACITY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Mutex::new(VecDeque::with_capacity(capacity)),
      capacity: capacity.max(1),
    }
  }

  fn lock(&self) -> MutexGuard<'_, VecDeque<AppError>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn push(&self, error: AppError) {
    let mut entries = self.lock();
    while entries.len() >= self.capacity {
      entries.pop_front();
    }
    entries.push_back(error);
  }

  /// Oldest first.
  pub fn snapshot(&self) -> Vec<AppError> {
    self.lock().iter().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }

  pub fn clear(&self) {
    self.lock().clear();
  }
}

impl Default for ErrorLog {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::classify::RawError;

  #[test]
  fn test_evicts_oldest_first() {
    let log = ErrorLog::with_capacity(3);
    for i in 0..5 {
      log.push(AppError::from_raw(&RawError::new(format!("e{i}")), None));
    }
    let messages: Vec<String> = log.snapshot().into_iter().map(|e| e.message).collect();
    assert_eq!(messages, vec!["e2", "e3", "e4"]);
  }

  #[test]
  fn test_clear() {
    let log = ErrorLog::new();
    log.push(AppError::from_raw(&RawError::new("x"), None));
    assert_eq!(log.len(), 1);
    log.clear();
    assert!(log.is_empty());
  }
}
