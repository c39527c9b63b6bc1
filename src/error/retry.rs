//! Error handler: classify-and-log, exponential back-off retry, safe fallback.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use super::classify::{AppError, AsRawError, RawError};
use super::log::ErrorLog;

/// Classifies failures and records them in a bounded log.
///
/// The fetch layer and the CLI share the process-wide instance from
/// [`ErrorHandler::global`]; tests build their own to keep logs isolated.
#[derive(Debug, Default)]
pub struct ErrorHandler {
  log: ErrorLog,
}

impl ErrorHandler {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn global() -> Arc<ErrorHandler> {
    static GLOBAL: OnceLock<Arc<ErrorHandler>> = OnceLock::new();
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(ErrorHandler::new())))
  }

  /// Classify `err` and append it to the log.
  ///
  /// An `AppError` keeps its classification. It is logged unless a handler
  /// already recorded it, so each failure lands in the log exactly once.
  pub fn classify<E: AsRawError + ?Sized>(&self, err: &E, context: &str) -> AppError {
    let mut error = match err.classified() {
      Some(existing) => existing.clone(),
      None => AppError::from_raw(&err.to_raw(), Some(context)),
    };
    if error.context.is_none() {
      error.context = Some(context.to_string());
    }
    if error.logged {
      return error;
    }

    error.logged = true;
    tracing::error!(
      code = %error.code,
      context,
      message = %error.message,
      "classified error"
    );
    self.log.push(error.clone());
    error
  }

  /// Run `operation` up to `max_attempts` times with exponential back-off.
  ///
  /// The delay before retry `i` is `base_delay * 2^(i-1)`. Auth, permission
  /// and not-found failures are returned after the first attempt. The error
  /// returned is the classification of the last failure.
  pub async fn with_retry<T, E, F, Fut>(
    &self,
    mut operation: F,
    max_attempts: u32,
    base_delay: Duration,
    context: &str,
  ) -> Result<T, AppError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: AsRawError,
  {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
      attempt += 1;
      match operation().await {
        Ok(value) => return Ok(value),
        Err(err) => {
          let error = self.classify(&err, context);
          if error.code.is_terminal() || attempt >= max_attempts {
            return Err(error);
          }
          let delay = backoff_delay(base_delay, attempt);
          tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            code = %error.code,
            context,
            "retrying after back-off"
          );
          tokio::time::sleep(delay).await;
        }
      }
    }
  }

  /// Await `operation`, returning `fallback` if it fails or panics.
  pub async fn safe_async<T, E, Fut>(&self, operation: Fut, fallback: T, context: &str) -> T
  where
    Fut: Future<Output = Result<T, E>>,
    E: AsRawError,
  {
    match AssertUnwindSafe(operation).catch_unwind().await {
      Ok(Ok(value)) => value,
      Ok(Err(err)) => {
        self.classify(&err, context);
        fallback
      }
      Err(panic) => {
        self.classify(&panic_to_raw(panic.as_ref()), context);
        fallback
      }
    }
  }

  pub fn log_snapshot(&self) -> Vec<AppError> {
    self.log.snapshot()
  }

  pub fn log_len(&self) -> usize {
    self.log.len()
  }

  pub fn clear_log(&self) {
    self.log.clear();
  }
}

/// Delay before retry number `retry` (1-based).
pub fn backoff_delay(base_delay: Duration, retry: u32) -> Duration {
  let factor = 1u32 << retry.saturating_sub(1).min(16);
  base_delay.saturating_mul(factor)
}

fn panic_to_raw(payload: &(dyn Any + Send)) -> RawError {
  if let Some(s) = payload.downcast_ref::<&str>() {
    RawError::new(*s)
  } else if let Some(s) = payload.downcast_ref::<String>() {
    RawError::new(s.clone())
  } else {
    RawError::unknown()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::classify::ErrorCode;
  use std::sync::atomic::{AtomicU32, Ordering};
  use tokio::time::Instant;

  #[test]
  fn test_backoff_doubles() {
    let base = Duration::from_millis(100);
    assert_eq!(backoff_delay(base, 1), Duration::from_millis(100));
    assert_eq!(backoff_delay(base, 2), Duration::from_millis(200));
    assert_eq!(backoff_delay(base, 3), Duration::from_millis(400));
  }

  #[tokio::test]
  async fn test_auth_error_is_not_retried() {
    let handler = ErrorHandler::new();
    let calls = AtomicU32::new(0);
    let result: Result<(), AppError> = handler
      .with_retry(
        || {
          calls.fetch_add(1, Ordering::SeqCst);
          async { Err::<(), _>(RawError::new("auth required")) }
        },
        5,
        Duration::from_millis(1),
        "profile",
      )
      .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.unwrap_err().code, ErrorCode::AuthError);
    assert_eq!(handler.log_len(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_timeout_retries_with_backoff() {
    let handler = ErrorHandler::new();
    let start = Instant::now();
    let attempts = std::sync::Mutex::new(Vec::new());

    let result: Result<(), AppError> = handler
      .with_retry(
        || {
          attempts.lock().unwrap().push(start.elapsed());
          async { Err::<(), _>(RawError::new("request timeout")) }
        },
        3,
        Duration::from_millis(100),
        "weather",
      )
      .await;

    let err = result.unwrap_err();
    assert_eq!(err.code, ErrorCode::TimeoutError);
    assert_eq!(err.message, "request timeout");

    let attempts = attempts.into_inner().unwrap();
    assert_eq!(attempts.len(), 3);
    let first_gap = attempts[1] - attempts[0];
    let second_gap = attempts[2] - attempts[1];
    assert!(first_gap >= Duration::from_millis(100) && first_gap < Duration::from_millis(110));
    assert!(second_gap >= Duration::from_millis(200) && second_gap < Duration::from_millis(210));
    assert_eq!(handler.log_len(), 3);
  }

  #[tokio::test]
  async fn test_retry_then_success() {
    let handler = ErrorHandler::new();
    let calls = AtomicU32::new(0);
    let result = handler
      .with_retry(
        || {
          let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
          async move {
            if n < 3 {
              Err(RawError::new("fetch failed"))
            } else {
              Ok(n)
            }
          }
        },
        3,
        Duration::ZERO,
        "attractions",
      )
      .await;

    assert_eq!(result.unwrap(), 3);
    assert_eq!(handler.log_len(), 2);
  }

  #[tokio::test]
  async fn test_zero_attempts_runs_once() {
    let handler = ErrorHandler::new();
    let calls = AtomicU32::new(0);
    let _ = handler
      .with_retry(
        || {
          calls.fetch_add(1, Ordering::SeqCst);
          async { Err::<(), _>(RawError::new("boom")) }
        },
        0,
        Duration::ZERO,
        "test",
      )
      .await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_safe_async_returns_fallback() {
    let handler = ErrorHandler::new();
    let value = handler
      .safe_async(async { Err::<i32, _>(RawError::new("boom")) }, -1, "test")
      .await;
    assert_eq!(value, -1);
    assert_eq!(handler.log_len(), 1);

    let value = handler
      .safe_async(async { Ok::<_, RawError>(7) }, -1, "test")
      .await;
    assert_eq!(value, 7);
    assert_eq!(handler.log_len(), 1);
  }

  #[tokio::test]
  async fn test_safe_async_absorbs_panics() {
    let handler = ErrorHandler::new();
    let value = handler
      .safe_async(
        async {
          if handler.log_len() == 0 {
            panic!("permission exploded");
          }
          Ok::<_, RawError>(1)
        },
        0,
        "test",
      )
      .await;
    assert_eq!(value, 0);
    assert_eq!(handler.log_snapshot()[0].code, ErrorCode::PermissionError);
  }

  #[tokio::test]
  async fn test_log_capped_at_capacity() {
    let handler = ErrorHandler::new();
    for i in 0..105 {
      handler
        .safe_async(
          async move { Err::<(), _>(RawError::new(format!("failure {i}"))) },
          (),
          "bulk",
        )
        .await;
    }

    let log = handler.log_snapshot();
    assert_eq!(log.len(), 100);
    assert_eq!(log[0].message, "failure 5");
    assert!(log.iter().all(|e| e.message != "failure 4"));
    assert_eq!(log[99].message, "failure 104");
  }

  #[tokio::test]
  async fn test_unlogged_app_error_is_logged_once() {
    let handler = ErrorHandler::new();
    let value = handler
      .safe_async(
        async { Err::<i32, _>(AppError::from_raw(&RawError::new("gateway timeout"), None)) },
        -1,
        "gallery",
      )
      .await;

    assert_eq!(value, -1);
    assert_eq!(handler.log_len(), 1);
    let logged = &handler.log_snapshot()[0];
    assert_eq!(logged.code, ErrorCode::TimeoutError);
    assert_eq!(logged.context.as_deref(), Some("gallery"));
    assert!(logged.is_logged());
  }

  #[tokio::test]
  async fn test_retry_logs_each_app_error_attempt() {
    let handler = ErrorHandler::new();
    let calls = AtomicU32::new(0);
    let result: Result<(), AppError> = handler
      .with_retry(
        || {
          calls.fetch_add(1, Ordering::SeqCst);
          async { Err(AppError::from_raw(&RawError::new("gateway timeout"), None)) }
        },
        3,
        Duration::ZERO,
        "weather",
      )
      .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(result.unwrap_err().is_logged());
    assert_eq!(handler.log_len(), 3);
  }

  #[test]
  fn test_classified_errors_pass_through() {
    let handler = ErrorHandler::new();
    let first = handler.classify("not found", "reviews");
    let second = handler.classify(&first, "other");
    assert_eq!(second, first);
    assert_eq!(handler.log_len(), 1);
  }
}
