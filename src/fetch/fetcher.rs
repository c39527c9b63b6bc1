//! Fetchers turn a resource key into JSON for the cache.

use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::{is_network_error, AppError, ErrorHandler, RawError};

use super::key::ResourceKey;
use super::mock::MockCatalog;
use super::transport::Transport;

/// Produces the value for a resource key.
pub trait Fetcher: Send + Sync {
  fn fetch<'a>(&'a self, key: &'a ResourceKey) -> BoxFuture<'a, Result<Value, AppError>>;
}

/// What a single GET produced, before any fallback decision.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
  /// 2xx JSON body that parsed
  Success(Value),
  /// 2xx but not JSON, or JSON that would not parse
  MalformedShape { content_type: Option<String> },
  /// Non-2xx status
  HttpStatus(u16),
  /// The transport itself failed
  TransportError(AppError),
}

/// What to do when the outcome is not `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
  /// Serve the domain's mock payload instead of failing
  MockData,
  /// Surface the failure as an error
  Propagate,
}

/// GET-over-transport fetcher with optional mock substitution.
pub struct DefaultFetcher {
  transport: Arc<dyn Transport>,
  errors: Arc<ErrorHandler>,
  fallback: FallbackPolicy,
  mocks: MockCatalog,
}

impl DefaultFetcher {
  pub fn new(transport: Arc<dyn Transport>, fallback: FallbackPolicy) -> Self {
    Self {
      transport,
      errors: ErrorHandler::global(),
      fallback,
      mocks: MockCatalog,
    }
  }

  pub fn with_error_handler(mut self, errors: Arc<ErrorHandler>) -> Self {
    self.errors = errors;
    self
  }

  pub fn fallback(&self) -> FallbackPolicy {
    self.fallback
  }

  /// Perform the GET and tag the result.
  pub async fn request(&self, key: &ResourceKey) -> FetchOutcome {
    let response = match self.transport.get(key.path()).await {
      Ok(response) => response,
      Err(e) => return FetchOutcome::TransportError(self.errors.classify(&e, key.path())),
    };

    if !response.is_success() {
      return FetchOutcome::HttpStatus(response.status);
    }
    if !response.is_json() {
      return FetchOutcome::MalformedShape {
        content_type: response.content_type,
      };
    }

    match serde_json::from_str(&response.body) {
      Ok(value) => FetchOutcome::Success(value),
      Err(e) => {
        tracing::debug!(key = %key, error = %e, "JSON body did not parse");
        FetchOutcome::MalformedShape {
          content_type: response.content_type,
        }
      }
    }
  }

  /// Apply the fallback policy to an outcome.
  ///
  /// Every non-success outcome is classified and logged first; the policy
  /// then decides whether the caller sees that error or the mock payload.
  pub fn resolve(&self, key: &ResourceKey, outcome: FetchOutcome) -> Result<Value, AppError> {
    let error = match outcome {
      FetchOutcome::Success(value) => return Ok(value),
      FetchOutcome::HttpStatus(status) => self.errors.classify(
        &RawError::new(format!("fetch of {} returned HTTP {}", key, status))
          .with_details(Value::from(status)),
        key.path(),
      ),
      FetchOutcome::MalformedShape { content_type } => self.errors.classify(
        &RawError::new(format!(
          "response for {} is not JSON (content-type: {})",
          key,
          content_type.as_deref().unwrap_or("none")
        )),
        key.path(),
      ),
      FetchOutcome::TransportError(error) => self.errors.classify(&error, key.path()),
    };

    match self.fallback {
      FallbackPolicy::Propagate => Err(error),
      FallbackPolicy::MockData => {
        tracing::warn!(
          key = %key,
          code = %error.code,
          offline = is_network_error(&error),
          "serving mock data in place of backend response"
        );
        Ok(self.mocks.payload(key.domain()))
      }
    }
  }
}

impl Fetcher for DefaultFetcher {
  fn fetch<'a>(&'a self, key: &'a ResourceKey) -> BoxFuture<'a, Result<Value, AppError>> {
    Box::pin(async move {
      let outcome = self.request(key).await;
      self.resolve(key, outcome)
    })
  }
}

/// Adapts a closure into a [`Fetcher`].
pub struct FnFetcher<F>(F);

pub fn fetcher_fn<F, Fut>(f: F) -> FnFetcher<F>
where
  F: Fn(ResourceKey) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
{
  FnFetcher(f)
}

impl<F, Fut> Fetcher for FnFetcher<F>
where
  F: Fn(ResourceKey) -> Fut + Send + Sync,
  Fut: Future<Output = Result<Value, AppError>> + Send + 'static,
{
  fn fetch<'a>(&'a self, key: &'a ResourceKey) -> BoxFuture<'a, Result<Value, AppError>> {
    Box::pin((self.0)(key.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorCode;
  use crate::fetch::key::Domain;
  use crate::fetch::transport::{TransportError, TransportResponse};
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};

  /// Returns a canned response (or failure) and counts calls.
  struct StubTransport {
    response: Option<TransportResponse>,
    calls: AtomicUsize,
  }

  impl StubTransport {
    fn responding(status: u16, content_type: &str, body: &str) -> Arc<Self> {
      Arc::new(Self {
        response: Some(TransportResponse {
          status,
          content_type: Some(content_type.to_string()),
          body: body.to_string(),
        }),
        calls: AtomicUsize::new(0),
      })
    }

    fn failing() -> Arc<Self> {
      Arc::new(Self {
        response: None,
        calls: AtomicUsize::new(0),
      })
    }
  }

  impl Transport for StubTransport {
    fn get<'a>(
      &'a self,
      _path: &'a str,
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let result = self
        .response
        .clone()
        .ok_or_else(|| TransportError::Other("connection refused".to_string()));
      Box::pin(async move { result })
    }
  }

  fn fetcher(transport: Arc<StubTransport>, fallback: FallbackPolicy) -> DefaultFetcher {
    DefaultFetcher::new(transport, fallback).with_error_handler(Arc::new(ErrorHandler::new()))
  }

  #[tokio::test]
  async fn test_json_success_passes_through() {
    let transport = StubTransport::responding(200, "application/json", r#"[{"id":9}]"#);
    let f = fetcher(transport.clone(), FallbackPolicy::MockData);
    let value = f.fetch(&ResourceKey::attractions()).await.unwrap();
    assert_eq!(value, json!([{ "id": 9 }]));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_html_response_is_malformed() {
    let transport = StubTransport::responding(200, "text/html", "<!doctype html>");
    let f = fetcher(transport, FallbackPolicy::MockData);
    let outcome = f.request(&ResourceKey::accommodations()).await;
    assert_eq!(
      outcome,
      FetchOutcome::MalformedShape {
        content_type: Some("text/html".to_string())
      }
    );
  }

  #[tokio::test]
  async fn test_non_json_serves_domain_mock() {
    let transport = StubTransport::responding(200, "text/html", "<!doctype html>");
    let f = fetcher(transport, FallbackPolicy::MockData);
    let value = f.fetch(&ResourceKey::accommodations()).await.unwrap();
    assert_eq!(value, MockCatalog.payload(Domain::Accommodations));
  }

  #[tokio::test]
  async fn test_unparseable_json_serves_mock() {
    let transport = StubTransport::responding(200, "application/json", "{not json");
    let f = fetcher(transport, FallbackPolicy::MockData);
    let value = f.fetch(&ResourceKey::weather("Tà Xùa")).await.unwrap();
    assert_eq!(value, MockCatalog.payload(Domain::Weather));
  }

  #[tokio::test]
  async fn test_transport_failure_serves_mock() {
    let errors = Arc::new(ErrorHandler::new());
    let f = DefaultFetcher::new(StubTransport::failing(), FallbackPolicy::MockData)
      .with_error_handler(errors.clone());
    let value = f.fetch(&ResourceKey::search("mây")).await.unwrap();
    assert_eq!(value, json!([]));
    assert_eq!(errors.log_len(), 1);
    assert_eq!(errors.log_snapshot()[0].code, ErrorCode::NetworkError);
  }

  #[tokio::test]
  async fn test_server_error_serves_mock() {
    let errors = Arc::new(ErrorHandler::new());
    let transport = StubTransport::responding(503, "application/json", "{}");
    let f = DefaultFetcher::new(transport, FallbackPolicy::MockData).with_error_handler(errors.clone());
    let value = f.fetch(&ResourceKey::attractions()).await.unwrap();
    assert_eq!(value, MockCatalog.payload(Domain::Attractions));

    let log = errors.log_snapshot();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].code, ErrorCode::NetworkError);
    assert_eq!(log[0].details, Some(json!(503)));
    assert_eq!(log[0].context.as_deref(), Some("/api/attractions"));
  }

  #[tokio::test]
  async fn test_malformed_shape_is_logged_before_mock() {
    let errors = Arc::new(ErrorHandler::new());
    let transport = StubTransport::responding(200, "text/html", "<!doctype html>");
    let f = DefaultFetcher::new(transport, FallbackPolicy::MockData).with_error_handler(errors.clone());
    let value = f.fetch(&ResourceKey::accommodations()).await.unwrap();
    assert_eq!(value, MockCatalog.payload(Domain::Accommodations));

    let log = errors.log_snapshot();
    assert_eq!(log.len(), 1);
    assert!(log[0].message.contains("text/html"));
  }

  #[tokio::test]
  async fn test_propagate_raises_network_error_on_status() {
    let transport = StubTransport::responding(500, "application/json", "{}");
    let f = fetcher(transport, FallbackPolicy::Propagate);
    let err = f.fetch(&ResourceKey::attractions()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NetworkError);
    assert_eq!(err.details, Some(json!(500)));
  }

  #[tokio::test]
  async fn test_propagate_surfaces_transport_error() {
    let f = fetcher(StubTransport::failing(), FallbackPolicy::Propagate);
    let err = f.fetch(&ResourceKey::attractions()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NetworkError);
    assert_eq!(err.context.as_deref(), Some("/api/attractions"));
  }

  #[tokio::test]
  async fn test_closure_fetcher() {
    let f = fetcher_fn(|key: ResourceKey| async move { Ok::<_, AppError>(json!(key.path())) });
    let value = f.fetch(&ResourceKey::user("7")).await.unwrap();
    assert_eq!(value, json!("/api/users/7"));
  }
}
