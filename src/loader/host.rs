//! The document a script loader injects into.

use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// A script element as inserted into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
  pub id: String,
  pub src: String,
  pub is_async: bool,
  pub defer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
  #[error("script {src} failed to load: {reason}")]
  LoadFailed { src: String, reason: String },
}

/// Seam between the loader and whatever hosts the script.
pub trait ScriptHost: Send + Sync + 'static {
  /// Id of an existing script whose source starts with `src_prefix`.
  fn find_script(&self, src_prefix: &str) -> Option<String>;

  /// Insert `element` and return a future that resolves on its load event
  /// or fails on its error event. Insertion happens before this returns.
  fn insert_script(&self, element: ScriptElement) -> BoxFuture<'static, Result<(), ScriptError>>;

  /// Remove a script by id. Returns whether it was present.
  fn remove_script(&self, id: &str) -> bool;

  /// Whether the SDK namespace the script defines is currently available.
  fn global_present(&self) -> bool;
}

#[derive(Default)]
struct Document {
  scripts: Mutex<Vec<ScriptElement>>,
  global: AtomicBool,
}

impl Document {
  fn scripts(&self) -> MutexGuard<'_, Vec<ScriptElement>> {
    self.scripts.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Headless host: "loading" a script means downloading it over HTTP.
///
/// A successful, non-empty download registers the SDK namespace; removing
/// the last script unregisters it.
#[derive(Clone)]
pub struct HttpScriptHost {
  client: reqwest::Client,
  document: Arc<Document>,
}

impl HttpScriptHost {
  pub fn new(client: reqwest::Client) -> Self {
    Self {
      client,
      document: Arc::new(Document::default()),
    }
  }

  pub fn scripts(&self) -> Vec<ScriptElement> {
    self.document.scripts().clone()
  }
}

impl HttpScriptHost {
  /// Host with its own client.
  ///
  /// Fails if the HTTP client cannot be built (TLS backend unavailable).
  pub fn build() -> Result<Self, reqwest::Error> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("taxua/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self::new(client))
  }
}

impl ScriptHost for HttpScriptHost {
  fn find_script(&self, src_prefix: &str) -> Option<String> {
    self
      .document
      .scripts()
      .iter()
      .find(|s| s.src.starts_with(src_prefix))
      .map(|s| s.id.clone())
  }

  fn insert_script(&self, element: ScriptElement) -> BoxFuture<'static, Result<(), ScriptError>> {
    self.document.scripts().push(element.clone());

    let client = self.client.clone();
    let document = Arc::clone(&self.document);
    Box::pin(async move {
      let failed = |reason: String| ScriptError::LoadFailed {
        src: element.src.clone(),
        reason,
      };

      let response = client
        .get(&element.src)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;
      if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
      }
      let body = response.text().await.map_err(|e| failed(e.to_string()))?;

      if !body.trim().is_empty() {
        document.global.store(true, Ordering::SeqCst);
      }
      Ok(())
    })
  }

  fn remove_script(&self, id: &str) -> bool {
    let mut scripts = self.document.scripts();
    let before = scripts.len();
    scripts.retain(|s| s.id != id);
    if scripts.is_empty() {
      self.document.global.store(false, Ordering::SeqCst);
    }
    scripts.len() != before
  }

  fn global_present(&self) -> bool {
    self.document.global.load(Ordering::SeqCst)
  }
}
