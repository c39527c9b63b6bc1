//! Load-once loader for the maps SDK script.
//!
//! However many callers ask for the SDK at once, exactly one script element
//! is injected. Callers that arrive while it is loading are queued and all
//! resolve together once the SDK namespace is verified present.

mod host;

pub use host::{HttpScriptHost, ScriptElement, ScriptError, ScriptHost};

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use url::Url;

use crate::config::MapsConfig;

/// Id given to the element this loader injects.
pub const SCRIPT_ID: &str = "taxua-maps-sdk";

/// Delay before re-checking the SDK namespace after the load event.
const GLOBAL_POLL_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderError {
  #[error("maps API key is not configured (set TAXUA_MAPS_API_KEY)")]
  MissingApiKey,
  #[error("invalid maps script url {url}: {reason}")]
  InvalidUrl { url: String, reason: String },
  #[error(transparent)]
  Script(#[from] ScriptError),
  #[error("maps script loaded but the SDK namespace never appeared")]
  GlobalMissing,
  #[error("loader was reset before the script finished loading")]
  Reset,
  #[error("could not create HTTP client for the script host: {reason}")]
  Client { reason: String },
}

type Callback = Box<dyn FnOnce() + Send>;

/// Per-call options.
pub struct LoadOptions {
  pub api_key: String,
  pub libraries: Vec<String>,
  pub language: String,
  pub region: String,
  /// Invoked once the SDK is ready; panics are contained.
  pub callback: Option<Callback>,
}

impl LoadOptions {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key: api_key.into(),
      libraries: Vec::new(),
      language: "vi".to_string(),
      region: "VN".to_string(),
      callback: None,
    }
  }

  pub fn from_config(config: &MapsConfig, api_key: impl Into<String>) -> Self {
    Self {
      libraries: config.libraries.clone(),
      language: config.language.clone(),
      region: config.region.clone(),
      ..Self::new(api_key)
    }
  }

  pub fn with_callback(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
    self.callback = Some(Box::new(callback));
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
  Idle,
  Loading,
  Loaded,
}

struct Waiter {
  tx: oneshot::Sender<Result<(), LoaderError>>,
  callback: Option<Callback>,
}

struct LoaderState {
  phase: LoadPhase,
  /// Bumped by `cleanup` so a load finishing afterwards is ignored
  generation: u64,
  waiters: Vec<Waiter>,
  script_id: Option<String>,
}

struct Inner<H> {
  host: H,
  script_url: String,
  poll_delay: Duration,
  state: Mutex<LoaderState>,
}

impl<H: ScriptHost> Inner<H> {
  fn lock(&self) -> MutexGuard<'_, LoaderState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn remove_owned_script(&self, state: &mut LoaderState) {
    if let Some(id) = state.script_id.take() {
      self.host.remove_script(&id);
    }
  }
}

/// Injects the maps script at most once and queues callers until it is ready.
pub struct ScriptLoader<H: ScriptHost> {
  inner: Arc<Inner<H>>,
}

impl<H: ScriptHost> Clone for ScriptLoader<H> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

fn run_callback(callback: Option<Callback>) {
  let Some(callback) = callback else {
    return;
  };
  if std::panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
    tracing::warn!("maps loader callback panicked");
  }
}

impl<H: ScriptHost> ScriptLoader<H> {
  pub fn new(host: H, script_url: impl Into<String>) -> Self {
    Self {
      inner: Arc::new(Inner {
        host,
        script_url: script_url.into(),
        poll_delay: GLOBAL_POLL_DELAY,
        state: Mutex::new(LoaderState {
          phase: LoadPhase::Idle,
          generation: 0,
          waiters: Vec::new(),
          script_id: None,
        }),
      }),
    }
  }

  pub fn host(&self) -> &H {
    &self.inner.host
  }

  pub fn phase(&self) -> LoadPhase {
    self.inner.lock().phase
  }

  /// Loaded, and the SDK namespace is present right now.
  pub fn is_loaded(&self) -> bool {
    self.inner.lock().phase == LoadPhase::Loaded && self.inner.host.global_present()
  }

  /// Make sure the SDK is loaded, injecting the script if nobody has yet.
  pub async fn load(&self, options: LoadOptions) -> Result<(), LoaderError> {
    let rx = {
      let mut state = self.inner.lock();

      if state.phase == LoadPhase::Loaded {
        if self.inner.host.global_present() {
          drop(state);
          run_callback(options.callback);
          return Ok(());
        }
        tracing::warn!("maps SDK namespace disappeared, reloading");
        self.inner.remove_owned_script(&mut state);
        state.phase = LoadPhase::Idle;
      }

      if state.phase == LoadPhase::Idle {
        let existing = self.inner.host.find_script(&self.inner.script_url);
        if existing.is_some() && self.inner.host.global_present() {
          tracing::debug!("maps script already present in document");
          state.phase = LoadPhase::Loaded;
          drop(state);
          run_callback(options.callback);
          return Ok(());
        }

        if options.api_key.trim().is_empty() {
          return Err(LoaderError::MissingApiKey);
        }
        let src = self.compose_src(&options)?;

        let element = ScriptElement {
          id: SCRIPT_ID.to_string(),
          src,
          is_async: true,
          defer: true,
        };
        tracing::info!(src = %element.src, "injecting maps script");

        state.phase = LoadPhase::Loading;
        state.script_id = Some(element.id.clone());
        let loaded = self.inner.host.insert_script(element);
        tokio::spawn(finish_load(
          Arc::clone(&self.inner),
          state.generation,
          loaded,
        ));
      }

      let (tx, rx) = oneshot::channel();
      state.waiters.push(Waiter {
        tx,
        callback: options.callback,
      });
      rx
    };

    rx.await.unwrap_or(Err(LoaderError::Reset))
  }

  /// Remove the injected script and forget all state.
  ///
  /// Pending callers are dropped, not resolved: they see [`LoaderError::Reset`].
  pub fn cleanup(&self) {
    let mut state = self.inner.lock();
    self.inner.remove_owned_script(&mut state);
    state.phase = LoadPhase::Idle;
    state.generation += 1;
    state.waiters.clear();
    tracing::debug!("maps loader reset");
  }

  fn compose_src(&self, options: &LoadOptions) -> Result<String, LoaderError> {
    let mut params = vec![("key", options.api_key.clone())];
    if !options.libraries.is_empty() {
      params.push(("libraries", options.libraries.join(",")));
    }
    params.push(("language", options.language.clone()));
    params.push(("region", options.region.clone()));
    params.push(("loading", "async".to_string()));

    Url::parse_with_params(&self.inner.script_url, &params)
      .map(String::from)
      .map_err(|e| LoaderError::InvalidUrl {
        url: self.inner.script_url.clone(),
        reason: e.to_string(),
      })
  }
}

/// Wait for the load event, verify the namespace, then settle every waiter.
async fn finish_load<H, F>(inner: Arc<Inner<H>>, generation: u64, loaded: F)
where
  H: ScriptHost,
  F: std::future::Future<Output = Result<(), ScriptError>>,
{
  let outcome = match loaded.await {
    Ok(()) if inner.host.global_present() => Ok(()),
    Ok(()) => {
      tokio::time::sleep(inner.poll_delay).await;
      if inner.host.global_present() {
        Ok(())
      } else {
        Err(LoaderError::GlobalMissing)
      }
    }
    Err(e) => Err(LoaderError::Script(e)),
  };

  let waiters = {
    let mut state = inner.lock();
    if state.generation != generation {
      tracing::debug!("discarding load result from before reset");
      return;
    }
    match &outcome {
      Ok(()) => state.phase = LoadPhase::Loaded,
      Err(e) => {
        tracing::error!(error = %e, "maps script failed to load");
        inner.remove_owned_script(&mut state);
        state.phase = LoadPhase::Idle;
      }
    }
    std::mem::take(&mut state.waiters)
  };

  for waiter in waiters {
    if outcome.is_ok() {
      run_callback(waiter.callback);
    }
    let _ = waiter.tx.send(outcome.clone());
  }
}

/// Loader type used by the application.
pub type MapsLoader = ScriptLoader<HttpScriptHost>;

static MAPS_LOADER: OnceLock<MapsLoader> = OnceLock::new();

/// Process-wide maps loader.
///
/// The first successful call decides the configuration; later calls return
/// the same instance regardless of `config`.
pub fn maps_loader(config: &MapsConfig) -> Result<&'static MapsLoader, LoaderError> {
  if let Some(loader) = MAPS_LOADER.get() {
    return Ok(loader);
  }
  let host = HttpScriptHost::build().map_err(|e| LoaderError::Client {
    reason: e.to_string(),
  })?;
  Ok(MAPS_LOADER.get_or_init(|| ScriptLoader::new(host, config.script_url.clone())))
}
