//! HTTP transport seam and its reqwest implementation.

use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use thiserror::Error;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{AsRawError, RawError};

/// What the fetcher needs from a response.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: String,
}

impl TransportResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn is_json(&self) -> bool {
    self
      .content_type
      .as_deref()
      .is_some_and(|ct| ct.contains("application/json"))
  }
}

#[derive(Debug, Error)]
pub enum TransportError {
  #[error("invalid request url {path}: {source}")]
  InvalidUrl {
    path: String,
    #[source]
    source: url::ParseError,
  },
  #[error(transparent)]
  Http(#[from] reqwest::Error),
  #[error("fetch failed: {0}")]
  Other(String),
}

impl AsRawError for TransportError {
  fn to_raw(&self) -> RawError {
    match self {
      TransportError::Http(e) => e.to_raw(),
      TransportError::InvalidUrl { .. } => RawError::new(self.to_string()),
      TransportError::Other(_) => RawError::new(self.to_string()).with_kind("NetworkError"),
    }
  }
}

/// Performs a GET for a resource path.
pub trait Transport: Send + Sync {
  fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<TransportResponse, TransportError>>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
  base_url: Url,
}

impl ReqwestTransport {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid API base URL {}: {}", config.base_url, e))?;

    let mut builder = reqwest::Client::builder();
    if let Some(agent) = &config.user_agent {
      builder = builder.user_agent(agent.clone());
    }
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(std::time::Duration::from_secs(secs));
    }
    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  async fn request(&self, path: &str) -> Result<TransportResponse, TransportError> {
    let url = self
      .base_url
      .join(path)
      .map_err(|source| TransportError::InvalidUrl {
        path: path.to_string(),
        source,
      })?;

    tracing::debug!(%url, "GET");
    let response = self.client.get(url).send().await?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response.text().await?;

    Ok(TransportResponse {
      status,
      content_type,
      body,
    })
  }
}

impl Transport for ReqwestTransport {
  fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
    Box::pin(self.request(path))
  }
}
