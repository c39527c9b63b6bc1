//! Error taxonomy and message-based classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Category assigned to every classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
  NetworkError,
  AuthError,
  PermissionError,
  TimeoutError,
  NotFoundError,
  GenericError,
  UnknownError,
}

impl ErrorCode {
  pub fn as_str(self) -> &'static str {
    match self {
      ErrorCode::NetworkError => "NETWORK_ERROR",
      ErrorCode::AuthError => "AUTH_ERROR",
      ErrorCode::PermissionError => "PERMISSION_ERROR",
      ErrorCode::TimeoutError => "TIMEOUT_ERROR",
      ErrorCode::NotFoundError => "NOT_FOUND_ERROR",
      ErrorCode::GenericError => "GENERIC_ERROR",
      ErrorCode::UnknownError => "UNKNOWN_ERROR",
    }
  }

  /// Codes that retrying cannot fix.
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      ErrorCode::AuthError | ErrorCode::PermissionError | ErrorCode::NotFoundError
    )
  }
}

impl fmt::Display for ErrorCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// User-facing explanation for a code. Never contains technical detail.
pub fn user_message(code: ErrorCode) -> &'static str {
  match code {
    ErrorCode::NetworkError => {
      "Không thể kết nối mạng. Vui lòng kiểm tra kết nối internet và thử lại."
    }
    ErrorCode::AuthError => "Phiên đăng nhập đã hết hạn. Vui lòng đăng nhập lại.",
    ErrorCode::PermissionError => "Bạn không có quyền thực hiện thao tác này.",
    ErrorCode::TimeoutError => "Yêu cầu mất quá nhiều thời gian. Vui lòng thử lại.",
    ErrorCode::NotFoundError => "Không tìm thấy dữ liệu được yêu cầu.",
    ErrorCode::GenericError => "Đã xảy ra lỗi. Vui lòng thử lại sau.",
    ErrorCode::UnknownError => "Đã xảy ra lỗi không xác định. Vui lòng thử lại.",
  }
}

/// A failure as it was caught, before classification.
///
/// `kind` mirrors the name tag some error sources carry (e.g. `NetworkError`);
/// a raw error without a message is an unknown shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawError {
  pub kind: Option<String>,
  pub message: Option<String>,
  pub details: Option<Value>,
}

impl RawError {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      kind: None,
      message: Some(message.into()),
      details: None,
    }
  }

  /// A value with no recognizable error shape.
  pub fn unknown() -> Self {
    Self::default()
  }

  pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
    self.kind = Some(kind.into());
    self
  }

  pub fn with_details(mut self, details: Value) -> Self {
    self.details = Some(details);
    self
  }
}

impl From<&str> for RawError {
  fn from(message: &str) -> Self {
    RawError::new(message)
  }
}

impl From<String> for RawError {
  fn from(message: String) -> Self {
    RawError::new(message)
  }
}

/// Anything the classifier can inspect.
pub trait AsRawError {
  fn to_raw(&self) -> RawError;

  /// Already-classified errors are passed through instead of being logged twice.
  fn classified(&self) -> Option<&AppError> {
    None
  }
}

impl AsRawError for RawError {
  fn to_raw(&self) -> RawError {
    self.clone()
  }
}

impl AsRawError for str {
  fn to_raw(&self) -> RawError {
    RawError::new(self)
  }
}

impl AsRawError for String {
  fn to_raw(&self) -> RawError {
    RawError::new(self.as_str())
  }
}

impl AsRawError for color_eyre::Report {
  fn to_raw(&self) -> RawError {
    RawError::new(self.to_string())
  }
}

impl AsRawError for reqwest::Error {
  fn to_raw(&self) -> RawError {
    let details = self.url().map(|u| Value::String(u.to_string()));
    let raw = if self.is_timeout() {
      RawError::new(format!("request timeout: {self}")).with_kind("TimeoutError")
    } else if self.is_decode() {
      RawError::new(self.to_string())
    } else {
      RawError::new(format!("fetch failed: {self}")).with_kind("NetworkError")
    };
    match details {
      Some(d) => raw.with_details(d),
      None => raw,
    }
  }
}

/// A classified, user-presentable error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
  pub code: ErrorCode,
  /// Raw diagnostic message
  pub message: String,
  pub user_message: String,
  pub timestamp: DateTime<Utc>,
  pub details: Option<Value>,
  /// Label supplied by the caller (resource key, operation name)
  pub context: Option<String>,
  /// Set once an [`ErrorHandler`](crate::error::ErrorHandler) has recorded it
  #[serde(skip)]
  pub(crate) logged: bool,
}

impl AppError {
  /// Build an error from a raw value. Does not touch any log.
  pub fn from_raw(raw: &RawError, context: Option<&str>) -> Self {
    let code = classify_code(raw);
    Self {
      code,
      message: raw
        .message
        .clone()
        .unwrap_or_else(|| "unknown error".to_string()),
      user_message: user_message(code).to_string(),
      timestamp: Utc::now(),
      details: raw.details.clone(),
      context: context.map(String::from),
      logged: false,
    }
  }

  /// Whether an error handler has already put this error in its log.
  pub fn is_logged(&self) -> bool {
    self.logged
  }

  /// Combined user message and code for diagnostic surfaces.
  pub fn formatted(&self) -> String {
    format!("{} (Mã lỗi: {})", self.user_message, self.code)
  }
}

impl fmt::Display for AppError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.code, self.message)
  }
}

impl std::error::Error for AppError {}

impl AsRawError for AppError {
  fn to_raw(&self) -> RawError {
    RawError {
      kind: None,
      message: Some(self.message.clone()),
      details: self.details.clone(),
    }
  }

  fn classified(&self) -> Option<&AppError> {
    Some(self)
  }
}

/// Assign a code from the raw message.
///
/// Matching is a plain case-sensitive substring test, first hit wins.
/// A message like "authors not loaded" lands in `AuthError`.
pub fn classify_code(raw: &RawError) -> ErrorCode {
  let Some(message) = raw.message.as_deref() else {
    return ErrorCode::UnknownError;
  };

  if message.contains("fetch") {
    ErrorCode::NetworkError
  } else if message.contains("auth") {
    ErrorCode::AuthError
  } else if message.contains("permission") {
    ErrorCode::PermissionError
  } else if message.contains("timeout") {
    ErrorCode::TimeoutError
  } else if message.contains("not found") {
    ErrorCode::NotFoundError
  } else {
    ErrorCode::GenericError
  }
}

/// Heuristic check for connectivity failures.
pub fn is_network_error<E: AsRawError + ?Sized>(err: &E) -> bool {
  let raw = err.to_raw();
  if raw.kind.as_deref() == Some("NetworkError") {
    return true;
  }
  raw.message.as_deref().is_some_and(|m| {
    m.contains("fetch") || m.contains("network") || m.contains("offline")
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_substring_classification() {
    let cases = [
      ("Failed to fetch", ErrorCode::NetworkError),
      ("auth token expired", ErrorCode::AuthError),
      ("missing permission for review", ErrorCode::PermissionError),
      ("gateway timeout", ErrorCode::TimeoutError),
      ("attraction not found", ErrorCode::NotFoundError),
      ("something odd", ErrorCode::GenericError),
    ];
    for (message, expected) in cases {
      assert_eq!(classify_code(&RawError::new(message)), expected, "{message}");
    }
  }

  #[test]
  fn test_first_match_wins() {
    // "fetch" is checked before "auth"
    assert_eq!(
      classify_code(&RawError::new("fetch rejected: auth required")),
      ErrorCode::NetworkError
    );
  }

  #[test]
  fn test_matching_is_case_sensitive() {
    assert_eq!(
      classify_code(&RawError::new("Timeout waiting for gateway")),
      ErrorCode::GenericError
    );
  }

  #[test]
  fn test_no_message_is_unknown() {
    assert_eq!(classify_code(&RawError::unknown()), ErrorCode::UnknownError);
    let err = AppError::from_raw(&RawError::unknown(), None);
    assert_eq!(err.user_message, user_message(ErrorCode::UnknownError));
  }

  #[test]
  fn test_same_input_same_output() {
    let raw = RawError::new("auth failed");
    let a = AppError::from_raw(&raw, Some("profile"));
    let b = AppError::from_raw(&raw, Some("profile"));
    assert_eq!(a.code, b.code);
    assert_eq!(a.user_message, b.user_message);
  }

  #[test]
  fn test_terminal_codes() {
    assert!(ErrorCode::AuthError.is_terminal());
    assert!(ErrorCode::PermissionError.is_terminal());
    assert!(ErrorCode::NotFoundError.is_terminal());
    assert!(!ErrorCode::TimeoutError.is_terminal());
    assert!(!ErrorCode::NetworkError.is_terminal());
  }

  #[test]
  fn test_network_error_detection() {
    assert!(is_network_error("network unreachable"));
    assert!(is_network_error("device is offline"));
    assert!(is_network_error(&RawError::new("boom").with_kind("NetworkError")));
    assert!(!is_network_error("permission denied"));
    assert!(!is_network_error(&RawError::unknown()));
  }

  #[test]
  fn test_formatted_includes_code() {
    let err = AppError::from_raw(&RawError::new("request timeout"), None);
    assert_eq!(
      err.formatted(),
      format!("{} (Mã lỗi: TIMEOUT_ERROR)", user_message(ErrorCode::TimeoutError))
    );
  }

  #[test]
  fn test_code_serializes_screaming_case() {
    let json = serde_json::to_string(&ErrorCode::NotFoundError).unwrap();
    assert_eq!(json, "\"NOT_FOUND_ERROR\"");
  }
}
