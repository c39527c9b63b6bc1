//! Error taxonomy, classification and retry helpers.
//!
//! Every caught failure is turned into an [`AppError`] carrying a category
//! code and a pre-baked Vietnamese message for the UI. The [`ErrorHandler`]
//! keeps a bounded log of what it classified and provides the back-off retry
//! and safe-fallback combinators the fetch layer builds on.

mod classify;
mod log;
mod retry;

pub use classify::{
  classify_code, is_network_error, user_message, AppError, AsRawError, ErrorCode, RawError,
};
pub use log::{ErrorLog, ERROR_LOG_CAPACITY};
pub use retry::{backoff_delay, ErrorHandler};
