//! Resource fetching: keys, transport, the default fetcher and mock fallback.
//!
//! The default fetcher never lets a dead or misconfigured backend blank out a
//! content page: under [`FallbackPolicy::MockData`] any non-success outcome
//! is replaced by the domain's built-in payload.

mod fetcher;
mod key;
mod mock;
mod transport;

pub use fetcher::{fetcher_fn, DefaultFetcher, FallbackPolicy, FetchOutcome, Fetcher, FnFetcher};
pub use key::{Domain, ResourceKey};
pub use mock::MockCatalog;
pub use transport::{ReqwestTransport, Transport, TransportError, TransportResponse};
