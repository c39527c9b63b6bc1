//! Stale-while-revalidate caching for site resources.
//!
//! This module provides the data layer content pages read from:
//! - One shared entry per resource key, with subscriber notification
//! - Request dedup inside a per-domain window
//! - Background revalidation on focus, reconnect and refresh timers
//! - Superseded responses are dropped by request sequence number
//! - Disabled (`None`) keys that never touch the network

mod layer;
mod policy;
mod resources;
mod state;

pub use layer::SwrCache;
pub use policy::FetchPolicy;
pub use resources::Resources;
pub use state::{ResourceState, Subscription};
