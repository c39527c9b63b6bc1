//! Data layer for the Tà Xùa travel site.
//!
//! Content pages read attractions, accommodations, weather and the rest
//! through [`cache::Resources`], which serves cached data immediately and
//! revalidates in the background. When the backend is down or answers with
//! something other than JSON, built-in mock tables keep pages populated.
//! The maps SDK is loaded through the load-once [`loader::ScriptLoader`].

pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod fetch;
pub mod loader;
pub mod models;
