//! HTTP handlers for metric updates and lookups.
//!
//! Handlers are thin: decode the request, call the store or repository, map
//! `MetricsError` to a status code.

pub mod handlers;

pub use handlers::{fetch_json, index, update_batch, update_json, update_path, value_path};
