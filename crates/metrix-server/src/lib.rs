//! metrix server library entry.
//!
//! This crate wires the metrics store, its persistence, the repository
//! contract and the HTTP surface into a runnable service. It is consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod ops;
pub mod repository;
pub mod router;
pub mod store;
