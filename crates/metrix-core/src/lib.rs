//! metrix core: the metric entity, numeric input conversion, payload signing
//! and the error surface.
//!
//! This crate defines the value types and integrity rules shared by the
//! server and any agent tooling. It carries no runtime or transport
//! dependencies so it can be reused in multiple contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed input surfaces as `MetricsError`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metric;
pub mod sign;

/// Shared result type.
pub use error::{ErrorCode, MetricsError, Result};
pub use metric::{Metric, MetricInput, MetricKey, MetricType};
pub use sign::Signer;
