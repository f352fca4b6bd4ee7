//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external formats and libraries:
//! - `artifact`: artifact reading, feature-order checks, SHA-256 manifest
//! - `forest`: random forest exported as fitted tree arrays
//! - `network`: dense feed-forward network exported as layer weights
//! - `loader`: startup loading of both models
//! - `http`: axum routes
//! - `sanitize`: clinical value filtering for logs

pub mod artifact;
pub mod forest;
pub mod http;
pub mod loader;
pub mod network;
pub mod sanitize;
