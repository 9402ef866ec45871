//! HTTP transport implementation
//!
//! Provides a reqwest-backed client implementing the [`Transport`](crate::Transport)
//! trait. It performs exactly one send per call; retries belong to the
//! [`RetryExecutor`](crate::RetryExecutor).

pub mod client;

pub use client::{HttpTransport, HttpTransportConfig};
