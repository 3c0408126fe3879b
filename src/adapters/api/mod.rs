//! Backend API Adapter
//!
//! Implements the HTTP client for the backend order-construction
//! service: markets, price history, staleness checks, positions, and
//! ready-to-sign order payloads.
//!
//! Sub-modules:
//! - `client`: HTTP client with retries and envelope handling
//! - `backend`: `BackendApi` port implementation
//! - `types`: wire request/response type definitions

pub mod backend;
pub mod client;
pub mod types;

pub use backend::RestBackend;
pub use client::{ApiClient, ApiClientConfig};
