//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP clients, WebSockets, fullnode REST).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: backend REST client for markets, prices, positions, orders
//! - `chain`: fullnode dry runs and the remote wallet signer
//! - `feeds`: real-time market data and the display throttle
//! - `metrics`: Prometheus metrics export and health checks

pub mod api;
pub mod chain;
pub mod feeds;
pub mod metrics;
