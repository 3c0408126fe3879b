//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires from
//! the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `BackendApi`: order-construction and position REST service
//! - `ChainClient`: fullnode transaction dry runs
//! - `WalletProvider`: external signing and broadcast
//! - `MarketDataSource`: vendor market-data snapshots and streams

pub mod backend;
pub mod chain;
pub mod market_data;
pub mod wallet;
