//! Market-data feed adapters.
//!
//! - `binance`: REST seeding plus combined-stream WebSocket feed
//! - `throttle`: bounded-staleness display buffer

pub mod binance;
pub mod throttle;

pub use binance::MarketDataFeed;
pub use throttle::{SnapshotRecords, Throttle, ThrottledStream};
