//! Domain layer - Core types and pure logic.
//!
//! No I/O here (hexagonal architecture inner ring): fixed-point
//! arithmetic, markets, positions, order intents, book snapshots,
//! candles, and entry-function payloads. Everything is serializable and
//! testable in isolation.

pub mod book;
pub mod candle;
pub mod fixed;
pub mod intent;
pub mod market;
pub mod payload;
pub mod position;

pub use book::{BookLevel, BookView, DepthSnapshot};
pub use candle::{Candle, CandleSeries, CandleUpdate};
pub use intent::{IntentError, OrderIntent};
pub use market::{LatestPrice, Market, MarketId, PricePoint, Side};
pub use payload::{EntryArg, TxPayload};
pub use position::{Position, PositionStatus};
