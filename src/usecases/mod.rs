//! Use Cases Layer - Application Logic
//!
//! Orchestrates the domain and ports into the desk's behavior:
//! - `session`: wallet connection lifecycle
//! - `submission`: the transaction submission pipeline
//! - `market_view`: throttled display state for one symbol
//! - `positions`: open-positions cache with optimistic inserts

pub mod market_view;
pub mod positions;
pub mod session;
pub mod submission;

pub use market_view::{MarketView, MarketViewHandle, PriceDirection, PriceDisplay};
pub use positions::PositionBoard;
pub use session::{SessionState, WalletSession};
pub use submission::{
    CloseReceipt, OpenReceipt, SubmissionPipeline, SubmissionState, SubmitError, SyncOutcome,
};
