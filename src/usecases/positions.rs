//! Position Board - Open Positions Cache
//!
//! Holds the user's open positions for display. The backend is the
//! source of truth; the board only adds an optimistic placeholder right
//! after a confirmed open, and drops it again as soon as a refresh shows
//! the real record (or the placeholder outlives its grace window).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::domain::position::Position;
use crate::ports::backend::{BackendApi, PositionQuery};

/// How long an optimistic placeholder may survive refreshes before it is
/// considered superseded or failed.
const OPTIMISTIC_GRACE: Duration = Duration::from_secs(30);

/// Cached open positions for the connected account.
pub struct PositionBoard<B> {
    backend: Arc<B>,
    board_tx: watch::Sender<Vec<Position>>,
}

impl<B: BackendApi> PositionBoard<B> {
    pub fn new(backend: Arc<B>) -> Self {
        let (board_tx, _) = watch::channel(Vec::new());
        Self { backend, board_tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Position>> {
        self.board_tx.subscribe()
    }

    pub fn current(&self) -> Vec<Position> {
        self.board_tx.borrow().clone()
    }

    /// Re-fetch open positions and merge surviving placeholders.
    #[instrument(skip(self))]
    pub async fn refresh(&self, user_addr: &str) -> Result<Vec<Position>> {
        let page = self
            .backend
            .positions(&PositionQuery::open_for(user_addr))
            .await
            .context("Position refresh failed")?;

        let merged = merge(self.board_tx.borrow().clone(), page.positions);
        self.board_tx.send_replace(merged.clone());
        Ok(merged)
    }

    /// Insert the optimistic placeholder for a just-confirmed open.
    pub fn insert_optimistic(&self, position: Position) {
        debug!(id = %position.id, "Inserting optimistic position");
        self.board_tx.send_modify(|board| {
            board.retain(|p| p.id != position.id);
            board.insert(0, position);
        });
    }

    /// Clear the board, typically on wallet disconnect.
    pub fn clear(&self) {
        self.board_tx.send_replace(Vec::new());
    }
}

fn is_optimistic(position: &Position) -> bool {
    position.id.starts_with("pending-")
}

/// Fetched records win. A placeholder survives only while it is inside
/// its grace window and no real record exists for the same market and
/// side.
fn merge(previous: Vec<Position>, fetched: Vec<Position>) -> Vec<Position> {
    let now = Utc::now();
    let mut merged: Vec<Position> = Vec::with_capacity(fetched.len() + 1);

    for placeholder in previous.into_iter().filter(|p| is_optimistic(p)) {
        let age = (now - placeholder.opened_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let superseded = fetched
            .iter()
            .any(|p| p.market_id == placeholder.market_id && p.side == placeholder.side);
        if age < OPTIMISTIC_GRACE && !superseded {
            merged.push(placeholder);
        }
    }
    merged.extend(fetched);
    merged
}
