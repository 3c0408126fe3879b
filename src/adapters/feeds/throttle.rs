//! Display Buffer / Throttle - Bounded-Staleness Publishing
//!
//! Collapses a bursty snapshot stream into fixed-cadence publishes. The
//! newest snapshot sits in a pending slot and is published when it is
//! complete (meets the minimum record count) and the minimum interval
//! since the last publish has elapsed. A timer tick force-flushes a
//! pending snapshot after the interval even when it never fills up, so
//! a thin feed still makes forward progress.
//!
//! The core is pure - the clock is an `Instant` argument - and the
//! async `ThrottledStream` wrapper turns a broadcast subscription into
//! a cancellable sequence of published snapshots.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::domain::book::DepthSnapshot;
use crate::domain::candle::Candle;
use crate::ports::market_data::TradeTick;

/// Completeness measure for a buffered snapshot.
pub trait SnapshotRecords {
    fn record_count(&self) -> usize;
}

impl SnapshotRecords for DepthSnapshot {
    fn record_count(&self) -> usize {
        DepthSnapshot::record_count(self)
    }
}

impl SnapshotRecords for TradeTick {
    fn record_count(&self) -> usize {
        1
    }
}

impl SnapshotRecords for Candle {
    fn record_count(&self) -> usize {
        1
    }
}

/// Pure throttle core. Holds at most one pending snapshot; the newest
/// always wins.
#[derive(Debug)]
pub struct Throttle<T> {
    min_interval: Duration,
    min_records: usize,
    pending: Option<T>,
    last_publish: Option<Instant>,
}

impl<T: SnapshotRecords> Throttle<T> {
    pub fn new(min_interval: Duration, min_records: usize) -> Self {
        Self {
            min_interval,
            min_records,
            pending: None,
            last_publish: None,
        }
    }

    /// Offer a fresh snapshot. Returns the snapshot to publish when it
    /// is complete and the interval has elapsed; otherwise it replaces
    /// the pending slot.
    pub fn offer(&mut self, snapshot: T, now: Instant) -> Option<T> {
        let complete = snapshot.record_count() >= self.min_records;
        self.pending = Some(snapshot);
        if complete && self.interval_elapsed(now) {
            self.publish(now)
        } else {
            None
        }
    }

    /// Timer path: flush the pending slot once the interval has elapsed,
    /// regardless of completeness. Guarantees forward progress when the
    /// feed never reaches the threshold.
    pub fn tick(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.interval_elapsed(now) {
            self.publish(now)
        } else {
            None
        }
    }

    /// Final flush on stream end, ignoring the cadence.
    pub fn take_pending(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn interval_elapsed(&self, now: Instant) -> bool {
        self.last_publish
            .map_or(true, |last| now.duration_since(last) >= self.min_interval)
    }

    fn publish(&mut self, now: Instant) -> Option<T> {
        self.last_publish = Some(now);
        self.pending.take()
    }
}

/// Cancellable sequence of throttled snapshots over a broadcast feed.
///
/// Dropping the stream tears the subscription down; there is nothing to
/// unsubscribe.
pub struct ThrottledStream<T> {
    rx: broadcast::Receiver<T>,
    throttle: Throttle<T>,
    timer: tokio::time::Interval,
}

impl<T: SnapshotRecords + Clone> ThrottledStream<T> {
    pub fn new(rx: broadcast::Receiver<T>, min_interval: Duration, min_records: usize) -> Self {
        let mut timer = tokio::time::interval(min_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            rx,
            throttle: Throttle::new(min_interval, min_records),
            timer,
        }
    }

    /// Next published snapshot, or `None` once the upstream feed closes
    /// and the pending slot is drained.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            tokio::select! {
                result = self.rx.recv() => match result {
                    Ok(snapshot) => {
                        if let Some(published) =
                            self.throttle.offer(snapshot, Instant::now())
                        {
                            return Some(published);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(dropped = n, "display buffer lagged behind feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return self.throttle.take_pending();
                    }
                },
                _ = self.timer.tick() => {
                    if let Some(published) = self.throttle.tick(Instant::now()) {
                        return Some(published);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Snap(usize, u32);

    impl SnapshotRecords for Snap {
        fn record_count(&self) -> usize {
            self.0
        }
    }

    const INTERVAL: Duration = Duration::from_millis(1000);

    #[test]
    fn test_first_complete_snapshot_publishes_immediately() {
        let mut throttle = Throttle::new(INTERVAL, 12);
        let now = Instant::now();
        assert_eq!(throttle.offer(Snap(12, 1), now), Some(Snap(12, 1)));
        assert!(!throttle.has_pending());
    }

    #[test]
    fn test_incomplete_snapshot_is_held() {
        let mut throttle = Throttle::new(INTERVAL, 12);
        let now = Instant::now();
        assert_eq!(throttle.offer(Snap(3, 1), now), None);
        assert!(throttle.has_pending());
    }

    #[test]
    fn test_timer_flush_surfaces_partial_data_after_interval() {
        let mut throttle = Throttle::new(INTERVAL, 12);
        let start = Instant::now();
        // A complete publish, then a thin feed forever
        assert!(throttle.offer(Snap(12, 1), start).is_some());
        assert_eq!(throttle.offer(Snap(3, 2), start + INTERVAL / 2), None);
        // Timer before the interval: nothing
        assert_eq!(throttle.tick(start + INTERVAL / 2), None);
        // Timer after the interval: forced flush of the partial snapshot
        assert_eq!(throttle.tick(start + INTERVAL), Some(Snap(3, 2)));
    }

    #[test]
    fn test_consecutive_publishes_respect_interval() {
        let mut throttle = Throttle::new(INTERVAL, 1);
        let start = Instant::now();
        assert!(throttle.offer(Snap(5, 1), start).is_some());
        // Complete snapshot arriving too soon stays pending
        assert_eq!(throttle.offer(Snap(5, 2), start + INTERVAL / 4), None);
        assert_eq!(throttle.offer(Snap(5, 3), start + INTERVAL / 2), None);
        // Once the interval elapses the newest pending wins
        assert_eq!(
            throttle.offer(Snap(5, 4), start + INTERVAL),
            Some(Snap(5, 4))
        );
    }

    #[test]
    fn test_newest_snapshot_replaces_pending() {
        let mut throttle = Throttle::new(INTERVAL, 12);
        let start = Instant::now();
        throttle.offer(Snap(3, 1), start);
        throttle.offer(Snap(4, 2), start);
        assert_eq!(throttle.tick(start + INTERVAL), Some(Snap(4, 2)));
    }

    #[test]
    fn test_tick_without_pending_is_noop() {
        let mut throttle: Throttle<Snap> = Throttle::new(INTERVAL, 1);
        assert_eq!(throttle.tick(Instant::now() + INTERVAL), None);
    }

    #[tokio::test]
    async fn test_stream_yields_then_drains_on_close() {
        let (tx, rx) = broadcast::channel(16);
        let mut stream = ThrottledStream::new(rx, Duration::from_millis(10), 1);

        tx.send(Snap(5, 1)).unwrap();
        assert_eq!(stream.next().await, Some(Snap(5, 1)));

        tx.send(Snap(5, 2)).unwrap();
        drop(tx);
        // Pending snapshot drains on close even if the cadence would
        // have held it back.
        assert_eq!(stream.next().await, Some(Snap(5, 2)));
        assert_eq!(stream.next().await, None);
    }
}
