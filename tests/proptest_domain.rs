//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that the fixed-point codec, order book
//! accumulation, and display throttle maintain their invariants across
//! random inputs.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use rust_decimal::Decimal;

use perps_desk::adapters::feeds::throttle::{SnapshotRecords, Throttle};
use perps_desk::domain::book::DepthSnapshot;
use perps_desk::domain::fixed::{from_fixed, parse_fixed, to_fixed, SCALE};
use perps_desk::domain::intent::OrderIntent;
use perps_desk::domain::market::Side;

// ── Fixed-Point Codec Properties ───────────────────────────

proptest! {
    /// Encoding never exceeds the true scaled value (floor semantics)
    /// and never undershoots it by a full unit.
    #[test]
    fn to_fixed_floors_within_one_unit(units in 0u64..1_000_000_000, frac in 0u32..100_000_000) {
        let value = Decimal::from(units) + Decimal::new(i64::from(frac), 8);
        let encoded = to_fixed(value).unwrap();
        let exact = Decimal::from(units) * Decimal::from(SCALE) + Decimal::from(frac);
        prop_assert!(Decimal::from(encoded) <= exact);
        prop_assert!(exact - Decimal::from(encoded) < Decimal::ONE);
    }

    /// Values with at most eight decimal places round-trip exactly.
    #[test]
    fn eight_decimal_values_round_trip(raw in 0u64..u64::MAX / 2) {
        let decoded = from_fixed(raw);
        prop_assert_eq!(to_fixed(decoded).unwrap(), raw);
    }

    /// The string decoder agrees with the integer decoder.
    #[test]
    fn parse_fixed_matches_from_fixed(raw in 0i64..i64::MAX / 2) {
        let parsed = parse_fixed(&raw.to_string()).unwrap();
        prop_assert_eq!(parsed, from_fixed(raw as u64));
    }

    /// Negative amounts are always rejected.
    #[test]
    fn negative_values_never_encode(units in 1u64..1_000_000) {
        let value = -Decimal::from(units);
        prop_assert!(to_fixed(value).is_err());
    }
}

// ── Order Intent Properties ────────────────────────────────

proptest! {
    /// Notional always equals margin times leverage for valid inputs.
    #[test]
    fn notional_is_margin_times_leverage(
        margin in 1u64..1_000_000,
        leverage in 1u64..100,
    ) {
        let intent = OrderIntent::new(
            0,
            Side::Long,
            Decimal::from(margin),
            Decimal::from(leverage),
        );
        prop_assert!(intent.validate_amounts().is_ok());
        prop_assert_eq!(
            intent.notional(),
            Decimal::from(margin) * Decimal::from(leverage)
        );
    }
}

// ── Order Book Accumulation Properties ─────────────────────

proptest! {
    /// Cumulative totals are monotonically non-decreasing down the book
    /// and the last total equals the sum of all quantities.
    #[test]
    fn cumulative_totals_monotone(quantities in prop::collection::vec(0.001f64..1_000.0, 1..24)) {
        let raw: Vec<(String, String)> = quantities
            .iter()
            .enumerate()
            .map(|(i, q)| ((50_000 - i as u32).to_string(), q.to_string()))
            .collect();
        let snap = DepthSnapshot::from_raw("BTCUSDT", &raw, &[], 24, 0);

        for pair in snap.bids.windows(2) {
            prop_assert!(pair[1].total >= pair[0].total);
        }
        let sum: f64 = snap.bids.iter().map(|l| l.quantity).sum();
        let last = snap.bids.last().map_or(0.0, |l| l.total);
        prop_assert!((last - sum).abs() < 1e-6);
    }
}

// ── Display Throttle Properties ────────────────────────────

#[derive(Debug, Clone)]
struct Snap(usize);

impl SnapshotRecords for Snap {
    fn record_count(&self) -> usize {
        self.0
    }
}

proptest! {
    /// No two publishes ever happen closer together than the minimum
    /// interval, whatever the offer pattern.
    #[test]
    fn publishes_respect_min_interval(offsets_ms in prop::collection::vec(0u64..5_000, 1..64)) {
        let interval = Duration::from_millis(1000);
        let mut throttle = Throttle::new(interval, 1);
        let start = Instant::now();

        let mut sorted = offsets_ms;
        sorted.sort_unstable();

        let mut last_publish: Option<Instant> = None;
        for offset in sorted {
            let now = start + Duration::from_millis(offset);
            if throttle.offer(Snap(1), now).is_some() {
                if let Some(prev) = last_publish {
                    prop_assert!(now.duration_since(prev) >= interval);
                }
                last_publish = Some(now);
            }
        }
    }

    /// An incomplete snapshot is never published through the offer path,
    /// regardless of timing.
    #[test]
    fn incomplete_snapshots_held_on_offer(
        records in 0usize..12,
        offset_ms in 0u64..10_000,
    ) {
        let mut throttle = Throttle::new(Duration::from_millis(1000), 12);
        let now = Instant::now() + Duration::from_millis(offset_ms);
        prop_assert!(throttle.offer(Snap(records), now).is_none());
        prop_assert!(throttle.has_pending());
    }
}
