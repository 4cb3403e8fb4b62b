//! Deterministic demo snapshot generation.
//!
//! RULE: Nothing here may call a platform RNG. The same seed must yield
//! the same snapshot byte for byte, so report runs stay reproducible and
//! tests can pin exact counts.
//!
//! The generated history deliberately contains the anomalies the engine
//! filters: missing purchase timestamps, purchases recorded before signup,
//! same-day deliveries, and status rows with no matching order line.

use crate::records::{CustomerRecord, DeliveryRecord, OrderLineRecord, Snapshot};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG for demo data.
pub struct DemoRng {
    inner: Pcg64Mcg,
}

impl DemoRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// A v4-shaped uuid drawn from this stream, not the platform RNG.
    pub fn uuid(&mut self) -> String {
        use rand::RngCore;
        let mut bytes = [0u8; 16];
        let (a, b) = (self.inner.next_u64(), self.inner.next_u64());
        bytes[..8].copy_from_slice(&a.to_le_bytes());
        bytes[8..].copy_from_slice(&b.to_le_bytes());
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}

/// (raw product name, base price). One entry uses a raw alias spelling so
/// generated data exercises the canonical-name table.
const PRODUCTS: &[(&str, f64)] = &[
    ("Espresso Beans 1kg", 18.50),
    ("Pour-Over Kettle", 42.00),
    ("Ceramic Mug", 12.00),
    ("Cold Brew Bottle", 24.00),
    ("Filter Papers", 6.50),
    ("gift-card-25", 25.00),
];

fn start_of_history() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap_or_default()
}

/// Generate a full demo snapshot: `customers` customers with order lines
/// and delivery status rows over roughly one year of history.
pub fn generate(seed: u64, customers: u32) -> Snapshot {
    let mut rng = DemoRng::new(seed);
    let base = start_of_history();

    let mut snapshot = Snapshot::default();

    for i in 0..customers {
        let customer_id = format!("c-{i:06}");
        let signup = base + Duration::days(rng.next_u64_below(300) as i64);

        // ~45% one-time, the rest place 2 to 5 orders.
        let order_count = if rng.chance(0.45) {
            1
        } else {
            2 + rng.next_u64_below(4)
        };

        let mut order_ts = signup + Duration::days(rng.next_u64_below(60) as i64);
        let first_order_ts = order_ts;
        for n in 0..order_count {
            if n > 0 {
                order_ts += Duration::days(1 + rng.next_u64_below(90) as i64);
            }
            let items = 1 + rng.next_u64_below(3);
            for _ in 0..items {
                let (name, base_price) = PRODUCTS[rng.next_u64_below(PRODUCTS.len() as u64) as usize];
                // ~3% of lines lose their timestamp in the feed.
                let purchased_at = if rng.chance(0.03) { None } else { Some(order_ts) };
                let line = OrderLineRecord {
                    line_item_id: rng.uuid(),
                    customer_id: customer_id.clone(),
                    purchased_at,
                    product_name: name.to_string(),
                    unit_price: base_price + rng.next_u64_below(300) as f64 / 100.0,
                };
                // ~80% of timestamped lines get a status row.
                if purchased_at.is_some() && rng.chance(0.80) {
                    let delivered_at = if rng.chance(0.05) {
                        None
                    } else {
                        // 0 days = same-day delivery, excluded by the
                        // delivery metric but present in the feed.
                        Some(order_ts + Duration::days(rng.next_u64_below(7) as i64))
                    };
                    snapshot.deliveries.push(DeliveryRecord {
                        line_item_id: line.line_item_id.clone(),
                        purchased_at,
                        delivered_at,
                    });
                }
                snapshot.order_lines.push(line);
            }
        }

        // ~2% of signups are recorded after the first purchase, which the
        // interval metric must exclude as a negative day count.
        let created_on = if rng.chance(0.02) {
            first_order_ts + Duration::days(1 + rng.next_u64_below(30) as i64)
        } else {
            signup
        };
        snapshot.customers.push(CustomerRecord {
            customer_id,
            created_on,
        });
    }

    // A few status rows reference line items missing from the order log.
    for _ in 0..(customers / 100).max(1) {
        let ts = base + Duration::days(rng.next_u64_below(300) as i64);
        snapshot.deliveries.push(DeliveryRecord {
            line_item_id: rng.uuid(),
            purchased_at: Some(ts),
            delivered_at: Some(ts + Duration::days(2)),
        });
    }

    snapshot
}
