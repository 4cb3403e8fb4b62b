//! Product mix per segment and purchase stage.
//!
//! Each line item is attributed to a stage by the dense rank of its order
//! event among the owning customer's distinct order events: every item in
//! a first basket is a first-stage item. Lines without a timestamp cannot
//! be staged and are skipped and counted.
//!
//! Grouping runs on canonical product names from the config alias table,
//! so two raw spellings of one product land in one row.

use crate::classifier::{CustomerType, Segment};
use crate::config::AnalyticsConfig;
use crate::ranking::{dense_rank_by_timestamp, keyed_timestamps_by_customer, PurchaseStage};
use crate::records::OrderLineRecord;
use crate::types::CustomerId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One canonical product's volumes within a breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub product_name: String,
    pub items_purchased: u64,
    pub total_revenue: f64,
    pub average_price: f64,
}

/// Product rows for one (segment, stage) partition, name ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductBreakdown {
    pub segment: Segment,
    pub stage: PurchaseStage,
    pub rows: Vec<ProductRow>,
    /// Untimestamped lines owned by this partition's segment. A line with
    /// no timestamp belongs to no stage, so every stage partition of one
    /// segment reports the same value; aggregate per segment, never by
    /// summing partitions.
    pub skipped_missing_timestamp: u64,
}

/// Volumes per canonical product over lines owned by `segment` customers
/// at purchase stage `stage`.
pub fn product_breakdown(
    lines: &[OrderLineRecord],
    classification: &BTreeMap<CustomerId, CustomerType>,
    config: &AnalyticsConfig,
    segment: Segment,
    stage: PurchaseStage,
) -> ProductBreakdown {
    let ranks_by_customer: BTreeMap<CustomerId, BTreeMap<NaiveDateTime, u32>> =
        keyed_timestamps_by_customer(lines)
            .into_iter()
            .map(|(id, ts)| {
                let map = dense_rank_by_timestamp(&ts);
                (id, map)
            })
            .collect();

    let mut skipped_missing_timestamp = 0u64;
    let mut items: BTreeMap<&str, u64> = BTreeMap::new();
    let mut revenue: BTreeMap<&str, f64> = BTreeMap::new();

    for line in lines {
        let in_segment = classification
            .get(&line.customer_id)
            .is_some_and(|t| segment.matches(*t));
        if !in_segment {
            continue;
        }
        let Some(ts) = line.purchased_at else {
            skipped_missing_timestamp += 1;
            continue;
        };
        let staged = ranks_by_customer
            .get(&line.customer_id)
            .and_then(|m| m.get(&ts))
            .is_some_and(|rank| stage.matches(*rank));
        if !staged {
            continue;
        }
        let name = config.normalize(&line.product_name);
        *items.entry(name).or_default() += 1;
        *revenue.entry(name).or_default() += line.unit_price;
    }

    let rows = items
        .into_iter()
        .map(|(name, count)| {
            let total = revenue.get(name).copied().unwrap_or(0.0);
            ProductRow {
                product_name: name.to_string(),
                items_purchased: count,
                total_revenue: total,
                average_price: total / count as f64,
            }
        })
        .collect();

    ProductBreakdown {
        segment,
        stage,
        rows,
        skipped_missing_timestamp,
    }
}
